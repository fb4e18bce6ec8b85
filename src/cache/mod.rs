//! Cache LRU de resultados.
//!
//! Este módulo implementa um cache Least Recently Used (LRU) que associa o
//! fingerprint de um objeto qualquer a um resultado já calculado, evitando
//! recomputar respostas caras (chamadas de LLM, embeddings).
//!
//! - [`fingerprint`] - chaves derivadas por hash da representação canônica
//! - [`lru`] - o cache em si ([`ResultCache`])
//! - [`shared`] - handle thread-safe e instância global ([`global`])
//! - [`snapshot`] - persistência externa para warm start

pub mod fingerprint;
pub mod lru;
pub mod shared;
pub mod snapshot;

pub use fingerprint::{canonical_repr, fingerprint, Fingerprint};
pub use lru::{CacheStats, CacheView, ResultCache, DEFAULT_CAPACITY};
pub use shared::{global, SharedCache};
#[cfg(feature = "sqlite")]
pub use snapshot::SqliteStore;
pub use snapshot::{
    open_store, persist, warm_start, CacheSnapshot, JsonFileStore, SnapshotStore,
};
