//! # resultcache
//!
//! Cache LRU limitado para resultados caros de calcular.
//!
//! Qualquer objeto serializável vira uma chave: o cache guarda o resultado sob
//! o fingerprint SHA256 da representação canônica do objeto e descarta a
//! entrada menos usada quando a capacidade estoura.
//!
//! ```
//! use resultcache::ResultCache;
//!
//! let mut cache = ResultCache::new(2);
//! cache.start();
//!
//! cache.put("prompt", &"resposta").unwrap();
//! assert_eq!(cache.get("prompt").unwrap().and_then(|v| v.as_str()), Some("resposta"));
//! ```
//!
//! ## Módulos
//!
//! - [`cache`] - Cache LRU, fingerprints, handle compartilhado e snapshots
//! - [`cli`] - Interface de linha de comando
//! - [`types`] - Tipos compartilhados

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod types;

pub use cache::{fingerprint, global, Fingerprint, ResultCache, SharedCache};
pub use types::config::Config;
pub use types::errors::{CacheError, CacheResult};
