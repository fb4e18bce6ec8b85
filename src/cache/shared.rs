//! Handle compartilhado do cache e instância global do processo.
//!
//! [`ResultCache`] exige `&mut self` para promover entradas. Quando o cache é
//! usado por várias tasks ou threads, [`SharedCache`] serializa cada operação
//! atrás de um único mutex. Nenhuma operação faz I/O dentro da seção crítica.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::types::errors::CacheResult;

use super::fingerprint::Fingerprint;
use super::lru::{CacheStats, ResultCache, DEFAULT_CAPACITY};
use super::snapshot::CacheSnapshot;

/// Instância global, criada no primeiro acesso e nunca destruída.
static GLOBAL_CACHE: OnceLock<SharedCache> = OnceLock::new();

/// Cache padrão do processo (capacidade [`DEFAULT_CAPACITY`]).
///
/// Como qualquer cache novo, começa não inicializado: alguém precisa chamar
/// `start` ou `seed` antes do primeiro uso. Prefira passar um
/// [`SharedCache`] explícito quando o ciclo de vida importa.
pub fn global() -> &'static SharedCache {
    GLOBAL_CACHE.get_or_init(|| SharedCache::new(DEFAULT_CAPACITY))
}

/// Handle clonável e thread-safe para um [`ResultCache`].
#[derive(Debug, Clone)]
pub struct SharedCache {
    inner: Arc<Mutex<ResultCache>>,
}

impl SharedCache {
    /// Cria um cache compartilhado não inicializado.
    pub fn new(capacity: usize) -> Self {
        Self::from_cache(ResultCache::new(capacity))
    }

    /// Envolve um cache existente.
    pub fn from_cache(cache: ResultCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResultCache> {
        // Nenhuma operação do cache deixa estado parcial ao entrar em pânico.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Executa várias operações como uma única seção crítica.
    pub fn with<R>(&self, f: impl FnOnce(&mut ResultCache) -> R) -> R {
        f(&mut self.lock())
    }

    /// Capacidade máxima.
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Indica se o cache está ativo.
    pub fn is_active(&self) -> bool {
        self.lock().is_active()
    }

    /// Número de entradas.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Indica se não há entradas.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Ver [`ResultCache::start`].
    pub fn start(&self) {
        self.lock().start();
    }

    /// Ver [`ResultCache::seed`].
    pub fn seed<I>(&self, entries: I, order: Vec<Fingerprint>)
    where
        I: IntoIterator<Item = (Fingerprint, Value)>,
    {
        self.lock().seed(entries, order);
    }

    /// Ver [`ResultCache::put`].
    pub fn put<K, V>(&self, obj: &K, result: &V) -> CacheResult<()>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        self.lock().put(obj, result)
    }

    /// Ver [`ResultCache::try_put`].
    pub fn try_put<K, V>(&self, obj: &K, result: &V) -> bool
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        self.lock().try_put(obj, result)
    }

    /// Ver [`ResultCache::get`]. Retorna uma cópia do valor.
    pub fn get<K>(&self, obj: &K) -> CacheResult<Option<Value>>
    where
        K: Serialize + ?Sized,
    {
        Ok(self.lock().get(obj)?.cloned())
    }

    /// Ver [`ResultCache::get_as`].
    pub fn get_as<K, V>(&self, obj: &K) -> CacheResult<Option<V>>
    where
        K: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        self.lock().get_as(obj)
    }

    /// Ver [`ResultCache::invalidate`].
    pub fn invalidate<K>(&self, obj: &K) -> CacheResult<bool>
    where
        K: Serialize + ?Sized,
    {
        self.lock().invalidate(obj)
    }

    /// Ver [`ResultCache::clear`].
    pub fn clear(&self) -> CacheResult<()> {
        self.lock().clear()
    }

    /// Cópia do estado atual.
    ///
    /// A visão emprestada de [`ResultCache::inspect`] não pode sair do lock;
    /// para inspecionar sem copiar use [`SharedCache::with`].
    pub fn snapshot(&self) -> CacheResult<CacheSnapshot> {
        let cache = self.lock();
        let snapshot = cache.inspect()?.to_snapshot();
        Ok(snapshot)
    }

    /// Restaura a partir de um snapshot.
    pub fn restore(&self, snapshot: CacheSnapshot) {
        self.lock().restore(snapshot);
    }

    /// Retorna estatísticas do cache.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }
}

impl Default for SharedCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
