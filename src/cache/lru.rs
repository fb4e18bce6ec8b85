//! Cache LRU de resultados indexado por fingerprint.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::errors::{CacheError, CacheResult};

use super::fingerprint::Fingerprint;

/// Capacidade padrão do cache.
pub const DEFAULT_CAPACITY: usize = 128;

const DEFAULT_NON_ZERO: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CAPACITY) {
    Some(cap) => cap,
    None => panic!("DEFAULT_CAPACITY must be non-zero"),
};

/// Estatísticas do cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Número atual de entradas.
    pub size: usize,

    /// Capacidade máxima.
    pub capacity: usize,

    /// Número de acertos (cache hits).
    pub hits: u64,

    /// Número de erros (cache misses).
    pub misses: u64,

    /// Entradas removidas por excesso de capacidade.
    pub evictions: u64,
}

impl CacheStats {
    /// Calcula a taxa de acerto.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache LRU de resultados.
///
/// O cache nasce sem armazenamento; [`ResultCache::start`] ou
/// [`ResultCache::seed`] o tornam ativo. Qualquer operação antes disso
/// retorna [`CacheError::Uninitialized`].
///
/// A ordem de recência e o mapa de entradas vivem no mesmo `LruCache`, então
/// os dois lados nunca divergem: promoção e remoção são O(1).
pub struct ResultCache {
    capacity: NonZeroUsize,
    store: Option<LruCache<Fingerprint, Value>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    /// Cria um cache ainda não inicializado.
    ///
    /// Capacidade zero cai no padrão ([`DEFAULT_CAPACITY`]).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: NonZeroUsize::new(capacity).unwrap_or(DEFAULT_NON_ZERO),
            store: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cria um cache com a capacidade padrão.
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Capacidade máxima (imutável).
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Indica se o cache já recebeu armazenamento.
    pub fn is_active(&self) -> bool {
        self.store.is_some()
    }

    /// Número de entradas (zero enquanto não inicializado).
    pub fn len(&self) -> usize {
        self.store.as_ref().map_or(0, LruCache::len)
    }

    /// Indica se não há entradas.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ativa o cache com armazenamento vazio, descartando o anterior.
    pub fn start(&mut self) {
        self.store = Some(LruCache::new(self.capacity));
        tracing::debug!(capacity = self.capacity.get(), "Result cache started");
    }

    /// Instala armazenamento externo (warm start).
    ///
    /// `order` vem do mais recente para o menos recente. A consistência entre
    /// `entries` e `order` é responsabilidade de quem chama; o que não puder
    /// ser representado é descartado: fingerprints sem valor, valores sem
    /// posição na ordem, repetições e o excedente da capacidade (a partir da
    /// cauda).
    pub fn seed<I>(&mut self, entries: I, order: Vec<Fingerprint>)
    where
        I: IntoIterator<Item = (Fingerprint, Value)>,
    {
        let mut entries: HashMap<Fingerprint, Value> = entries.into_iter().collect();
        let mut store = LruCache::new(self.capacity);
        let mut missing = 0usize;
        let mut overflow = 0usize;

        // Repetições mantêm a ocorrência mais recente.
        let total = order.len();
        let mut seen = HashSet::with_capacity(total);
        let order: Vec<Fingerprint> = order
            .into_iter()
            .filter(|fp| seen.insert(fp.clone()))
            .collect();
        let duplicates = total - order.len();

        // Insere da cauda para a frente: o último push fica como mais recente.
        for fp in order.into_iter().rev() {
            match entries.remove(&fp) {
                Some(value) => {
                    if store.push(fp, value).is_some() {
                        overflow += 1;
                    }
                }
                None => missing += 1,
            }
        }

        let orphans = entries.len();
        if missing + orphans + overflow + duplicates > 0 {
            tracing::warn!(
                missing,
                orphans,
                overflow,
                duplicates,
                "Seed data inconsistent with cache invariants, extra entries dropped"
            );
        }

        tracing::debug!(
            size = store.len(),
            capacity = self.capacity.get(),
            "Result cache seeded"
        );
        self.store = Some(store);
    }

    /// Visão somente leitura do armazenamento atual.
    ///
    /// A visão empresta o cache: não é uma cópia, e reflete exatamente o
    /// estado no momento da leitura. Use [`CacheView::to_snapshot`] para
    /// obter uma cópia independente.
    pub fn inspect(&self) -> CacheResult<CacheView<'_>> {
        let store = self.store.as_ref().ok_or(CacheError::Uninitialized)?;
        Ok(CacheView {
            store,
            capacity: self.capacity.get(),
        })
    }

    /// Armazena `result` sob o fingerprint de `obj`.
    ///
    /// A entrada vai para a frente da ordem de recência; se a capacidade for
    /// excedida, a entrada menos recente é removida. Em caso de erro nada é
    /// alterado.
    pub fn put<K, V>(&mut self, obj: &K, result: &V) -> CacheResult<()>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        if self.store.is_none() {
            return Err(CacheError::Uninitialized);
        }

        let value = serde_json::to_value(result)
            .map_err(|e| CacheError::UnrepresentableResult(e.to_string()))?;
        let fp = Fingerprint::of(obj)?;

        self.put_fingerprint(fp, value)
    }

    /// Versão de [`ResultCache::put`] que nunca propaga erros.
    ///
    /// Falhas são registradas como warning e retornam `false`.
    pub fn try_put<K, V>(&mut self, obj: &K, result: &V) -> bool
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        match self.put(obj, result) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Error while trying to add to cache");
                false
            }
        }
    }

    /// Armazena um valor já serializado sob um fingerprint já calculado.
    pub fn put_fingerprint(&mut self, fp: Fingerprint, value: Value) -> CacheResult<()> {
        let store = self.store.as_mut().ok_or(CacheError::Uninitialized)?;

        tracing::trace!(fingerprint = %fp, "Result cached");

        // `push` devolve o par antigo quando a chave já existia, ou o par
        // removido da cauda quando a capacidade estourou.
        if let Some((old_fp, _)) = store.push(fp.clone(), value) {
            if old_fp != fp {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(evicted = %old_fp, size = store.len(), "LRU entry evicted");
            }
        }

        Ok(())
    }

    /// Busca o resultado associado a `obj`, promovendo-o na ordem de recência.
    ///
    /// Uma chave sem representação canônica nunca pode ter sido inserida, então
    /// é tratada como miss.
    pub fn get<K>(&mut self, obj: &K) -> CacheResult<Option<&Value>>
    where
        K: Serialize + ?Sized,
    {
        if self.store.is_none() {
            return Err(CacheError::Uninitialized);
        }

        match Fingerprint::of(obj) {
            Ok(fp) => self.get_fingerprint(&fp),
            Err(e) => {
                tracing::debug!(error = %e, "Lookup with unrepresentable key");
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Busca e decodifica o resultado no tipo pedido.
    pub fn get_as<K, V>(&mut self, obj: &K) -> CacheResult<Option<V>>
    where
        K: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        match self.get(obj)? {
            Some(value) => V::deserialize(value)
                .map(Some)
                .map_err(|e| CacheError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    /// Busca por fingerprint, promovendo a entrada encontrada.
    pub fn get_fingerprint(&mut self, fp: &Fingerprint) -> CacheResult<Option<&Value>> {
        let store = self.store.as_mut().ok_or(CacheError::Uninitialized)?;

        match store.get(fp) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Remove a entrada de `obj`. Retorna se havia algo para remover.
    pub fn invalidate<K>(&mut self, obj: &K) -> CacheResult<bool>
    where
        K: Serialize + ?Sized,
    {
        let store = self.store.as_mut().ok_or(CacheError::Uninitialized)?;

        match Fingerprint::of(obj) {
            Ok(fp) => Ok(store.pop(&fp).is_some()),
            Err(_) => Ok(false),
        }
    }

    /// Limpa todo o cache (continua ativo).
    pub fn clear(&mut self) -> CacheResult<()> {
        let store = self.store.as_mut().ok_or(CacheError::Uninitialized)?;
        store.clear();
        Ok(())
    }

    /// Retorna estatísticas do cache.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            capacity: self.capacity.get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("capacity", &self.capacity)
            .field("active", &self.is_active())
            .field("size", &self.len())
            .finish()
    }
}

/// Visão emprestada do armazenamento do cache.
#[derive(Clone, Copy)]
pub struct CacheView<'a> {
    store: &'a LruCache<Fingerprint, Value>,
    capacity: usize,
}

impl<'a> CacheView<'a> {
    /// Fingerprints do mais recente para o menos recente.
    pub fn order(&self) -> impl Iterator<Item = &'a Fingerprint> + 'a {
        let store = self.store;
        store.iter().map(|(fp, _)| fp)
    }

    /// Entradas na ordem de recência.
    pub fn entries(&self) -> impl Iterator<Item = (&'a Fingerprint, &'a Value)> + 'a {
        let store = self.store;
        store.iter()
    }

    /// Lê uma entrada sem promovê-la.
    pub fn get(&self, fp: &Fingerprint) -> Option<&'a Value> {
        let store = self.store;
        store.peek(fp)
    }

    /// Indica se o fingerprint está no cache.
    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.store.contains(fp)
    }

    /// Número de entradas.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Indica se não há entradas.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Capacidade do cache inspecionado.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cópia do mapa de entradas.
    pub fn to_entries(&self) -> HashMap<Fingerprint, Value> {
        self.entries()
            .map(|(fp, value)| (fp.clone(), value.clone()))
            .collect()
    }

    /// Cópia da ordem de recência.
    pub fn to_order(&self) -> Vec<Fingerprint> {
        self.order().cloned().collect()
    }
}

impl fmt::Debug for CacheView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.order()).finish()
    }
}
