//! Snapshots do cache para warm start entre execuções.
//!
//! O cache nunca faz I/O. Este módulo é o colaborador externo que lê o estado
//! via `inspect`, grava em algum lugar e depois o devolve via `seed`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::config::{CacheConfig, SnapshotBackend};
use crate::types::errors::{CacheError, CacheResult};

use super::fingerprint::Fingerprint;
use super::lru::{CacheView, ResultCache};
use super::shared::SharedCache;

/// Versão do formato de snapshot.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Cópia independente do conteúdo do cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Versão do formato.
    pub version: String,
    /// Momento em que o snapshot foi tirado.
    pub saved_at: DateTime<Utc>,
    /// Capacidade do cache de origem.
    pub capacity: usize,
    /// Valores por fingerprint.
    pub entries: BTreeMap<Fingerprint, Value>,
    /// Ordem de recência, do mais recente para o menos recente.
    pub order: Vec<Fingerprint>,
}

impl CacheSnapshot {
    /// Snapshot vazio.
    pub fn empty(capacity: usize) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            saved_at: Utc::now(),
            capacity,
            entries: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// Número de entradas.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Indica se não há entradas.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verifica versão e formato dos fingerprints.
    pub fn validate(&self) -> CacheResult<()> {
        let major = |v: &str| v.split('.').next().unwrap_or_default().to_string();
        if major(&self.version) != major(SNAPSHOT_VERSION) {
            return Err(CacheError::snapshot(format!(
                "versão {} incompatível com {}",
                self.version, SNAPSHOT_VERSION
            )));
        }

        for fp in self.entries.keys().chain(self.order.iter()) {
            Fingerprint::parse(fp.as_str())?;
        }

        Ok(())
    }
}

impl CacheView<'_> {
    /// Copia a visão para um snapshot independente.
    pub fn to_snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            saved_at: Utc::now(),
            capacity: self.capacity(),
            entries: self
                .entries()
                .map(|(fp, value)| (fp.clone(), value.clone()))
                .collect(),
            order: self.to_order(),
        }
    }
}

impl ResultCache {
    /// Instala o conteúdo de um snapshot (ver [`ResultCache::seed`]).
    pub fn restore(&mut self, snapshot: CacheSnapshot) {
        if snapshot.capacity != self.capacity() {
            tracing::debug!(
                snapshot_capacity = snapshot.capacity,
                capacity = self.capacity(),
                "Restoring snapshot taken with a different capacity"
            );
        }
        self.seed(snapshot.entries, snapshot.order);
    }
}

/// Destino de persistência de snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Nome do backend.
    fn name(&self) -> &str;

    /// Local do snapshot.
    fn location(&self) -> &Path;

    /// Carrega o último snapshot. `None` quando ainda não existe.
    async fn load(&self) -> CacheResult<Option<CacheSnapshot>>;

    /// Grava o snapshot, substituindo o anterior.
    async fn save(&self, snapshot: &CacheSnapshot) -> CacheResult<()>;
}

/// Snapshot em arquivo JSON.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Cria um store para o arquivo indicado.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    fn location(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> CacheResult<Option<CacheSnapshot>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: CacheSnapshot = serde_json::from_str(&json)?;
        snapshot.validate()?;

        tracing::info!(
            path = %self.path.display(),
            entries = snapshot.len(),
            "Cache snapshot loaded"
        );

        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &CacheSnapshot) -> CacheResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Grava num arquivo temporário e renomeia: o snapshot antigo só some
        // quando o novo está completo.
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::info!(
            path = %self.path.display(),
            entries = snapshot.len(),
            "Cache snapshot saved"
        );

        Ok(())
    }
}

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;

    use rusqlite::{params, Connection, OptionalExtension};

    /// Snapshot em banco SQLite.
    #[derive(Debug, Clone)]
    pub struct SqliteStore {
        path: PathBuf,
    }

    impl SqliteStore {
        /// Cria um store para o banco indicado.
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        fn open(&self) -> CacheResult<Connection> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let conn = Connection::open(&self.path)?;
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS snapshot_meta (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    version TEXT NOT NULL,
                    saved_at TEXT NOT NULL,
                    capacity INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS entries (
                    fingerprint TEXT PRIMARY KEY,
                    position INTEGER NOT NULL,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_entries_position ON entries(position);
                "#,
            )?;

            Ok(conn)
        }
    }

    #[async_trait]
    impl SnapshotStore for SqliteStore {
        fn name(&self) -> &str {
            "sqlite"
        }

        fn location(&self) -> &Path {
            &self.path
        }

        async fn load(&self) -> CacheResult<Option<CacheSnapshot>> {
            let conn = self.open()?;

            let meta: Option<(String, String, i64)> = conn
                .query_row(
                    "SELECT version, saved_at, capacity FROM snapshot_meta WHERE id = 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let Some((version, saved_at, capacity)) = meta else {
                return Ok(None);
            };

            let saved_at = DateTime::parse_from_rfc3339(&saved_at)
                .map_err(|e| CacheError::snapshot(format!("saved_at inválido: {}", e)))?
                .with_timezone(&Utc);

            let mut entries = BTreeMap::new();
            let mut order = Vec::new();

            let mut stmt =
                conn.prepare("SELECT fingerprint, value FROM entries ORDER BY position ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            for row in rows {
                let (fp, value) = row?;
                let fp = Fingerprint::parse(&fp)?;
                let value: Value = serde_json::from_str(&value)?;
                order.push(fp.clone());
                entries.insert(fp, value);
            }

            let snapshot = CacheSnapshot {
                version,
                saved_at,
                capacity: usize::try_from(capacity).unwrap_or_default(),
                entries,
                order,
            };
            snapshot.validate()?;

            tracing::info!(
                path = %self.path.display(),
                entries = snapshot.len(),
                "Cache snapshot loaded"
            );

            Ok(Some(snapshot))
        }

        async fn save(&self, snapshot: &CacheSnapshot) -> CacheResult<()> {
            let mut conn = self.open()?;
            let tx = conn.transaction()?;

            tx.execute("DELETE FROM entries", [])?;
            tx.execute(
                "INSERT OR REPLACE INTO snapshot_meta (id, version, saved_at, capacity)
                 VALUES (1, ?1, ?2, ?3)",
                params![
                    snapshot.version,
                    snapshot.saved_at.to_rfc3339(),
                    snapshot.capacity as i64
                ],
            )?;

            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO entries (fingerprint, position, value)
                     VALUES (?1, ?2, ?3)",
                )?;

                for (position, fp) in snapshot.order.iter().enumerate() {
                    let Some(value) = snapshot.entries.get(fp) else {
                        continue;
                    };
                    stmt.execute(params![
                        fp.as_str(),
                        position as i64,
                        serde_json::to_string(value)?
                    ])?;
                }
            }

            tx.commit()?;

            tracing::info!(
                path = %self.path.display(),
                entries = snapshot.len(),
                "Cache snapshot saved"
            );

            Ok(())
        }
    }
}

/// Cria o store configurado.
pub fn open_store(config: &CacheConfig) -> CacheResult<Box<dyn SnapshotStore>> {
    match config.backend {
        SnapshotBackend::Json => Ok(Box::new(JsonFileStore::new(&config.snapshot_path))),
        #[cfg(feature = "sqlite")]
        SnapshotBackend::Sqlite => Ok(Box::new(SqliteStore::new(&config.snapshot_path))),
        #[cfg(not(feature = "sqlite"))]
        SnapshotBackend::Sqlite => Err(CacheError::config(
            "backend 'sqlite' requer a feature 'sqlite'",
        )),
    }
}

/// Ativa o cache a partir do último snapshot, ou vazio se não houver.
///
/// Retorna o número de entradas instaladas.
pub async fn warm_start(cache: &SharedCache, store: &dyn SnapshotStore) -> CacheResult<usize> {
    match store.load().await? {
        Some(snapshot) => cache.restore(snapshot),
        None => {
            tracing::debug!(
                store = store.name(),
                path = %store.location().display(),
                "No snapshot found, starting cold"
            );
            cache.start();
        }
    }

    Ok(cache.len())
}

/// Grava o estado atual do cache. Retorna o número de entradas gravadas.
pub async fn persist(cache: &SharedCache, store: &dyn SnapshotStore) -> CacheResult<usize> {
    let snapshot = cache.snapshot()?;
    store.save(&snapshot).await?;
    Ok(snapshot.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn populated(capacity: usize) -> SharedCache {
        let cache = SharedCache::new(capacity);
        cache.start();
        cache.put("first", &json!({"tokens": 3})).unwrap();
        cache.put("second", &"plain text").unwrap();
        cache.put(&["third", "key"], &vec![1.5, 2.5]).unwrap();
        cache
    }

    async fn assert_round_trip(store: &dyn SnapshotStore) {
        let cache = populated(8);
        let saved = persist(&cache, store).await.unwrap();
        assert_eq!(saved, 3);

        let restored = SharedCache::new(8);
        let loaded = warm_start(&restored, store).await.unwrap();
        assert_eq!(loaded, 3);

        assert_eq!(restored.snapshot().unwrap().order, cache.snapshot().unwrap().order);
        assert_eq!(
            restored.get("second").unwrap(),
            Some(json!("plain text"))
        );
    }

    #[test]
    fn test_view_to_snapshot() {
        let cache = populated(8);
        let snapshot = cache.snapshot().unwrap();

        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.capacity, 8);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.order[0], Fingerprint::of(&["third", "key"]).unwrap());
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_restore_into_smaller_cache_keeps_most_recent() {
        let snapshot = populated(8).snapshot().unwrap();

        let mut small = ResultCache::new(2);
        small.restore(snapshot.clone());

        assert_eq!(small.inspect().unwrap().to_order(), snapshot.order[..2].to_vec());
    }

    #[test]
    fn test_validate_rejects_other_major_version() {
        let mut snapshot = CacheSnapshot::empty(4);
        snapshot.version = "2.0".to_string();
        assert!(matches!(snapshot.validate(), Err(CacheError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_json_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("cache.json"));
        assert_round_trip(&store).await;
    }

    #[tokio::test]
    async fn test_json_store_missing_file_starts_cold() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("cache.json"));

        let cache = SharedCache::new(4);
        assert_eq!(warm_start(&cache, &store).await.unwrap(), 0);
        assert!(cache.is_active());
    }

    #[tokio::test]
    async fn test_json_store_rejects_bad_fingerprint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let mut raw = serde_json::to_value(CacheSnapshot::empty(4)).unwrap();
        raw["order"] = json!(["not-a-fingerprint"]);
        std::fs::write(&path, raw.to_string()).unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidFingerprint(_)));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("cache.db"));
        assert_round_trip(&store).await;
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_sqlite_store_empty_database() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("cache.db"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_sqlite_save_replaces_previous() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("cache.db"));

        persist(&populated(8), &store).await.unwrap();

        let cache = SharedCache::new(8);
        cache.start();
        cache.put("only", &1).unwrap();
        persist(&cache, &store).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.order, vec![Fingerprint::of("only").unwrap()]);
    }

    #[test]
    fn test_open_store_json() {
        let config = CacheConfig::default();
        let store = open_store(&config).unwrap();
        assert_eq!(store.name(), "json");
        assert_eq!(store.location(), config.snapshot_path.as_path());
    }
}
