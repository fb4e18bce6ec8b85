//! Tipos de erro do resultcache.

use thiserror::Error;

/// Tipo de resultado padrão do resultcache.
pub type CacheResult<T> = Result<T, CacheError>;

/// Erros possíveis no resultcache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache não inicializado: chame start() ou seed() antes de usar")]
    Uninitialized,

    #[error("Resultado não pode ser armazenado no cache: {0}")]
    UnrepresentableResult(String),

    #[error("Chave não possui representação canônica: {0}")]
    UnrepresentableKey(String),

    #[error("Valor em cache não pôde ser decodificado: {0}")]
    Decode(String),

    #[error("Fingerprint inválido: '{0}'")]
    InvalidFingerprint(String),

    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("Erro de IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro ao parsear TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Erro ao serializar TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Erro de JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Erro no snapshot: {0}")]
    Snapshot(String),

    #[cfg(feature = "sqlite")]
    #[error("Erro de SQLite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

impl CacheError {
    /// Cria um erro genérico.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Cria um erro de configuração.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Cria um erro de snapshot.
    pub fn snapshot<S: Into<String>>(msg: S) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Indica se o erro vem de um resultado que não pôde ser armazenado.
    pub fn is_unrepresentable(&self) -> bool {
        matches!(
            self,
            Self::UnrepresentableResult(_) | Self::UnrepresentableKey(_)
        )
    }
}
