//! Implementação dos comandos CLI do resultcache.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::cache::{open_store, persist, warm_start, Fingerprint, SharedCache, SnapshotStore};
use crate::types::config::Config;
use crate::CacheResult;

/// Initializes configuration in the specified directory.
pub async fn init(path: Option<PathBuf>) -> CacheResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    // Create directory if it doesn't exist
    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join("resultcache.toml");

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        return Ok(());
    }

    // Create .resultcache/ directory for snapshots
    let data_dir = target_dir.join(".resultcache");
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!(".resultcache/ directory created");
    }

    update_gitignore(&target_dir)?;

    let config = Config::default_config();
    config.save(&config_path)?;

    println!("resultcache initialized successfully!");
    println!("Configuration created at: {}", config_path.display());
    println!("Snapshot directory: .resultcache/");

    Ok(())
}

/// Updates or creates .gitignore to include .resultcache/
fn update_gitignore(target_dir: &Path) -> CacheResult<()> {
    let gitignore_path = target_dir.join(".gitignore");
    let entry = ".resultcache/";
    let comment = "# resultcache - local snapshots";

    if gitignore_path.exists() {
        let content = std::fs::read_to_string(&gitignore_path)?;

        if content
            .lines()
            .any(|line| line.trim() == entry || line.trim() == ".resultcache")
        {
            tracing::debug!(".gitignore already contains .resultcache/");
            return Ok(());
        }

        let mut new_content = content.trim_end().to_string();
        if !new_content.is_empty() {
            new_content.push_str("\n\n");
        }
        new_content.push_str(comment);
        new_content.push('\n');
        new_content.push_str(entry);
        new_content.push('\n');

        std::fs::write(&gitignore_path, new_content)?;
        println!(".gitignore updated with .resultcache/");
    } else {
        let content = format!("{}\n{}\n", comment, entry);
        std::fs::write(&gitignore_path, content)?;
        println!(".gitignore created with .resultcache/");
    }

    Ok(())
}

/// Interpreta um argumento como JSON; texto solto vira string JSON.
pub fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Abre o cache configurado, já aquecido a partir do último snapshot.
async fn open_cache(config: &Config) -> CacheResult<(SharedCache, Box<dyn SnapshotStore>)> {
    let cache = SharedCache::new(config.cache.capacity);
    let store = open_store(&config.cache)?;

    let loaded = warm_start(&cache, store.as_ref()).await?;
    tracing::debug!(
        backend = store.name(),
        entries = loaded,
        capacity = cache.capacity(),
        "Cache opened"
    );

    Ok((cache, store))
}

/// Armazena um resultado.
pub async fn put(key: &str, value: &str, config: &Config) -> CacheResult<()> {
    let (cache, store) = open_cache(config).await?;

    let key = parse_arg(key);
    cache.put(&key, &parse_arg(value))?;
    persist(&cache, store.as_ref()).await?;

    println!("Armazenado: {}", Fingerprint::of(&key)?);
    Ok(())
}

/// Busca um resultado.
pub async fn get(key: &str, config: &Config) -> CacheResult<()> {
    let (cache, store) = open_cache(config).await?;

    let key = parse_arg(key);
    match cache.get(&key)? {
        Some(value) => {
            // A leitura promoveu a entrada; grava a nova ordem.
            persist(&cache, store.as_ref()).await?;
            println!("{}", render_value(&value));
        }
        None => {
            println!("Não encontrado: {}", Fingerprint::of(&key)?);
        }
    }

    Ok(())
}

/// Mostra o fingerprint de uma chave.
pub fn fingerprint(key: &str) -> CacheResult<()> {
    println!("{}", Fingerprint::of(&parse_arg(key))?);
    Ok(())
}

/// Lista o conteúdo do cache.
pub async fn show(json: bool, config: &Config) -> CacheResult<()> {
    let (cache, _store) = open_cache(config).await?;

    if json {
        let snapshot = cache.snapshot()?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    cache.with(|c| -> CacheResult<()> {
        let view = c.inspect()?;
        println!("Entradas ({}/{}):\n", view.len(), view.capacity());

        for (i, (fp, value)) in view.entries().enumerate() {
            let mut rendered = value.to_string();
            if rendered.chars().count() > 60 {
                rendered = rendered.chars().take(57).collect::<String>() + "...";
            }
            println!("  {}. {}  {}", i + 1, fp.short(), rendered);
        }

        Ok(())
    })
}

/// Remove uma entrada.
pub async fn forget(key: &str, config: &Config) -> CacheResult<()> {
    let (cache, store) = open_cache(config).await?;

    if cache.invalidate(&parse_arg(key))? {
        persist(&cache, store.as_ref()).await?;
        println!("Entrada removida.");
    } else {
        println!("Nada a remover.");
    }

    Ok(())
}

/// Esvazia o cache.
pub async fn clear(config: &Config) -> CacheResult<()> {
    let (cache, store) = open_cache(config).await?;

    let removed = cache.len();
    cache.clear()?;
    persist(&cache, store.as_ref()).await?;

    println!("Cache limpo ({} entradas removidas).", removed);
    Ok(())
}

/// Mostra status do cache.
pub async fn status(config: &Config) -> CacheResult<()> {
    let (cache, store) = open_cache(config).await?;
    let stats = cache.stats();

    println!("Status do cache\n");
    println!("  Capacidade: {}", stats.capacity);
    println!("  Entradas:   {}", stats.size);
    println!("  Backend:    {}", store.name());
    println!("  Snapshot:   {}", store.location().display());

    Ok(())
}

/// Mostra versão.
pub fn version() {
    println!("resultcache {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Cache LRU de resultados com warm start por snapshot");
}
