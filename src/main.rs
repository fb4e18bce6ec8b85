use clap::Parser;
use resultcache::cli::{Cli, Commands};
use resultcache::types::config::Config;
use resultcache::CacheResult;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> CacheResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let config = if cli.config.exists() {
        Config::load(&cli.config).unwrap_or_else(|_| Config::default_config())
    } else {
        Config::default_config()
    };

    // Determine log level: CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("resultcache={}", log_level)
            .parse()
            .unwrap_or_else(|_| "resultcache=info".parse().expect("fallback directive is valid")),
    );

    if config.general.log_format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            resultcache::cli::commands::init(path).await?;
        }
        Commands::Put { key, value } => {
            resultcache::cli::commands::put(&key, &value, &config).await?;
        }
        Commands::Get { key } => {
            resultcache::cli::commands::get(&key, &config).await?;
        }
        Commands::Fingerprint { key } => {
            resultcache::cli::commands::fingerprint(&key)?;
        }
        Commands::Show { json } => {
            resultcache::cli::commands::show(json, &config).await?;
        }
        Commands::Forget { key } => {
            resultcache::cli::commands::forget(&key, &config).await?;
        }
        Commands::Clear => {
            resultcache::cli::commands::clear(&config).await?;
        }
        Commands::Status => {
            resultcache::cli::commands::status(&config).await?;
        }
        Commands::Version => {
            resultcache::cli::commands::version();
        }
    }

    Ok(())
}
