//! Interface de linha de comando do resultcache.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// resultcache - Cache LRU de resultados com warm start por snapshot.
#[derive(Parser, Debug)]
#[command(name = "resultcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Arquivo de configuração.
    #[arg(short, long, default_value = "resultcache.toml")]
    pub config: PathBuf,

    /// Modo verbose.
    #[arg(short, long)]
    pub verbose: bool,

    /// Modo silencioso.
    #[arg(short, long)]
    pub quiet: bool,

    /// Comando a executar.
    #[command(subcommand)]
    pub command: Commands,
}

/// Comandos disponíveis.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inicializa configuração no diretório atual.
    Init {
        /// Diretório de destino (padrão: diretório atual).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Armazena um resultado (chave e valor em JSON ou texto).
    Put {
        /// Chave do resultado.
        key: String,

        /// Valor a armazenar.
        value: String,
    },

    /// Busca um resultado, promovendo-o na ordem de recência.
    Get {
        /// Chave do resultado.
        key: String,
    },

    /// Mostra o fingerprint de uma chave.
    Fingerprint {
        /// Chave a calcular.
        key: String,
    },

    /// Lista as entradas da mais recente para a menos recente.
    Show {
        /// Imprime o snapshot completo em JSON.
        #[arg(long)]
        json: bool,
    },

    /// Remove uma entrada.
    Forget {
        /// Chave do resultado.
        key: String,
    },

    /// Esvazia o cache.
    Clear,

    /// Mostra capacidade, ocupação e local do snapshot.
    Status,

    /// Mostra versão.
    Version,
}
