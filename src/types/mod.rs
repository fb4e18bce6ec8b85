//! Tipos compartilhados do resultcache.

pub mod config;
pub mod errors;
