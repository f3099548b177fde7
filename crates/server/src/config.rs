//! Server configuration: CLI flags, environment, and TOML files.
//!
//! Precedence is flag, then environment, then file, then built-in default.
//!
//! Environment variables:
//! - `SCROLL_CONFIG` - engine config TOML
//! - `SCROLL_MESSAGES` - message catalog TOML
//! - `SCROLL_DATA_DIR` - directory holding `locations.json`
//! - `SCROLL_LOG_DIR` - directory holding `server.log`
//! - `SCROLL_COOLDOWN_SECONDS`, `SCROLL_MAX_CHARGES`, `SCROLL_SAFE_SEARCH_RADIUS`,
//!   `SCROLL_CHUNK_LOAD_TIMEOUT_MILLIS`, `SCROLL_CONSUME_ON_EMPTY` - override
//!   the matching engine option
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use scroll_content::{ConfigLoader, MessageCatalog, MessageLoader};
use scroll_core::ScrollConfig;
use scroll_runtime::{ConfigSource, HostError, Shared};

use crate::dirs;

/// Reference server for the scroll teleport engine
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "scroll-server", version, about)]
pub struct Args {
    /// Engine configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Message catalog overrides (TOML)
    #[arg(long)]
    pub messages: Option<PathBuf>,

    /// Directory for persisted bindings
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory for log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

pub struct ServerConfig {
    pub scroll: ScrollConfig,
    pub messages: MessageCatalog,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        Self::resolve(args, |key| env::var(key).ok())
    }

    fn resolve(args: Args, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = |flag: Option<PathBuf>, key: &str| flag.or_else(|| var(key).map(PathBuf::from));

        let mut scroll = match path(args.config, "SCROLL_CONFIG") {
            Some(file) => ConfigLoader::load(&file)?,
            None => ScrollConfig::default(),
        };
        apply_overrides(&mut scroll, &var);
        scroll
            .validate()
            .context("invalid configuration after environment overrides")?;

        let messages = match path(args.messages, "SCROLL_MESSAGES") {
            Some(file) => MessageLoader::load(&file)?,
            None => MessageCatalog::default(),
        };

        Ok(Self {
            scroll,
            messages,
            data_dir: path(args.data_dir, "SCROLL_DATA_DIR").unwrap_or_else(dirs::data_dir),
            log_dir: path(args.log_dir, "SCROLL_LOG_DIR").unwrap_or_else(dirs::log_dir),
        })
    }
}

/// Re-reads the same flags, environment, and files the server started with.
///
/// A reload replaces the engine config and the message catalog. Data and log
/// directories stay as they were at startup.
pub struct FileConfigSource {
    args: Args,
    var: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
    messages: Arc<Shared<MessageCatalog>>,
}

impl FileConfigSource {
    pub fn new(args: Args, messages: Arc<Shared<MessageCatalog>>) -> Self {
        Self {
            args,
            var: Box::new(|key| env::var(key).ok()),
            messages,
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn reload(&self) -> Result<ScrollConfig, HostError> {
        let config = ServerConfig::resolve(self.args.clone(), &self.var)
            .map_err(|error| HostError::Rejected(format!("{:#}", error)))?;
        self.messages.store(config.messages);
        tracing::info!("Reloaded configuration files");
        Ok(config.scroll)
    }
}

fn apply_overrides(config: &mut ScrollConfig, var: &impl Fn(&str) -> Option<String>) {
    if let Some(value) = read(var, "SCROLL_COOLDOWN_SECONDS") {
        config.cooldown_seconds = value;
    }
    if let Some(value) = read(var, "SCROLL_MAX_CHARGES") {
        config.max_charges = value;
    }
    if let Some(value) = read(var, "SCROLL_SAFE_SEARCH_RADIUS") {
        config.safe_search_radius = value;
    }
    if let Some(value) = read(var, "SCROLL_CHUNK_LOAD_TIMEOUT_MILLIS") {
        config.chunk_load_timeout_millis = value;
    }
    if let Some(value) = read(var, "SCROLL_CONSUME_ON_EMPTY") {
        config.consume_on_empty = value;
    }
}

fn read<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
{
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}
