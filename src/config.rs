//! Server configuration.
//!
//! A [`ServerConfig`] is built once at startup from defaults, an optional YAML
//! file and the command line, then validated and shared read-only with every
//! connection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9999;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_BACKLOG: u32 = 5;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_HEAD_BYTES: usize = 16 * 1024;

/// Immutable settings consumed by the listener and every connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Directory files are served from. Absolute once validated.
    pub document_root: PathBuf,
    pub host: String,
    pub port: u16,
    /// Maximum number of connections handled at the same time.
    pub workers: usize,
    /// Pending connections the OS queues while every worker is busy.
    pub backlog: u32,
    /// Idle timeout applied to each socket read.
    pub read_timeout_ms: u64,
    /// Upper bound on the size of a request head.
    pub max_head_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            document_root: PathBuf::from("DOCUMENT_ROOT"),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            backlog: DEFAULT_BACKLOG,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_head_bytes: DEFAULT_MAX_HEAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Creates a config serving `document_root` with every other field at its default.
    pub fn new(document_root: impl Into<PathBuf>) -> Self {
        Self {
            document_root: document_root.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid configuration")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("in config file {}", path.display()))
    }

    /// `host:port` as handed to the resolver.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Checks the settings and makes the document root absolute.
    ///
    /// A missing document root or an empty worker pool cannot be recovered
    /// from, so both are reported here rather than on the first request.
    pub fn validate(mut self) -> anyhow::Result<Self> {
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.max_head_bytes == 0 {
            anyhow::bail!("max_head_bytes must be greater than 0");
        }

        let root = std::fs::canonicalize(&self.document_root).with_context(|| {
            format!(
                "document root {} does not exist",
                self.document_root.display()
            )
        })?;
        if !root.is_dir() {
            anyhow::bail!("document root {} is not a directory", root.display());
        }

        self.document_root = root;
        Ok(self)
    }
}

/// Command line of the `lantern` binary.
///
/// Every flag can also come from the environment; anything left unset falls
/// back to the config file and then to the built-in defaults.
#[derive(Debug, Default, Parser)]
#[command(name = "lantern", version, about = "Static file HTTP/1.1 server")]
pub struct Cli {
    /// YAML file with server settings
    #[arg(short, long, env = "LANTERN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory to serve files from
    #[arg(short = 'r', long = "root", env = "LANTERN_ROOT")]
    pub document_root: Option<PathBuf>,

    /// Number of connections served concurrently
    #[arg(short, long, env = "LANTERN_WORKERS")]
    pub workers: Option<usize>,

    /// Interface to bind
    #[arg(long, env = "LANTERN_HOST")]
    pub host: Option<String>,

    /// Port to bind
    #[arg(short, long, env = "LANTERN_PORT")]
    pub port: Option<u16>,

    /// Listen backlog
    #[arg(long, env = "LANTERN_BACKLOG")]
    pub backlog: Option<u32>,

    /// Per-read idle timeout in milliseconds
    #[arg(long, env = "LANTERN_READ_TIMEOUT_MS")]
    pub read_timeout_ms: Option<u64>,
}

impl Cli {
    /// Merges the command line over the config file (if any) and validates the result.
    pub fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut cfg = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(root) = self.document_root {
            cfg.document_root = root;
        }
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        if let Some(host) = self.host {
            cfg.host = host;
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(backlog) = self.backlog {
            cfg.backlog = backlog;
        }
        if let Some(timeout) = self.read_timeout_ms {
            cfg.read_timeout_ms = timeout;
        }

        cfg.validate()
    }
}
