//! Server configuration.
//!
//! Precedence, lowest first: built-in defaults, `plating.toml`, environment
//! (including a `.env` file), command-line flags applied by `main`.

pub mod loader;
pub mod sources;

use std::{path::PathBuf, time::Duration};

use plating_core::{
    BatchLimits, DEFAULT_SCORER_TIMEOUT,
    batch::{DEFAULT_CONCURRENCY, DEFAULT_MAX_BATCH_SIZE},
};

pub use loader::{
    ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
    ConfigWarning, ConfigWarnings,
};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
/// Base64 inflates payloads by a third; ten large photos fit comfortably.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub scoring: ScoringConfig,
    pub scorer: ScorerConfig,
    pub cors: CorsConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    pub max_batch_size: usize,
    pub concurrency: usize,
    pub scratch_dir: PathBuf,
    /// `None` lets a scorer call run as long as it needs.
    pub timeout: Option<Duration>,
}

impl ScoringConfig {
    pub fn limits(&self) -> BatchLimits {
        BatchLimits {
            max_batch_size: self.max_batch_size,
            concurrency: self.concurrency,
        }
    }
}

/// External model invocation; no program means the model is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScorerConfig {
    pub program: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn is_permissive(&self) -> bool {
        self.allowed_origins.is_empty()
            || self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
            scoring: ScoringConfig {
                max_batch_size: DEFAULT_MAX_BATCH_SIZE,
                concurrency: DEFAULT_CONCURRENCY,
                scratch_dir: default_scratch_dir(),
                timeout: Some(DEFAULT_SCORER_TIMEOUT),
            },
            scorer: ScorerConfig::default(),
            cors: CorsConfig {
                allowed_origins: vec!["*".to_string()],
            },
            metadata: ConfigMetadata::default(),
        }
    }
}

pub fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("plating-scratch")
}
