use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub scoring: FileScoringConfig,
    #[serde(default)]
    pub scorer: FileScorerConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileScoringConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
    /// Humantime duration, e.g. `"90s"`; `"0s"` disables the timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileScorerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
}

/// Environment overrides, kept as raw strings until the loader parses them
/// so a bad value can be reported with its variable name.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub max_body_bytes: Option<String>,
    pub max_batch_size: Option<String>,
    pub concurrency: Option<String>,
    pub scratch_dir: Option<PathBuf>,
    pub scorer_timeout: Option<String>,
    pub scorer_program: Option<String>,
    pub scorer_args: Option<Vec<String>>,
    pub cors_allowed_origins: Option<Vec<String>>,
}

pub const ENV_CONFIG_PATH: &str = "PLATING_CONFIG_PATH";
pub const ENV_SERVER_HOST: &str = "SERVER_HOST";
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";
pub const ENV_MAX_BODY_BYTES: &str = "PLATING_MAX_BODY_BYTES";
pub const ENV_MAX_BATCH_SIZE: &str = "PLATING_MAX_BATCH_SIZE";
pub const ENV_CONCURRENCY: &str = "PLATING_CONCURRENCY";
pub const ENV_SCRATCH_DIR: &str = "PLATING_SCRATCH_DIR";
pub const ENV_SCORER_TIMEOUT: &str = "PLATING_SCORER_TIMEOUT";
pub const ENV_SCORER_PROGRAM: &str = "PLATING_SCORER_PROGRAM";
pub const ENV_SCORER_ARGS: &str = "PLATING_SCORER_ARGS";
pub const ENV_CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";

impl EnvConfig {
    /// Read overrides from the process environment.
    pub fn gather() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read overrides through `lookup`, ignoring blank values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            config_path: get(ENV_CONFIG_PATH).map(PathBuf::from),
            server_host: get(ENV_SERVER_HOST),
            server_port: get(ENV_SERVER_PORT),
            max_body_bytes: get(ENV_MAX_BODY_BYTES),
            max_batch_size: get(ENV_MAX_BATCH_SIZE),
            concurrency: get(ENV_CONCURRENCY),
            scratch_dir: get(ENV_SCRATCH_DIR).map(PathBuf::from),
            scorer_timeout: get(ENV_SCORER_TIMEOUT),
            scorer_program: get(ENV_SCORER_PROGRAM),
            scorer_args: get(ENV_SCORER_ARGS).map(|raw| {
                raw.split_whitespace().map(str::to_string).collect()
            }),
            cors_allowed_origins: get(ENV_CORS_ALLOWED_ORIGINS).map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            }),
        }
    }
}
