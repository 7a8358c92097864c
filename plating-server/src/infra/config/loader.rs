use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use thiserror::Error;

use super::{
    Config, ConfigMetadata, CorsConfig, ScorerConfig, ScoringConfig,
    ServerConfig,
    sources::{
        ENV_CONCURRENCY, ENV_MAX_BATCH_SIZE, ENV_MAX_BODY_BYTES,
        ENV_SCORER_TIMEOUT, ENV_SERVER_PORT, EnvConfig, FileConfig,
    },
};

const DEFAULT_CONFIG_LOCATIONS: &[&str] =
    &["plating.toml", "config/plating.toml"];

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file {path} does not exist")]
    MissingConfig { path: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    #[error("invalid value {value:?} for {key}: {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push(&mut self, message: impl Into<String>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint(
        &mut self,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, then compose file and process environment.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose configuration from an explicit environment snapshot.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        compose_config(file_config, env, config_path)
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(Path::new)
                .find(|candidate| candidate.exists())
            {
                Some(found) => found.to_path_buf(),
                None => return Ok((None, None)),
            },
        };

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();
    if file.is_none() {
        warnings.push_with_hint(
            "No plating.toml detected; using environment variables and defaults",
            "Create plating.toml or set PLATING_CONFIG_PATH",
        );
    }

    let defaults = Config::default();
    let FileConfig {
        server: file_server,
        scoring: file_scoring,
        scorer: file_scorer,
        cors: file_cors,
    } = file.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or(defaults.server.host),
        port: parse_env(ENV_SERVER_PORT, env.server_port.as_deref())?
            .or(file_server.port)
            .unwrap_or(defaults.server.port),
        max_body_bytes: parse_env(
            ENV_MAX_BODY_BYTES,
            env.max_body_bytes.as_deref(),
        )?
        .or(file_server.max_body_bytes)
        .unwrap_or(defaults.server.max_body_bytes),
    };

    let timeout = match env.scorer_timeout.as_deref() {
        Some(raw) => parse_timeout(ENV_SCORER_TIMEOUT, raw)?,
        None => match file_scoring.timeout.as_deref() {
            Some(raw) => parse_timeout("scoring.timeout", raw)?,
            None => defaults.scoring.timeout,
        },
    };

    let scoring = ScoringConfig {
        max_batch_size: parse_env(
            ENV_MAX_BATCH_SIZE,
            env.max_batch_size.as_deref(),
        )?
        .or(file_scoring.max_batch_size)
        .unwrap_or(defaults.scoring.max_batch_size),
        concurrency: parse_env(ENV_CONCURRENCY, env.concurrency.as_deref())?
            .or(file_scoring.concurrency)
            .unwrap_or(defaults.scoring.concurrency),
        scratch_dir: env
            .scratch_dir
            .or(file_scoring.scratch_dir)
            .unwrap_or(defaults.scoring.scratch_dir),
        timeout,
    };

    if scoring.max_batch_size == 0 {
        return Err(ConfigLoadError::Invalid(
            "scoring.max_batch_size must be at least 1".into(),
        ));
    }
    if scoring.concurrency == 0 {
        return Err(ConfigLoadError::Invalid(
            "scoring.concurrency must be at least 1".into(),
        ));
    }

    let scorer = ScorerConfig {
        program: env.scorer_program.or(file_scorer.program),
        args: env.scorer_args.or(file_scorer.args).unwrap_or_default(),
    };
    if scorer.program.is_none() {
        warnings.push_with_hint(
            "No scorer program configured; scoring endpoints will answer 503",
            "Set scorer.program in plating.toml or PLATING_SCORER_PROGRAM",
        );
    }

    let cors = CorsConfig {
        allowed_origins: env
            .cors_allowed_origins
            .or(file_cors.allowed_origins)
            .unwrap_or(defaults.cors.allowed_origins),
    };

    Ok(ConfigLoad {
        config: Config {
            server,
            scoring,
            scorer,
            cors,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        },
        warnings,
    })
}

fn parse_env<T>(key: &str, raw: Option<&str>) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|value| {
        value.parse::<T>().map_err(|err| ConfigLoadError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            message: err.to_string(),
        })
    })
    .transpose()
}

fn parse_timeout(
    key: &str,
    raw: &str,
) -> Result<Option<Duration>, ConfigLoadError> {
    let duration = humantime::parse_duration(raw.trim()).map_err(|err| {
        ConfigLoadError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            message: err.to_string(),
        }
    })?;
    Ok((!duration.is_zero()).then_some(duration))
}
