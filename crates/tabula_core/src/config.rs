//! Runtime configuration.
//!
//! Layers, lowest first: built-in defaults, an optional JSON file, then
//! `TABULA_*` environment variables (`TABULA_DB_PATH`, `TABULA_RENDER_TIMEOUT_MS`, ...).

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "TABULA";

#[derive(Debug)]
pub enum ConfigError {
    /// A layer could not be read, parsed or deserialized.
    Source(::config::ConfigError),
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(err) => write!(f, "invalid configuration: {err}"),
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid `{key}` value `{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<::config::ConfigError> for ConfigError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Source(err)
    }
}

/// Core settings shared by every host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// File logging is off when unset.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    /// Directory of `<name>.png` glyphs; tokens fall back to text when unset.
    pub glyph_dir: Option<PathBuf>,
    /// Render deadline; 0 disables it.
    pub render_timeout_ms: u64,
    /// Context whose tokens and marks are drawn.
    pub context: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("tabula.db"),
            log_dir: None,
            log_level: default_log_level().to_string(),
            glyph_dir: None,
            render_timeout_ms: 5_000,
            context: "default".to_string(),
        }
    }
}

impl CoreConfig {
    /// Loads `path` (if any) over the defaults, applies process environment
    /// overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`CoreConfig::load`], reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<::config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Json)
                    .required(true),
            );
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        let config = config.without_blank_dirs();
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document over the defaults, without environment overrides.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?)
            .add_source(::config::File::from_str(text, ::config::FileFormat::Json))
            .build()?
            .try_deserialize()?;
        Ok(config.without_blank_dirs())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "db_path",
                value: String::new(),
                reason: "cannot be empty",
            });
        }
        if normalize_level(&self.log_level).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "log_level",
                value: self.log_level.clone(),
                reason: "expected trace|debug|info|warn|error",
            });
        }
        if self.context.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "context",
                value: self.context.clone(),
                reason: "cannot be blank",
            });
        }
        Ok(())
    }

    pub fn render_timeout(&self) -> Option<Duration> {
        (self.render_timeout_ms > 0).then(|| Duration::from_millis(self.render_timeout_ms))
    }

    // An empty directory (e.g. `TABULA_GLYPH_DIR=`) switches the feature off.
    fn without_blank_dirs(mut self) -> Self {
        self.log_dir = self.log_dir.filter(|dir| !is_blank(dir));
        self.glyph_dir = self.glyph_dir.filter(|dir| !is_blank(dir));
        self
    }
}

fn is_blank(path: &Path) -> bool {
    path.to_string_lossy().trim().is_empty()
}
