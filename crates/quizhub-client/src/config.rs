use persistence::DatabaseConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub views: ViewsConfig,
}

/// Which store adapter backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Run embedded migrations when connecting to PostgreSQL.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewsConfig {
    /// Per-user profile lookup timeout when building views.
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,

    /// Undelivered changes buffered per registration subscription.
    #[serde(default = "default_change_buffer")]
    pub change_buffer: usize,
}

impl ViewsConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: default_lookup_timeout_ms(),
            change_buffer: default_change_buffer(),
        }
    }
}

fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}
fn default_run_migrations() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_lookup_timeout_ms() -> u64 {
    5000
}
fn default_change_buffer() -> usize {
    64
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

const TEST_DEFAULTS: &str = r#"
    [store]
    backend = "memory"
    run_migrations = false

    [database]
    url = ""
    max_connections = 10
    min_connections = 1
    connect_timeout_secs = 10
    idle_timeout_secs = 600
    pool_metrics_interval_secs = 10

    [logging]
    level = "info"
    format = "pretty"

    [views]
    lookup_timeout_ms = 5000
    change_buffer = 64
"#;

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with QH__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("QH").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Builds a configuration from embedded defaults and `overrides`,
    /// without touching config files or the environment. Not validated.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            TEST_DEFAULTS,
            config::FileFormat::Toml,
        ));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.store.backend == StoreBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "QH__DATABASE__URL must be set for the postgres backend".to_string(),
            ));
        }

        if self.database.pool_metrics_interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "pool_metrics_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.views.lookup_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "views.lookup_timeout_ms must be positive".to_string(),
            ));
        }

        if self.views.change_buffer == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "views.change_buffer must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
