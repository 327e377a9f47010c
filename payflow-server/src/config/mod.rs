//! Configuration module for payflow-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments and
//! environment variables, and turns it into the validated runtime types the
//! core processors are built from.

pub mod file;

use crate::config::file::{DestinationConfig, FileConfig};
use payflow_core::config::{
    BatchConfig, MAX_BATCH_SIZE, MAX_SCHEDULE_HOURS, ReconciliationConfig, ScheduleConfig,
    TransferDestination,
};
use payflow_sdk::client::Environment;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const PRIVATE_KEY_ENV: &str = "PAYFLOW_PRIVATE_KEY";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("failed to read private key {path}: {source}")]
    PrivateKeyError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Overrides coming from the command line. `None` keeps the file value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOverrides {
    pub listen: Option<SocketAddr>,
    pub mock_mode: Option<bool>,
}

/// How to reach the payment processor.
#[derive(Clone)]
pub enum ProcessorSettings {
    /// Hosted API, requests signed with the project key.
    Real {
        environment: Environment,
        project_id: String,
        private_key_pem: String,
    },
    /// Mock processor, unauthenticated.
    Mock { base_url: Url },
}

impl ProcessorSettings {
    pub fn is_mock(&self) -> bool {
        matches!(self, ProcessorSettings::Mock { .. })
    }
}

impl std::fmt::Debug for ProcessorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessorSettings::Real {
                environment,
                project_id,
                ..
            } => f
                .debug_struct("Real")
                .field("environment", environment)
                .field("project_id", project_id)
                .finish_non_exhaustive(),
            ProcessorSettings::Mock { base_url } => f
                .debug_struct("Mock")
                .field("base_url", &base_url.as_str())
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub processor: ProcessorSettings,
    pub request_timeout: Duration,
    pub batch: BatchConfig,
    pub schedule: ScheduleConfig,
    pub reconciliation: ReconciliationConfig,
    pub destination: TransferDestination,
    pub database: DatabaseSettings,
}

impl LoadedConfig {
    pub fn mock_mode(&self) -> bool {
        self.processor.is_mock()
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    overrides: CliOverrides,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, overrides: CliOverrides) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            overrides,
        }
    }

    /// Load and process the configuration using the process environment.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file (a missing file means all defaults)
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the configuration
    /// 4. Resolve the private key in real mode
    pub fn load_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = self.read_file()?;

        if let Some(listen) = self.overrides.listen {
            file_config.server.listen = listen;
        }
        if let Some(mock_mode) = self.overrides.mock_mode {
            file_config.server.mock_mode = mock_mode;
        }
        if let Some(url) = env(DATABASE_URL_ENV).filter(|url| !url.is_empty()) {
            file_config.database.url = url;
        }

        validate(&file_config)?;

        let processor = if file_config.server.mock_mode {
            let base_url = Url::parse(&file_config.processor.mock_api_url).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "processor.mock_api_url {:?} is not a valid URL: {e}",
                    file_config.processor.mock_api_url
                ))
            })?;
            ProcessorSettings::Mock { base_url }
        } else {
            let private_key_pem = match env(PRIVATE_KEY_ENV).filter(|pem| !pem.trim().is_empty()) {
                Some(pem) => pem,
                None => read_private_key(file_config.processor.private_key_path.as_deref())?,
            };
            ProcessorSettings::Real {
                environment: file_config.processor.environment,
                project_id: file_config.processor.project_id.clone(),
                private_key_pem,
            }
        };

        build_loaded_config(file_config, processor)
    }

    fn read_file(&self) -> Result<FileConfig, ConfigError> {
        match std::fs::read_to_string(&self.config_path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                Ok(FileConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let schedule = &config.schedule;
    if schedule.min_batch < 1 || schedule.min_batch > schedule.max_batch {
        return Err(ConfigError::ValidationError(format!(
            "schedule batch size must satisfy 1 <= min_batch <= max_batch, got {}..={}",
            schedule.min_batch, schedule.max_batch
        )));
    }
    if schedule.max_batch > MAX_BATCH_SIZE {
        return Err(ConfigError::ValidationError(format!(
            "schedule.max_batch must not exceed {MAX_BATCH_SIZE} invoices, got {}",
            schedule.max_batch
        )));
    }
    if schedule.min_amount <= 0 || schedule.min_amount > schedule.max_amount {
        return Err(ConfigError::ValidationError(format!(
            "schedule amounts must satisfy 0 < min_amount <= max_amount, got {}..={}",
            schedule.min_amount, schedule.max_amount
        )));
    }
    if schedule.interval_hours == 0 {
        return Err(ConfigError::ValidationError(
            "schedule.interval_hours must be greater than zero".to_string(),
        ));
    }
    if schedule.interval_hours > MAX_SCHEDULE_HOURS || schedule.duration_hours > MAX_SCHEDULE_HOURS
    {
        return Err(ConfigError::ValidationError(format!(
            "schedule.interval_hours and schedule.duration_hours must not exceed {MAX_SCHEDULE_HOURS}, got {} and {}",
            schedule.interval_hours, schedule.duration_hours
        )));
    }
    if schedule.due_in_secs < 0 || schedule.expiration_secs < 0 {
        return Err(ConfigError::ValidationError(
            "schedule.due_in_secs and schedule.expiration_secs must not be negative".to_string(),
        ));
    }
    if config.processor.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "processor.request_timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config.database.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "database.url must not be empty".to_string(),
        ));
    }
    if !config.server.mock_mode && config.processor.project_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "processor.project_id is required outside mock mode".to_string(),
        ));
    }
    Ok(())
}

fn read_private_key(path: Option<&Path>) -> Result<String, ConfigError> {
    let Some(path) = path else {
        return Err(ConfigError::ValidationError(format!(
            "a private key is required outside mock mode: set {PRIVATE_KEY_ENV} or processor.private_key_path"
        )));
    };
    std::fs::read_to_string(path).map_err(|source| ConfigError::PrivateKeyError {
        path: path.to_path_buf(),
        source,
    })
}

fn build_loaded_config(
    file_config: FileConfig,
    processor: ProcessorSettings,
) -> Result<LoadedConfig, ConfigError> {
    let FileConfig {
        server,
        processor: processor_file,
        schedule,
        reconciliation,
        destination,
        database,
    } = file_config;

    let cadence = ScheduleConfig::from_hours(schedule.interval_hours, schedule.duration_hours)
        .ok_or_else(|| {
            ConfigError::ValidationError("schedule hours are out of range".to_string())
        })?;

    Ok(LoadedConfig {
        listen: server.listen,
        processor,
        request_timeout: Duration::from_secs(processor_file.request_timeout_secs),
        batch: BatchConfig {
            min_batch: schedule.min_batch,
            max_batch: schedule.max_batch,
            min_amount: schedule.min_amount,
            max_amount: schedule.max_amount,
            due_in: time::Duration::seconds(schedule.due_in_secs),
            expiration: time::Duration::seconds(schedule.expiration_secs),
        },
        schedule: cadence,
        reconciliation: ReconciliationConfig {
            enabled: reconciliation.enabled,
            initial_delay: Duration::from_secs(reconciliation.initial_delay_secs),
            interval: Duration::from_secs(reconciliation.interval_secs.max(1)),
            page_limit: reconciliation.page_limit,
        },
        destination: convert_destination(destination),
        database: DatabaseSettings {
            url: database.url,
            max_connections: database.max_connections,
        },
    })
}

fn convert_destination(d: DestinationConfig) -> TransferDestination {
    let defaults = TransferDestination::default();
    TransferDestination {
        bank_code: d.bank_code.unwrap_or(defaults.bank_code),
        branch_code: d.branch_code.unwrap_or(defaults.branch_code),
        account_number: d.account_number.unwrap_or(defaults.account_number),
        account_type: d.account_type.unwrap_or(defaults.account_type),
        name: d.name.unwrap_or(defaults.name),
        tax_id: d.tax_id.unwrap_or(defaults.tax_id),
    }
}
