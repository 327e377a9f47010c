//! TOML file configuration structures.
//!
//! These structs directly map to the `payflow.toml` file format. Every
//! section and every field is optional; a missing file is the same as an
//! empty one.

use payflow_sdk::client::Environment;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub processor: ProcessorConfig,
    pub schedule: ScheduleConfig,
    pub reconciliation: ReconciliationConfig,
    pub destination: DestinationConfig,
    pub database: DatabaseConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    pub listen: SocketAddr,
    /// Talk to the mock processor instead of the hosted API.
    pub mock_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            mock_mode: false,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Payment processor credentials and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub environment: Environment,
    pub project_id: String,
    /// PEM file holding the project's secp256k1 private key.
    /// `PAYFLOW_PRIVATE_KEY` takes precedence when set.
    pub private_key_path: Option<PathBuf>,
    /// Base URL of the mock processor used in mock mode.
    pub mock_api_url: String,
    /// Upper bound on every processor API call, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Sandbox,
            project_id: String::new(),
            private_key_path: None,
            mock_api_url: default_mock_api_url(),
            request_timeout_secs: 30,
        }
    }
}

fn default_mock_api_url() -> String {
    "http://127.0.0.1:9090".to_string()
}

/// Invoice emission section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub min_batch: u32,
    pub max_batch: u32,
    /// Cents.
    pub min_amount: i64,
    /// Cents.
    pub max_amount: i64,
    pub interval_hours: u64,
    pub duration_hours: u64,
    pub due_in_secs: i64,
    pub expiration_secs: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_batch: 8,
            max_batch: 12,
            min_amount: 1_000,
            max_amount: 50_000,
            interval_hours: 3,
            duration_hours: 24,
            due_in_secs: 3_600,
            expiration_secs: 3_600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub enabled: bool,
    pub initial_delay_secs: u64,
    pub interval_secs: u64,
    pub page_limit: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_secs: 60,
            interval_secs: 900,
            page_limit: 100,
        }
    }
}

/// Settlement destination account. Unset fields keep the built-in account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    pub bank_code: Option<String>,
    pub branch_code: Option<String>,
    pub account_number: Option<String>,
    pub account_type: Option<String>,
    pub name: Option<String>,
    pub tax_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection string. `DATABASE_URL` takes precedence when set.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://payflow.db".to_string(),
            max_connections: 5,
        }
    }
}
