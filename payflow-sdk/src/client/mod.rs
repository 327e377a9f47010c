//! HTTP client for the processor's v2 REST API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod processor;

pub use processor::ProcessorClient;

use k256::ecdsa::SigningKey;
use reqwest::StatusCode;
use url::Url;

use crate::signature::SignatureError;

/// Errors produced by the SDK HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A key could not be parsed or a signature could not be produced.
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Processor deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn base_url(self) -> Result<Url, url::ParseError> {
        match self {
            Environment::Sandbox => Url::parse("https://sandbox.api.starkbank.com"),
            Environment::Production => Url::parse("https://api.starkbank.com"),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Sandbox => write!(f, "sandbox"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Project credentials used to sign API requests.
#[derive(Clone)]
pub struct Credentials {
    pub project_id: String,
    pub signing_key: SigningKey,
}

impl Credentials {
    pub fn new(project_id: impl Into<String>, signing_key: SigningKey) -> Self {
        Self {
            project_id: project_id.into(),
            signing_key,
        }
    }

    /// Parse the private key from PEM.
    pub fn from_pem(project_id: impl Into<String>, pem: &str) -> Result<Self, SignatureError> {
        let signing_key = crate::signature::parse_private_key_pem(pem)?;
        Ok(Self::new(project_id, signing_key))
    }

    /// Value of the `Access-Id` header.
    pub fn access_id(&self) -> String {
        format!("project/{}", self.project_id)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}
