//! ECDSA verification of webhook events.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k256::ecdsa::VerifyingKey;
use payflow_sdk::objects::Event;
use payflow_sdk::signature::{SignatureError, verify_message};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{EventOrigin, EventVerifier, ParsedEvent, PublicKeySource, VerifyError};

/// Verifies events against the key of their origin.
///
/// Keys are fetched lazily and cached per origin. A well-formed signature that
/// does not match the cached key triggers one refetch, so a rotated key is
/// picked up without a restart. A key younger than the refetch interval is
/// never refetched. Origins without a configured source are rejected.
pub struct EcdsaEventVerifier {
    sources: HashMap<EventOrigin, Arc<dyn PublicKeySource>>,
    cache: RwLock<HashMap<EventOrigin, CachedKey>>,
    refetch_interval: Duration,
}

/// Minimum age of a cached key before a mismatch may refetch it.
pub const DEFAULT_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Copy)]
struct CachedKey {
    key: VerifyingKey,
    fetched_at: Instant,
}

impl EcdsaEventVerifier {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
            refetch_interval: DEFAULT_REFETCH_INTERVAL,
        }
    }

    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = interval;
        self
    }

    pub fn with_source(mut self, origin: EventOrigin, source: Arc<dyn PublicKeySource>) -> Self {
        self.sources.insert(origin, source);
        self
    }

    /// Fetch the key for `origin` now, replacing any cached one.
    pub async fn refresh(&self, origin: EventOrigin) -> Result<VerifyingKey, VerifyError> {
        let source = self
            .sources
            .get(&origin)
            .ok_or(VerifyError::UnsupportedOrigin(origin))?;
        let key = source.fetch_public_key().await?;
        let entry = CachedKey {
            key,
            fetched_at: Instant::now(),
        };
        self.cache.write().await.insert(origin, entry);
        info!(%origin, "Fetched event signing key");
        Ok(key)
    }

    async fn cached(&self, origin: EventOrigin) -> Option<CachedKey> {
        self.cache.read().await.get(&origin).copied()
    }
}

impl Default for EcdsaEventVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventVerifier for EcdsaEventVerifier {
    async fn parse(
        &self,
        content: &[u8],
        signature: &str,
        origin: EventOrigin,
    ) -> Result<ParsedEvent, VerifyError> {
        if !self.sources.contains_key(&origin) {
            return Err(VerifyError::UnsupportedOrigin(origin));
        }

        let (key, may_refetch) = match self.cached(origin).await {
            Some(cached) => (
                cached.key,
                cached.fetched_at.elapsed() >= self.refetch_interval,
            ),
            None => (self.refresh(origin).await?, false),
        };

        match verify_message(content, signature, &key) {
            Ok(()) => {}
            Err(SignatureError::SignatureMismatch) if may_refetch => {
                debug!(%origin, "Signature mismatch with cached key, refetching");
                let fresh = self.refresh(origin).await?;
                if fresh == key {
                    return Err(VerifyError::InvalidSignature);
                }
                verify_message(content, signature, &fresh)
                    .map_err(|_| VerifyError::InvalidSignature)?;
            }
            Err(_) => return Err(VerifyError::InvalidSignature),
        }

        let event = Event::from_slice(content)?;
        Ok(ParsedEvent::new(origin, event))
    }
}
