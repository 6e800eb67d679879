//! High level fetch orchestration.
//!
//! Wires together the proxy pool, fingerprint provider, transport strategy,
//! result cache, and event observers to expose one call: look up a product
//! by its key and return the payload. Partial failures are the norm here;
//! the orchestrator's job is to absorb them inside a bounded retry loop and
//! only ever surface the three terminal outcomes.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use crate::config::{ConfigError, GatewayConfig, ProxyModeConfig, TransportKind, parse_url};
use crate::modules::cache::ResultCache;
use crate::modules::events::{
    AttemptEvent, EventDispatcher, ExhaustedEvent, FileSinkHandler, GatewayEvent, LoggingHandler,
    RequestEvent, SuccessEvent,
};
use crate::modules::fingerprint::FingerprintProvider;
use crate::modules::proxy::{CanaryProbe, HttpProxySource, ProxyPool};
use crate::modules::transport::{DirectTransport, RenderTransport, TransportStrategy};

/// Attempt budget against the single fixed upstream identity. Each attempt
/// is cheap and upstream failures are transient, so persistence pays off.
pub const FIXED_UPSTREAM_ATTEMPTS: usize = 20;

/// Full passes over the discovered identity list. Here the scarce resource
/// is distinct unblocked egress IPs, not request volume, so the budget
/// spreads across the whole list a few times instead.
pub const DISCOVERY_PASSES: usize = 3;

/// Result alias used across the orchestration layer.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Terminal outcomes that cross the core boundary. Per-attempt failures
/// never appear here; they are absorbed by the retry loop.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("no usable proxies available")]
    NoProxiesAvailable,
    #[error("all {attempts} fetch attempts failed")]
    AllAttemptsExhausted { attempts: usize },
}

/// Identity of one product-detail query. Both fields are required and
/// non-empty; the canonical `store-deal` form keys the result cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    store_id: String,
    deal_id: String,
}

impl LookupKey {
    pub fn new(
        store_id: impl Into<String>,
        deal_id: impl Into<String>,
    ) -> GatewayResult<Self> {
        let store_id = store_id.into().trim().to_string();
        let deal_id = deal_id.into().trim().to_string();
        if store_id.is_empty() || deal_id.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "storeId and dealId are required".into(),
            ));
        }
        Ok(Self { store_id, deal_id })
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn deal_id(&self) -> &str {
        &self.deal_id
    }

    /// Canonical cache-key form.
    pub fn cache_key(&self) -> String {
        format!("{}-{}", self.store_id, self.deal_id)
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.store_id, self.deal_id)
    }
}

/// Fluent builder for [`Gateway`], used to wire custom pools, caches, and
/// transports (stubs included) into the orchestrator.
pub struct GatewayBuilder {
    fingerprints: Option<FingerprintProvider>,
    pool: Option<Arc<ProxyPool>>,
    cache: Option<Arc<ResultCache>>,
    transport: Option<Arc<dyn TransportStrategy>>,
    events: Option<Arc<EventDispatcher>>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            fingerprints: None,
            pool: None,
            cache: None,
            transport: None,
            events: None,
        }
    }

    pub fn with_fingerprints(mut self, fingerprints: FingerprintProvider) -> Self {
        self.fingerprints = Some(fingerprints);
        self
    }

    pub fn with_pool(mut self, pool: Arc<ProxyPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn TransportStrategy>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Assemble the gateway. A pool and a transport are mandatory; the
    /// other collaborators fall back to defaults.
    pub fn build(self) -> Result<Gateway, ConfigError> {
        let pool = self
            .pool
            .ok_or(ConfigError::MissingCollaborator("proxy pool"))?;
        let transport = self
            .transport
            .ok_or(ConfigError::MissingCollaborator("transport strategy"))?;
        Ok(Gateway {
            fingerprints: self.fingerprints.unwrap_or_default(),
            pool,
            cache: self.cache.unwrap_or_default(),
            transport,
            events: self.events.unwrap_or_default(),
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main fetch orchestrator.
pub struct Gateway {
    fingerprints: FingerprintProvider,
    pool: Arc<ProxyPool>,
    cache: Arc<ResultCache>,
    transport: Arc<dyn TransportStrategy>,
    events: Arc<EventDispatcher>,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Construct the production wiring from validated configuration:
    /// real proxy source and canary probe, the configured transport, and
    /// the log observers.
    pub fn from_config(config: GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut events = EventDispatcher::new();
        events.register_handler(Arc::new(LoggingHandler));
        if let Some(ref path) = config.log_file {
            events.register_handler(Arc::new(FileSinkHandler::open(path)?));
        }
        let events = Arc::new(events);

        let pool = match &config.proxy_mode {
            ProxyModeConfig::Discovery {
                source_url,
                canary_url,
            } => {
                let source = HttpProxySource::new(parse_url("proxy source URL", source_url)?)
                    .map_err(|err| ConfigError::HttpClient(err.to_string()))?;
                let probe = CanaryProbe::new(parse_url("canary URL", canary_url)?);
                Arc::new(ProxyPool::discovery(
                    Arc::new(source),
                    Arc::new(probe),
                    Arc::clone(&events),
                ))
            }
            ProxyModeConfig::FixedUpstream(upstream) => Arc::new(ProxyPool::fixed_upstream(
                upstream.identity(),
                Arc::clone(&events),
            )),
        };

        let transport: Arc<dyn TransportStrategy> = match config.transport {
            TransportKind::Direct => Arc::new(DirectTransport::new(config.target.clone())),
            TransportKind::Rendering => Arc::new(RenderTransport::new(config.target.clone())),
        };

        let fingerprints = FingerprintProvider::new(config.user_agents.clone())
            .map_err(|_| ConfigError::EmptyUserAgentCatalog)?;

        Ok(Self {
            fingerprints,
            pool,
            cache: Arc::new(ResultCache::new()),
            transport,
            events,
        })
    }

    /// Look up one product. Cache hits short-circuit everything; misses run
    /// the bounded retry loop across the usable identities.
    pub async fn lookup(&self, key: &LookupKey) -> GatewayResult<Value> {
        self.events
            .dispatch(GatewayEvent::Received(RequestEvent::now(key.cache_key())));

        if let Some(payload) = self.cache.get(key) {
            self.events
                .dispatch(GatewayEvent::CacheHit(RequestEvent::now(key.cache_key())));
            return Ok(payload);
        }

        let identities = self.pool.acquire_usable().await;
        if identities.is_empty() {
            self.events.dispatch(GatewayEvent::Exhausted(ExhaustedEvent {
                key: key.cache_key(),
                attempts: 0,
                reason: "no-proxies".into(),
                timestamp: Utc::now(),
            }));
            return Err(GatewayError::NoProxiesAvailable);
        }

        let budget = if self.pool.is_fixed_upstream() {
            FIXED_UPSTREAM_ATTEMPTS
        } else {
            DISCOVERY_PASSES * identities.len()
        };

        for attempt in 1..=budget {
            let identity = &identities[(attempt - 1) % identities.len()];
            let fingerprint = self.fingerprints.next();

            match self.transport.fetch(key, identity, fingerprint).await {
                Ok(payload) => {
                    self.cache.set(key, payload.clone());
                    self.events
                        .dispatch(GatewayEvent::FetchSucceeded(SuccessEvent {
                            key: key.cache_key(),
                            identity: identity.endpoint(),
                            attempt,
                            timestamp: Utc::now(),
                        }));
                    return Ok(payload);
                }
                Err(failure) => {
                    self.events.dispatch(GatewayEvent::AttemptFailed(AttemptEvent {
                        key: key.cache_key(),
                        identity: identity.endpoint(),
                        attempt,
                        kind: failure.kind(),
                        detail: failure.detail().to_string(),
                        timestamp: Utc::now(),
                    }));
                }
            }
        }

        self.events.dispatch(GatewayEvent::Exhausted(ExhaustedEvent {
            key: key.cache_key(),
            attempts: budget,
            reason: "all-proxies-failed".into(),
            timestamp: Utc::now(),
        }));
        Err(GatewayError::AllAttemptsExhausted { attempts: budget })
    }

    /// The only pool detail the status surface may report.
    pub fn cached_proxy_count(&self) -> usize {
        self.pool.cached_count()
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_key_requires_both_fields() {
        assert!(LookupKey::new("123", "456").is_ok());
        assert!(matches!(
            LookupKey::new("", "456"),
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            LookupKey::new("123", "  "),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn cache_key_is_canonical() {
        let key = LookupKey::new(" 123 ", "456").unwrap();
        assert_eq!(key.cache_key(), "123-456");
        assert_eq!(key.to_string(), "123-456");
    }
}
