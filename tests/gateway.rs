//! Orchestrator behavior against stubbed collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use dealgate::{
    DISCOVERY_PASSES, EventDispatcher, FIXED_UPSTREAM_ATTEMPTS, Gateway, GatewayError, LookupKey,
    PoolError, ProxyCredentials, ProxyIdentity, ProxyPool, ProxyProbe, ProxySource, ResultCache,
    TransportError, TransportStrategy,
};

/// Transport stub that fails until a configured attempt, then succeeds.
struct ScriptedTransport {
    succeed_on: usize,
    payload: Value,
    calls: AtomicUsize,
    identities_seen: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// `succeed_on = 0` never succeeds.
    fn new(succeed_on: usize, payload: Value) -> Self {
        Self {
            succeed_on,
            payload,
            calls: AtomicUsize::new(0),
            identities_seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportStrategy for ScriptedTransport {
    async fn fetch(
        &self,
        _key: &LookupKey,
        identity: &ProxyIdentity,
        fingerprint: &str,
    ) -> Result<Value, TransportError> {
        assert!(!fingerprint.is_empty());
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.identities_seen
            .lock()
            .unwrap()
            .push(identity.endpoint());
        if self.succeed_on != 0 && call >= self.succeed_on {
            Ok(self.payload.clone())
        } else {
            Err(TransportError::Proxy(format!("scripted failure {call}")))
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct StaticSource(Vec<ProxyIdentity>);

#[async_trait]
impl ProxySource for StaticSource {
    async fn fetch_candidates(&self) -> Result<Vec<ProxyIdentity>, PoolError> {
        Ok(self.0.clone())
    }
}

struct AcceptAll;

#[async_trait]
impl ProxyProbe for AcceptAll {
    async fn probe(&self, _identity: &ProxyIdentity) -> bool {
        true
    }
}

fn discovery_pool(count: usize) -> Arc<ProxyPool> {
    let identities = (0..count)
        .map(|i| ProxyIdentity::discovered(format!("10.0.0.{i}"), 8080))
        .collect();
    Arc::new(ProxyPool::discovery(
        Arc::new(StaticSource(identities)),
        Arc::new(AcceptAll),
        Arc::new(EventDispatcher::new()),
    ))
}

fn upstream_pool() -> Arc<ProxyPool> {
    Arc::new(ProxyPool::fixed_upstream(
        ProxyIdentity::upstream(
            "gw.example.net",
            33335,
            ProxyCredentials {
                username: "customer".into(),
                zone: "zone-a".into(),
                password: "secret".into(),
            },
        ),
        Arc::new(EventDispatcher::new()),
    ))
}

#[tokio::test]
async fn first_fetch_populates_cache_and_second_skips_transport() {
    let transport = Arc::new(ScriptedTransport::new(1, json!({"itemid": 456})));
    let gateway = Gateway::builder()
        .with_pool(discovery_pool(1))
        .with_transport(transport.clone())
        .build()
        .unwrap();

    let key = LookupKey::new("123", "456").unwrap();
    let first = gateway.lookup(&key).await.unwrap();
    let second = gateway.lookup(&key).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn empty_pool_exhausts_without_transport_calls() {
    let transport = Arc::new(ScriptedTransport::new(1, json!({})));
    let gateway = Gateway::builder()
        .with_pool(Arc::new(ProxyPool::discovery(
            Arc::new(StaticSource(Vec::new())),
            Arc::new(AcceptAll),
            Arc::new(EventDispatcher::new()),
        )))
        .with_transport(transport.clone())
        .build()
        .unwrap();

    let key = LookupKey::new("123", "456").unwrap();
    let err = gateway.lookup(&key).await.unwrap_err();

    assert!(matches!(err, GatewayError::NoProxiesAvailable));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn succeeds_on_nth_attempt_with_exactly_n_calls() {
    let transport = Arc::new(ScriptedTransport::new(5, json!({"itemid": 456})));
    let gateway = Gateway::builder()
        .with_pool(discovery_pool(2))
        .with_transport(transport.clone())
        .build()
        .unwrap();

    let key = LookupKey::new("123", "456").unwrap();
    let payload = gateway.lookup(&key).await.unwrap();

    assert_eq!(payload, json!({"itemid": 456}));
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn discovery_budget_is_passes_times_identities() {
    let transport = Arc::new(ScriptedTransport::new(0, json!({})));
    let gateway = Gateway::builder()
        .with_pool(discovery_pool(2))
        .with_transport(transport.clone())
        .build()
        .unwrap();

    let key = LookupKey::new("123", "456").unwrap();
    let err = gateway.lookup(&key).await.unwrap_err();

    let expected = DISCOVERY_PASSES * 2;
    assert!(matches!(
        err,
        GatewayError::AllAttemptsExhausted { attempts } if attempts == expected
    ));
    assert_eq!(transport.calls(), expected);

    // Round-robin: consecutive attempts alternate identities.
    let seen = transport.identities_seen.lock().unwrap();
    assert_eq!(seen.len(), expected);
    assert_ne!(seen[0], seen[1]);
    assert_eq!(seen[0], seen[2]);
}

#[tokio::test]
async fn fixed_upstream_budget_is_twenty_attempts() {
    let transport = Arc::new(ScriptedTransport::new(0, json!({})));
    let gateway = Gateway::builder()
        .with_pool(upstream_pool())
        .with_transport(transport.clone())
        .build()
        .unwrap();

    let key = LookupKey::new("123", "456").unwrap();
    let err = gateway.lookup(&key).await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::AllAttemptsExhausted { attempts } if attempts == FIXED_UPSTREAM_ATTEMPTS
    ));
    assert_eq!(transport.calls(), FIXED_UPSTREAM_ATTEMPTS);

    let seen = transport.identities_seen.lock().unwrap();
    assert!(seen.iter().all(|endpoint| endpoint == "gw.example.net:33335"));
}

#[tokio::test]
async fn example_scenario_caches_payload_under_canonical_key() {
    let cache = Arc::new(ResultCache::new());
    let transport = Arc::new(ScriptedTransport::new(1, json!({"itemid": 456})));
    let gateway = Gateway::builder()
        .with_pool(discovery_pool(1))
        .with_cache(cache.clone())
        .with_transport(transport.clone())
        .build()
        .unwrap();

    let key = LookupKey::new("123", "456").unwrap();
    assert!(cache.get(&key).is_none());

    let payload = gateway.lookup(&key).await.unwrap();
    assert_eq!(payload, json!({"itemid": 456}));
    assert_eq!(key.cache_key(), "123-456");
    assert_eq!(cache.get(&key), Some(json!({"itemid": 456})));
}

#[tokio::test]
async fn status_surface_reports_cached_proxy_count() {
    let transport = Arc::new(ScriptedTransport::new(1, json!({})));
    let gateway = Gateway::builder()
        .with_pool(discovery_pool(3))
        .with_transport(transport)
        .build()
        .unwrap();

    // Nothing discovered yet.
    assert_eq!(gateway.cached_proxy_count(), 0);

    let key = LookupKey::new("123", "456").unwrap();
    gateway.lookup(&key).await.unwrap();
    assert_eq!(gateway.cached_proxy_count(), 3);
}

#[test]
fn invalid_keys_never_reach_the_orchestrator() {
    assert!(matches!(
        LookupKey::new("", "456"),
        Err(GatewayError::InvalidRequest(_))
    ));
    assert!(matches!(
        LookupKey::new("123", ""),
        Err(GatewayError::InvalidRequest(_))
    ));
}
