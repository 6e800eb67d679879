//! Direct HTTP transport.
//!
//! One proxied GET per attempt with the fingerprint and the fixed header
//! set the target expects. Success means the transport completed, the
//! status was 200, and the body held a non-empty JSON document; anything
//! else is a classified proxy failure and the caller should move on to the
//! next identity.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::gateway::LookupKey;
use crate::modules::proxy::ProxyIdentity;

use super::{TargetProfile, TransportError, TransportStrategy};

/// Per-attempt bound for the direct request.
pub const DIRECT_TIMEOUT: Duration = Duration::from_secs(7);

/// Reqwest-backed transport with one client per proxy endpoint.
pub struct DirectTransport {
    target: TargetProfile,
    timeout: Duration,
    clients: Mutex<HashMap<String, Client>>,
}

impl DirectTransport {
    pub fn new(target: TargetProfile) -> Self {
        Self::with_timeout(target, DIRECT_TIMEOUT)
    }

    pub fn with_timeout(target: TargetProfile, timeout: Duration) -> Self {
        Self {
            target,
            timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Client pool keyed by proxy endpoint. Identities churn with the pool
    /// snapshot, so entries for dead identities simply stop being asked for.
    async fn client_for(&self, identity: &ProxyIdentity) -> Result<Client, TransportError> {
        let mut guard = self.clients.lock().await;
        let key = identity.endpoint();
        if let Some(client) = guard.get(&key) {
            return Ok(client.clone());
        }

        let proxy = reqwest::Proxy::all(identity.proxy_url())
            .map_err(|err| TransportError::Proxy(err.to_string()))?;
        let client = Client::builder()
            .cookie_store(true)
            .proxy(proxy)
            .timeout(self.timeout)
            .build()
            .map_err(|err| TransportError::Proxy(err.to_string()))?;
        guard.insert(key, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl TransportStrategy for DirectTransport {
    async fn fetch(
        &self,
        key: &LookupKey,
        identity: &ProxyIdentity,
        fingerprint: &str,
    ) -> Result<Value, TransportError> {
        let client = self.client_for(identity).await?;
        let url = self.target.url_for(key);

        let response = client
            .get(&url)
            .header(USER_AGENT, fingerprint)
            .header(ACCEPT_LANGUAGE, &self.target.accept_language)
            .header(REFERER, &self.target.referer)
            .send()
            .await
            .map_err(|err| TransportError::Proxy(err.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::Proxy(format!("unexpected status {status}")));
        }

        let body: Bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::Proxy(err.to_string()))?;
        if body.is_empty() {
            return Err(TransportError::Proxy("empty response body".into()));
        }

        serde_json::from_slice(&body)
            .map_err(|err| TransportError::Proxy(format!("body is not JSON: {err}")))
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}
