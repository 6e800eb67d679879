//! Transport strategies for a single fetch attempt.
//!
//! Two interchangeable implementations share one contract: a direct proxied
//! HTTP request and a full browser-engine navigation. Which one runs is a
//! startup configuration choice, never a per-request decision. Every failed
//! attempt is classified so the orchestrator can decide whether to move to
//! the next identity.

mod direct;
mod render;

pub use direct::{DIRECT_TIMEOUT, DirectTransport};
pub use render::{RENDER_TIMEOUT, RenderTransport};

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::gateway::LookupKey;
use crate::modules::proxy::ProxyIdentity;

/// Classification bucket for a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Proxy,
    Render,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Proxy => write!(f, "proxy-failure"),
            FailureKind::Render => write!(f, "render-failure"),
        }
    }
}

/// Classified outcome of one transport attempt. Absorbed and logged by the
/// orchestrator; never surfaced to callers individually.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("proxy attempt failed: {0}")]
    Proxy(String),
    #[error("render attempt failed: {0}")]
    Render(String),
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Proxy(_) => FailureKind::Proxy,
            TransportError::Render(_) => FailureKind::Render,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            TransportError::Proxy(detail) | TransportError::Render(detail) => detail,
        }
    }
}

/// Where attempts are aimed and which fixed headers they carry.
#[derive(Debug, Clone)]
pub struct TargetProfile {
    /// Product API URL with `{store_id}` and `{deal_id}` placeholders.
    pub url_template: String,
    pub referer: String,
    pub accept_language: String,
}

impl TargetProfile {
    pub fn url_for(&self, key: &LookupKey) -> String {
        self.url_template
            .replace("{store_id}", key.store_id())
            .replace("{deal_id}", key.deal_id())
    }
}

/// One fetch attempt through one proxy identity under one fingerprint.
#[async_trait]
pub trait TransportStrategy: Send + Sync {
    async fn fetch(
        &self,
        key: &LookupKey,
        identity: &ProxyIdentity,
        fingerprint: &str,
    ) -> Result<Value, TransportError>;

    fn name(&self) -> &'static str;
}
