//! # dealgate
//!
//! A resilient gateway for retrieving product-detail JSON from an
//! e-commerce API that actively blocks automated access.
//!
//! The crate's core is the fetch orchestrator: it keeps a pool of outbound
//! proxy identities, picks a fresh browser fingerprint per attempt, drives a
//! bounded retry loop over one of two transport strategies (direct HTTP or
//! full browser-engine rendering), and fronts all of it with a short-lived
//! result cache. Partial failure is the expected case; the orchestrator
//! absorbs it and bounds latency and cost.
//!
//! ## Features
//!
//! - Discovery mode: free proxies fetched, canary-validated, and cached for
//!   ten minutes
//! - Fixed-upstream mode: one authenticated paid proxy, retried persistently
//! - User-Agent fingerprint rotation
//! - Direct and browser-engine transports behind one trait
//! - Five-minute result cache with cache-hit short-circuit
//! - Event observers for logging and an append-only log file
//!
//! ## Example
//!
//! ```no_run
//! use dealgate::{Gateway, GatewayConfig, LookupKey};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Gateway::from_config(GatewayConfig::default())?;
//!     let key = LookupKey::new("123", "456")?;
//!     let payload = gateway.lookup(&key).await?;
//!     println!("{payload}");
//!     Ok(())
//! }
//! ```

mod gateway;

pub mod config;
pub mod modules;
pub mod server;

pub use crate::gateway::{
    DISCOVERY_PASSES,
    FIXED_UPSTREAM_ATTEMPTS,
    Gateway,
    GatewayBuilder,
    GatewayError,
    GatewayResult,
    LookupKey,
};

pub use crate::config::{
    ConfigError,
    GatewayConfig,
    ProxyModeConfig,
    TransportKind,
    UpstreamProxyConfig,
};

pub use crate::modules::{
    CanaryProbe,
    DirectTransport,
    EventDispatcher,
    EventHandler,
    FailureKind,
    FileSinkHandler,
    FingerprintProvider,
    GatewayEvent,
    HttpProxySource,
    LoggingHandler,
    PoolError,
    ProxyCredentials,
    ProxyIdentity,
    ProxyPool,
    ProxyProbe,
    ProxySource,
    RenderTransport,
    ResultCache,
    TargetProfile,
    TransportError,
    TransportStrategy,
};

pub use crate::server::{AppState, create_router};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
