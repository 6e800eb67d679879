//! Cross-cutting services module
//!
//! Houses the collaborators the orchestrator is wired from: proxy identity
//! pooling, fingerprint selection, transport strategies, the result cache,
//! and the event observers.

pub mod cache;
pub mod events;
pub mod fingerprint;
pub mod proxy;
pub mod transport;

// Re-export commonly used types
pub use cache::{DEFAULT_RESULT_TTL, ResultCache};
pub use events::{
    AttemptEvent, EventDispatcher, EventHandler, ExhaustedEvent, FileSinkHandler, GatewayEvent,
    LoggingHandler, RefreshEvent, RequestEvent, SuccessEvent,
};
pub use fingerprint::{DEFAULT_USER_AGENTS, FingerprintError, FingerprintProvider};
pub use proxy::{
    CanaryProbe, HttpProxySource, POOL_VALIDITY, PROBE_TIMEOUT, PoolError, ProxyCredentials,
    ProxyIdentity, ProxyPool, ProxyProbe, ProxySource,
};
pub use transport::{
    DirectTransport, FailureKind, RenderTransport, TargetProfile, TransportError,
    TransportStrategy,
};
