//! Event system for gateway observability.
//!
//! Every notable step of a lookup (request received, refresh result, attempt
//! failure, success, exhaustion) is dispatched to registered handlers. The
//! handlers are observers only; nothing in the fetch control flow depends on
//! them. Two handlers ship with the crate: one forwarding to the `log`
//! facade and one appending timestamped lines to a log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::modules::transport::FailureKind;

/// Marker events around one inbound lookup.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub key: String,
    pub timestamp: DateTime<Utc>,
}

impl RequestEvent {
    pub fn now(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of one proxy-pool validation sweep.
#[derive(Debug, Clone)]
pub struct RefreshEvent {
    pub retained: usize,
    pub timestamp: DateTime<Utc>,
}

/// One absorbed transport failure.
#[derive(Debug, Clone)]
pub struct AttemptEvent {
    pub key: String,
    pub identity: String,
    pub attempt: usize,
    pub kind: FailureKind,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SuccessEvent {
    pub key: String,
    pub identity: String,
    pub attempt: usize,
    pub timestamp: DateTime<Utc>,
}

/// Terminal failure of a lookup after its whole attempt budget.
#[derive(Debug, Clone)]
pub struct ExhaustedEvent {
    pub key: String,
    pub attempts: usize,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Received(RequestEvent),
    CacheHit(RequestEvent),
    ProxyRefresh(RefreshEvent),
    AttemptFailed(AttemptEvent),
    FetchSucceeded(SuccessEvent),
    Exhausted(ExhaustedEvent),
}

impl GatewayEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            GatewayEvent::Received(e) | GatewayEvent::CacheHit(e) => e.timestamp,
            GatewayEvent::ProxyRefresh(e) => e.timestamp,
            GatewayEvent::AttemptFailed(e) => e.timestamp,
            GatewayEvent::FetchSucceeded(e) => e.timestamp,
            GatewayEvent::Exhausted(e) => e.timestamp,
        }
    }

    /// Single-line rendering shared by the shipped handlers.
    pub fn describe(&self) -> String {
        match self {
            GatewayEvent::Received(e) => format!("received request for {}", e.key),
            GatewayEvent::CacheHit(e) => format!("cache hit for {}", e.key),
            GatewayEvent::ProxyRefresh(e) => {
                format!("proxy refresh retained {} identities", e.retained)
            }
            GatewayEvent::AttemptFailed(e) => format!(
                "attempt {} for {} via {} failed ({}): {}",
                e.attempt, e.key, e.identity, e.kind, e.detail
            ),
            GatewayEvent::FetchSucceeded(e) => format!(
                "fetched {} via {} on attempt {}",
                e.key, e.identity, e.attempt
            ),
            GatewayEvent::Exhausted(e) => format!(
                "lookup {} exhausted after {} attempts ({})",
                e.key, e.attempts, e.reason
            ),
        }
    }
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &GatewayEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: GatewayEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &GatewayEvent) {
        match event {
            GatewayEvent::AttemptFailed(_) | GatewayEvent::Exhausted(_) => {
                log::warn!("{}", event.describe());
            }
            GatewayEvent::CacheHit(_) => log::debug!("{}", event.describe()),
            _ => log::info!("{}", event.describe()),
        }
    }
}

/// Appends one timestamped line per event to a log file. Write errors are
/// swallowed; the sink is an observer, not part of the fetch contract.
pub struct FileSinkHandler {
    file: Mutex<File>,
}

impl FileSinkHandler {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventHandler for FileSinkHandler {
    fn handle(&self, event: &GatewayEvent) {
        if let Ok(mut file) = self.file.lock() {
            let line = format!(
                "[{}] {}\n",
                event.timestamp().to_rfc3339(),
                event.describe()
            );
            let _ = file.write_all(line.as_bytes());
        }
    }
}
