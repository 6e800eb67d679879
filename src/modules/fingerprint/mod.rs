//! User-Agent fingerprint selection.
//!
//! Supplies a pseudo-random browser fingerprint for each outbound attempt
//! from a fixed catalog validated at startup. Selection is uniform and
//! stateless so consecutive attempts through the same proxy identity do not
//! present the same fingerprint.

use rand::seq::SliceRandom;
use rand::thread_rng;
use thiserror::Error;

/// Built-in catalog used when no custom catalog is configured.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
];

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("user-agent catalog is empty")]
    EmptyCatalog,
}

/// Uniform-random User-Agent provider over a non-empty catalog.
#[derive(Debug, Clone)]
pub struct FingerprintProvider {
    catalog: Vec<String>,
}

impl FingerprintProvider {
    /// Build a provider from a custom catalog. The catalog must be non-empty;
    /// emptiness is a startup error, never a call-time one.
    pub fn new<I, S>(catalog: I) -> Result<Self, FingerprintError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let catalog: Vec<String> = catalog
            .into_iter()
            .map(Into::into)
            .filter(|agent| !agent.trim().is_empty())
            .collect();
        if catalog.is_empty() {
            return Err(FingerprintError::EmptyCatalog);
        }
        Ok(Self { catalog })
    }

    /// Provider over the built-in catalog.
    pub fn with_default_catalog() -> Self {
        Self {
            catalog: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Pick the fingerprint for the next attempt.
    pub fn next(&self) -> &str {
        let mut rng = thread_rng();
        self.catalog
            .choose(&mut rng)
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

impl Default for FingerprintProvider {
    fn default() -> Self {
        Self::with_default_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(
            FingerprintProvider::new(Vec::<String>::new()),
            Err(FingerprintError::EmptyCatalog)
        ));
        assert!(matches!(
            FingerprintProvider::new(["  ", ""]),
            Err(FingerprintError::EmptyCatalog)
        ));
    }

    #[test]
    fn selection_stays_within_catalog() {
        let provider = FingerprintProvider::new(["agent-a", "agent-b"]).unwrap();
        for _ in 0..32 {
            let picked = provider.next();
            assert!(picked == "agent-a" || picked == "agent-b");
        }
    }

    #[test]
    fn default_catalog_is_nonempty() {
        let provider = FingerprintProvider::with_default_catalog();
        assert!(provider.len() >= 10);
        assert!(provider.next().starts_with("Mozilla/5.0"));
    }
}
