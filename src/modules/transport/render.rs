//! Browser-engine rendering transport.
//!
//! Used when the target's anti-bot defenses defeat the direct client. Each
//! attempt gets its own isolated Chromium session routed through the proxy
//! identity, with proxy authentication wired up at session level before the
//! first navigation. The rendered document is reduced back to the JSON
//! payload the API actually served. The session is torn down on every exit
//! path, success or failure.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
    ContinueWithAuthParams, EventAuthRequired, EventRequestPaused,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use futures::StreamExt;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::gateway::LookupKey;
use crate::modules::proxy::{ProxyCredentials, ProxyIdentity};

use super::{TargetProfile, TransportError, TransportStrategy};

/// Per-attempt bound covering navigation and readiness.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves once the document has finished loading, with a fallback so a
/// page that never fires `load` still reports its state.
const SETTLE_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete') {
            resolve('complete');
        } else {
            window.addEventListener('load', () => resolve('complete'));
            setTimeout(() => resolve(document.readyState), 8000);
        }
    })
"#;

/// Chromium-backed transport spawning one session per attempt.
pub struct RenderTransport {
    target: TargetProfile,
    timeout: Duration,
    headless: bool,
}

impl RenderTransport {
    pub fn new(target: TargetProfile) -> Self {
        Self::with_timeout(target, RENDER_TIMEOUT)
    }

    pub fn with_timeout(target: TargetProfile, timeout: Duration) -> Self {
        Self {
            target,
            timeout,
            headless: true,
        }
    }

    fn browser_config(&self, identity: &ProxyIdentity) -> Result<BrowserConfig, TransportError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg(format!("--proxy-server={}", identity.endpoint()))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-background-networking")
            .arg("--no-first-run")
            .arg("--disable-gpu");
        if !self.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(TransportError::Render)
    }

    async fn drive_session(
        &self,
        browser: &Browser,
        url: &str,
        identity: &ProxyIdentity,
        fingerprint: &str,
    ) -> Result<Value, TransportError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| TransportError::Render(format!("failed to open page: {err}")))?;
        let result = self.drive_page(&page, url, identity, fingerprint).await;
        let _ = page.close().await;
        result
    }

    async fn drive_page(
        &self,
        page: &Page,
        url: &str,
        identity: &ProxyIdentity,
        fingerprint: &str,
    ) -> Result<Value, TransportError> {
        if let Some(credentials) = identity.credentials() {
            enable_session_auth(page, credentials).await?;
        }

        page.execute(SetUserAgentOverrideParams::new(fingerprint.to_string()))
            .await
            .map_err(|err| {
                TransportError::Render(format!("user-agent override failed: {err}"))
            })?;

        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        tokio::time::timeout(self.timeout, navigation)
            .await
            .map_err(|_| {
                TransportError::Render(format!(
                    "navigation timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| TransportError::Render(format!("navigation failed: {err}")))?;

        self.wait_until_settled(page).await;

        let content = page
            .content()
            .await
            .map_err(|err| TransportError::Render(format!("failed to read content: {err}")))?;
        extract_payload(&content)
    }

    async fn wait_until_settled(&self, page: &Page) {
        match tokio::time::timeout(self.timeout, page.evaluate(SETTLE_SCRIPT.to_string())).await {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                log::debug!("render settled with readiness '{state}'");
            }
            Ok(Err(err)) => log::debug!("readiness check failed: {err}"),
            Err(_) => log::warn!("timed out waiting for page to settle"),
        }
        // Grace period for late script writes into the DOM.
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
}

#[async_trait]
impl TransportStrategy for RenderTransport {
    async fn fetch(
        &self,
        key: &LookupKey,
        identity: &ProxyIdentity,
        fingerprint: &str,
    ) -> Result<Value, TransportError> {
        let url = self.target.url_for(key);
        let config = self.browser_config(identity)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| TransportError::Render(format!("failed to launch browser: {err}")))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = self.drive_session(&browser, &url, identity, fingerprint).await;

        // The session belongs to this attempt alone; release it before
        // returning on every path.
        let _ = browser.close().await;
        handler_task.abort();

        result
    }

    fn name(&self) -> &'static str {
        "render"
    }
}

/// Answer proxy auth challenges with the identity's credentials before any
/// navigation happens. Enabling the fetch domain pauses requests, so paused
/// requests are resumed as-is alongside the auth responses.
async fn enable_session_auth(
    page: &Page,
    credentials: &ProxyCredentials,
) -> Result<(), TransportError> {
    let mut enable = fetch::EnableParams::default();
    enable.handle_auth_requests = Some(true);
    page.execute(enable)
        .await
        .map_err(|err| TransportError::Render(format!("failed to enable auth handling: {err}")))?;

    let username = format!("{}-{}", credentials.username, credentials.zone);
    let password = credentials.password.clone();

    let mut auth_events = page
        .event_listener::<EventAuthRequired>()
        .await
        .map_err(|err| TransportError::Render(format!("auth listener failed: {err}")))?;
    let auth_page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = auth_events.next().await {
            let challenge = AuthChallengeResponse {
                response: AuthChallengeResponseResponse::ProvideCredentials,
                username: Some(username.clone()),
                password: Some(password.clone()),
            };
            let params = ContinueWithAuthParams::new(event.request_id.clone(), challenge);
            let _ = auth_page.execute(params).await;
        }
    });

    let mut paused_events = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|err| TransportError::Render(format!("pause listener failed: {err}")))?;
    let resume_page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = paused_events.next().await {
            let params = ContinueRequestParams::new(event.request_id.clone());
            let _ = resume_page.execute(params).await;
        }
    });

    Ok(())
}

/// Recover the JSON document out of a rendered page. Chromium wraps raw JSON
/// responses in an HTML shell with the body inside a `<pre>` element and may
/// entity-escape it on the way.
fn extract_payload(document: &str) -> Result<Value, TransportError> {
    let html = Html::parse_document(document);
    let text = Selector::parse("pre")
        .ok()
        .and_then(|selector| {
            html.select(&selector)
                .next()
                .map(|element| element.text().collect::<String>())
        })
        .or_else(|| {
            Selector::parse("body").ok().and_then(|selector| {
                html.select(&selector)
                    .next()
                    .map(|element| element.text().collect::<String>())
            })
        })
        .unwrap_or_else(|| document.to_string());

    let decoded = html_escape::decode_html_entities(text.trim()).to_string();
    if decoded.is_empty() {
        return Err(TransportError::Render("rendered page was empty".into()));
    }
    serde_json::from_str(&decoded)
        .map_err(|err| TransportError::Render(format!("rendered body is not JSON: {err}")))
}
