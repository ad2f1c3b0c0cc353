//! The injected browser-automation capability.
//!
//! The pipeline only ever talks to [`Browser`]/[`BrowserSession`]; the
//! production implementation drives a browserless-style rendering service
//! over HTTP (rendered HTML via `/content`, diagnostics via
//! `/screenshot`). Anti-detection posture is expressed through
//! [`SessionConfig`]; the rendering service owns the actual automation
//! signal patching.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use koltrack_core::ProxyConfig;

use crate::dom;
use crate::error::ScrapeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Per-session posture: user agent and viewport drawn from the configured
/// pools, optional upstream proxy, and a stealth flag requesting patched
/// automation signals.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_agent: String,
    pub viewport: Viewport,
    pub proxy: Option<ProxyConfig>,
    pub stealth: bool,
}

/// Factory for browser sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Acquires a fresh session with the given posture.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Init`] when the session cannot be created.
    async fn new_session(&self, config: SessionConfig)
        -> Result<Box<dyn BrowserSession>, ScrapeError>;
}

/// One live browser session, valid for a single scrape.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Loads `url`, replacing the current document.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Navigation`] on timeout or load failure.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Trimmed text of the first element matching `selector`, if any.
    async fn text(&self, selector: &str) -> Option<String>;

    /// Attribute of the first element matching `selector`, if any.
    async fn attribute(&self, selector: &str, attr: &str) -> Option<String>;

    /// Whether any element matches `selector`.
    async fn exists(&self, selector: &str) -> bool;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> usize;

    /// Trimmed non-empty texts of every element matching `selector`.
    async fn texts(&self, selector: &str) -> Vec<String>;

    /// Whitespace-normalized text of the whole document.
    async fn full_text(&self) -> String;

    /// Best-effort dismissal of an interstitial (cookie consent, age gate,
    /// login modal). Returns whether anything was dismissed; never fails.
    async fn dismiss(&mut self, _selector: &str) -> bool {
        false
    }

    /// Best-effort human-behavior simulation hooks. Backends without a
    /// live input channel ignore them.
    async fn move_pointer(&mut self, _x: u32, _y: u32) {}
    async fn scroll_by(&mut self, _pixels: i64) {}

    /// Captures a diagnostic screenshot of the current document.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Init`] if the capture or write fails; the
    /// pipeline treats this as best-effort and only logs it.
    async fn screenshot(&self, path: &Path) -> Result<(), ScrapeError>;

    /// Releases the session. Idempotent.
    async fn close(&mut self);
}

/// Production [`Browser`] backed by a browserless-style rendering service.
pub struct RenderedBrowser {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RenderedBrowser {
    /// # Errors
    ///
    /// Returns [`ScrapeError::Init`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ScrapeError::Init {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        match &self.token {
            Some(token) => format!("{}/{path}?token={token}", self.base_url),
            None => format!("{}/{path}", self.base_url),
        }
    }
}

#[async_trait]
impl Browser for RenderedBrowser {
    async fn new_session(
        &self,
        config: SessionConfig,
    ) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        Ok(Box::new(RenderedSession {
            client: self.client.clone(),
            content_endpoint: self.endpoint("content"),
            screenshot_endpoint: self.endpoint("screenshot"),
            config,
            current_url: None,
            html: None,
        }))
    }
}

struct RenderedSession {
    client: reqwest::Client,
    content_endpoint: String,
    screenshot_endpoint: String,
    config: SessionConfig,
    current_url: Option<String>,
    html: Option<String>,
}

impl RenderedSession {
    fn render_body(&self, url: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "url": url,
            "userAgent": self.config.user_agent,
            "viewport": {
                "width": self.config.viewport.width,
                "height": self.config.viewport.height,
            },
            "stealth": self.config.stealth,
        });
        if let Some(proxy) = &self.config.proxy {
            body["proxy"] = serde_json::json!({
                "server": proxy.url,
                "username": proxy.username,
                "password": proxy.password,
            });
        }
        body
    }
}

#[async_trait]
impl BrowserSession for RenderedSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let nav_err = |timed_out: bool| ScrapeError::Navigation {
            url: url.to_owned(),
            attempts: 1,
            timed_out,
        };

        let response = self
            .client
            .post(&self.content_endpoint)
            .timeout(timeout)
            .json(&self.render_body(url))
            .send()
            .await
            .map_err(|e| nav_err(e.is_timeout()))?;

        if !response.status().is_success() {
            tracing::warn!(url, status = %response.status(), "render service returned error");
            return Err(nav_err(false));
        }

        let html = response.text().await.map_err(|e| nav_err(e.is_timeout()))?;
        self.current_url = Some(url.to_owned());
        self.html = Some(html);
        Ok(())
    }

    async fn text(&self, selector: &str) -> Option<String> {
        dom::select_text(self.html.as_deref()?, selector)
    }

    async fn attribute(&self, selector: &str, attr: &str) -> Option<String> {
        dom::select_attr(self.html.as_deref()?, selector, attr)
    }

    async fn exists(&self, selector: &str) -> bool {
        self.html.as_deref().is_some_and(|h| dom::exists(h, selector))
    }

    async fn count(&self, selector: &str) -> usize {
        self.html.as_deref().map_or(0, |h| dom::count(h, selector))
    }

    async fn texts(&self, selector: &str) -> Vec<String> {
        self.html
            .as_deref()
            .map(|h| dom::select_texts(h, selector))
            .unwrap_or_default()
    }

    async fn full_text(&self) -> String {
        self.html.as_deref().map(dom::full_text).unwrap_or_default()
    }

    async fn screenshot(&self, path: &Path) -> Result<(), ScrapeError> {
        let url = self.current_url.as_deref().ok_or_else(|| ScrapeError::Init {
            reason: "no document loaded for screenshot".to_owned(),
        })?;

        let response = self
            .client
            .post(&self.screenshot_endpoint)
            .json(&serde_json::json!({ "url": url, "fullPage": true }))
            .send()
            .await
            .map_err(|e| ScrapeError::Init {
                reason: format!("screenshot request failed: {e}"),
            })?;
        let bytes = response.bytes().await.map_err(|e| ScrapeError::Init {
            reason: format!("screenshot body failed: {e}"),
        })?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| ScrapeError::Init {
                reason: format!("screenshot write failed: {e}"),
            })?;
        Ok(())
    }

    async fn close(&mut self) {
        // The rendering service is stateless per request; dropping the
        // document is all the cleanup there is.
        self.html = None;
        self.current_url = None;
    }
}

#[cfg(test)]
#[path = "browser_test.rs"]
mod browser_test;
