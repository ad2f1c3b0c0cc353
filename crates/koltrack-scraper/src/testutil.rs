//! Test doubles shared across the crate's unit tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::{Browser, BrowserSession, SessionConfig};
use crate::dom;
use crate::error::ScrapeError;

/// What the canned sessions did, observable after the pipeline has
/// consumed them.
#[derive(Debug, Default)]
pub(crate) struct SessionLog {
    pub(crate) visited: Mutex<Vec<String>>,
    pub(crate) dismissed: Mutex<Vec<String>>,
    pub(crate) screenshots: Mutex<Vec<PathBuf>>,
    pub(crate) closed: Mutex<bool>,
}

impl SessionLog {
    pub(crate) fn visits(&self) -> Vec<String> {
        self.visited.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub(crate) fn dismissals(&self) -> Vec<String> {
        self.dismissed.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub(crate) fn screenshot_count(&self) -> usize {
        self.screenshots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub(crate) fn was_closed(&self) -> bool {
        self.closed.lock().map(|c| *c).unwrap_or(false)
    }
}

/// A [`BrowserSession`] over a fixed document. Every query runs against
/// the canned HTML; navigations can be scripted to fail first.
pub(crate) struct StaticSession {
    html: String,
    log: Arc<SessionLog>,
    fail_navigations: usize,
}

impl StaticSession {
    pub(crate) fn new(html: &str) -> Self {
        Self {
            html: html.to_owned(),
            log: Arc::new(SessionLog::default()),
            fail_navigations: 0,
        }
    }
}

#[async_trait]
impl BrowserSession for StaticSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), ScrapeError> {
        if let Ok(mut visited) = self.log.visited.lock() {
            visited.push(url.to_owned());
        }
        if self.fail_navigations > 0 {
            self.fail_navigations -= 1;
            return Err(ScrapeError::Navigation {
                url: url.to_owned(),
                attempts: 1,
                timed_out: true,
            });
        }
        Ok(())
    }

    async fn text(&self, selector: &str) -> Option<String> {
        dom::select_text(&self.html, selector)
    }

    async fn attribute(&self, selector: &str, attr: &str) -> Option<String> {
        dom::select_attr(&self.html, selector, attr)
    }

    async fn exists(&self, selector: &str) -> bool {
        dom::exists(&self.html, selector)
    }

    async fn count(&self, selector: &str) -> usize {
        dom::count(&self.html, selector)
    }

    async fn texts(&self, selector: &str) -> Vec<String> {
        dom::select_texts(&self.html, selector)
    }

    async fn full_text(&self) -> String {
        dom::full_text(&self.html)
    }

    async fn dismiss(&mut self, selector: &str) -> bool {
        let present = dom::exists(&self.html, selector);
        if present {
            if let Ok(mut dismissed) = self.log.dismissed.lock() {
                dismissed.push(selector.to_owned());
            }
        }
        present
    }

    async fn screenshot(&self, path: &Path) -> Result<(), ScrapeError> {
        if let Ok(mut screenshots) = self.log.screenshots.lock() {
            screenshots.push(path.to_path_buf());
        }
        Ok(())
    }

    async fn close(&mut self) {
        if let Ok(mut closed) = self.log.closed.lock() {
            *closed = true;
        }
    }
}

/// A [`Browser`] handing out [`StaticSession`]s over one canned document,
/// all reporting into a shared [`SessionLog`].
pub(crate) struct StaticBrowser {
    html: String,
    fail_navigations: usize,
    pub(crate) log: Arc<SessionLog>,
}

impl StaticBrowser {
    pub(crate) fn new(html: &str) -> Self {
        Self {
            html: html.to_owned(),
            fail_navigations: 0,
            log: Arc::new(SessionLog::default()),
        }
    }

    /// Makes the first `n` navigations time out before the document loads.
    pub(crate) fn failing_first(html: &str, n: usize) -> Self {
        let mut browser = Self::new(html);
        browser.fail_navigations = n;
        browser
    }
}

#[async_trait]
impl Browser for StaticBrowser {
    async fn new_session(
        &self,
        _config: SessionConfig,
    ) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        Ok(Box::new(StaticSession {
            html: self.html.clone(),
            log: Arc::clone(&self.log),
            fail_navigations: self.fail_navigations,
        }))
    }
}
