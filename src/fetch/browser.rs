//! Headless-browser capability, modelled as an external collaborator
//! (spec.md §9: "the core does not import browser types" beyond this
//! narrow trait).
//!
//! Grounded on the teacher's `browser_setup.rs` (executable discovery,
//! `tracing` spans around launch) but reduced to the three operations the
//! pipeline actually calls.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;

use crate::error::FetchError;

/// A single headless-browser instance scoped to one job (spec.md §4.5:
/// "single browser instance per Job").
#[async_trait]
pub trait BrowserFetcher: Send + Sync {
    /// Launch the underlying browser process. Idempotent.
    async fn start(&self) -> Result<(), FetchError>;

    /// Navigate to `url`, wait for the network to settle, and return the
    /// rendered page's full HTML.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;

    /// Shut the browser down. Idempotent; must not panic if already
    /// stopped or never started.
    async fn stop(&self);
}

/// `chromiumoxide`-backed implementation.
pub struct ChromiumBrowser {
    inner: tokio::sync::Mutex<Option<Browser>>,
}

impl ChromiumBrowser {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: tokio::sync::Mutex::new(None) }
    }
}

impl Default for ChromiumBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserFetcher for ChromiumBrowser {
    async fn start(&self) -> Result<(), FetchError> {
        let mut guard = self.inner.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let config = BrowserConfig::builder()
            .build()
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        *guard = Some(browser);
        Ok(())
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let guard = self.inner.lock().await;
        let browser = guard.as_ref().ok_or_else(|| {
            FetchError::Browser("browser not started".to_string())
        })?;
        let navigate = async {
            let page: Page = browser
                .new_page(url)
                .await
                .map_err(|e| FetchError::Browser(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| FetchError::Browser(e.to_string()))?;
            page.content()
                .await
                .map_err(|e| FetchError::Browser(e.to_string()))
        };
        tokio::time::timeout(timeout, navigate)
            .await
            .map_err(|_| FetchError::Timeout(url.to_string()))?
    }

    async fn stop(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(mut browser) = guard.take() {
            let _ = browser.close().await;
        }
    }
}
