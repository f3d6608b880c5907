//! Page Fetcher (C5): three-tier content acquisition plus chunking.

pub mod browser;
pub mod chunk;
pub mod markdown;
pub mod preclean;

use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::error::FetchError;
use browser::BrowserFetcher;
use markdown::MarkdownConverter;

/// Which tier produced a page's Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Native,
    Proxy,
    Browser,
}

/// DOM noise selectors stripped before content extraction (spec.md
/// §4.5, tier 3).
const NOISE_SELECTORS: &[&str] = &[
    "nav",
    "footer",
    "header",
    "script",
    "style",
    "iframe",
    "[class*=\"cookie\"]",
    "[class*=\"toc\"]",
    "[class*=\"prev-next\"]",
    "[class*=\"edit-page\"]",
    "[class*=\"theme-toggle\"]",
    "[class*=\"search\"]",
];

const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    "#content",
    ".content",
    ".markdown-body",
    ".docs-content",
    ".documentation",
    "#main-content",
];

const BODY_SELECTOR: &str = "body";

pub struct PageFetcher {
    client: reqwest::Client,
    pub use_native_markdown: bool,
    pub use_markdown_proxy: bool,
    pub proxy_base: Option<String>,
    browser: Arc<dyn BrowserFetcher>,
    converter: Arc<dyn MarkdownConverter>,
}

impl PageFetcher {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        use_native_markdown: bool,
        use_markdown_proxy: bool,
        proxy_base: Option<String>,
        browser: Arc<dyn BrowserFetcher>,
        converter: Arc<dyn MarkdownConverter>,
    ) -> Self {
        Self { client, use_native_markdown, use_markdown_proxy, proxy_base, browser, converter }
    }

    /// Fetch `url`'s content as Markdown, trying native content
    /// negotiation, then proxy, then the headless browser.
    pub async fn page_markdown(
        &self,
        url: &str,
    ) -> Result<(String, Option<usize>, FetchMethod), FetchError> {
        if self.use_native_markdown {
            if let Some((md, tokens)) = self.try_native(url).await {
                return Ok((md, tokens, FetchMethod::Native));
            }
        }

        if self.use_markdown_proxy {
            if let Some(md) = self.try_proxy(url).await {
                return Ok((md, None, FetchMethod::Proxy));
            }
        }

        let md = self.try_browser(url).await?;
        Ok((md, None, FetchMethod::Browser))
    }

    async fn try_native(&self, url: &str) -> Option<(String, Option<usize>)> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "text/markdown, text/html;q=0.9, */*;q=0.8")
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .ok()?;

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("text/markdown") {
            return None;
        }

        let tokens = resp
            .headers()
            .get("X-Markdown-Tokens")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());

        let body = resp.text().await.ok()?;
        Some((body, tokens))
    }

    async fn try_proxy(&self, url: &str) -> Option<String> {
        let base = self.proxy_base.as_ref()?;
        let proxy_url = format!("{}/{}", base.trim_end_matches('/'), url);
        let resp = self
            .client
            .get(&proxy_url)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .ok()?;
        if resp.status() != reqwest::StatusCode::OK {
            return None;
        }
        let body = resp.text().await.ok()?;
        if body.len() > 100 { Some(body) } else { None }
    }

    async fn try_browser(&self, url: &str) -> Result<String, FetchError> {
        let html = self.browser.fetch(url, Duration::from_secs(30)).await?;
        let document = Html::parse_document(&html);
        let cleaned = strip_noise(&document);
        let content_html = extract_content(&cleaned)
            .or_else(|| body_html(&cleaned))
            .unwrap_or_else(|| cleaned.root_element().html());
        self.converter
            .convert(&content_html)
            .map_err(FetchError::Browser)
    }
}

fn strip_noise(document: &Html) -> Html {
    let mut html = document.html();
    for selector_str in NOISE_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            let doc = Html::parse_document(&html);
            let mut out = html.clone();
            for el in doc.select(&selector) {
                let fragment = el.html();
                out = out.replacen(&fragment, "", 1);
            }
            html = out;
        }
    }
    Html::parse_document(&html)
}

fn extract_content(document: &Html) -> Option<String> {
    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else { continue };
        if let Some(el) = document.select(&selector).next() {
            let inner = el.inner_html();
            if inner.chars().count() >= 200 {
                return Some(inner);
            }
        }
    }
    None
}

/// Tier-3 fallback between the content-selector cascade and the whole
/// document: `<body>` excludes `<head>`, `<script>`, and `<style>`
/// content that the whole-document fallback would otherwise include.
fn body_html(document: &Html) -> Option<String> {
    let selector = Selector::parse(BODY_SELECTOR).ok()?;
    document.select(&selector).next().map(|el| el.inner_html())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_body_when_no_content_selector_matches() {
        let html = "<html><head><script>evil()</script></head><body><p>hi</p></body></html>";
        let document = Html::parse_document(html);
        assert!(extract_content(&document).is_none());
        let body = body_html(&document).unwrap();
        assert!(body.contains("<p>hi</p>"));
        assert!(!body.contains("evil()"));
    }
}
