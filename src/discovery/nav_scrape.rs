//! Navigation-scrape discovery tier (spec.md §4.2 step 2): rendered DOM,
//! anchors under common nav/sidebar/TOC selectors.

use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};
use url::Url;

use crate::fetch::browser::BrowserFetcher;
use crate::url_safety;

const NAV_SELECTORS: &str =
    "nav a, aside a, .sidebar a, .navigation a, [role=\"navigation\"] a, .toc a, .menu a";
const MAX_LINKS: usize = 100;
const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn discover(origin: &Url, browser: &Arc<dyn BrowserFetcher>) -> Vec<String> {
    let html = match browser.fetch(origin.as_str(), PAGE_TIMEOUT).await {
        Ok(h) => h,
        Err(e) => {
            log::warn!("nav-scrape: failed to render {origin}: {e}");
            return Vec::new();
        }
    };

    let Ok(selector) = Selector::parse(NAV_SELECTORS) else { return Vec::new() };
    let document = Html::parse_document(&html);

    let mut out = Vec::new();
    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else { continue };
        let Ok(resolved) = origin.join(href) else { continue };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        if resolved.host_str() != origin.host_str() {
            continue;
        }
        let normalized = url_safety::normalize(resolved.as_str());
        if !out.contains(&normalized) {
            out.push(normalized);
        }
        if out.len() >= MAX_LINKS {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nav_selector_parses() {
        assert!(Selector::parse(NAV_SELECTORS).is_ok());
    }
}
