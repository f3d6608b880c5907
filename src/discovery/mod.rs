//! Discovery Cascade (C2): sitemap → nav-scrape → BFS, first-success wins.

pub mod bfs;
pub mod nav_scrape;
pub mod sitemap;

use std::sync::Arc;

use url::Url;

use crate::error::SafetyError;
use crate::fetch::browser::BrowserFetcher;
use crate::url_safety;

/// `(url, depth)` pair used internally by the BFS tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryCandidate {
    pub url: String,
    pub depth: u8,
}

/// Run the cascade for `origin`, returning an ordered, deduplicated URL
/// set. Never returns empty: the minimum fallback is `[normalize(origin)]`.
pub async fn discover(
    client: &reqwest::Client,
    browser: &Arc<dyn BrowserFetcher>,
    origin: &str,
    max_depth: u8,
    filter_by_path: bool,
) -> Result<Vec<String>, SafetyError> {
    url_safety::assert_not_ssrf(origin)?;

    let normalized_origin = url_safety::normalize(origin);
    let Ok(origin_url) = Url::parse(&normalized_origin) else {
        return Ok(vec![normalized_origin]);
    };

    let sitemap_urls = sitemap::discover(client, &origin_url, filter_by_path).await;
    if !sitemap_urls.is_empty() {
        return Ok(dedup_normalized(sitemap_urls));
    }

    url_safety::assert_not_ssrf(&normalized_origin)?;
    let nav_urls = nav_scrape::discover(&origin_url, browser).await;
    if !nav_urls.is_empty() {
        return Ok(dedup_normalized(nav_urls));
    }

    let bfs_urls = bfs::discover(client, &origin_url, max_depth).await;
    if !bfs_urls.is_empty() {
        return Ok(dedup_normalized(bfs_urls));
    }

    Ok(vec![normalized_origin])
}

fn dedup_normalized(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for u in urls {
        let n = url_safety::normalize(&u);
        if seen.insert(n.clone()) {
            out.push(n);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_normalized_drops_case_variants() {
        let urls = vec![
            "HTTPS://H.COM/P/".to_string(),
            "https://h.com/p".to_string(),
        ];
        assert_eq!(dedup_normalized(urls), vec!["https://h.com/p".to_string()]);
    }
}
