//! Recursive BFS discovery tier (spec.md §4.2 step 3), the last-resort
//! fallback when sitemap and nav-scrape both yield nothing.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use scraper::{Html, Selector};
use url::Url;

use crate::url_safety;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const RATE_LIMIT: Duration = Duration::from_millis(500);
const MAX_URLS: usize = 1_000;
const YIELD_EVERY: usize = 10;

pub async fn discover(client: &reqwest::Client, origin: &Url, max_depth: u8) -> Vec<String> {
    let mut queue: VecDeque<(String, u8)> = VecDeque::new();
    queue.push_back((origin.to_string(), 0));

    let mut visited: HashSet<String> = HashSet::new();
    let mut discovered: Vec<String> = Vec::new();
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    while let Some((url, depth)) = queue.pop_front() {
        let normalized = url_safety::normalize(&url);
        if visited.contains(&normalized) {
            continue;
        }
        visited.insert(normalized.clone());
        discovered.push(normalized.clone());

        if discovered.len() % YIELD_EVERY == 0 {
            log::debug!("bfs discovery: {} URLs found so far", discovered.len());
            tokio::task::yield_now().await;
        }
        if discovered.len() >= MAX_URLS {
            log::warn!("bfs discovery: hit hard cap of {MAX_URLS} URLs, stopping");
            break;
        }

        if depth >= max_depth {
            continue;
        }

        let body = match fetch(client, &normalized).await {
            Some(b) => b,
            None => continue,
        };

        let document = Html::parse_document(&body);
        for el in document.select(&selector) {
            let Some(href) = el.value().attr("href") else { continue };
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
            {
                continue;
            }
            let Ok(mut resolved) = Url::parse(&normalized).and_then(|base| base.join(href)) else {
                continue;
            };
            if resolved.scheme() != "http" && resolved.scheme() != "https" {
                continue;
            }
            if resolved.host_str() != origin.host_str() {
                continue;
            }
            resolved.set_fragment(None);
            queue.push_back((resolved.to_string(), depth + 1));
        }

        tokio::time::sleep(RATE_LIMIT).await;
    }

    discovered
}

async fn fetch(client: &reqwest::Client, url: &str) -> Option<String> {
    match client.get(url).timeout(FETCH_TIMEOUT).send().await {
        Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
        Ok(resp) => {
            log::debug!("bfs discovery: {url} returned status {}", resp.status());
            None
        }
        Err(e) => {
            log::debug!("bfs discovery: fetch error for {url}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn max_depth_zero_only_visits_origin() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(r#"<html><body><a href="/page-a">a</a></body></html>"#)
            .expect(0)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let origin = Url::parse(&server.url()).unwrap();
        let found = discover(&client, &origin, 0).await;

        assert_eq!(found, vec![url_safety::normalize(origin.as_str())]);
        mock.assert_async().await;
    }
}
