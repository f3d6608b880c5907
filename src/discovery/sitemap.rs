//! Sitemap discovery tier (spec.md §4.2 step 1).

use std::io::Read;
use std::time::Duration;

use futures::future::BoxFuture;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static LOCALE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]{2,4})?$").expect("static regex is valid"));

const WHOLE_STRATEGY_TIMEOUT: Duration = Duration::from_secs(360);

/// Try every sitemap candidate in order, returning the first non-empty,
/// origin-filtered URL set.
pub async fn discover(
    client: &reqwest::Client,
    origin: &Url,
    filter_by_path: bool,
) -> Vec<String> {
    let work = async {
        for candidate in candidate_urls(client, origin).await {
            let urls = fetch_and_parse(client, &candidate, 0).await;
            let accepted: Vec<String> = urls
                .into_iter()
                .filter(|u| accept(origin, u, filter_by_path))
                .collect();
            if !accepted.is_empty() {
                return accepted;
            }
        }
        Vec::new()
    };

    match tokio::time::timeout(WHOLE_STRATEGY_TIMEOUT, work).await {
        Ok(urls) => urls,
        Err(_) => {
            log::warn!("sitemap discovery exceeded {WHOLE_STRATEGY_TIMEOUT:?}, giving up");
            Vec::new()
        }
    }
}

/// Build the ordered candidate list: `<origin_path>/sitemap.xml` (only
/// when origin path isn't root), `/sitemap.xml`, `/sitemap_index.xml`,
/// then every `Sitemap:` directive in `/robots.txt`.
async fn candidate_urls(client: &reqwest::Client, origin: &Url) -> Vec<String> {
    let mut candidates = Vec::new();
    let path = origin.path();
    if path != "/" {
        let trimmed = path.trim_end_matches('/');
        candidates.push(format!("{}://{}{}/sitemap.xml", origin.scheme(), origin_host(origin), trimmed));
    }
    candidates.push(format!("{}://{}/sitemap.xml", origin.scheme(), origin_host(origin)));
    candidates.push(format!("{}://{}/sitemap_index.xml", origin.scheme(), origin_host(origin)));

    let robots_url = format!("{}://{}/robots.txt", origin.scheme(), origin_host(origin));
    if let Ok(resp) = client.get(&robots_url).timeout(Duration::from_secs(10)).send().await {
        if let Ok(body) = resp.text().await {
            for line in body.lines() {
                let trimmed = line.trim();
                if let Some(rest) = trimmed.strip_prefix("Sitemap:").or_else(|| trimmed.strip_prefix("sitemap:")) {
                    candidates.push(rest.trim().to_string());
                }
            }
        }
    }
    candidates
}

fn origin_host(origin: &Url) -> String {
    origin.host_str().unwrap_or_default().to_string()
}

/// Fetch `url`, decoding gzip and recursing into sitemap indexes at most
/// one level (`recursion_depth` guards that). Boxed because the recursive
/// call would otherwise give the future an infinite size.
fn fetch_and_parse<'a>(
    client: &'a reqwest::Client,
    url: &'a str,
    recursion_depth: u8,
) -> BoxFuture<'a, Vec<String>> {
    Box::pin(async move {
        let body = match fetch_body(client, url).await {
            Some(b) => b,
            None => return Vec::new(),
        };

        let doc = match roxmltree::Document::parse(&body) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("sitemap {url}: invalid XML: {e}");
                return Vec::new();
            }
        };

        let root = doc.root_element();
        let tag = root.tag_name().name();

        if tag == "urlset" {
            return root
                .children()
                .filter(|n| n.tag_name().name() == "url")
                .filter_map(|n| n.children().find(|c| c.tag_name().name() == "loc"))
                .filter_map(|n| n.text())
                .map(str::to_string)
                .collect();
        }

        if tag == "sitemapindex" {
            if recursion_depth >= 1 {
                log::warn!("sitemap index {url}: recursion depth exceeded, stopping");
                return Vec::new();
            }
            let sub_sitemaps: Vec<String> = root
                .children()
                .filter(|n| n.tag_name().name() == "sitemap")
                .filter_map(|n| n.children().find(|c| c.tag_name().name() == "loc"))
                .filter_map(|n| n.text())
                .map(str::to_string)
                .collect();

            let to_fetch = keyword_prefilter(url, &sub_sitemaps);
            let mut out = Vec::new();
            for sub in to_fetch {
                out.extend(fetch_and_parse(client, &sub, recursion_depth + 1).await);
            }
            return out;
        }

        Vec::new()
    })
}

/// Pre-filter sub-sitemaps by product path keywords extracted from the
/// parent sitemap index's own path segments, skipping locale tokens.
fn keyword_prefilter(parent_url: &str, sub_sitemaps: &[String]) -> Vec<String> {
    let Ok(parsed) = Url::parse(parent_url) else { return sub_sitemaps.to_vec() };
    let keywords: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|seg| !seg.is_empty() && !LOCALE_TOKEN.is_match(seg))
        .collect();

    if keywords.is_empty() {
        return sub_sitemaps.to_vec();
    }

    let matching: Vec<String> = sub_sitemaps
        .iter()
        .filter(|s| keywords.iter().any(|k| s.contains(k)))
        .cloned()
        .collect();

    if matching.is_empty() { sub_sitemaps.to_vec() } else { matching }
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Option<String> {
    let resp = client.get(url).timeout(Duration::from_secs(10)).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let bytes = resp.bytes().await.ok()?;
    if url.ends_with(".gz") {
        let mut decoder = flate2::read::GzDecoder::new(&bytes[..]);
        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).ok()?;
        Some(decoded)
    } else {
        String::from_utf8(bytes.to_vec()).ok()
    }
}

fn accept(origin: &Url, candidate: &str, filter_by_path: bool) -> bool {
    let Ok(parsed) = Url::parse(candidate) else { return false };
    if parsed.host_str() != origin.host_str() {
        return false;
    }
    if filter_by_path && origin.path() != "/" {
        let base = origin.path().trim_end_matches('/');
        let path = parsed.path();
        if path != base && !path.starts_with(&format!("{base}/")) {
            return false;
        }
    }
    true
}
