//! Minimal `robots.txt` parser (spec.md §6): only the global `User-agent: *`
//! block, simple prefix-match `Disallow`, and `Crawl-delay` as a lower
//! bound on per-page delay.
//!
//! Hand-written rather than pulled from the `robotstxt` crate seen
//! elsewhere in the corpus: a general-purpose parser implements group
//! selection, wildcards, and `Allow:` precedence that this system's
//! narrower contract doesn't call for — see DESIGN.md.

#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    disallow: Vec<String>,
    pub crawl_delay_secs: Option<f64>,
}

impl RobotsRules {
    /// Parse `body` as the text of a `robots.txt` file, keeping only
    /// directives inside a `User-agent: *` block.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let mut disallow = Vec::new();
        let mut crawl_delay_secs = None;
        let mut in_wildcard_block = false;

        for raw_line in body.lines() {
            let line = match raw_line.split_once('#') {
                Some((before, _)) => before.trim(),
                None => raw_line.trim(),
            };
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else { continue };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    in_wildcard_block = value == "*";
                }
                "disallow" if in_wildcard_block => {
                    if !value.is_empty() {
                        disallow.push(value.to_string());
                    }
                }
                "crawl-delay" if in_wildcard_block => {
                    if let Ok(secs) = value.parse::<f64>() {
                        crawl_delay_secs = Some(secs);
                    }
                }
                _ => {}
            }
        }

        Self { disallow, crawl_delay_secs }
    }

    /// `true` if `path` is not disallowed by any `Disallow:` prefix.
    #[must_use]
    pub fn is_allowed(&self, path: &str) -> bool {
        !self.disallow.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disallows_matching_prefix() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /admin\n");
        assert!(!rules.is_allowed("/admin/settings"));
        assert!(rules.is_allowed("/docs/page"));
    }

    #[test]
    fn ignores_other_user_agent_blocks() {
        let rules = RobotsRules::parse("User-agent: Googlebot\nDisallow: /\nUser-agent: *\nDisallow: /private\n");
        assert!(rules.is_allowed("/docs/page"));
        assert!(!rules.is_allowed("/private/x"));
    }

    #[test]
    fn parses_crawl_delay() {
        let rules = RobotsRules::parse("User-agent: *\nCrawl-delay: 2.5\n");
        assert_eq!(rules.crawl_delay_secs, Some(2.5));
    }

    #[test]
    fn empty_disallow_value_allows_everything() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow:\n");
        assert!(rules.is_allowed("/anything"));
    }
}
