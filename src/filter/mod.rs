//! Deterministic Filter (C3): domain/base-path/extension/pattern/language
//! pruning. The robots gate (spec.md §4.3 rule 6) is applied separately
//! by the orchestrator, once per job, against the parsed `robots.txt`.

pub mod robots;

use url::Url;

const EXCLUDED_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "tar", "gz", "rar", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "mp4",
    "mp3", "wav", "avi", "mov", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "exe", "dmg", "deb",
    "rpm",
];

const EXCLUDED_PATTERNS: &[&str] =
    &["/blog/", "/changelog/", "/api-reference/", "/releases/", "/download/", "/assets/"];

fn language_fragments(lang: &str) -> Option<&'static [&'static str]> {
    match lang {
        "en" => Some(&["/en/", "/en-us/", "/en-gb/", "/english/"]),
        "es" => Some(&["/es/", "/es-es/", "/es-mx/", "/spanish/"]),
        "fr" => Some(&["/fr/", "/fr-fr/", "/fr-ca/", "/french/"]),
        "de" => Some(&["/de/", "/de-de/", "/german/"]),
        "ja" => Some(&["/ja/", "/ja-jp/", "/japanese/"]),
        "zh" => Some(&["/zh/", "/zh-cn/", "/zh-tw/", "/chinese/"]),
        "pt" => Some(&["/pt/", "/pt-br/", "/pt-pt/", "/portuguese/"]),
        "ru" => Some(&["/ru/", "/ru-ru/", "/russian/"]),
        "ko" => Some(&["/ko/", "/ko-kr/", "/korean/"]),
        _ => None,
    }
}

const ALL_LANGUAGES: &[&str] = &["en", "es", "fr", "de", "ja", "zh", "pt", "ru", "ko"];

/// Apply rules 1–5 of spec.md §4.3, in order, returning a normalized,
/// deduplicated, lexicographically sorted URL set.
#[must_use]
pub fn filter(urls: &[String], origin: &str, language: &str) -> Vec<String> {
    let Ok(origin_url) = Url::parse(origin) else { return Vec::new() };
    let origin_host = origin_url.host_str().map(str::to_lowercase);
    let base_path = origin_url.path().trim_end_matches('/').to_string();

    let mut out: Vec<String> = urls
        .iter()
        .filter_map(|u| Url::parse(u).ok().map(|parsed| (u.clone(), parsed)))
        .filter(|(_, parsed)| parsed.host_str().map(str::to_lowercase) == origin_host)
        .filter(|(_, parsed)| path_under_base(parsed.path(), &base_path))
        .filter(|(_, parsed)| !has_excluded_extension(parsed.path()))
        .filter(|(_, parsed)| !has_excluded_pattern(parsed.path()))
        .filter(|(_, parsed)| language_allows(parsed.path(), &base_path, language))
        .map(|(_, parsed)| canonical_key(&parsed))
        .collect();

    out.sort();
    out.dedup();
    out
}

fn path_under_base(path: &str, base_path: &str) -> bool {
    if base_path.is_empty() {
        return true;
    }
    path == base_path || path.starts_with(&format!("{base_path}/"))
}

fn has_excluded_extension(path: &str) -> bool {
    let Some(last_segment) = path.rsplit('/').next() else { return false };
    let Some(ext) = last_segment.rsplit('.').next() else { return false };
    if ext == last_segment {
        return false;
    }
    EXCLUDED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

fn has_excluded_pattern(path: &str) -> bool {
    EXCLUDED_PATTERNS.iter().any(|p| path.contains(p))
}

fn language_allows(path: &str, base_path: &str, language: &str) -> bool {
    if language == "all" {
        return true;
    }
    let Some(fragments) = language_fragments(language) else { return true };

    if fragments.iter().any(|f| path.contains(f)) {
        return true;
    }
    for other in ALL_LANGUAGES {
        if *other == language {
            continue;
        }
        if let Some(other_fragments) = language_fragments(other) {
            if other_fragments.iter().any(|f| path.contains(f)) {
                return false;
            }
        }
    }
    !ALL_LANGUAGES.iter().filter_map(|l| language_fragments(l)).flatten().any(|f| base_path.contains(f))
}

fn canonical_key(parsed: &Url) -> String {
    format!("{}://{}{}", parsed.scheme(), parsed.host_str().unwrap_or_default(), parsed.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_origin_host() {
        let urls = vec![
            "https://docs.example.com/guide/a".to_string(),
            "https://other.com/guide/b".to_string(),
        ];
        let out = filter(&urls, "https://docs.example.com/guide/", "all");
        assert_eq!(out, vec!["https://docs.example.com/guide/a".to_string()]);
    }

    #[test]
    fn drops_excluded_extensions() {
        let urls = vec![
            "https://docs.example.com/guide/a".to_string(),
            "https://docs.example.com/guide/file.pdf".to_string(),
        ];
        let out = filter(&urls, "https://docs.example.com/guide/", "all");
        assert_eq!(out, vec!["https://docs.example.com/guide/a".to_string()]);
    }

    #[test]
    fn drops_excluded_patterns() {
        let urls = vec![
            "https://docs.example.com/guide/a".to_string(),
            "https://docs.example.com/guide/blog/post".to_string(),
        ];
        let out = filter(&urls, "https://docs.example.com/guide/", "all");
        assert_eq!(out, vec!["https://docs.example.com/guide/a".to_string()]);
    }

    #[test]
    fn language_keeps_matching_fragment() {
        let urls = vec![
            "https://docs.example.com/en/guide".to_string(),
            "https://docs.example.com/fr/guide".to_string(),
            "https://docs.example.com/guide".to_string(),
        ];
        let out = filter(&urls, "https://docs.example.com/", "en");
        assert!(out.contains(&"https://docs.example.com/en/guide".to_string()));
        assert!(!out.contains(&"https://docs.example.com/fr/guide".to_string()));
        assert!(out.contains(&"https://docs.example.com/guide".to_string()));
    }

    #[test]
    fn output_is_sorted_and_deduped() {
        let urls = vec![
            "https://docs.example.com/b".to_string(),
            "https://docs.example.com/a".to_string(),
            "https://docs.example.com/a".to_string(),
        ];
        let out = filter(&urls, "https://docs.example.com/", "all");
        assert_eq!(
            out,
            vec!["https://docs.example.com/a".to_string(), "https://docs.example.com/b".to_string()]
        );
    }
}
