//! Output-tree file mapping (spec.md §4.6 "File mapping", §6 "Output
//! tree").

use std::path::{Path, PathBuf};

use url::Url;

/// Map a discovered URL to its output file path under `output_root`,
/// given the job's `base_path` (origin path, trailing slashes stripped).
///
/// Every path segment is run through `sanitize_filename::sanitize` before
/// being joined, so a URL path segment carrying characters invalid on the
/// host filesystem (or a bare `.`/`..` segment) can't escape `output_root`
/// or collide with a reserved filename.
#[must_use]
pub fn relative_path_for_url(url: &str, base_path: &str) -> PathBuf {
    let Ok(parsed) = Url::parse(url) else { return PathBuf::from("index.md") };
    let mut path = parsed.path();
    if !base_path.is_empty() && path.starts_with(base_path) {
        path = &path[base_path.len()..];
    }
    let trimmed = path.trim_start_matches('/').trim_end_matches('/');

    if trimmed.is_empty() {
        return PathBuf::from("index.md");
    }

    let sanitized: Vec<String> = trimmed
        .split('/')
        .map(sanitize_segment)
        .filter(|s| !s.is_empty())
        .collect();
    if sanitized.is_empty() {
        return PathBuf::from("index.md");
    }

    let joined = sanitized.join("/");
    let stripped = strip_last_segment_extension(&joined);
    PathBuf::from(format!("{stripped}.md"))
}

/// Sanitize a single path segment, guarding against traversal segments
/// that `sanitize_filename` itself doesn't treat as illegal.
fn sanitize_segment(segment: &str) -> String {
    if segment == "." || segment == ".." {
        return String::new();
    }
    sanitize_filename::sanitize(segment)
}

fn strip_last_segment_extension(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, last)) => {
            let last_stem = last.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(last);
            format!("{dir}/{last_stem}")
        }
        None => path.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(path).to_string(),
    }
}

/// Write the root `_index.md`: one `- [<leaf>](<relative>.md)` line per
/// written page, sorted by relative path.
pub async fn write_index(output_root: &Path, mut entries: Vec<PathBuf>) -> std::io::Result<()> {
    entries.sort();
    let mut body = String::from("# Documentation Index\n");
    for entry in &entries {
        let leaf = entry.file_stem().and_then(|s| s.to_str()).unwrap_or("untitled");
        let rel = entry.to_string_lossy();
        body.push_str(&format!("- [{leaf}]({rel})\n"));
    }
    tokio::fs::write(output_root.join("_index.md"), body).await
}
