//! Pre-clean pass applied to raw page Markdown before chunking
//! (spec.md §4.5).

use std::sync::LazyLock;

use regex::Regex;

static LINE_NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^on this page$",
        r"(?i)^edit this page$",
        r"(?i)^was this page helpful\??$",
        r"(?i)^last updated.*$",
        r"(?i)^skip to (main )?content$",
        r"(?i)^table of contents?$",
        r"(?i)^previous$",
        r"(?i)^next$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex is valid"))
    .collect()
});

static INLINE_NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"self\.__next_\w*",
        r"document\.querySelectorAll\([^)]*\)",
        r"document\.getElementById\([^)]*\)",
        r"window\.addEventListener\([^)]*\)",
        r#"data-page-mode="#,
        r"suppressHydrationWarning",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex is valid"))
    .collect()
});

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex is valid"));

/// Strip known navigation/UI chrome and stray script/style fragments from
/// `markdown`, leaving content lines intact.
#[must_use]
pub fn preclean(markdown: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut in_brace_block = false;
    'outer: for line in markdown.lines() {
        let trimmed = line.trim();
        if in_brace_block {
            if trimmed == "}" {
                in_brace_block = false;
            }
            continue;
        }
        if trimmed == "{" {
            in_brace_block = true;
            continue;
        }
        for re in LINE_NOISE.iter() {
            if re.is_match(trimmed) {
                continue 'outer;
            }
        }
        lines.push(line);
    }
    let mut joined = lines.join("\n");

    for re in INLINE_NOISE.iter() {
        joined = re.replace_all(&joined, "").to_string();
    }

    BLANK_RUN.replace_all(&joined, "\n\n").to_string()
}
