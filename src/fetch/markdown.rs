//! HTML-to-Markdown conversion, modelled as an external collaborator
//! (spec.md §1 lists "the HTML-to-Markdown converter" as out of scope);
//! this crate only needs the conversion entrypoint.

use htmd::HtmlToMarkdown;

/// Converts rendered HTML into Markdown text.
pub trait MarkdownConverter: Send + Sync {
    fn convert(&self, html: &str) -> Result<String, String>;
}

/// `htmd`-backed implementation.
pub struct HtmdConverter {
    inner: HtmlToMarkdown,
}

impl HtmdConverter {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: HtmlToMarkdown::new() }
    }
}

impl Default for HtmdConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownConverter for HtmdConverter {
    fn convert(&self, html: &str) -> Result<String, String> {
        self.inner.convert(html).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_basic_html() {
        let conv = HtmdConverter::new();
        let md = conv.convert("<h1>Title</h1><p>Body text.</p>").unwrap();
        assert!(md.contains("Title"));
        assert!(md.contains("Body text."));
    }
}
