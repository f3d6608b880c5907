//! `JobRequest` (the immutable input data model, SPEC_FULL.md §3) and
//! process-wide provider configuration.
//!
//! Grounded on the teacher's [`crate::fetch`]-adjacent config builder
//! (`config/types.rs`, `config/builder.rs`) but reduced to plain
//! construct-then-validate, since a multi-stage typestate builder isn't
//! warranted for a handful of required fields — see DESIGN.md.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ValidationError;
use crate::url_safety;

static MODEL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w./:@-]{1,100}$").expect("static regex is valid"));

/// Immutable, validated crawl job input (SPEC_FULL.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub origin: String,
    pub crawl_model: String,
    pub pipeline_model: String,
    pub reasoning_model: String,
    pub output_path: PathBuf,
    pub delay_ms: u32,
    pub max_concurrent: u8,
    pub max_depth: u8,
    pub respect_robots_txt: bool,
    pub use_native_markdown: bool,
    pub use_markdown_proxy: bool,
    pub filter_sitemap_by_path: bool,
    pub proxy_url: Option<String>,
    pub language: String,
}

impl JobRequest {
    /// Validate every field, returning the normalized origin/output path on
    /// success. Validation errors are surfaced immediately to the caller
    /// (spec.md §7, error kind 1).
    pub fn validate(mut self, data_root: &Path) -> Result<Self, ValidationError> {
        let origin = Url::parse(&self.origin)
            .map_err(|_| ValidationError::InvalidScheme(self.origin.clone()))?;
        if origin.scheme() != "http" && origin.scheme() != "https" {
            return Err(ValidationError::InvalidScheme(self.origin.clone()));
        }
        if origin.host_str().is_none() {
            return Err(ValidationError::NotPublicHost(self.origin.clone()));
        }
        self.origin = url_safety::normalize(&self.origin);
        url_safety::assert_not_ssrf(&self.origin)
            .map_err(|_| ValidationError::UnsafeTarget(self.origin.clone()))?;

        for (field, value) in [
            ("crawl_model", &self.crawl_model),
            ("pipeline_model", &self.pipeline_model),
            ("reasoning_model", &self.reasoning_model),
        ] {
            if !MODEL_ID_RE.is_match(value) {
                return Err(ValidationError::InvalidModelId { field, value: value.clone() });
            }
        }

        if !(100..=60_000).contains(&self.delay_ms) {
            return Err(ValidationError::DelayOutOfRange(self.delay_ms));
        }
        if !(1..=10).contains(&self.max_concurrent) {
            return Err(ValidationError::MaxConcurrentOutOfRange(self.max_concurrent));
        }
        if !(1..=20).contains(&self.max_depth) {
            return Err(ValidationError::MaxDepthOutOfRange(self.max_depth));
        }

        if let Some(proxy) = &self.proxy_url {
            let parsed =
                Url::parse(proxy).map_err(|_| ValidationError::ProxyMustBeHttps(proxy.clone()))?;
            if parsed.scheme() != "https" {
                return Err(ValidationError::ProxyMustBeHttps(proxy.clone()));
            }
            url_safety::assert_not_ssrf(proxy)
                .map_err(|_| ValidationError::UnsafeTarget(proxy.clone()))?;
        }

        // Output path must resolve under data_root with no `..` traversal.
        if self.output_path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(ValidationError::OutputPathTraversal);
        }
        let resolved = if self.output_path.is_absolute() {
            self.output_path.clone()
        } else {
            data_root.join(&self.output_path)
        };
        if !resolved.starts_with(data_root) {
            return Err(ValidationError::OutputPathEscapesRoot);
        }
        self.output_path = resolved;

        Ok(self)
    }
}

/// Process-wide provider configuration, read once from the environment
/// (SPEC_FULL.md §2 `[AMBIENT]`).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub data_root: PathBuf,
    pub ollama_url: String,
    pub openrouter_url: String,
    pub openrouter_api_key: Option<String>,
    pub opencode_url: String,
    pub opencode_api_key: Option<String>,
}

impl ProviderConfig {
    /// Load from environment variables; absent keys disable the
    /// corresponding provider (spec.md §6).
    pub fn from_env() -> Self {
        Self {
            data_root: std::env::var("DOCCRAWL_DATA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/data")),
            ollama_url: std::env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            openrouter_url: std::env::var("OPENROUTER_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok(),
            opencode_url: std::env::var("OPENCODE_URL")
                .unwrap_or_else(|_| "https://api.opencode.dev/v1".to_string()),
            opencode_api_key: std::env::var("OPENCODE_API_KEY").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> JobRequest {
        JobRequest {
            origin: "https://docs.example.com/guide/".to_string(),
            crawl_model: "ollama/llama3".to_string(),
            pipeline_model: "ollama/llama3".to_string(),
            reasoning_model: "ollama/llama3".to_string(),
            output_path: PathBuf::from("out"),
            delay_ms: 1000,
            max_concurrent: 1,
            max_depth: 3,
            respect_robots_txt: true,
            use_native_markdown: true,
            use_markdown_proxy: false,
            filter_sitemap_by_path: true,
            proxy_url: None,
            language: "en".to_string(),
        }
    }

    #[test]
    fn valid_request_normalizes_origin_and_resolves_output() {
        let root = PathBuf::from("/data");
        let req = base_request().validate(&root).unwrap();
        assert_eq!(req.origin, "https://docs.example.com/guide");
        assert_eq!(req.output_path, PathBuf::from("/data/out"));
    }

    #[test]
    fn rejects_ssrf_origin() {
        let mut req = base_request();
        req.origin = "http://169.254.169.254/latest/".to_string();
        let root = PathBuf::from("/data");
        assert!(matches!(req.validate(&root), Err(ValidationError::UnsafeTarget(_))));
    }

    #[test]
    fn rejects_path_traversal_output() {
        let mut req = base_request();
        req.output_path = PathBuf::from("../escape");
        let root = PathBuf::from("/data");
        assert!(matches!(req.validate(&root), Err(ValidationError::OutputPathTraversal)));
    }

    #[test]
    fn rejects_malformed_model_id() {
        let mut req = base_request();
        req.crawl_model = "bad model!".to_string();
        let root = PathBuf::from("/data");
        assert!(matches!(
            req.validate(&root),
            Err(ValidationError::InvalidModelId { field: "crawl_model", .. })
        ));
    }

    #[test]
    fn rejects_delay_out_of_range() {
        let mut req = base_request();
        req.delay_ms = 50;
        let root = PathBuf::from("/data");
        assert!(matches!(req.validate(&root), Err(ValidationError::DelayOutOfRange(50))));
    }

    #[test]
    fn rejects_http_proxy() {
        let mut req = base_request();
        req.proxy_url = Some("http://proxy.example.com".to_string());
        let root = PathBuf::from("/data");
        assert!(matches!(req.validate(&root), Err(ValidationError::ProxyMustBeHttps(_))));
    }
}
