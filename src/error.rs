//! Crate-wide error types.
//!
//! Each component gets its own variant set; the orchestrator only ever
//! surfaces a sanitized top-level message to the event stream, never a
//! full `anyhow` chain — see SPEC_FULL.md §7.

use thiserror::Error;

/// Errors raised while validating a [`crate::config::JobRequest`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("origin URL must be http or https: {0}")]
    InvalidScheme(String),

    #[error("origin URL has no public host: {0}")]
    NotPublicHost(String),

    #[error("model identifier {field} is malformed: {value}")]
    InvalidModelId { field: &'static str, value: String },

    #[error("output path escapes the data root")]
    OutputPathEscapesRoot,

    #[error("output path contains a parent directory segment")]
    OutputPathTraversal,

    #[error("delay_ms {0} out of range [100, 60000]")]
    DelayOutOfRange(u32),

    #[error("max_concurrent {0} out of range [1, 10]")]
    MaxConcurrentOutOfRange(u8),

    #[error("max_depth {0} out of range [1, 20]")]
    MaxDepthOutOfRange(u8),

    #[error("proxy URL must be https: {0}")]
    ProxyMustBeHttps(String),

    #[error("unsafe target (SSRF): {0}")]
    UnsafeTarget(String),
}

/// Errors from the URL safety layer (C1).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SafetyError {
    #[error("URL has no hostname: {0}")]
    NoHostname(String),

    #[error("unsafe target (SSRF): {0} resolves to a private/reserved address")]
    UnsafeTarget(String),
}

/// Errors from the job orchestrator (C6).
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("job not found")]
    NotFound,

    #[error("job runner failed: {0}")]
    RunnerFailed(String),
}

/// Errors from the page fetcher (C5).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("all fetch tiers failed for {0}")]
    AllTiersFailed(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("timed out fetching {0}")]
    Timeout(String),
}

/// Errors from the LLM gateway (C4).
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no base URL configured for provider {0}")]
    ProviderDisabled(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned malformed response: {0}")]
    MalformedResponse(String),

    #[error("model {requested} not available; first available: {available:?}")]
    ModelNotFound { requested: String, available: Vec<String> },

    #[error("request timed out")]
    Timeout,
}

/// Sanitized terminal error surfaced in a `job_done`/`job_error` payload.
///
/// Deliberately carries only a short message — full detail goes to logs via
/// `log::error!("{err:#}")` at the point of failure, never into the event
/// stream (SPEC_FULL.md §7).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SanitizedError {
    pub message: String,
}

impl SanitizedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for SanitizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
