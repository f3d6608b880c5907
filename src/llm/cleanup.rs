//! LLM-backed chunk cleanup (spec.md §4.4 "Cleanup usage" and "Skip
//! heuristic").

use std::time::Duration;

use super::providers::GenerateOptions;
use super::LlmGateway;

const ATTEMPT_DELAYS_SECS: [u64; 2] = [1, 3];

const NOISE_TOKENS: &[&str] = &[
    "cookie",
    "privacy policy",
    "terms of service",
    "subscribe",
    "toggle dark",
    "toggle light",
    "dark mode",
    "light mode",
    "skip to content",
    "table of contents",
    "on this page",
    "all rights reserved",
    "powered by",
];

const SYSTEM_PROMPT: &str = "You clean up scraped documentation Markdown. Remove leftover \
navigation chrome, ads, and boilerplate while preserving all technical content, code blocks, \
and structure exactly. Return only the cleaned Markdown, nothing else.";

/// `true` iff `chunk` looks like it needs an LLM cleanup pass: any noise
/// token appears, or the chunk is long enough (≥2,000 chars) that it's
/// worth cleaning even without an explicit noise token — unless it's
/// mostly code, which cleanup should leave alone either way.
#[must_use]
pub fn needs_cleanup(chunk: &str) -> bool {
    let lower = chunk.to_lowercase();
    let has_noise = NOISE_TOKENS.iter().any(|t| lower.contains(t));
    let is_long = chunk.chars().count() >= 2_000;
    if !has_noise && !is_long {
        return false;
    }

    let fence_chars: usize = chunk.matches('`').count();
    if (fence_chars * 100) / chunk.chars().count().max(1) > 60 {
        return false;
    }

    true
}

/// Clean a single chunk with `model`. On total failure (2 attempts,
/// backoff 1/3s) returns the original chunk unchanged.
pub async fn cleanup(gateway: &LlmGateway, chunk: &str, model: &str) -> String {
    let chars = chunk.chars().count();
    let options = GenerateOptions {
        num_ctx: ((chars / 4) as u32 + 1_024).max(2_048),
        num_predict: ((chars / 4) as u32 + 512).min(4_096),
        temperature: 0.1,
    };
    let timeout_secs = (45.0 + 10.0 * (chars as f64 / 1024.0)).clamp(45.0, 90.0);
    let timeout = Duration::from_secs_f64(timeout_secs);

    for delay_secs in ATTEMPT_DELAYS_SECS {
        match gateway.generate(model, chunk, Some(SYSTEM_PROMPT), timeout, options).await {
            Ok(reply) if !reply.trim().is_empty() => return reply,
            Ok(_) => log::warn!("cleanup: model returned whitespace-only reply, retrying"),
            Err(e) => log::warn!("cleanup attempt failed: {e}"),
        }
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
    }

    log::warn!("cleanup: all attempts failed, keeping raw chunk");
    chunk.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_noise_token() {
        assert!(needs_cleanup(&("x".repeat(2_100) + "\ncookie notice banner")));
    }

    #[test]
    fn clean_short_chunk_without_noise_skipped() {
        assert!(!needs_cleanup("short content with no noise"));
    }

    #[test]
    fn code_heavy_chunk_skipped_even_with_noise_token() {
        let chunk = "```\n".repeat(50) + "cookie";
        assert!(!needs_cleanup(&chunk));
    }

    #[test]
    fn short_chunk_with_noise_token_still_flagged() {
        let chunk = "cookie notice";
        assert!(needs_cleanup(chunk));
    }

    #[test]
    fn long_chunk_without_noise_token_still_flagged() {
        let chunk = "word ".repeat(500);
        assert!(chunk.chars().count() >= 2_000);
        assert!(needs_cleanup(&chunk));
    }
}
