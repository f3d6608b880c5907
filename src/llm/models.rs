//! Model discovery, caching, and validation (spec.md §4.4).

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::LlmError;

use super::providers::Provider;

const CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub is_free: bool,
    pub provider: &'static str,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
    size: Option<u64>,
}

/// Process-wide, read-mostly cache of `provider → (list, fetched_at)`.
/// Not strictly necessary for correctness (spec.md §9) — dropping it
/// would just spam provider listing endpoints.
#[derive(Default)]
pub struct ModelCache {
    entries: DashMap<&'static str, (Vec<ModelInfo>, Instant)>,
}

impl ModelCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(
        &self,
        client: &reqwest::Client,
        config: &ProviderConfig,
        provider: Provider,
    ) -> Result<Vec<ModelInfo>, LlmError> {
        let key = provider.name();
        if let Some(entry) = self.entries.get(key) {
            if entry.1.elapsed() < CACHE_TTL {
                return Ok(entry.0.clone());
            }
        }

        let fresh = fetch_list(client, config, provider).await?;
        self.entries.insert(key, (fresh.clone(), Instant::now()));
        Ok(fresh)
    }
}

async fn fetch_list(
    client: &reqwest::Client,
    config: &ProviderConfig,
    provider: Provider,
) -> Result<Vec<ModelInfo>, LlmError> {
    match provider {
        Provider::Ollama => {
            let url = format!("{}/api/tags", config.ollama_url.trim_end_matches('/'));
            let resp = client.get(&url).send().await?;
            let parsed: OllamaTagsResponse = resp
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
            Ok(parsed
                .models
                .into_iter()
                .map(|m| ModelInfo { name: m.name, size: m.size, is_free: false, provider: "ollama" })
                .collect())
        }
        Provider::OpenRouter => {
            let url = format!("{}/models", config.openrouter_url.trim_end_matches('/'));
            let mut req = client.get(&url);
            if let Some(key) = &config.openrouter_api_key {
                req = req.bearer_auth(key);
            }
            let resp = req.send().await?;
            let body: Value = resp
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
            let data = body.get("data").and_then(Value::as_array).cloned().unwrap_or_default();
            Ok(data
                .into_iter()
                .filter_map(|entry| {
                    let name = entry.get("id")?.as_str()?.to_string();
                    let prompt_price = entry
                        .get("pricing")
                        .and_then(|p| p.get("prompt"))
                        .and_then(Value::as_str)
                        .and_then(|s| s.parse::<f64>().ok())
                        .unwrap_or(1.0);
                    let is_free =
                        prompt_price == 0.0 || name.contains(":free") || name.to_lowercase().contains("free");
                    Some(ModelInfo { name, size: None, is_free, provider: "openrouter" })
                })
                .collect())
        }
        Provider::OpenCode => Ok(vec![ModelInfo {
            name: "opencode/default".to_string(),
            size: None,
            is_free: false,
            provider: "opencode",
        }]),
    }
}

/// Validate a requested model string against an available list
/// (spec.md §4.4 "Validation"). Ollama requires exact/`:latest`/prefix
/// match; API providers just need a non-empty catalog.
pub fn validate(provider: Provider, requested: &str, available: &[ModelInfo]) -> Result<(), LlmError> {
    match provider {
        Provider::Ollama => {
            let matches = available.iter().any(|m| {
                m.name == requested
                    || m.name == format!("{requested}:latest")
                    || m.name.starts_with(&format!("{requested}:"))
            });
            if matches {
                Ok(())
            } else {
                let first_five: Vec<String> = available.iter().take(5).map(|m| m.name.clone()).collect();
                Err(LlmError::ModelNotFound { requested: requested.to_string(), available: first_five })
            }
        }
        Provider::OpenRouter | Provider::OpenCode => {
            if available.is_empty() {
                Err(LlmError::ModelNotFound { requested: requested.to_string(), available: Vec::new() })
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models(names: &[&str]) -> Vec<ModelInfo> {
        names
            .iter()
            .map(|n| ModelInfo { name: n.to_string(), size: None, is_free: false, provider: "ollama" })
            .collect()
    }

    #[test]
    fn validates_exact_match() {
        assert!(validate(Provider::Ollama, "llama3", &models(&["llama3"])).is_ok());
    }

    #[test]
    fn validates_latest_suffix() {
        assert!(validate(Provider::Ollama, "llama3", &models(&["llama3:latest"])).is_ok());
    }

    #[test]
    fn validates_tag_prefix() {
        assert!(validate(Provider::Ollama, "llama3", &models(&["llama3:8b"])).is_ok());
    }

    #[test]
    fn rejects_unknown_model_with_first_five() {
        let err = validate(Provider::Ollama, "ghost", &models(&["a", "b"])).unwrap_err();
        assert!(matches!(err, LlmError::ModelNotFound { .. }));
    }

    #[test]
    fn api_provider_accepts_nonempty_catalog() {
        assert!(validate(Provider::OpenRouter, "anything", &models(&["x"])).is_ok());
    }
}
