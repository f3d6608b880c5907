//! LLM Gateway (C4): provider-routed generation, model discovery/cache,
//! URL filtering, and chunk cleanup.

pub mod cleanup;
pub mod models;
pub mod providers;
pub mod url_filter;

use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::LlmError;

use models::{ModelCache, ModelInfo};
use providers::{GenerateOptions, Provider};

pub struct LlmGateway {
    client: reqwest::Client,
    config: ProviderConfig,
    cache: ModelCache,
}

impl LlmGateway {
    #[must_use]
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config, cache: ModelCache::new() }
    }

    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
        timeout: Duration,
        options: GenerateOptions,
    ) -> Result<String, LlmError> {
        providers::generate(&self.client, &self.config, model, prompt, system, timeout, options).await
    }

    pub async fn list(&self, provider: Provider) -> Result<Vec<ModelInfo>, LlmError> {
        self.cache.list(&self.client, &self.config, provider).await
    }

    pub async fn validate_model(&self, model: &str) -> Result<(), LlmError> {
        let provider = Provider::for_model(model);
        let available = self.list(provider).await?;
        let bare = model.splitn(2, '/').nth(1).unwrap_or(model);
        models::validate(provider, bare, &available)
    }

    pub async fn filter_urls(&self, urls: &[String], model: &str) -> Vec<String> {
        url_filter::filter_urls(self, urls, model).await
    }

    pub async fn cleanup(&self, chunk: &str, model: &str) -> String {
        cleanup::cleanup(self, chunk, model).await
    }
}
