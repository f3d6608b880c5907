//! Provider routing and wire-format adapters (spec.md §4.4, §6).

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::config::ProviderConfig;
use crate::error::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenRouter,
    OpenCode,
}

impl Provider {
    /// Route by model prefix: `openrouter/*` → OpenRouter; `opencode/*` →
    /// OpenCode; anything else → Ollama.
    #[must_use]
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("openrouter/") {
            Provider::OpenRouter
        } else if model.starts_with("opencode/") {
            Provider::OpenCode
        } else {
            Provider::Ollama
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenRouter => "openrouter",
            Provider::OpenCode => "opencode",
        }
    }
}

/// Dynamic per-call generation options (spec.md §4.4's sizing formulas
/// live at the caller; this is just the wire shape).
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub num_ctx: u32,
    pub num_predict: u32,
    pub temperature: f32,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Unified generation call, routed by `model`'s prefix.
pub async fn generate(
    client: &reqwest::Client,
    config: &ProviderConfig,
    model: &str,
    prompt: &str,
    system: Option<&str>,
    timeout: Duration,
    options: GenerateOptions,
) -> Result<String, LlmError> {
    match Provider::for_model(model) {
        Provider::Ollama => ollama_generate(client, config, model, prompt, system, timeout, options).await,
        Provider::OpenRouter => {
            let key = config
                .openrouter_api_key
                .as_deref()
                .ok_or(LlmError::ProviderDisabled("openrouter"))?;
            chat_completion(client, &config.openrouter_url, key, model, prompt, system, timeout, options).await
        }
        Provider::OpenCode => {
            let key = config.opencode_api_key.as_deref().ok_or(LlmError::ProviderDisabled("opencode"))?;
            chat_completion(client, &config.opencode_url, key, model, prompt, system, timeout, options).await
        }
    }
}

async fn ollama_generate(
    client: &reqwest::Client,
    config: &ProviderConfig,
    model: &str,
    prompt: &str,
    system: Option<&str>,
    timeout: Duration,
    options: GenerateOptions,
) -> Result<String, LlmError> {
    let url = format!("{}/api/generate", config.ollama_url.trim_end_matches('/'));
    let body = json!({
        "model": model,
        "prompt": prompt,
        "system": system,
        "stream": false,
        "options": {
            "num_ctx": options.num_ctx,
            "num_predict": options.num_predict,
            "temperature": options.temperature,
        }
    });

    let resp = client.post(&url).json(&body).timeout(timeout).send().await?;
    let parsed: OllamaGenerateResponse = resp
        .json()
        .await
        .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
    Ok(parsed.response)
}

async fn chat_completion(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
    system: Option<&str>,
    timeout: Duration,
    options: GenerateOptions,
) -> Result<String, LlmError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let stripped_model = model.splitn(2, '/').nth(1).unwrap_or(model);

    let mut messages = Vec::new();
    if let Some(sys) = system {
        messages.push(json!({"role": "system", "content": sys}));
    }
    messages.push(json!({"role": "user", "content": prompt}));

    let body = json!({
        "model": stripped_model,
        "messages": messages,
        "temperature": options.temperature,
        "max_tokens": options.num_predict,
    });

    let resp = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&body)
        .timeout(timeout)
        .send()
        .await?;
    let parsed: ChatCompletionResponse = resp
        .json()
        .await
        .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| LlmError::MalformedResponse("empty choices array".to_string()))
}
