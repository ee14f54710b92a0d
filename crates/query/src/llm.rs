use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LlmConfig, Provider};

/// What `invoke` hands back: always text, never an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Completion {
    pub content: String,
}

/// Text generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Provider and model, for logs and health output.
    fn describe(&self) -> String;

    /// Infallible variant: transport failures become an `Error: ...` string.
    async fn invoke(&self, prompt: &str) -> Completion {
        match self.complete(prompt).await {
            Ok(content) => Completion { content },
            Err(e) => {
                tracing::warn!(model = %self.describe(), error = %e, "generation failed");
                Completion {
                    content: format!("Error: {}", e),
                }
            }
        }
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, max_tokens: u32, temperature: f32, timeout: Duration) -> Self {
        Self {
            base_url,
            model,
            max_tokens,
            temperature,
            client: http_client(timeout),
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(
            "http://localhost:11434".to_string(),
            "llama3".to_string(),
            512,
            0.1,
            Duration::from_secs(30),
        )
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                num_predict: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }

    fn describe(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

/// OpenAI-compatible chat completions on openrouter.ai.
#[derive(Clone)]
pub struct OpenRouterClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>, model: String, max_tokens: u32, temperature: f32, timeout: Duration) -> Self {
        Self {
            api_key,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model,
            max_tokens,
            temperature,
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            anyhow::bail!("No API key set. Please set OPENROUTER_API_KEY environment variable");
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenRouter")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(500).collect();
            anyhow::bail!("OpenRouter request failed: {} {}", status, detail);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenRouter response")?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("OpenRouter response contained no choices")
    }

    fn describe(&self) -> String {
        format!("openrouter:{}", self.model)
    }
}

/// Google Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiReply,
}

#[derive(Deserialize)]
struct GeminiReply {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Deserialize)]
struct GeminiReplyPart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: String, max_tokens: u32, temperature: f32, timeout: Duration) -> Self {
        Self {
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model,
            max_tokens,
            temperature,
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            anyhow::bail!("No API key set. Please set GEMINI_API_KEY environment variable");
        };

        let request = GeminiRequest {
            contents: vec![GeminiContent { parts: vec![GeminiPart { text: prompt }] }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self.client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        if !response.status().is_success() {
            anyhow::bail!("Gemini request failed: {}", response.status());
        }

        let gemini: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let text: String = gemini
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .context("Gemini response contained no candidates")?;

        Ok(text)
    }

    fn describe(&self) -> String {
        format!("gemini:{}", self.model)
    }
}

/// Pick the backend named by the configuration.
pub fn build_model(config: &LlmConfig) -> Arc<dyn LanguageModel> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let model = config.model.clone();

    match config.provider {
        Provider::Ollama => Arc::new(OllamaClient::new(
            config.ollama_url.clone(),
            model,
            config.max_tokens,
            config.temperature,
            timeout,
        )),
        Provider::OpenRouter => Arc::new(OpenRouterClient::new(
            config.openrouter_api_key.clone(),
            model,
            config.max_tokens,
            config.temperature,
            timeout,
        )),
        Provider::Gemini => Arc::new(GeminiClient::new(
            config.gemini_api_key.clone(),
            model,
            config.max_tokens,
            config.temperature,
            timeout,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[tokio::test]
    async fn test_invoke_turns_failures_into_text() {
        let model = ScriptedModel::new(vec![Err("connection refused".to_string())]);
        let completion = model.invoke("hello").await;
        assert_eq!(completion.content, "Error: connection refused");
    }

    #[test]
    fn test_ollama_default_targets_local_llama3() {
        let client = OllamaClient::default();
        assert_eq!(client.describe(), "ollama:llama3");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_an_error_not_a_panic() {
        let client = OpenRouterClient::new(None, "m".to_string(), 16, 0.1, Duration::from_secs(1));
        let err = client.complete("hi").await.unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));

        let gemini = GeminiClient::new(None, "m".to_string(), 16, 0.1, Duration::from_secs(1));
        let completion = gemini.invoke("hi").await;
        assert!(completion.content.starts_with("Error: No API key set"));
    }

    #[test]
    fn test_build_model_follows_provider() {
        let mut config = LlmConfig::default();
        assert_eq!(build_model(&config).describe(), "ollama:llama3");

        config.provider = Provider::Gemini;
        config.model = "gemini-1.5-flash".to_string();
        assert_eq!(build_model(&config).describe(), "gemini:gemini-1.5-flash");
    }
}
