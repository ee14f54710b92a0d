use index::config::{process_env, read_or, read_string};
use index::Neo4jConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    OpenRouter,
    Gemini,
}

impl Provider {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openrouter" => Some(Self::OpenRouter),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Ollama => "llama3",
            Self::OpenRouter => "meta-llama/llama-3.1-8b-instruct",
            Self::Gemini => "gemini-1.5-flash",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub ollama_url: String,
    #[serde(skip_serializing)]
    pub openrouter_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: Provider::Ollama.default_model().to_string(),
            max_tokens: 512,
            temperature: 0.1,
            ollama_url: "http://localhost:11434".to_string(),
            openrouter_api_key: None,
            gemini_api_key: None,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let provider = match lookup("LLM_PROVIDER") {
            None => defaults.provider,
            Some(raw) => Provider::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "unknown LLM_PROVIDER, using ollama");
                defaults.provider
            }),
        };

        let key = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            provider,
            model: read_string(lookup, "LLM_MODEL", provider.default_model()),
            max_tokens: read_or(lookup, "LLM_MAX_TOKENS", defaults.max_tokens),
            temperature: read_or(lookup, "LLM_TEMPERATURE", defaults.temperature),
            ollama_url: read_string(lookup, "OLLAMA_URL", &defaults.ollama_url),
            openrouter_api_key: key("OPENROUTER_API_KEY"),
            gemini_api_key: key("GEMINI_API_KEY"),
            timeout_secs: read_or(lookup, "LLM_TIMEOUT_SECS", defaults.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub neo4j: Neo4jConfig,
    pub llm: LlmConfig,
    pub query_timeout_secs: u64,
    pub stream_word_delay_ms: u64,
    pub verbose: bool,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            neo4j: Neo4jConfig::default(),
            llm: LlmConfig::default(),
            query_timeout_secs: 15,
            stream_word_delay_ms: 20,
            verbose: false,
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            neo4j: Neo4jConfig::from_lookup(lookup),
            llm: LlmConfig::from_lookup(lookup),
            query_timeout_secs: read_or(lookup, "QUERY_TIMEOUT_SECS", defaults.query_timeout_secs),
            stream_word_delay_ms: read_or(lookup, "STREAM_WORD_DELAY_MS", defaults.stream_word_delay_ms),
            verbose: read_or(lookup, "VERBOSE", defaults.verbose),
            bind_addr: read_string(lookup, "BIND_ADDR", &defaults.bind_addr),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(&process_env)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn word_delay(&self) -> Duration {
        Duration::from_millis(self.stream_word_delay_ms)
    }
}
