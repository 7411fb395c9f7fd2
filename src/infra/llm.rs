//! 大模型文本生成客户端.
//!
//! 分类器, 两个合成器与总结器都只依赖 [`TextGenerator`], 具体厂商由配置决定.
//! 调用失败以 [`LlmError`] 返回, 由调用点显式处理.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::{LlmConfig, LlmProvider};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse LLM response: {0}")]
    Decode(String),

    #[error("LLM returned an empty response")]
    Empty,

    #[error("LLM configuration error: {0}")]
    Config(String),
}

/// 一次生成请求; `system` 为空时只发送用户消息
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            system: None,
            user: text.into(),
        }
    }

    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 返回模型生成的原始文本
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, LlmError> {
    if config.api_key.trim().is_empty() {
        return Err(LlmError::Config(format!("missing API key for model {}", config.model)));
    }
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    let generator: Arc<dyn TextGenerator> = match config.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiClient {
            client,
            config: config.clone(),
        }),
        LlmProvider::Gemini => Arc::new(GeminiClient {
            client,
            config: config.clone(),
        }),
    };
    Ok(generator)
}

// ============ OpenAI ============

pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &prompt.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt.user}));

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.model,
                "messages": messages,
                "temperature": 0
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!("OpenAI 响应长度: {}", body.len());
        parse_openai_body(&body)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn parse_openai_body(body: &str) -> Result<String, LlmError> {
    let parsed: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Decode(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::Empty)
}

// ============ Gemini ============

pub struct GeminiClient {
    client: Client,
    config: LlmConfig,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt.user}]}],
            "generationConfig": {"temperature": 0}
        });
        if let Some(system) = &prompt.system {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.config.base_url, self.config.model
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        debug!("Gemini 响应长度: {}", text.len());
        parse_gemini_body(&text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn parse_gemini_body(body: &str) -> Result<String, LlmError> {
    let parsed: GeminiResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Decode(e.to_string()))?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(LlmError::Empty);
    }
    Ok(text)
}
