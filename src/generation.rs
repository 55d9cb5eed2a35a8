//! OpenAI completion client implementing [`Generator`].
//!
//! Sends the stuffed QA prompt either to the legacy completions endpoint
//! (default, `gpt-3.5-turbo-instruct`) or to chat completions, depending on
//! `generation.api`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docqa_core::generation::{stuff_prompt, Generator};

use crate::config::{GenerationApi, GenerationConfig};

pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    api: GenerationApi,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIGenerator {
    /// Creates the client, reading the key from `OPENAI_API_KEY`.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &GenerationConfig, api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("OpenAI API key is empty");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build OpenAI HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api: config.api,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        match self.api {
            GenerationApi::Completions => format!("{}/completions", self.api_base),
            GenerationApi::Chat => format!("{}/chat/completions", self.api_base),
        }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        match self.api {
            GenerationApi::Completions => serde_json::json!(CompletionRequest {
                model: &self.model,
                prompt,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            }),
            GenerationApi::Chat => serde_json::json!(ChatRequest {
                model: &self.model,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
            }),
        }
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        let prompt = stuff_prompt(context, question);
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "calling generation API");

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&prompt))
            .send()
            .await
            .context("failed to call OpenAI generation endpoint")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("OpenAI returned {}: {}", status, text);
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse OpenAI generation response")?;
        parse_answer(self.api, json)
    }
}

/// Pulls the first choice's text out of a completions or chat response.
fn parse_answer(api: GenerationApi, json: serde_json::Value) -> Result<String> {
    match api {
        GenerationApi::Completions => {
            let parsed: CompletionResponse =
                serde_json::from_value(json).context("unexpected completions response")?;
            parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.text.trim().to_string())
                .ok_or_else(|| anyhow::anyhow!("completions response has no choices"))
        }
        GenerationApi::Chat => {
            let parsed: ChatResponse =
                serde_json::from_value(json).context("unexpected chat response")?;
            parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content.unwrap_or_default().trim().to_string())
                .ok_or_else(|| anyhow::anyhow!("chat response has no choices"))
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
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
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}
