#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::TestGenError;
use crate::chat::{ChatCompletionService, ChatEntry, ChatHistory, SamplingParams};
use crate::config::OpenAiConfig;
use crate::embeddings::{Embedding, EmbeddingService};

const API_KEY_HEADER: &str = "api-key";
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Blocking client for an Azure OpenAI resource
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    base_url: Url,
    api_key: String,
    api_version: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Embedding,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatEntry],
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl AzureOpenAiClient {
    #[inline]
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid Azure OpenAI endpoint: '{}'", config.endpoint))?;

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            agent: build_agent(config.timeout()),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    /// `{endpoint}/openai/deployments/{model}/{operation}?api-version=..`
    fn deployment_url(&self, model: &str, operation: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("Endpoint cannot be a base URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(["openai", "deployments", model])
            .extend(operation);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    fn post_json(&self, url: &Url, body: &str) -> Result<String> {
        debug!("POST {}", url.path());

        let mut response = self
            .agent
            .post(url.as_str())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header("Content-Type", "application/json")
            .send(body)
            .with_context(|| format!("Request to {} failed", url.path()))?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_body(&text)
            ));
        }

        Ok(text)
    }

    /// Embed a single chunk with an embeddings deployment
    #[inline]
    pub fn create_embedding(&self, model: &str, input: &str) -> Result<Embedding> {
        let url = self.deployment_url(model, &["embeddings"])?;
        let request_json = serde_json::to_string(&EmbeddingRequest { input: [input] })
            .context("Failed to serialize embedding request")?;

        let response_text = self
            .post_json(&url, &request_json)
            .context("Failed to generate embedding")?;

        let response: EmbeddingResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embedding response")?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow!("No embeddings returned for model '{model}'"))?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    /// Run a chat completion and return the first choice's content
    #[inline]
    pub fn create_chat_completion(
        &self,
        model: &str,
        history: &ChatHistory,
        sampling: SamplingParams,
    ) -> Result<String> {
        let url = self.deployment_url(model, &["chat", "completions"])?;
        let request = ChatCompletionRequest {
            messages: history.entries(),
            temperature: sampling.temperature,
            top_p: sampling.top_p,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        let response_text = self
            .post_json(&url, &request_json)
            .with_context(|| format!("Chat completion with model '{model}' failed"))?;

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat completion response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Chat completion with model '{model}' returned no content"))
    }
}

impl EmbeddingService for AzureOpenAiClient {
    #[inline]
    fn embed(&self, model: &str, chunk: &str) -> Result<Embedding> {
        self.create_embedding(model, chunk)
    }
}

impl ChatCompletionService for AzureOpenAiClient {
    #[inline]
    fn complete(
        &self,
        model: &str,
        history: &ChatHistory,
        sampling: SamplingParams,
    ) -> crate::Result<String> {
        self.create_chat_completion(model, history, sampling)
            .map_err(TestGenError::ChatCompletion)
    }
}

pub(crate) fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

pub(crate) fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{head}...")
}
