use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::Token;
use crate::config::CompletionConfig;
use crate::error::{CommitLensError, Result};
use crate::providers::http_client;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct CompletionClient {
    client: Client,
    completions_url: Url,
    api_key: Token,
    model: String,
}

impl CompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = http_client(config.timeout)?;

        let completions_url = config
            .api_url
            .join("chat/completions")
            .map_err(|e| CommitLensError::Config(format!("Invalid completions URL: {e}")))?;

        Ok(Self {
            client,
            completions_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Send one chat completion request and return the first choice's text, if any.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        debug!("Requesting completion from {}", self.completions_url);
        let response = self
            .client
            .post(self.completions_url.clone())
            .bearer_auth(self.api_key.as_str())
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?;

        let body = response.json::<ChatCompletionResponse>().await?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content))
    }
}
