use async_trait::async_trait;
use serde_json::{Value, json};
use crate::actions::{ExecutionRequest, Executor};
use crate::config::ExecutionConfig;
use crate::error::ExecutionError;
use std::fmt;
use std::time::Duration;
use reqwest::Client;
use tracing::{debug, error};

/// Sends the document to an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionExecutor {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatCompletionExecutor {
    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Build from config, reading the key from `config.api_key_env`.
    pub fn from_config(config: &ExecutionConfig) -> Result<Self, ExecutionError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExecutionError::MissingApiKey(config.api_key_env.clone()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExecutionError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    pub fn body(&self, request: &ExecutionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_instruction },
                { "role": "user", "content": request.document }
            ]
        })
    }
}

impl fmt::Debug for ChatCompletionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionExecutor")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// `error.message` from an API error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl Executor for ChatCompletionExecutor {
    fn name(&self) -> &str {
        "chat-completion"
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<String, ExecutionError> {
        let url = self.url();
        debug!(%url, model = %self.model, "Sending compiled document");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.body(&request))
            .send()
            .await
            .map_err(|e| ExecutionError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExecutionError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&text);
            error!(status = status.as_u16(), %message, "Execution failed");
            return Err(ExecutionError::Failed {
                status: status.as_u16(),
                message,
            });
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ExecutionError::Request(format!("Invalid response body: {}", e)))?;

        data["choices"][0]["message"]["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or(ExecutionError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint_without_double_slash() {
        let exec = ChatCompletionExecutor::new("https://api.example.com/v1/", "m", "k");
        assert_eq!(exec.url(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn body_puts_system_before_document() {
        let exec = ChatCompletionExecutor::new("https://api.example.com/v1", "gpt-test", "k");
        let body = exec.body(&ExecutionRequest::new("Be brief.", "Hello World"));
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be brief.");
        assert_eq!(body["messages"][1]["content"], "Hello World");
    }

    #[test]
    fn error_message_prefers_api_error_field() {
        assert_eq!(error_message(r#"{"error":{"message":"bad key"}}"#), "bad key");
        assert_eq!(error_message("  gateway timeout "), "gateway timeout");
    }
}
