//! OpenAI-compatible chat completions client

use super::prompt::{fit_to_budget, required_keys};
use super::{json_kind, AnalysisReport, Analyzer};
use crate::config::AnalysisConfig;
use crate::AnalysisError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// How much of an upstream error body is kept in the error message
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Analyzer backed by a `POST {base}/chat/completions` endpoint
///
/// Requests JSON mode (`response_format: json_object`) and requires the
/// assistant message to be a JSON object carrying every key the configured
/// schema marks as required.
pub struct LlmAnalyzer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    config: AnalysisConfig,
    required: Vec<String>,
}

impl LlmAnalyzer {
    /// Creates an analyzer from configuration
    ///
    /// The API key is read from the environment variable named by `api-key-env`.
    /// A missing key is not an error here; [`Analyzer::analyze`] reports it.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        let required = match config.schema.as_deref() {
            Some(schema) => {
                let schema: Value = serde_json::from_str(schema)
                    .map_err(|e| AnalysisError::Malformed(format!("invalid schema: {}", e)))?;
                required_keys(&schema)
            }
            None => Vec::new(),
        };

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.api_base_url.trim_end_matches('/')
            ),
            api_key,
            config: config.clone(),
            required,
        })
    }

    /// Overrides the API key taken from the environment
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(
        &self,
        api_key: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        let request_body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "response_format": { "type": "json_object" },
            "max_tokens": self.config.max_output_tokens,
            "temperature": self.config.temperature
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(AnalysisError::Upstream {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let envelope: Value = serde_json::from_str(&body)
            .map_err(|e| AnalysisError::Malformed(format!("response is not JSON: {}", e)))?;

        if let Some(usage) = envelope.get("usage") {
            tracing::debug!(
                "Analysis token usage: prompt={} completion={}",
                usage["prompt_tokens"].as_u64().unwrap_or(0),
                usage["completion_tokens"].as_u64().unwrap_or(0)
            );
        }

        let content = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AnalysisError::Malformed("no message content in response".to_string()))?;

        parse_report(content, &self.required)
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    async fn analyze(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AnalysisError::MissingApiKey {
                env_var: self.config.api_key_env.clone(),
            })?;

        let user_prompt = fit_to_budget(system_prompt, user_prompt, self.config.max_input_tokens);
        let seconds = self.config.timeout_secs;

        tracing::debug!("Requesting analysis from {} ({})", self.endpoint, self.config.model);

        tokio::time::timeout(
            Duration::from_secs(seconds),
            self.complete(api_key, system_prompt, user_prompt),
        )
        .await
        .map_err(|_| AnalysisError::Timeout { seconds })?
    }
}

/// Parses the assistant message strictly as a JSON object with the required keys
fn parse_report(content: &str, required: &[String]) -> Result<AnalysisReport, AnalysisError> {
    let value: Value = serde_json::from_str(content.trim()).map_err(|e| {
        AnalysisError::Malformed(format!("message content is not valid JSON: {}", e))
    })?;

    if !value.is_object() {
        return Err(AnalysisError::Malformed(format!(
            "message content is {}, expected an object",
            json_kind(&value)
        )));
    }

    let missing: Vec<&str> = required
        .iter()
        .filter(|key| value.get(key.as_str()).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::Malformed(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    }

    AnalysisReport::from_value(value)
}
