//! Language-model analysis
//!
//! An optional, best-effort stage: the orchestrator hands extracted text to an
//! [`Analyzer`] and attaches the JSON report it returns. Failures are reported as
//! [`AnalysisError`] and never abort a scrape.

mod llm;
mod prompt;

pub use llm::LlmAnalyzer;
pub use prompt::{
    build_system_prompt, build_user_prompt, estimate_tokens, fit_to_budget, required_keys,
    truncate_to_tokens, DEFAULT_SYSTEM_PROMPT,
};

use crate::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured analysis returned by the model
///
/// The fields are whatever the configured schema asked for; the report only
/// guarantees it is a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisReport(Map<String, Value>);

impl AnalysisReport {
    /// Wraps a JSON value, rejecting anything but an object
    pub fn from_value(value: Value) -> Result<Self, AnalysisError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AnalysisError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Something that can turn prompts into an analysis report
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<AnalysisReport, AnalysisError>;
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
