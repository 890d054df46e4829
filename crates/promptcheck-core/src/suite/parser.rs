//! Suite parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::template;
use crate::types::{ResponseTest, Variables};

use super::schema::validate_suite_schema;

/// Errors that can occur when loading suites.
#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Failed to read suite file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Suite does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Suite validation failed: {0}")]
    ValidationError(String),
}

/// A prompt template with its variables and acceptance tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Prompt template with `{name}` placeholders
    pub prompt: String,

    #[serde(default)]
    pub variables: Variables,

    #[serde(default)]
    pub tests: Vec<ResponseTest>,
}

impl TestSuite {
    /// Build a suite in code.
    pub fn new(prompt: impl Into<String>, variables: Variables, tests: Vec<ResponseTest>) -> Self {
        Self {
            name: None,
            description: None,
            prompt: prompt.into(),
            variables,
            tests,
        }
    }

    /// Parse a suite from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SuiteError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a suite from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SuiteError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a suite file; `.json` files are JSON, everything else YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self, SuiteError> {
        validate_suite_schema(&value).map_err(SuiteError::SchemaError)?;
        let suite: TestSuite = serde_json::from_value(value)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Semantic checks the schema cannot express.
    fn validate(&self) -> Result<(), SuiteError> {
        if self.prompt.trim().is_empty() {
            return Err(SuiteError::ValidationError("prompt is empty".to_string()));
        }

        for name in self.variables.keys() {
            template::check_variable_name(name)
                .map_err(|e| SuiteError::ValidationError(e.to_string()))?;
        }

        for (index, test) in self.tests.iter().enumerate() {
            match test {
                ResponseTest::Size(t) => {
                    if let (Some(min), Some(max)) = (t.min_words, t.max_words) {
                        if min > max {
                            return Err(SuiteError::ValidationError(format!(
                                "tests[{}]: minWords {} exceeds maxWords {}",
                                index, min, max
                            )));
                        }
                    }
                    if let (Some(min), Some(max)) = (t.min_chars, t.max_chars) {
                        if min > max {
                            return Err(SuiteError::ValidationError(format!(
                                "tests[{}]: minChars {} exceeds maxChars {}",
                                index, min, max
                            )));
                        }
                    }
                }
                ResponseTest::Regex(t) => {
                    regex::Regex::new(&t.pattern).map_err(|e| {
                        SuiteError::ValidationError(format!("tests[{}]: {}", index, e))
                    })?;
                }
                ResponseTest::Unsupported(t) => {
                    tracing::warn!(index, kind = %t.kind, "Suite contains an unsupported test type; it will always fail");
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Placeholders in the prompt that have no binding.
    pub fn unbound_variables(&self) -> Vec<String> {
        template::extract_variables(&self.prompt)
            .into_iter()
            .filter(|name| !self.variables.contains_key(name))
            .collect()
    }

    /// Tests that need a backend round-trip.
    pub fn judged_tests(&self) -> impl Iterator<Item = &ResponseTest> {
        self.tests.iter().filter(|t| t.requires_llm())
    }

    /// The prompt after lenient substitution.
    pub fn resolved_prompt(&self) -> String {
        template::substitute(&self.prompt, &self.variables)
    }
}
