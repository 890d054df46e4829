//! Core types for promptcheck.
//!
//! Test specifications are the primary authoring surface: a suite is a list
//! of [`ResponseTest`] values, serialized with an explicit `type` tag.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Variable bindings for a prompt template.
///
/// BTreeMap keeps iteration (and therefore generated meta-prompts) stable.
pub type Variables = BTreeMap<String, String>;

/// Identifies a backend: a provider plus one of its models.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LlmType {
    /// Provider identifier used for registry lookup (e.g., "openAI")
    pub provider: String,

    /// Model name passed through to the provider (e.g., "gpt-4o-mini")
    pub model: String,
}

impl LlmType {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl FromStr for LlmType {
    type Err = String;

    /// Parse `provider/model`. Everything after the first `/` is the model.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok(Self::new(provider, model))
            }
            _ => Err(format!("expected 'provider/model', got '{}'", s)),
        }
    }
}

/// Formats a [`FormatTest`] can ask for.
///
/// Unknown format names are kept as [`ResponseFormat::Other`] so that a
/// suite naming them still loads; such tests always fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseFormat {
    Text,
    Json,
    Html,
    Csv,
    JavaScript,
    TypeScript,
    Python,
    Other(String),
}

impl ResponseFormat {
    pub fn as_str(&self) -> &str {
        match self {
            ResponseFormat::Text => "text",
            ResponseFormat::Json => "json",
            ResponseFormat::Html => "html",
            ResponseFormat::Csv => "csv",
            ResponseFormat::JavaScript => "javascript",
            ResponseFormat::TypeScript => "typescript",
            ResponseFormat::Python => "python",
            ResponseFormat::Other(name) => name,
        }
    }
}

impl From<String> for ResponseFormat {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => ResponseFormat::Text,
            "json" => ResponseFormat::Json,
            "html" => ResponseFormat::Html,
            "csv" => ResponseFormat::Csv,
            "javascript" => ResponseFormat::JavaScript,
            "typescript" => ResponseFormat::TypeScript,
            "python" => ResponseFormat::Python,
            _ => ResponseFormat::Other(value),
        }
    }
}

impl From<ResponseFormat> for String {
    fn from(value: ResponseFormat) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Word and character bounds. Omitted bounds impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeTest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_chars: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_words: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_words: Option<usize>,
}

/// Passes when the pattern matches anywhere in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexTest {
    #[serde(alias = "regex")]
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatTest {
    pub expected_format: ResponseFormat,
}

/// A model judges the response against a natural-language criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiJudgedTest {
    pub llm_type: LlmType,

    /// What the response should do, e.g. "be javascript code to add two numbers"
    pub should: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NsfwJudgedTest {
    pub llm_type: LlmType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HateSpeechJudgedTest {
    pub llm_type: LlmType,
}

/// One acceptance test applied to a response.
///
/// Serialized internally tagged on `type`. A tag this version does not know
/// becomes [`ResponseTest::Unsupported`] holding the document as written,
/// so it serializes back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseTest {
    Size(SizeTest),
    Regex(RegexTest),
    Format(FormatTest),
    AiJudged(AiJudgedTest),
    NsfwJudged(NsfwJudgedTest),
    HateSpeechJudged(HateSpeechJudgedTest),

    /// Always fails.
    Unsupported(UnknownTest),
}

/// A test whose `type` tag is not recognised.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownTest {
    pub kind: String,
    pub raw: JsonValue,
}

const KNOWN_TAGS: [&str; 6] = [
    "SizeResponseTest",
    "RegexResponseTest",
    "FormatResponseTest",
    "AIResponseTest",
    "NSFWResponseTest",
    "HateSpeechResponseTest",
];

#[derive(Deserialize)]
#[serde(tag = "type")]
enum TaggedTest {
    #[serde(rename = "SizeResponseTest")]
    Size(SizeTest),
    #[serde(rename = "RegexResponseTest")]
    Regex(RegexTest),
    #[serde(rename = "FormatResponseTest")]
    Format(FormatTest),
    #[serde(rename = "AIResponseTest")]
    AiJudged(AiJudgedTest),
    #[serde(rename = "NSFWResponseTest")]
    NsfwJudged(NsfwJudgedTest),
    #[serde(rename = "HateSpeechResponseTest")]
    HateSpeechJudged(HateSpeechJudgedTest),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum TaggedTestRef<'a> {
    #[serde(rename = "SizeResponseTest")]
    Size(&'a SizeTest),
    #[serde(rename = "RegexResponseTest")]
    Regex(&'a RegexTest),
    #[serde(rename = "FormatResponseTest")]
    Format(&'a FormatTest),
    #[serde(rename = "AIResponseTest")]
    AiJudged(&'a AiJudgedTest),
    #[serde(rename = "NSFWResponseTest")]
    NsfwJudged(&'a NsfwJudgedTest),
    #[serde(rename = "HateSpeechResponseTest")]
    HateSpeechJudged(&'a HateSpeechJudgedTest),
}

impl From<TaggedTest> for ResponseTest {
    fn from(test: TaggedTest) -> Self {
        match test {
            TaggedTest::Size(t) => ResponseTest::Size(t),
            TaggedTest::Regex(t) => ResponseTest::Regex(t),
            TaggedTest::Format(t) => ResponseTest::Format(t),
            TaggedTest::AiJudged(t) => ResponseTest::AiJudged(t),
            TaggedTest::NsfwJudged(t) => ResponseTest::NsfwJudged(t),
            TaggedTest::HateSpeechJudged(t) => ResponseTest::HateSpeechJudged(t),
        }
    }
}

impl Serialize for ResponseTest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged = match self {
            ResponseTest::Size(t) => TaggedTestRef::Size(t),
            ResponseTest::Regex(t) => TaggedTestRef::Regex(t),
            ResponseTest::Format(t) => TaggedTestRef::Format(t),
            ResponseTest::AiJudged(t) => TaggedTestRef::AiJudged(t),
            ResponseTest::NsfwJudged(t) => TaggedTestRef::NsfwJudged(t),
            ResponseTest::HateSpeechJudged(t) => TaggedTestRef::HateSpeechJudged(t),
            ResponseTest::Unsupported(t) => return t.raw.serialize(serializer),
        };
        tagged.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResponseTest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(deserializer)?;
        let kind = match raw.get("type").and_then(JsonValue::as_str) {
            Some(kind) => kind.to_string(),
            None => return Err(de::Error::missing_field("type")),
        };

        if KNOWN_TAGS.contains(&kind.as_str()) {
            serde_json::from_value::<TaggedTest>(raw)
                .map(ResponseTest::from)
                .map_err(de::Error::custom)
        } else {
            Ok(ResponseTest::Unsupported(UnknownTest { kind, raw }))
        }
    }
}

impl ResponseTest {
    /// An unrecognised test carrying only its tag.
    pub fn unsupported(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        let raw = serde_json::json!({ "type": kind });
        ResponseTest::Unsupported(UnknownTest { kind, raw })
    }

    /// The serialized tag of this test.
    pub fn kind(&self) -> &str {
        match self {
            ResponseTest::Size(_) => "SizeResponseTest",
            ResponseTest::Regex(_) => "RegexResponseTest",
            ResponseTest::Format(_) => "FormatResponseTest",
            ResponseTest::AiJudged(_) => "AIResponseTest",
            ResponseTest::NsfwJudged(_) => "NSFWResponseTest",
            ResponseTest::HateSpeechJudged(_) => "HateSpeechResponseTest",
            ResponseTest::Unsupported(t) => &t.kind,
        }
    }

    /// Whether evaluating this test needs a backend round-trip.
    pub fn requires_llm(&self) -> bool {
        matches!(
            self,
            ResponseTest::AiJudged(_) | ResponseTest::NsfwJudged(_)
        )
    }

    /// The judging backend, for variants that name one.
    pub fn llm_type(&self) -> Option<&LlmType> {
        match self {
            ResponseTest::AiJudged(t) => Some(&t.llm_type),
            ResponseTest::NsfwJudged(t) => Some(&t.llm_type),
            ResponseTest::HateSpeechJudged(t) => Some(&t.llm_type),
            _ => None,
        }
    }
}

/// Outcome of one test against one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseTestResult {
    Passed,
    Failed {
        test: ResponseTest,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl ResponseTestResult {
    pub fn failed(test: ResponseTest, message: impl Into<String>) -> Self {
        ResponseTestResult::Failed {
            test,
            message: Some(message.into()),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, ResponseTestResult::Passed)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ResponseTestResult::Passed => None,
            ResponseTestResult::Failed { message, .. } => message.as_deref(),
        }
    }
}

/// A failed test within a list, with its position in that list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTestFailure {
    pub test_index: usize,
    pub test: ResponseTest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of a whole test list against one response.
///
/// `SomeFailed` always carries at least one failure; build it through
/// [`ResponseTestsResult::from_failures`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseTestsResult {
    AllPassed,
    SomeFailed { failures: Vec<ResponseTestFailure> },
}

impl ResponseTestsResult {
    pub fn from_failures(failures: Vec<ResponseTestFailure>) -> Self {
        if failures.is_empty() {
            ResponseTestsResult::AllPassed
        } else {
            ResponseTestsResult::SomeFailed { failures }
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, ResponseTestsResult::AllPassed)
    }

    pub fn failures(&self) -> &[ResponseTestFailure] {
        match self {
            ResponseTestsResult::AllPassed => &[],
            ResponseTestsResult::SomeFailed { failures } => failures,
        }
    }

    /// Whether the test at `test_index` counts as passed for this response.
    pub fn passed_test(&self, test_index: usize) -> bool {
        !self.failures().iter().any(|f| f.test_index == test_index)
    }
}

/// Test results for one sampled response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnePromptTestResult {
    pub prompt: String,
    pub response: String,
    pub results: ResponseTestsResult,
}

/// Pass/fail counts for one test across all sampled responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTestStatistics {
    pub test: ResponseTest,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl ResponseTestStatistics {
    /// Fraction of responses that passed, 0.0 when nothing was sampled.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

/// Aggregated feedback for a prompt across repeated executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptFeedback {
    /// The template as supplied
    pub prompt: String,

    /// The template after variable substitution
    pub resolved_prompt: String,

    /// Number of variations requested from the backend
    pub result_variations: usize,

    pub raw_results: Vec<OnePromptTestResult>,

    /// One entry per test, in suite order
    pub statistics: Vec<ResponseTestStatistics>,

    pub generated_at: DateTime<Utc>,
}

impl PromptFeedback {
    /// Pass rate of the test at `test_index`, if there is one.
    pub fn pass_rate(&self, test_index: usize) -> Option<f64> {
        self.statistics.get(test_index).map(|s| s.pass_rate())
    }

    /// Whether every sampled response passed every test.
    pub fn all_passed(&self) -> bool {
        self.raw_results.iter().all(|r| r.results.is_pass())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_type_parse_and_display() {
        let llm: LlmType = "openAI/gpt-4o-mini".parse().unwrap();
        assert_eq!(llm, LlmType::new("openAI", "gpt-4o-mini"));
        assert_eq!(llm.to_string(), "openAI/gpt-4o-mini");

        let nested: LlmType = "local/org/model".parse().unwrap();
        assert_eq!(nested.model, "org/model");

        assert!("no-slash".parse::<LlmType>().is_err());
        assert!("/model".parse::<LlmType>().is_err());
    }

    #[test]
    fn test_size_test_deserializes_camel_case() {
        let test: ResponseTest = serde_json::from_value(serde_json::json!({
            "type": "SizeResponseTest",
            "minWords": 1,
            "maxWords": 5
        }))
        .unwrap();

        assert_eq!(
            test,
            ResponseTest::Size(SizeTest {
                min_words: Some(1),
                max_words: Some(5),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_regex_accepts_legacy_field_name() {
        let test: ResponseTest =
            serde_json::from_str(r#"{"type": "RegexResponseTest", "regex": "^Error"}"#).unwrap();
        assert_eq!(
            test,
            ResponseTest::Regex(RegexTest {
                pattern: "^Error".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let test: ResponseTest =
            serde_json::from_str(r#"{"type": "SentimentResponseTest"}"#).unwrap();
        assert_eq!(test, ResponseTest::unsupported("SentimentResponseTest"));
        assert_eq!(test.kind(), "SentimentResponseTest");
    }

    #[test]
    fn test_unknown_test_serializes_as_written() {
        let written = serde_json::json!({
            "type": "SentimentResponseTest",
            "expected": "positive",
            "threshold": 0.8
        });
        let test: ResponseTest = serde_json::from_value(written.clone()).unwrap();
        assert_eq!(test.kind(), "SentimentResponseTest");
        assert_eq!(serde_json::to_value(&test).unwrap(), written);
    }

    #[test]
    fn test_missing_tag_is_an_error() {
        assert!(serde_json::from_str::<ResponseTest>(r#"{"pattern": "x"}"#).is_err());
    }

    #[test]
    fn test_known_tag_with_bad_fields_is_an_error() {
        assert!(serde_json::from_str::<ResponseTest>(r#"{"type": "RegexResponseTest"}"#).is_err());
    }

    #[test]
    fn test_unknown_format_is_kept() {
        let test: ResponseTest = serde_json::from_str(
            r#"{"type": "FormatResponseTest", "expectedFormat": "yaml"}"#,
        )
        .unwrap();
        match test {
            ResponseTest::Format(f) => {
                assert_eq!(f.expected_format, ResponseFormat::Other("yaml".to_string()));
                assert_eq!(f.expected_format.to_string(), "yaml");
            }
            other => panic!("Expected format test, got {:?}", other),
        }
    }

    #[test]
    fn test_judged_test_roundtrip_keeps_tag() {
        let test = ResponseTest::AiJudged(AiJudgedTest {
            llm_type: LlmType::new("openAI", "gpt-4o-mini"),
            should: "greet the user".to_string(),
        });
        let json = serde_json::to_value(&test).unwrap();
        assert_eq!(json["type"], "AIResponseTest");
        assert_eq!(json["llmType"]["provider"], "openAI");
        assert!(test.requires_llm());
    }

    #[test]
    fn test_tests_result_from_failures() {
        assert!(ResponseTestsResult::from_failures(vec![]).is_pass());

        let result = ResponseTestsResult::from_failures(vec![ResponseTestFailure {
            test_index: 1,
            test: ResponseTest::unsupported("SentimentResponseTest"),
            message: Some("Not implemented".to_string()),
        }]);
        assert!(!result.is_pass());
        assert!(result.passed_test(0));
        assert!(!result.passed_test(1));
    }

    #[test]
    fn test_statistics_pass_rate() {
        let stats = ResponseTestStatistics {
            test: ResponseTest::unsupported("SentimentResponseTest"),
            passed: 3,
            failed: 1,
            total: 4,
        };
        assert_eq!(stats.pass_rate(), 0.75);
    }
}
