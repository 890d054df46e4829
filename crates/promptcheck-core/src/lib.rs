//! # promptcheck-core
//!
//! Deterministic model for prompt testing.
//!
//! This crate holds everything about prompt testing that needs no network:
//! - The test specification types authors write suites against
//! - Local checks (size bounds, regex, format validators)
//! - Template variable substitution
//! - Per-test statistics across sampled responses
//! - Embedding similarity for stability scores
//!
//! Tests judged by a model (`AIResponseTest`, `NSFWResponseTest`) are
//! dispatched by `promptcheck-runtime`, which calls back into
//! [`checks::evaluate_local`] for everything else.
//!
//! ## Example
//!
//! ```rust
//! use promptcheck_core::{checks, RegexTest, ResponseTest};
//!
//! let test = ResponseTest::Regex(RegexTest { pattern: "^Error".to_string() });
//! let verdict = checks::evaluate_local("Error: bad input", &test).unwrap();
//! assert!(verdict.is_pass());
//! ```

pub mod checks;
pub mod similarity;
pub mod stats;
pub mod suite;
pub mod template;
pub mod types;

pub use checks::{evaluate_local, Verdict, NOT_IMPLEMENTED};
pub use similarity::{cosine_similarity, mean_pairwise_similarity};
pub use stats::aggregate_statistics;
pub use suite::{SuiteError, TestSuite};
pub use template::{
    check_variable_name, extract_variables, substitute, substitute_strict, TemplateError,
};
pub use types::{
    AiJudgedTest, FormatTest, HateSpeechJudgedTest, LlmType, NsfwJudgedTest, OnePromptTestResult,
    PromptFeedback, RegexTest, ResponseFormat, ResponseTest, ResponseTestFailure,
    ResponseTestResult, ResponseTestStatistics, ResponseTestsResult, SizeTest, UnknownTest,
    Variables,
};
