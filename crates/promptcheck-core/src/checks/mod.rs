//! Local response checks.
//!
//! These checks need nothing but the response text. Judged tests
//! (`AIResponseTest`, `NSFWResponseTest`) need a backend and are evaluated
//! by `promptcheck-runtime`; [`evaluate_local`] returns `None` for them.

pub mod format;
pub mod pattern;
pub mod size;

use crate::types::{ResponseTest, ResponseTestResult};

/// Message for tests and formats that have no implementation.
pub const NOT_IMPLEMENTED: &str = "Not implemented";

/// Pass/fail decision of a single check, before it is tied to its test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Option<String>),
}

impl Verdict {
    pub fn fail(message: impl Into<String>) -> Self {
        Verdict::Fail(Some(message.into()))
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Attach the test this verdict belongs to.
    pub fn into_result(self, test: &ResponseTest) -> ResponseTestResult {
        match self {
            Verdict::Pass => ResponseTestResult::Passed,
            Verdict::Fail(message) => ResponseTestResult::Failed {
                test: test.clone(),
                message,
            },
        }
    }
}

/// Evaluate a test that needs no backend.
///
/// Returns `None` when the test must be judged by a model.
pub fn evaluate_local(response: &str, test: &ResponseTest) -> Option<Verdict> {
    match test {
        ResponseTest::Size(t) => Some(size::check(response, t)),
        ResponseTest::Regex(t) => Some(pattern::check(response, t)),
        ResponseTest::Format(t) => Some(format::check(response, t)),
        ResponseTest::HateSpeechJudged(_) | ResponseTest::Unsupported(_) => {
            Some(Verdict::fail(NOT_IMPLEMENTED))
        }
        ResponseTest::AiJudged(_) | ResponseTest::NsfwJudged(_) => None,
    }
}
