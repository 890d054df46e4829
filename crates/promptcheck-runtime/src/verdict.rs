//! Parsing of structured model replies.
//!
//! Judges and generators are asked for one JSON variation. A reply that is
//! missing or is not the expected JSON is a [`RuntimeError::Parse`]; it is
//! never coerced into a passing or failing verdict.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use promptcheck_core::Verdict;

use crate::RuntimeError;

/// Reply to [`crate::prompts::correctness_prompt`].
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectnessVerdict {
    /// Missing means not correct
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<CorrectnessVerdict> for Verdict {
    fn from(reply: CorrectnessVerdict) -> Self {
        if reply.correct {
            Verdict::Pass
        } else {
            Verdict::Fail(reply.reason)
        }
    }
}

/// Reply to [`crate::prompts::nsfw_prompt`].
#[derive(Debug, Clone, Deserialize)]
pub struct NsfwVerdict {
    /// Missing means safe
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<NsfwVerdict> for Verdict {
    fn from(reply: NsfwVerdict) -> Self {
        if reply.nsfw {
            Verdict::Fail(reply.reason)
        } else {
            Verdict::Pass
        }
    }
}

/// Reply to [`crate::prompts::candidates_prompt`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateReply {
    pub prompt_candidates: Vec<String>,
}

/// Parse the first variation of a reply as `T`.
pub fn parse_reply<T: DeserializeOwned>(replies: &[String], what: &str) -> Result<T, RuntimeError> {
    let first = replies
        .first()
        .ok_or_else(|| RuntimeError::Parse(format!("{}: backend returned no variations", what)))?;

    serde_json::from_str(first).map_err(|e| {
        tracing::warn!(what, error = %e, "Model reply is not the expected JSON");
        RuntimeError::Parse(format!("{}: {}", what, e))
    })
}
