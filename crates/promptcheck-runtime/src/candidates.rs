//! Alternative prompt phrasings proposed by a model.

use promptcheck_core::{LlmType, ResponseTest, Variables};

use crate::prompts;
use crate::providers::LlmClient;
use crate::verdict::{parse_reply, CandidateReply};
use crate::RuntimeError;

/// Ask `llm_type` for `candidate_count` rewrites of `original_prompt`.
///
/// The candidates are returned as the model gave them; their count and
/// their use of the variables are not checked.
pub async fn propose_candidates(
    client: &dyn LlmClient,
    llm_type: &LlmType,
    original_prompt: &str,
    candidate_count: usize,
    variables: &Variables,
    tests: &[ResponseTest],
) -> Result<Vec<String>, RuntimeError> {
    let prompt = prompts::candidates_prompt(original_prompt, candidate_count, variables, tests)
        .map_err(|e| RuntimeError::InvalidArgument(format!("tests cannot be serialized: {}", e)))?;

    let replies = client.execute_llm(llm_type, &prompt, 1, true).await?;
    let reply: CandidateReply = parse_reply(&replies, "prompt candidates")?;

    if reply.prompt_candidates.len() != candidate_count {
        tracing::debug!(
            requested = candidate_count,
            received = reply.prompt_candidates.len(),
            "Model returned a different number of candidates"
        );
    }
    Ok(reply.prompt_candidates)
}
