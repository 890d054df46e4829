//! Prompt stability as mean pairwise embedding similarity.
//!
//! The score is the mean cosine similarity over every distinct pair of
//! sampled responses, in [-1, 1]. Higher means the prompt yields more
//! consistent answers.

use futures::future::join_all;

use promptcheck_core::{mean_pairwise_similarity, substitute, LlmType, Variables};

use crate::providers::LlmClient;
use crate::RuntimeError;

/// Sample `template` `sample_count` times with `llm_type`, embed every
/// response with `embedding_llm_type`, and score their similarity.
pub async fn calculate_stability(
    client: &dyn LlmClient,
    llm_type: &LlmType,
    embedding_llm_type: &LlmType,
    template: &str,
    sample_count: usize,
    variables: &Variables,
) -> Result<f64, RuntimeError> {
    if sample_count < 2 {
        return Err(RuntimeError::InvalidArgument(format!(
            "stability needs at least 2 samples, got {}",
            sample_count
        )));
    }

    let prompt = substitute(template, variables);
    let responses = client
        .execute_llm(llm_type, &prompt, sample_count, false)
        .await?;

    if responses.len() < 2 {
        return Err(RuntimeError::InvalidArgument(format!(
            "stability needs at least 2 responses, backend returned {}",
            responses.len()
        )));
    }

    let embeddings = join_all(
        responses
            .iter()
            .map(|response| client.generate_embedding(embedding_llm_type, response, None)),
    )
    .await
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;

    let score = mean_pairwise_similarity(&embeddings).ok_or_else(|| {
        RuntimeError::InvalidArgument("stability needs at least 2 embeddings".to_string())
    })?;

    tracing::info!(
        llm = %llm_type,
        embedding = %embedding_llm_type,
        samples = embeddings.len(),
        score,
        "Stability calculated"
    );
    Ok(score)
}
