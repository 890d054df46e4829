//! Evaluation of one response against acceptance tests.
//!
//! Local tests go through [`promptcheck_core::evaluate_local`]; judged tests
//! make one JSON-mode call to the backend named in the test. Test outcomes,
//! including unimplemented tests, are data. Only backend failures and
//! malformed judge replies are errors.

use futures::future::join_all;

use promptcheck_core::{
    evaluate_local, AiJudgedTest, NsfwJudgedTest, ResponseTest, ResponseTestFailure,
    ResponseTestResult, ResponseTestsResult, Verdict,
};

use crate::prompts;
use crate::providers::LlmClient;
use crate::verdict::{parse_reply, CorrectnessVerdict, NsfwVerdict};
use crate::RuntimeError;

/// Evaluate a single test.
pub async fn evaluate_one(
    client: &dyn LlmClient,
    response: &str,
    test: &ResponseTest,
) -> Result<ResponseTestResult, RuntimeError> {
    let verdict = match evaluate_local(response, test) {
        Some(verdict) => verdict,
        None => match test {
            ResponseTest::AiJudged(t) => judge_correctness(client, response, t).await?,
            ResponseTest::NsfwJudged(t) => judge_nsfw(client, response, t).await?,
            // evaluate_local covers every other variant
            _ => Verdict::fail(promptcheck_core::NOT_IMPLEMENTED),
        },
    };
    Ok(verdict.into_result(test))
}

/// Evaluate every test concurrently and collect all failures.
///
/// Waits for every evaluation even when one errors, then reports the first
/// error in test order.
pub async fn evaluate_all(
    client: &dyn LlmClient,
    response: &str,
    tests: &[ResponseTest],
) -> Result<ResponseTestsResult, RuntimeError> {
    let outcomes = join_all(tests.iter().map(|test| evaluate_one(client, response, test))).await;

    let mut failures = Vec::new();
    for (test_index, outcome) in outcomes.into_iter().enumerate() {
        if let ResponseTestResult::Failed { test, message } = outcome? {
            failures.push(ResponseTestFailure {
                test_index,
                test,
                message,
            });
        }
    }

    Ok(ResponseTestsResult::from_failures(failures))
}

async fn judge_correctness(
    client: &dyn LlmClient,
    response: &str,
    test: &AiJudgedTest,
) -> Result<Verdict, RuntimeError> {
    let prompt = prompts::correctness_prompt(response, &test.should);
    let replies = client.execute_llm(&test.llm_type, &prompt, 1, true).await?;
    let reply: CorrectnessVerdict = parse_reply(&replies, "correctness verdict")?;
    tracing::debug!(llm = %test.llm_type, correct = reply.correct, "Correctness judged");
    Ok(reply.into())
}

async fn judge_nsfw(
    client: &dyn LlmClient,
    response: &str,
    test: &NsfwJudgedTest,
) -> Result<Verdict, RuntimeError> {
    let prompt = prompts::nsfw_prompt(response);
    let replies = client.execute_llm(&test.llm_type, &prompt, 1, true).await?;
    let reply: NsfwVerdict = parse_reply(&replies, "nsfw verdict")?;
    tracing::debug!(llm = %test.llm_type, nsfw = reply.nsfw, "NSFW judged");
    Ok(reply.into())
}
