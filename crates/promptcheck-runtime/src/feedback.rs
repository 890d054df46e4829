//! Prompt feedback: sample a prompt, test every sample, aggregate.

use chrono::Utc;
use futures::future::join_all;

use promptcheck_core::{
    aggregate_statistics, substitute, LlmType, OnePromptTestResult, PromptFeedback, ResponseTest,
    ResponseTestsResult, Variables,
};

use crate::evaluator::evaluate_all;
use crate::providers::LlmClient;
use crate::RuntimeError;

/// Substitute `variables` into `template` and request `variation_count`
/// completions.
pub async fn execute_prompt(
    client: &dyn LlmClient,
    llm_type: &LlmType,
    template: &str,
    variation_count: usize,
    variables: &Variables,
) -> Result<Vec<String>, RuntimeError> {
    let prompt = substitute(template, variables);
    client
        .execute_llm(llm_type, &prompt, variation_count, false)
        .await
}

/// Evaluate one response against a test list.
pub async fn test_response(
    client: &dyn LlmClient,
    response: &str,
    tests: &[ResponseTest],
) -> Result<ResponseTestsResult, RuntimeError> {
    evaluate_all(client, response, tests).await
}

/// Sample `template` `sample_count` times and report per-test statistics.
///
/// Every response is evaluated against every test concurrently; the
/// report is built only after all evaluations finish.
pub async fn generate_feedback(
    client: &dyn LlmClient,
    llm_type: &LlmType,
    template: &str,
    sample_count: usize,
    variables: &Variables,
    tests: &[ResponseTest],
) -> Result<PromptFeedback, RuntimeError> {
    let resolved_prompt = substitute(template, variables);
    let responses = client
        .execute_llm(llm_type, &resolved_prompt, sample_count, false)
        .await?;

    if responses.len() != sample_count {
        tracing::warn!(
            llm = %llm_type,
            requested = sample_count,
            received = responses.len(),
            "Backend returned a different number of variations"
        );
    }

    let evaluations = join_all(
        responses
            .iter()
            .map(|response| evaluate_all(client, response, tests)),
    )
    .await;

    let raw_results = responses
        .into_iter()
        .zip(evaluations)
        .map(|(response, results)| -> Result<OnePromptTestResult, RuntimeError> {
            Ok(OnePromptTestResult {
                prompt: template.to_string(),
                response,
                results: results?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let statistics = aggregate_statistics(tests, &raw_results);
    tracing::info!(
        llm = %llm_type,
        responses = raw_results.len(),
        tests = tests.len(),
        all_passed = raw_results.iter().all(|r| r.results.is_pass()),
        "Prompt feedback generated"
    );

    Ok(PromptFeedback {
        prompt: template.to_string(),
        resolved_prompt,
        result_variations: sample_count,
        raw_results,
        statistics,
        generated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use promptcheck_core::{AiJudgedTest, FormatTest, RegexTest, ResponseFormat, SizeTest};

    fn model() -> LlmType {
        LlmType::new("openAI", "gpt-4o-mini")
    }

    fn say_hi_client() -> ScriptedClient {
        ScriptedClient::new().on("Say hi", &["hi", "hi there", "hello there friend"])
    }

    fn regex(pattern: &str) -> ResponseTest {
        ResponseTest::Regex(RegexTest {
            pattern: pattern.to_string(),
        })
    }

    #[tokio::test]
    async fn test_say_hi_size_scenario() {
        let client = say_hi_client();
        let tests = vec![ResponseTest::Size(SizeTest {
            min_words: Some(1),
            max_words: Some(5),
            ..SizeTest::default()
        })];

        let feedback = generate_feedback(&client, &model(), "Say hi", 3, &Variables::new(), &tests)
            .await
            .unwrap();

        assert_eq!(feedback.result_variations, 3);
        assert_eq!(feedback.raw_results.len(), 3);
        let stats = &feedback.statistics[0];
        assert_eq!((stats.passed, stats.failed, stats.total), (3, 0, 3));
        assert!(feedback.all_passed());
    }

    #[tokio::test]
    async fn test_statistics_per_test() {
        let client = say_hi_client();
        let tests = vec![
            regex("there"),
            ResponseTest::Format(FormatTest {
                expected_format: ResponseFormat::Html,
            }),
        ];

        let feedback = generate_feedback(&client, &model(), "Say hi", 3, &Variables::new(), &tests)
            .await
            .unwrap();

        let counts: Vec<(usize, usize)> = feedback
            .statistics
            .iter()
            .map(|s| (s.passed, s.failed))
            .collect();
        assert_eq!(counts, vec![(2, 1), (0, 3)]);
        assert_eq!(feedback.pass_rate(1), Some(0.0));
        assert!(!feedback.all_passed());
    }

    #[tokio::test]
    async fn test_duplicate_tests_are_counted_independently() {
        let client = say_hi_client();
        let tests = vec![regex("there"), regex("there")];

        let feedback = generate_feedback(&client, &model(), "Say hi", 3, &Variables::new(), &tests)
            .await
            .unwrap();

        for stats in &feedback.statistics {
            assert_eq!((stats.passed, stats.failed), (2, 1));
        }
    }

    #[tokio::test]
    async fn test_variables_are_substituted() {
        let client = ScriptedClient::new().on("Greet World", &["Hello World"]);
        let mut variables = Variables::new();
        variables.insert("name".to_string(), "World".to_string());

        let feedback = generate_feedback(&client, &model(), "Greet {name}", 1, &variables, &[])
            .await
            .unwrap();

        assert_eq!(feedback.prompt, "Greet {name}");
        assert_eq!(feedback.resolved_prompt, "Greet World");
        assert_eq!(feedback.raw_results[0].prompt, "Greet {name}");
        assert_eq!(client.recorded_prompts(), vec!["Greet World"]);
    }

    #[tokio::test]
    async fn test_judged_tests_inside_feedback() {
        let client = ScriptedClient::new()
            .on("be a greeting", &[r#"{"correct": true}"#])
            .on("Say hi", &["hi", "hi there", "hello there friend"]);
        let tests = vec![
            ResponseTest::AiJudged(AiJudgedTest {
                llm_type: model(),
                should: "be a greeting".to_string(),
            }),
            ResponseTest::Size(SizeTest {
                max_words: Some(2),
                ..SizeTest::default()
            }),
        ];

        let feedback = generate_feedback(&client, &model(), "Say hi", 3, &Variables::new(), &tests)
            .await
            .unwrap();

        assert_eq!(feedback.statistics[0].passed, 3);
        assert_eq!(feedback.statistics[1].failed, 1);
        // One sampling call plus one judge call per response
        assert_eq!(client.recorded_prompts().len(), 4);
    }

    #[tokio::test]
    async fn test_execute_prompt_returns_raw_variations() {
        let client = say_hi_client();
        let responses = execute_prompt(&client, &model(), "Say hi", 2, &Variables::new())
            .await
            .unwrap();
        assert_eq!(responses, vec!["hi", "hi there"]);
    }

    #[tokio::test]
    async fn test_test_response() {
        let client = ScriptedClient::new();
        let result = test_response(&client, "hi there", &[regex("^hi"), regex("bye")])
            .await
            .unwrap();
        assert_eq!(result.failures().len(), 1);
        assert_eq!(result.failures()[0].test_index, 1);
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let client = ScriptedClient::new();
        let result = generate_feedback(&client, &model(), "Say hi", 3, &Variables::new(), &[]).await;
        assert!(matches!(result, Err(RuntimeError::Provider(_))));
    }
}
