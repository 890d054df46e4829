//! Meta-prompts sent to judging and generating models.
//!
//! Every prompt asks for a JSON object; the matching reply shapes live in
//! [`crate::verdict`].

use promptcheck_core::{ResponseTest, Variables};

/// Ask a model whether `response` satisfies `should`.
///
/// Expected reply: `{"correct": true}` or `{"correct": false, "reason": "..."}`.
pub fn correctness_prompt(response: &str, should: &str) -> String {
    format!(
        "Is this ai response correct?\n\n\
         {response}\n\n \
         it should {should}\n\n.  \
         Reply in json format with {{\"correct\": true}} or \
         {{\"correct\": false, \"reason\": \"INSERT_REASON_HERE\"}}"
    )
}

/// Ask a model whether `response` is unsafe for work.
///
/// Expected reply: `{"nsfw": false}` or `{"nsfw": true, "reason": "..."}`.
pub fn nsfw_prompt(response: &str) -> String {
    format!(
        "Please analyze the following text for NSFW content.\n\
         Determine if the text contains any material that is not safe for work or public settings, \
         such as explicit sexual content, excessive profanity, graphic violence, or other adult themes.\n\
         Text: {response}\n\
         Respond in JSON format with {{ \"nsfw\": false }} or \
         {{ \"nsfw\": true, \"reason\": \"INSERT_REASON_HERE\" }}"
    )
}

/// Ask a model for `count` rewrites of `prompt` that keep its variables
/// and aim to pass `tests`.
///
/// Expected reply: `{"promptCandidates": ["...", ...]}`.
pub fn candidates_prompt(
    prompt: &str,
    count: usize,
    variables: &Variables,
    tests: &[ResponseTest],
) -> Result<String, serde_json::Error> {
    let variables_sentence = if variables.is_empty() {
        String::new()
    } else {
        let names: Vec<String> = variables.keys().map(|name| format!("{{{}}}", name)).collect();
        format!(
            "The prompt includes the following variables: {}. \
             These variables should be present in the alternative prompts. ",
            names.join(", ")
        )
    };
    let tests_json = serde_json::to_string(tests)?;

    Ok(format!(
        "Create {count} refined prompt candidates that are highly likely to \
         consistently generate relevant and coherent responses from a large language model. \
         The original prompt is \"{prompt}\". \
         {variables_sentence}\n\n\
         The following acceptance tests were defined by the prompt author and are required \
         to pass for the prompt candidates: {tests_json}\n\n\
         respond in this JSON format {{ \"promptCandidates\" : string[] }}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptcheck_core::{RegexTest, SizeTest};

    #[test]
    fn test_correctness_prompt_embeds_response_and_criterion() {
        let prompt = correctness_prompt("function add(a, b) { return a + b }", "add two numbers");
        assert!(prompt.starts_with("Is this ai response correct?"));
        assert!(prompt.contains("function add(a, b)"));
        assert!(prompt.contains("it should add two numbers"));
        assert!(prompt.contains(r#"{"correct": true}"#));
        assert!(prompt.contains("reason"));
    }

    #[test]
    fn test_nsfw_prompt_asks_for_json() {
        let prompt = nsfw_prompt("hello there");
        assert!(prompt.contains("Text: hello there"));
        assert!(prompt.contains(r#"{ "nsfw": false }"#));
    }

    #[test]
    fn test_candidates_prompt_lists_variables_in_order() {
        let mut variables = Variables::new();
        variables.insert("topic".to_string(), "rust".to_string());
        variables.insert("audience".to_string(), "students".to_string());

        let prompt = candidates_prompt("Explain {topic} to {audience}", 3, &variables, &[]).unwrap();
        assert!(prompt.starts_with("Create 3 refined prompt candidates"));
        assert!(prompt.contains("\"Explain {topic} to {audience}\""));
        assert!(prompt.contains("following variables: {audience}, {topic}."));
        assert!(prompt.contains("promptCandidates"));
    }

    #[test]
    fn test_candidates_prompt_without_variables() {
        let tests = vec![
            ResponseTest::Size(SizeTest {
                max_words: Some(50),
                ..SizeTest::default()
            }),
            ResponseTest::Regex(RegexTest {
                pattern: "^Hi".to_string(),
            }),
        ];

        let prompt = candidates_prompt("Say hi", 2, &Variables::new(), &tests).unwrap();
        assert!(!prompt.contains("following variables"));
        assert!(prompt.contains(r#""type":"SizeResponseTest""#));
        assert!(prompt.contains(r#""maxWords":50"#));
        assert!(prompt.contains(r#""type":"RegexResponseTest""#));
    }
}
