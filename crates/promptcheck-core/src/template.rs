//! Prompt template variables.
//!
//! Any bound variable whose name holds no braces is substituted wherever
//! `{name}` appears. Unbound placeholders are only *reported* when the name
//! starts with a letter or `_` and continues with letters, digits, `_`, `-`
//! or `.`, so JSON such as `{"a": 1}` in a prompt is not mistaken for one.
//! Substitution is a single pass: substituted values are never re-scanned.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::types::Variables;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.\-]*)\}").unwrap();
    static ref BRACED: Regex = Regex::new(r"\{([^{}]+)\}").unwrap();
}

/// Errors from strict substitution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unresolved template variables: {}", .0.join(", "))]
    UnresolvedVariables(Vec<String>),

    #[error("Invalid variable name '{0}': names must be non-empty and contain no braces")]
    InvalidVariableName(String),
}

/// A name can be bound only if `{name}` can appear in a template.
pub fn check_variable_name(name: &str) -> Result<(), TemplateError> {
    if name.is_empty() || name.contains(['{', '}']) {
        return Err(TemplateError::InvalidVariableName(name.to_string()));
    }
    Ok(())
}

/// Replace every bound `{name}`. Unbound placeholders are left verbatim.
pub fn substitute(template: &str, variables: &Variables) -> String {
    BRACED
        .replace_all(template, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Like [`substitute`], but any unbound placeholder is an error.
pub fn substitute_strict(template: &str, variables: &Variables) -> Result<String, TemplateError> {
    let missing: Vec<String> = extract_variables(template)
        .into_iter()
        .filter(|name| !variables.contains_key(name))
        .collect();

    if !missing.is_empty() {
        return Err(TemplateError::UnresolvedVariables(missing));
    }

    Ok(substitute(template, variables))
}

/// Placeholder names in first-seen order, without duplicates.
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_every_occurrence() {
        let out = substitute("{a} and {a} then {b}", &vars(&[("a", "x"), ("b", "y")]));
        assert_eq!(out, "x and x then y");
    }

    #[test]
    fn test_unbound_placeholders_left_verbatim() {
        let out = substitute("Rewrite {post} for {audience}", &vars(&[("post", "hello")]));
        assert_eq!(out, "Rewrite hello for {audience}");
    }

    #[test]
    fn test_any_bound_name_is_substituted() {
        let out = substitute(
            "Hi {user name}, the {1st} step",
            &vars(&[("user name", "Ada"), ("1st", "first")]),
        );
        assert_eq!(out, "Hi Ada, the first step");
    }

    #[test]
    fn test_json_braces_survive_substitution() {
        let out = substitute(r#"{"greeting": "{word}"}"#, &vars(&[("word", "hi")]));
        assert_eq!(out, r#"{"greeting": "hi"}"#);
    }

    #[test]
    fn test_check_variable_name() {
        assert!(check_variable_name("user name").is_ok());
        assert!(check_variable_name("1st").is_ok());
        assert_eq!(
            check_variable_name("a{b}"),
            Err(TemplateError::InvalidVariableName("a{b}".to_string()))
        );
        assert!(check_variable_name("").is_err());
    }

    #[test]
    fn test_single_pass() {
        let out = substitute("{a}", &vars(&[("a", "{b}"), ("b", "nope")]));
        assert_eq!(out, "{b}");
    }

    #[test]
    fn test_json_braces_are_not_placeholders() {
        let template = r#"Reply with {"correct": true} for {topic}"#;
        assert_eq!(extract_variables(template), vec!["topic"]);
        assert!(substitute_strict(template, &vars(&[("topic", "cats")])).is_ok());
    }

    #[test]
    fn test_strict_reports_missing_names() {
        let result = substitute_strict("{a} {b} {c} {b}", &vars(&[("a", "1")]));
        assert_eq!(
            result,
            Err(TemplateError::UnresolvedVariables(vec![
                "b".to_string(),
                "c".to_string()
            ]))
        );
    }

    #[test]
    fn test_extract_variables_order() {
        assert_eq!(
            extract_variables("{second} {first} {second} {user.name}"),
            vec!["second", "first", "user.name"]
        );
        assert!(extract_variables("no placeholders").is_empty());
    }
}
