//! Format validators.
//!
//! Each implemented format has a syntax-only validator. Formats without one
//! (html, csv, typescript, python, and unknown names) always fail with
//! [`NOT_IMPLEMENTED`]; they never pass silently.

use oxc_allocator::Allocator;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::SourceType;

use crate::types::{FormatTest, ResponseFormat};

use super::{Verdict, NOT_IMPLEMENTED};

/// A syntax validator for one format.
pub type FormatValidator = fn(&str) -> Verdict;

/// Look up the validator for a format.
pub fn validator_for(format: &ResponseFormat) -> Option<FormatValidator> {
    match format {
        ResponseFormat::Text => Some(validate_text),
        ResponseFormat::Json => Some(validate_json),
        ResponseFormat::JavaScript => Some(validate_javascript),
        ResponseFormat::Html
        | ResponseFormat::Csv
        | ResponseFormat::TypeScript
        | ResponseFormat::Python
        | ResponseFormat::Other(_) => None,
    }
}

pub fn check(response: &str, test: &FormatTest) -> Verdict {
    match validator_for(&test.expected_format) {
        Some(validate) => validate(response),
        None => {
            tracing::debug!(format = %test.expected_format, "No validator for format");
            Verdict::fail(NOT_IMPLEMENTED)
        }
    }
}

fn validate_text(_response: &str) -> Verdict {
    Verdict::Pass
}

fn validate_json(response: &str) -> Verdict {
    match serde_json::from_str::<serde_json::Value>(response) {
        Ok(_) => Verdict::Pass,
        Err(_) => Verdict::fail("Response is not valid JSON"),
    }
}

/// Parse without executing, as the body of a sloppy-mode function: a
/// top-level `return` is allowed and `await` is an ordinary identifier.
/// Any diagnostic counts as invalid syntax.
fn validate_javascript(response: &str) -> Verdict {
    let allocator = Allocator::default();
    let options = ParseOptions {
        allow_return_outside_function: true,
        ..ParseOptions::default()
    };
    let parsed = Parser::new(&allocator, response, SourceType::default().with_module(false))
        .with_options(options)
        .parse();

    if parsed.panicked || !parsed.errors.is_empty() {
        Verdict::fail("Response is not valid JavaScript")
    } else {
        Verdict::Pass
    }
}
