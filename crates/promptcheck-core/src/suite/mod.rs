//! Test suite documents.
//!
//! A suite bundles a prompt template, its variable bindings and the
//! acceptance tests for its responses. Suites are YAML or JSON and are
//! validated against an embedded JSON Schema before deserialization.

mod parser;
mod schema;

pub use parser::{SuiteError, TestSuite};
pub use schema::validate_suite_schema;
