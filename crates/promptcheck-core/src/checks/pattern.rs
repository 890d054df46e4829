//! Regular-expression checks.
//!
//! Patterns use the `regex` crate dialect (no look-around, no
//! back-references) and are searched for anywhere in the response.

use regex::Regex;

use crate::types::RegexTest;

use super::Verdict;

pub fn check(response: &str, test: &RegexTest) -> Verdict {
    let re = match Regex::new(&test.pattern) {
        Ok(re) => re,
        Err(e) => return Verdict::fail(format!("Invalid regex: {}", e)),
    };

    if re.is_match(response) {
        Verdict::Pass
    } else {
        Verdict::fail("Response does not match regex")
    }
}
