//! Per-test statistics across sampled responses.
//!
//! A response counts as passed for test `i` when its whole list passed, or
//! when it failed but no reported failure has `test_index == i`.

use crate::types::{OnePromptTestResult, ResponseTest, ResponseTestStatistics};

/// Count passes and failures of each test over all responses.
///
/// Returns one entry per test, in the order of `tests`.
pub fn aggregate_statistics(
    tests: &[ResponseTest],
    results: &[OnePromptTestResult],
) -> Vec<ResponseTestStatistics> {
    let total = results.len();

    tests
        .iter()
        .enumerate()
        .map(|(index, test)| {
            let passed = results
                .iter()
                .filter(|r| r.results.passed_test(index))
                .count();
            ResponseTestStatistics {
                test: test.clone(),
                passed,
                failed: total - passed,
                total,
            }
        })
        .collect()
}
