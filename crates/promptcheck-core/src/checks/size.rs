//! Size bounds on words and characters.
//!
//! Words are whitespace-separated runs (`split_whitespace`), so an empty
//! response has zero words. Characters are Unicode scalar values.

use crate::types::SizeTest;

use super::Verdict;

pub fn word_count(response: &str) -> usize {
    response.split_whitespace().count()
}

pub fn char_count(response: &str) -> usize {
    response.chars().count()
}

/// Check bounds in fixed order: minWords, maxWords, minChars, maxChars.
/// The first violated bound decides the message.
pub fn check(response: &str, test: &SizeTest) -> Verdict {
    let words = word_count(response);
    let chars = char_count(response);

    if test.min_words.is_some_and(|min| words < min) {
        return Verdict::fail("Response has too few words");
    }
    if test.max_words.is_some_and(|max| words > max) {
        return Verdict::fail("Response has too many words");
    }
    if test.min_chars.is_some_and(|min| chars < min) {
        return Verdict::fail("Response has too few characters");
    }
    if test.max_chars.is_some_and(|max| chars > max) {
        return Verdict::fail("Response has too many characters");
    }

    Verdict::Pass
}
