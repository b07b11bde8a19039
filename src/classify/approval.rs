use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::RegexSet;

use super::choices::list_item_count;
use crate::error::{AsklineError, Result};

/// Questions with at most this many words that end in `?` count as yes/no.
pub const SHORT_QUESTION_WORDS: usize = 12;

static DEFAULT: LazyLock<ApprovalClassifier> = LazyLock::new(ApprovalClassifier::default_rules);

/// Returns true when the question reads as a yes/no confirmation.
pub fn is_approval_question(text: &str) -> bool {
    DEFAULT.is_approval(text)
}

/// Rule-based yes/no detector.
///
/// Negative rules run first and short-circuit: many real questions contain
/// both "should I" phrasing and a request for a specific value, and those
/// must not be offered as a yes/no prompt.
pub struct ApprovalClassifier {
    negative: RegexSet,
    phrases: AhoCorasick,
    min_list_items: usize,
}

impl ApprovalClassifier {
    /// Build from negative regex patterns and positive confirmation phrases.
    pub fn new(negative: Vec<String>, phrases: Vec<String>) -> Result<Self> {
        let negative = RegexSet::new(&negative).map_err(|e| AsklineError::InvalidPattern {
            reason: format!("invalid regex pattern: {e}"),
        })?;
        let phrases = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&phrases)
            .map_err(|e| AsklineError::InvalidPattern {
                reason: format!("invalid phrase set: {e}"),
            })?;
        Ok(Self {
            negative,
            phrases,
            min_list_items: 2,
        })
    }

    pub fn default_rules() -> Self {
        Self::new(Self::default_negative_patterns(), Self::default_phrases())
            .expect("default classifier rules should compile")
    }

    /// Patterns that rule out a yes/no answer.
    pub fn default_negative_patterns() -> Vec<String> {
        vec![
            // Open questions at the start of a sentence or line
            r"(?im)(?:^|[.!?:]\s+)\s*(?:what|which|how|where|who|why)\b".into(),
            // Requests to type something in
            r"(?i)\b(?:enter|provide|specify|type in|tell me|give me|paste)\b".into(),
            // Asking for a specific name, path or value
            r"(?i)\b(?:name|filename|file name|path|directory|folder|value|url|port|email|branch)\s+(?:for|of|to use|should)\b"
                .into(),
        ]
    }

    /// Permission and confirmation phrasing.
    pub fn default_phrases() -> Vec<String> {
        vec![
            "should i".into(),
            "shall i".into(),
            "can i".into(),
            "may i".into(),
            "do you want".into(),
            "would you like".into(),
            "is it ok".into(),
            "is it okay".into(),
            "is that ok".into(),
            "is this ok".into(),
            "ok to".into(),
            "okay to".into(),
            "proceed".into(),
            "continue".into(),
            "go ahead".into(),
            "confirm".into(),
            "approve".into(),
            "sounds good".into(),
            "looks good".into(),
            "are you sure".into(),
            "permission".into(),
        ]
    }

    pub fn is_approval(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        if self.is_ruled_out(text) {
            return false;
        }
        self.has_confirmation_phrase(text) || is_short_question(text)
    }

    fn is_ruled_out(&self, text: &str) -> bool {
        self.negative.is_match(text) || list_item_count(text) >= self.min_list_items
    }

    fn has_confirmation_phrase(&self, text: &str) -> bool {
        self.phrases
            .find_iter(text)
            .any(|m| is_word_bounded(text, m.start(), m.end()))
    }
}

fn is_short_question(text: &str) -> bool {
    text.ends_with('?') && text.split_whitespace().count() <= SHORT_QUESTION_WORDS
}

// "can i" must not fire inside "scan it".
fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_i_proceed() {
        assert!(is_approval_question("Should I proceed with the deployment?"));
    }

    #[test]
    fn test_what_filename() {
        assert!(!is_approval_question("What filename should I use?"));
    }

    #[test]
    fn test_numbered_list_overrides() {
        assert!(!is_approval_question("1. Option A\n2. Option B\nWhich one?"));
        assert!(!is_approval_question(
            "Should I continue with one of these?\n1. Fast path\n2. Safe path"
        ));
    }

    #[test]
    fn test_value_request_overrides_phrase() {
        assert!(!is_approval_question(
            "Should I continue? If so, provide the branch name to use."
        ));
        assert!(!is_approval_question("Can I get the path for the config file?"));
    }

    #[test]
    fn test_short_question_without_phrase() {
        assert!(is_approval_question("Ready to merge?"));
    }

    #[test]
    fn test_long_statement_is_not_approval() {
        assert!(!is_approval_question(
            "I refactored the module and moved the helpers into a separate file."
        ));
    }

    #[test]
    fn test_phrase_needs_word_boundary() {
        assert!(!is_approval_question(
            "I will scan its dependencies and report back in a summary afterwards."
        ));
    }

    #[test]
    fn test_confirmation_without_question_mark() {
        assert!(is_approval_question(
            "Please confirm the migration plan before I touch the database."
        ));
    }

    #[test]
    fn test_longest_phrase_wins() {
        assert!(is_approval_question(
            "Is it okay to drop the legacy table now that the migration finished and the backups are verified"
        ));
    }

    #[test]
    fn test_empty() {
        assert!(!is_approval_question("   "));
    }
}
