use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum characters shown for a choice label.
pub const MAX_LABEL_CHARS: usize = 60;

/// Maximum characters shown for a short button label.
pub const MAX_SHORT_LABEL_CHARS: usize = 24;

/// Lines allowed between two items of the same list.
pub const MAX_LINE_GAP: usize = 3;

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?(?:\*\*|__)?(\d{1,2})[.)](?:\*\*|__)?\s+(\S.*)$")
        .expect("numbered item pattern should compile")
});

static LETTERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?(?:\*\*|__)?([A-Z])[.)](?:\*\*|__)?\s+(\S.*)$")
        .expect("lettered item pattern should compile")
});

static OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(option\s+(?:[a-z]|\d{1,2}))\b\s*[:.)\-]")
        .expect("option item pattern should compile")
});

/// One selectable answer detected in a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedChoice {
    pub label: String,

    /// Sent back verbatim as the answer (`1`, `B`, `Option A`).
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Numbered,
    Lettered,
    Option,
}

#[derive(Debug, Clone)]
struct Candidate {
    kind: ListKind,
    ordinal: u32,
    value: String,
    raw_label: String,
    line: usize,
}

/// Extract the canonical list of choices from a question.
///
/// The first contiguous run of at least two items wins, so an illustrative
/// list further down the text does not replace the real one. A run breaks
/// when the list kind changes, the numbering does not advance by exactly one,
/// or more than [`MAX_LINE_GAP`] lines separate two items.
pub fn parse_choices(text: &str) -> Vec<ParsedChoice> {
    let mut run: Vec<Candidate> = Vec::new();

    for cand in candidates(text) {
        if let Some(last) = run.last() {
            let continues = cand.kind == last.kind
                && cand.ordinal == last.ordinal + 1
                && cand.line - last.line <= MAX_LINE_GAP + 1;
            if !continues {
                if run.len() >= 2 {
                    break;
                }
                run.clear();
            }
        }
        run.push(cand);
    }

    if run.len() < 2 {
        return Vec::new();
    }

    let choices: Vec<ParsedChoice> = run
        .into_iter()
        .filter_map(|c| {
            let label = clean_label(&c.raw_label);
            if label.is_empty() {
                return None;
            }
            let short_label = short_label(&c.raw_label, &label);
            Some(ParsedChoice {
                label: truncate_chars(&label, MAX_LABEL_CHARS),
                value: c.value,
                short_label,
            })
        })
        .collect();
    if choices.len() < 2 {
        return Vec::new();
    }
    choices
}

/// Number of lines that look like numbered or lettered list items.
pub fn list_item_count(text: &str) -> usize {
    text.lines()
        .filter(|line| NUMBERED.is_match(line) || LETTERED.is_match(line))
        .count()
}

fn candidates(text: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut in_fence = false;

    for (line_idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some(caps) = NUMBERED.captures(line) {
            let token = &caps[1];
            if let Ok(ordinal) = token.parse::<u32>() {
                out.push(Candidate {
                    kind: ListKind::Numbered,
                    ordinal,
                    value: token.to_string(),
                    raw_label: caps[2].to_string(),
                    line: line_idx,
                });
            }
            continue;
        }

        if let Some(caps) = LETTERED.captures(line) {
            let token = &caps[1];
            out.push(Candidate {
                kind: ListKind::Lettered,
                ordinal: letter_ordinal(token),
                value: token.to_string(),
                raw_label: caps[2].to_string(),
                line: line_idx,
            });
            continue;
        }

        // Several `Option X:` items may share one line.
        let matches: Vec<_> = OPTION.captures_iter(line).collect();
        for (i, caps) in matches.iter().enumerate() {
            let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(line.len(), |m| m.start());
            let value = token.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            out.push(Candidate {
                kind: ListKind::Option,
                ordinal: option_ordinal(&value),
                value,
                raw_label: line[whole.end()..end].to_string(),
                line: line_idx,
            });
        }
    }

    out
}

fn letter_ordinal(token: &str) -> u32 {
    token
        .chars()
        .next()
        .map_or(0, |c| {
            u32::from(c.to_ascii_uppercase()).saturating_sub(u32::from('A')) + 1
        })
}

fn option_ordinal(value: &str) -> u32 {
    let suffix = value.split_whitespace().last().unwrap_or_default();
    match suffix.parse::<u32>() {
        Ok(n) => n,
        Err(_) if suffix.chars().all(|c| c.is_ascii_alphabetic()) => letter_ordinal(suffix),
        Err(_) => 0,
    }
}

/// Strip markdown emphasis, trailing punctuation and extra whitespace.
fn clean_label(raw: &str) -> String {
    let without_marks = raw.replace("**", "").replace("__", "").replace('`', "");
    let collapsed = without_marks.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_start_matches(['*', '_'])
        .trim_end_matches(|c: char| matches!(c, '*' | '_' | '.' | ',' | ';' | ':' | '!' | '?'))
        .trim()
        .to_string()
}

fn short_label(raw: &str, label: &str) -> Option<String> {
    let cleaned = clean_label(raw);
    let head = [" - ", " – ", " — ", ": "]
        .iter()
        .filter_map(|sep| cleaned.find(sep))
        .min()
        .map(|idx| clean_label(&cleaned[..idx]))?;
    if head.is_empty() || head.chars().count() >= label.chars().count() {
        return None;
    }
    Some(truncate_chars(&head, MAX_SHORT_LABEL_CHARS))
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(choices: &[ParsedChoice]) -> Vec<&str> {
        choices.iter().map(|c| c.value.as_str()).collect()
    }

    fn labels(choices: &[ParsedChoice]) -> Vec<&str> {
        choices.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn test_numbered_list() {
        let choices = parse_choices("1. Red\n2. Blue\n3. Green\nWhich color?");
        assert_eq!(values(&choices), vec!["1", "2", "3"]);
        assert_eq!(labels(&choices), vec!["Red", "Blue", "Green"]);
    }

    #[test]
    fn test_lettered_list_with_parens() {
        let choices = parse_choices("Pick one:\nA) Keep it\nB) Drop it");
        assert_eq!(values(&choices), vec!["A", "B"]);
        assert_eq!(labels(&choices), vec!["Keep it", "Drop it"]);
    }

    #[test]
    fn test_inline_option_pattern() {
        let choices = parse_choices("Option A: rewrite the parser. Option B: patch the lexer.");
        assert_eq!(values(&choices), vec!["Option A", "Option B"]);
        assert_eq!(labels(&choices), vec!["rewrite the parser", "patch the lexer"]);
    }

    #[test]
    fn test_option_lines() {
        let choices = parse_choices("**Option 1:** Ship now\n**Option 2:** Wait for QA");
        assert_eq!(values(&choices), vec!["Option 1", "Option 2"]);
        assert_eq!(labels(&choices), vec!["Ship now", "Wait for QA"]);
    }

    #[test]
    fn test_inline_example_is_not_a_list() {
        let choices = parse_choices("What's your favorite color? Example: 1) red 2) blue");
        assert!(choices.is_empty());
    }

    #[test]
    fn test_first_run_is_canonical() {
        let text = "How should I proceed?\n\
                    1. Refactor first\n\
                    2. Add tests first\n\
                    \n\
                    For example, a plan could look like:\n\
                    1. Write a design doc\n\
                    2. Review it\n\
                    3. Implement";
        let choices = parse_choices(text);
        assert_eq!(labels(&choices), vec!["Refactor first", "Add tests first"]);
    }

    #[test]
    fn test_large_gap_breaks_run() {
        let text = "1. Alpha\n\nnote\nnote\nnote\n2. Beta";
        assert!(parse_choices(text).is_empty());
    }

    #[test]
    fn test_small_gap_keeps_run() {
        let text = "1. Alpha\n   the first letter\n\n2. Beta";
        assert_eq!(values(&parse_choices(text)), vec!["1", "2"]);
    }

    #[test]
    fn test_single_item_run_is_skipped() {
        let text = "1. Only step\n\nThen choose:\nA. Yes\nB. No";
        assert_eq!(values(&parse_choices(text)), vec!["A", "B"]);
    }

    #[test]
    fn test_single_item_yields_nothing() {
        assert!(parse_choices("1. Just this").is_empty());
    }

    #[test]
    fn test_blank_label_leaves_too_few_choices() {
        assert!(parse_choices("1. ...\n2. Blue").is_empty());
        assert_eq!(labels(&parse_choices("1. ...\n2. Blue\n3. Green")), vec!["Blue", "Green"]);
    }

    #[test]
    fn test_markdown_and_punctuation_stripped() {
        let choices = parse_choices("1. **Use Redis**.\n2. *Use Memcached*?");
        assert_eq!(labels(&choices), vec!["Use Redis", "Use Memcached"]);
    }

    #[test]
    fn test_short_label() {
        let choices = parse_choices("1. Postgres - battle tested\n2. SQLite: zero setup");
        assert_eq!(choices[0].short_label.as_deref(), Some("Postgres"));
        assert_eq!(choices[1].short_label.as_deref(), Some("SQLite"));
        assert_eq!(choices[0].label, "Postgres - battle tested");
    }

    #[test]
    fn test_long_label_truncated() {
        let long = "x".repeat(200);
        let choices = parse_choices(&format!("1. {long}\n2. short"));
        assert_eq!(choices[0].label.chars().count(), MAX_LABEL_CHARS);
        assert!(choices[0].label.ends_with("..."));
    }

    #[test]
    fn test_code_fence_ignored() {
        let text = "```\n1. not\n2. real\n```\nA. Yes\nB. No";
        assert_eq!(values(&parse_choices(text)), vec!["A", "B"]);
    }

    #[test]
    fn test_list_item_count() {
        assert_eq!(list_item_count("1. a\n2. b\nplain"), 2);
        assert_eq!(list_item_count("no list here"), 0);
    }
}
