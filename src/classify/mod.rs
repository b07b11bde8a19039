//! Heuristic question classification.
//!
//! Turns a free-form question into a hint for the UI: a yes/no approval, a set
//! of choices to render as buttons, or an open text field. Everything here is a
//! pure function of the input text.

pub mod approval;
pub mod choices;

use serde::{Deserialize, Serialize};

pub use approval::{is_approval_question, ApprovalClassifier};
pub use choices::{parse_choices, ParsedChoice};

/// UI affordance suggested for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "choices", rename_all = "camelCase")]
pub enum Classification {
    Approval,
    Choices(Vec<ParsedChoice>),
    OpenEnded,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Approval => "approval",
            Classification::Choices(_) => "choices",
            Classification::OpenEnded => "openEnded",
        }
    }
}

/// Classify a question. A detected list wins over approval phrasing.
pub fn classify(text: &str) -> Classification {
    let choices = parse_choices(text);
    if choices.len() >= 2 {
        return Classification::Choices(choices);
    }
    if is_approval_question(text) {
        return Classification::Approval;
    }
    Classification::OpenEnded
}
