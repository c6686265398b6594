use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Question kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Poll,
    Descriptive,
    Image,
}

impl QuestionType {
    /// Convert from document string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "mcq" => Ok(QuestionType::Mcq),
            "poll" => Ok(QuestionType::Poll),
            "descriptive" => Ok(QuestionType::Descriptive),
            "image" => Ok(QuestionType::Image),
            _ => Err(format!("Invalid question type: {}", s)),
        }
    }

    /// Convert to document string
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Poll => "poll",
            QuestionType::Descriptive => "descriptive",
            QuestionType::Image => "image",
        }
    }

    /// Whether an answer to this question is an option index
    pub fn takes_option_index(&self) -> bool {
        matches!(self, QuestionType::Mcq | QuestionType::Poll)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Stored as text; use `question_type_enum` for type safety.
    pub question_type: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<u32>,
}

impl Question {
    /// Get question type as an enum; unrecognized types answer as free text.
    pub fn question_type_enum(&self) -> QuestionType {
        QuestionType::from_str(&self.question_type).unwrap_or(QuestionType::Descriptive)
    }
}

/// One answer per question: an option index for mcq/poll, free text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Choice(u32),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub username: String,
    pub answers: Vec<AnswerValue>,
    pub submitted_at: i64,
}

/// Quiz/poll document (`quizzes/{id}`). Awards a flat XP amount on the
/// first completed submission per username.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Storage key, injected on load; not part of the document body.
    #[serde(default, skip_serializing)]
    pub id: String,
    pub title: String,
    pub start_time: i64,
    pub end_time: i64,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submissions: Option<BTreeMap<String, Submission>>,
}

impl Activity {
    pub fn is_live(&self, now_millis: i64) -> bool {
        self.start_time <= now_millis && now_millis <= self.end_time
    }

    pub fn has_submission_from(&self, username: &str) -> bool {
        self.submissions
            .as_ref()
            .map(|subs| subs.values().any(|sub| sub.username == username))
            .unwrap_or(false)
    }
}

/// Admin input for creating a quiz/poll
#[derive(Debug, Clone)]
pub struct ActivityDraft {
    pub title: String,
    pub start_time: i64,
    pub end_time: i64,
    pub xp: u64,
    pub questions: Vec<Question>,
}
