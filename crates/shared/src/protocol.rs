use serde::{Deserialize, Serialize};

/// Payload for `POST /user-profile`. Everything beyond the name is optional;
/// the backend accepts both these field names and its own legacy aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfileDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cet4_taken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cet4_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cet4_reading_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cet6_taken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cet6_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cet6_reading_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_scores: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_score: Option<String>,
}

impl UserProfileDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Payload for `POST /exam-result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResultSubmission {
    pub name: String,
    pub exam_id: i64,
    pub score: i64,
    pub wrong_questions: Vec<String>,
}

/// Payload for `POST /strategy-result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResultSubmission {
    pub name: String,
    pub score: i64,
    pub is_pre_test: bool,
}

/// Payload for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub name: String,
    pub message: String,
}
