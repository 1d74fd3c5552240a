use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sequential stage of the learning flow. Gates which screens are reachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Planning,
    Execution,
    Feedback,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::Execution => "execution",
            Phase::Feedback => "feedback",
        }
    }

    /// Screen slugs belonging to this phase, in display order. Used only for
    /// progress rendering, never for gating logic.
    pub fn screens(&self) -> &'static [&'static str] {
        match self {
            Phase::Planning => &[
                "introduction",
                "self-rate",
                "user-profile",
                "pre-test",
                "strategy-pre-test",
            ],
            Phase::Execution => &["ai-interaction"],
            Phase::Feedback => &["post-test", "strategy-post-test", "summary"],
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown phase '{0}'")]
pub struct UnknownPhase(String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(Phase::Planning),
            "execution" => Ok(Phase::Execution),
            "feedback" => Ok(Phase::Feedback),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Delivery state of a chat log entry. User entries start out `Pending` and
/// are finalized once the assistant reply settles; assistant entries are
/// `Answered` from the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Pending,
    Answered,
    Unanswered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub delivery: Delivery,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            delivery: Delivery::Pending,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            delivery: Delivery::Answered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_round_trips_through_its_string_form() {
        for phase in [Phase::Planning, Phase::Execution, Phase::Feedback] {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
    }

    #[test]
    fn unknown_phase_string_is_rejected() {
        assert!("review".parse::<Phase>().is_err());
    }

    #[test]
    fn planning_screens_keep_route_table_order() {
        assert_eq!(Phase::Planning.screens()[0], "introduction");
        assert_eq!(Phase::Planning.screens().len(), 5);
        assert_eq!(Phase::Feedback.screens().last(), Some(&"summary"));
    }
}
