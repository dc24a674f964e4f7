use serde::{Deserialize, Serialize};

use crate::error::InterviewError;
use crate::gateway::{ChatMessage, ChatRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Interviewer,
    Candidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn interviewer(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Interviewer,
            text: text.into(),
        }
    }

    pub fn candidate(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Candidate,
            text: text.into(),
        }
    }

    pub fn to_message(&self) -> ChatMessage {
        let role = match self.speaker {
            Speaker::Interviewer => ChatRole::Assistant,
            Speaker::Candidate => ChatRole::User,
        };
        ChatMessage {
            role,
            content: self.text.clone(),
        }
    }
}

/// Ordered conversation. Grows only until frozen.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
    #[serde(skip)]
    frozen: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) -> Result<(), InterviewError> {
        if self.frozen {
            return Err(InterviewError::InvalidTransition(
                "Transcript is frozen".to_string(),
            ));
        }
        self.turns.push(turn);
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Candidate turns recorded so far.
    pub fn answers(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.speaker == Speaker::Candidate)
            .count()
    }

    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns.iter().map(Turn::to_message).collect()
    }
}
