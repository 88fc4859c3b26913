//! Wire types for the chat relay (`POST /api/chat`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::Snapshot;
use crate::units::format_sq_ft;

pub const CHAT_PATH: &str = "/api/chat";
pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    /// Older clients send a flattened summary instead of a snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LegacyContext>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyContext {
    pub total_sq_ft: f64,
    pub selections_count: usize,
    pub selections_summary: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatRequestError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("message is {0} characters; the limit is {MAX_MESSAGE_CHARS}")]
    MessageTooLong(usize),
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            message: message.into(),
            snapshot: Some(snapshot),
            context: None,
        }
    }

    /// The trimmed question, if it is sendable.
    pub fn validate(&self) -> Result<&str, ChatRequestError> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ChatRequestError::EmptyMessage);
        }
        let length = message.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(ChatRequestError::MessageTooLong(length));
        }
        Ok(message)
    }

    /// Plain-text description of the estimate for the model.
    pub fn estimate_context(&self) -> String {
        if let Some(snapshot) = &self.snapshot {
            return format!(
                "Total: {} sq ft across {} area(s).\n{}",
                format_sq_ft(snapshot.total_sq_ft),
                snapshot.selections_count,
                snapshot.summary_text()
            );
        }
        if let Some(context) = &self.context {
            let summary = if context.selections_summary.trim().is_empty() {
                "No areas measured yet."
            } else {
                context.selections_summary.trim()
            };
            return format!(
                "Total: {} sq ft across {} area(s).\n{}",
                format_sq_ft(context.total_sq_ft),
                context.selections_count,
                summary
            );
        }
        "No estimate was shared.".to_string()
    }
}
