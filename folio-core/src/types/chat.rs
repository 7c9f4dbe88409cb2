//! Chat transcript types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message in the chat widget's transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message text (markdown for bot replies)
    pub message: String,
    /// Whether the assistant wrote it
    #[serde(default)]
    pub is_bot: bool,
    /// When it was written
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A message written now.
    pub fn new(message: impl Into<String>, is_bot: bool) -> Self {
        Self::at(message, is_bot, Utc::now())
    }

    /// A message written at `timestamp`.
    pub fn at(message: impl Into<String>, is_bot: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            is_bot,
            timestamp,
        }
    }
}
