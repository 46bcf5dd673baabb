//! One-shot user messages carried across a redirect in the session.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    /// CSS class used by the layout template.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Info => "flash-info",
            Self::Error => "flash-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

/// Queue a message for the next rendered page.
///
/// Flash messages are best-effort: a session failure is logged, not raised.
pub async fn push(session: &Session, level: FlashLevel, text: impl Into<String>) {
    let mut messages = session
        .get::<Vec<FlashMessage>>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    messages.push(FlashMessage {
        level,
        text: text.into(),
    });

    if let Err(e) = session.insert(session_keys::FLASH, messages).await {
        tracing::warn!("Failed to store flash message: {e}");
    }
}

pub async fn success(session: &Session, text: impl Into<String>) {
    push(session, FlashLevel::Success, text).await;
}

pub async fn error(session: &Session, text: impl Into<String>) {
    push(session, FlashLevel::Error, text).await;
}

/// Drain all queued messages.
pub async fn take(session: &Session) -> Vec<FlashMessage> {
    session
        .remove::<Vec<FlashMessage>>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
