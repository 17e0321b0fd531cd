//! Base types for AIUI sessions.
//!
//! This module defines the error taxonomy, the session report and the
//! callback types shared by the send and receive halves of a session.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during an AIUI session.
#[derive(Debug, Error)]
pub enum AiuiError {
    /// The base URL could not be turned into a signed handshake URL
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The WebSocket upgrade did not complete
    #[error("Handshake failed: {message}")]
    Handshake {
        /// HTTP status of the upgrade response, if one was received
        status: Option<u16>,
        /// Response body, if one was received
        body: Option<String>,
        /// Human readable description
        message: String,
    },

    /// Read or write failure on an established connection
    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer closed the connection before the session completed
    #[error("Connection closed before the session completed")]
    ConnectionClosed,

    /// An inbound frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The service reported a non-zero response code
    #[error("Service error {code}: {message}")]
    Protocol {
        /// Service error code
        code: i64,
        /// Service error message
        message: String,
        /// Raw response body
        raw: String,
    },

    /// Output or input audio stream failure
    #[error("Audio I/O error: {0}")]
    AudioIo(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A session task panicked or was cancelled
    #[error("Session task failed: {0}")]
    TaskFailed(String),
}

impl AiuiError {
    /// Whether the error belongs to the transport class (write, read or close).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ConnectionClosed)
    }
}

/// Result type for AIUI operations.
pub type AiuiResult<T> = Result<T, AiuiError>;

// =============================================================================
// First Error Slot
// =============================================================================

/// Records the first fatal error observed across the session tasks.
///
/// Later errors are logged by the task that hit them but never replace the
/// recorded one.
#[derive(Debug, Clone, Default)]
pub(crate) struct FirstError {
    slot: Arc<Mutex<Option<AiuiError>>>,
}

impl FirstError {
    pub(crate) fn record(&self, error: AiuiError) {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    pub(crate) fn take(&self) -> Option<AiuiError> {
        self.slot.lock().take()
    }
}

// =============================================================================
// Session Events
// =============================================================================

/// Outcome of decoding a `cbm_semantic` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticOutcome {
    /// A skill matched (`rc == 0`)
    Hit {
        /// Utterance the skill matched on
        text: Option<String>,
        /// Skill category
        category: Option<String>,
        /// Answer text, if the skill produced one
        answer: Option<String>,
    },
    /// The document decoded but no skill matched; carries the raw document
    Miss(String),
    /// The document could not be decoded; carries the raw text verbatim
    Raw(String),
}

/// Decoded, non-audio payload sections forwarded to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Service event (vad start, vad end, silence)
    Event(String),
    /// Speech recognition result
    Recognition {
        /// Words extracted from the recognition document
        text: String,
        /// Raw recognition document
        raw: String,
        /// Whether the recognition section was the last one
        is_final: bool,
    },
    /// Skill (semantic) result
    Semantic(SemanticOutcome),
    /// Dialogue (nlp) text
    Dialogue(String),
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Event(text) => write!(f, "event: {text}"),
            SessionEvent::Recognition { text, .. } => write!(f, "iat: {text}"),
            SessionEvent::Semantic(SemanticOutcome::Hit {
                category, answer, ..
            }) => write!(
                f,
                "semantic hit: {} -> {}",
                category.as_deref().unwrap_or("-"),
                answer.as_deref().unwrap_or("")
            ),
            SessionEvent::Semantic(SemanticOutcome::Miss(raw))
            | SessionEvent::Semantic(SemanticOutcome::Raw(raw)) => write!(f, "semantic: {raw}"),
            SessionEvent::Dialogue(text) => write!(f, "nlp: {text}"),
        }
    }
}

/// Callback type for session events.
pub type SessionEventCallback =
    Arc<dyn Fn(SessionEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Session Report
// =============================================================================

/// Summary of the reassembled TTS output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioOutputInfo {
    /// Output stream name (`<sid>.<ext>`)
    pub name: String,
    /// Bytes written to the stream
    pub bytes: u64,
    /// Chunks accepted into the stream
    pub chunks: u32,
}

/// Summary of a successfully completed session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Frames pushed by the send driver
    pub frames_sent: usize,
    /// Last session id seen on an inbound frame
    pub sid: Option<String>,
    /// Reassembled TTS output, if any audio was received
    pub audio_output: Option<AudioOutputInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_keeps_first() {
        let slot = FirstError::default();
        slot.record(AiuiError::ConnectionClosed);
        slot.record(AiuiError::Decode("late".to_string()));

        assert!(matches!(slot.take(), Some(AiuiError::ConnectionClosed)));
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_error_display() {
        let err = AiuiError::Protocol {
            code: 10013,
            message: "invalid appid".to_string(),
            raw: "{}".to_string(),
        };
        assert_eq!(err.to_string(), "Service error 10013: invalid appid");
        assert!(AiuiError::Transport("reset".into()).is_transport());
        assert!(!AiuiError::Decode("bad".into()).is_transport());
    }

    #[test]
    fn test_event_display() {
        let event = SessionEvent::Semantic(SemanticOutcome::Hit {
            text: Some("你是谁".to_string()),
            category: Some("IFLYTEK.chat".to_string()),
            answer: Some("我是小飞".to_string()),
        });
        assert_eq!(event.to_string(), "semantic hit: IFLYTEK.chat -> 我是小飞");
    }
}
