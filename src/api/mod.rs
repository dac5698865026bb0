//! Binding to the PandasAI-compatible backend.
//!
//! The chat client consumes exactly two backend operations, expressed by the
//! [`PandasAiApi`] trait:
//!
//! - [`PandasAiApi::send_query`]: ask a question, get an answer plus follow-up
//!   suggestions.
//! - [`PandasAiApi::fetch_history`]: page backwards through a conversation.
//!
//! [`HttpBackend`] talks to the real service over HTTP. [`RetryingApi`] wraps
//! any implementation with a bounded exponential backoff policy.

pub mod http;
pub mod retry;

pub use http::HttpBackend;
pub use retry::{RetryPolicy, RetryingApi};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::{AiResponse, ChatMessage, FailureKind, FollowUpQuestion, TurnFailure};

/// A question for the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    /// Backend conversation to continue; `None` starts a new one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub query: String,
}

/// The backend's answer to a [`QueryRequest`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryReply {
    /// Conversation the answer belongs to, when the backend reports it.
    pub conversation_id: Option<String>,
    pub response: AiResponse,
    pub follow_ups: Vec<FollowUpQuestion>,
}

/// Position in a conversation's history, counted in turns from the newest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryCursor {
    pub skip: usize,
}

impl HistoryCursor {
    /// Cursor pointing at the newest turn.
    pub const START: Self = Self { skip: 0 };
}

/// A request for one page of history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub conversation_id: String,
    pub cursor: HistoryCursor,
    pub limit: usize,
}

/// One page of history, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPage {
    pub messages: Vec<ChatMessage>,
    /// Cursor for the next older page; `None` when the start was reached.
    pub next_cursor: Option<HistoryCursor>,
}

/// Errors surfaced by the backend binding.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never reached the backend.
    #[error("could not connect to the backend: {0}")]
    Connect(String),

    /// The connection failed after the request was sent.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend did not answer in time.
    #[error("the backend did not answer in time")]
    Timeout,

    /// The backend answered with an error status.
    #[error("backend error ({status}): {message}")]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The backend answered with a body we could not read.
    #[error("malformed backend response: {0}")]
    Decode(String),

    /// The request was refused before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Every attempt allowed by the retry policy failed.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<ApiError> },
}

impl ApiError {
    /// Transient failures worth another attempt for read-only calls.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Transport(_) | Self::Timeout => true,
            Self::Backend { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::InvalidRequest(_) | Self::Exhausted { .. } => false,
        }
    }

    /// Failures after which the backend cannot have run the query, so
    /// sending it again does not duplicate work.
    #[must_use]
    pub fn is_safe_to_resend(&self) -> bool {
        match self {
            Self::Connect(_) => true,
            Self::Backend { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Display class of this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Connect(_) | Self::Transport(_) => FailureKind::Network,
            Self::Timeout => FailureKind::Timeout,
            Self::Backend { .. } | Self::InvalidRequest(_) => FailureKind::Backend,
            Self::Decode(_) => FailureKind::InvalidResponse,
            Self::Exhausted { .. } => FailureKind::RetriesExhausted,
        }
    }

    /// Convert into the failure recorded on a chat turn.
    #[must_use]
    pub fn to_failure(&self) -> TurnFailure {
        let message = match self {
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        };
        TurnFailure {
            kind: self.kind(),
            message,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Longest conversation id accepted from a browser.
pub const MAX_CONVERSATION_ID_LEN: usize = 128;

/// Conversation ids are opaque backend tokens: ASCII letters, digits, `-`
/// and `_`. Anything else never reaches a backend URL.
#[must_use]
pub fn is_valid_conversation_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_CONVERSATION_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// The two operations the chat client needs from the backend.
#[async_trait]
pub trait PandasAiApi: Send + Sync {
    /// Submit a natural-language query. May take several seconds.
    async fn send_query(&self, request: &QueryRequest) -> Result<QueryReply, ApiError>;

    /// Fetch one page of a conversation's history.
    async fn fetch_history(&self, request: &HistoryRequest) -> Result<HistoryPage, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(status: u16) -> ApiError {
        ApiError::Backend {
            status,
            code: None,
            message: "nope".to_string(),
        }
    }

    #[test]
    fn client_errors_are_terminal() {
        assert!(!backend(400).is_retryable());
        assert!(!backend(422).is_safe_to_resend());
        assert!(backend(503).is_retryable());
        assert!(backend(429).is_safe_to_resend());
    }

    #[test]
    fn timeouts_are_not_resent() {
        assert!(ApiError::Timeout.is_retryable());
        assert!(!ApiError::Timeout.is_safe_to_resend());
        assert!(!backend(500).is_safe_to_resend());
    }

    #[test]
    fn conversation_ids_are_opaque_tokens() {
        assert!(is_valid_conversation_id("conv-42"));
        assert!(is_valid_conversation_id("3f2b_A9"));
        assert!(!is_valid_conversation_id(""));
        assert!(!is_valid_conversation_id(".."));
        assert!(!is_valid_conversation_id("../../admin/users?all=1#"));
        assert!(!is_valid_conversation_id("a b"));
        assert!(!is_valid_conversation_id(&"x".repeat(MAX_CONVERSATION_ID_LEN + 1)));
    }

    #[test]
    fn invalid_requests_are_terminal() {
        let err = ApiError::InvalidRequest("bad id".to_string());
        assert!(!err.is_retryable());
        assert!(!err.is_safe_to_resend());
    }

    #[test]
    fn backend_failures_keep_the_backend_message() {
        let failure = backend(400).to_failure();
        assert_eq!(failure.kind, FailureKind::Backend);
        assert_eq!(failure.message, "nope");

        let exhausted = ApiError::Exhausted {
            attempts: 3,
            last: Box::new(ApiError::Timeout),
        };
        assert_eq!(exhausted.kind(), FailureKind::RetriesExhausted);
    }
}
