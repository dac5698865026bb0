//! Chat records shown in the conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Maximum number of follow-up chips kept from a single response.
pub const MAX_FOLLOW_UPS: usize = 3;

/// A single entry in the chat list.
///
/// A record is either a user query or an AI turn, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Stable identifier. Backend records keep their backend id.
    pub id: String,
    /// What the record carries.
    pub body: MessageBody,
    /// When the record was created.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A user query with a freshly generated id.
    #[must_use]
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            body: MessageBody::Query(text.into()),
            timestamp: Utc::now(),
        }
    }

    /// An AI response with the given id.
    #[must_use]
    pub fn response(id: impl Into<String>, response: AiResponse) -> Self {
        Self {
            id: id.into(),
            body: MessageBody::Response(response),
            timestamp: Utc::now(),
        }
    }

    /// A failed AI turn with the given id.
    #[must_use]
    pub fn failed(id: impl Into<String>, failure: TurnFailure) -> Self {
        Self {
            id: id.into(),
            body: MessageBody::Failed(failure),
            timestamp: Utc::now(),
        }
    }

    /// Whether this record was authored by the user.
    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self.body, MessageBody::Query(_))
    }
}

/// Payload of a [`ChatMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum MessageBody {
    /// Text typed (or selected) by the user.
    Query(String),
    /// A successful backend answer.
    Response(AiResponse),
    /// A turn that ended in an error.
    Failed(TurnFailure),
}

/// A backend answer, made of zero or more parts.
///
/// Zero parts is a valid empty result, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub parts: Vec<ResponsePart>,
}

impl AiResponse {
    /// A single plain-text answer.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![ResponsePart::Text(text.into())],
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// One renderable piece of an AI answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResponsePart {
    Text(String),
    Number(serde_json::Number),
    Table(DataTable),
    /// Image URL or `data:` URI.
    Plot(String),
}

/// Tabular result as produced by a dataframe answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    #[serde(alias = "columns")]
    pub headers: Vec<String>,
    #[serde(alias = "data")]
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Broad class of a failed turn, used for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The backend could not be reached.
    Network,
    /// The backend did not answer in time.
    Timeout,
    /// The backend answered with an error (invalid query, quota, ...).
    Backend,
    /// The backend answered with something we could not read.
    InvalidResponse,
    /// Every retry attempt failed.
    RetriesExhausted,
}

impl FailureKind {
    /// Short label for the error bubble.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "Connection problem",
            Self::Timeout => "Timed out",
            Self::Backend => "Query failed",
            Self::InvalidResponse => "Unreadable answer",
            Self::RetriesExhausted => "Service unavailable",
        }
    }
}

/// Why a turn ended without an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// A backend-suggested next query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub question: String,
}

impl FollowUpQuestion {
    #[must_use]
    pub fn new(id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
        }
    }
}

/// Accepts `1` as well as `"1"` for identifiers.
pub(crate) fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(serde_json::Number),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_up_accepts_numeric_and_string_ids() {
        let numeric: FollowUpQuestion =
            serde_json::from_str(r#"{"id": 1, "question": "more?"}"#).unwrap();
        assert_eq!(numeric.id, "1");

        let text: FollowUpQuestion =
            serde_json::from_str(r#"{"id": "abc", "question": "why?"}"#).unwrap();
        assert_eq!(text.id, "abc");
    }

    #[test]
    fn data_table_accepts_pandas_split_layout() {
        let table: DataTable =
            serde_json::from_str(r#"{"columns": ["a", "b"], "data": [[1, "x"]]}"#).unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn query_messages_are_user_messages() {
        let msg = ChatMessage::query("hello");
        assert!(msg.is_user());
        assert!(!ChatMessage::response("r1", AiResponse::text("hi")).is_user());
    }
}
