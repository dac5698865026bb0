//! HTTP implementation of [`PandasAiApi`].
//!
//! Requests go from this server to the backend; the API key is attached here
//! and never leaves the server.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use super::{
    ApiError, HistoryCursor, HistoryPage, HistoryRequest, PandasAiApi, QueryReply, QueryRequest,
};
use crate::chat::message::id_from_string_or_number;
use crate::chat::{AiResponse, ChatMessage, DataTable, FollowUpQuestion, MessageBody, ResponsePart};

/// Client for a PandasAI-compatible backend.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: Url,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Create a client. `timeout` bounds every single request.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pandasai-chat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(base_url, api_key, http)
    }

    /// Create a client around an existing `reqwest` client.
    pub fn with_client(
        base_url: &str,
        api_key: Option<String>,
        http: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Keep any path prefix when joining relative endpoints.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    /// `{base}/v1/conversations/{id}/messages` with the id as one encoded
    /// path segment.
    fn conversation_messages_url(&self, conversation_id: &str) -> Result<Url, ApiError> {
        if !super::is_valid_conversation_id(conversation_id) {
            return Err(ApiError::InvalidRequest(format!(
                "unsupported conversation id {conversation_id:?}"
            )));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidRequest("base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(["v1", "conversations", conversation_id, "messages"]);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let started = Instant::now();
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        info!(
            name: "backend.response",
            operation,
            status = status.as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            body_length = body.len(),
            "Backend responded"
        );

        if !status.is_success() {
            return Err(backend_error(status, &body));
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PandasAiApi for HttpBackend {
    async fn send_query(&self, request: &QueryRequest) -> Result<QueryReply, ApiError> {
        debug!(
            name: "backend.send_query",
            conversation_id = ?request.conversation_id,
            query_length = request.query.len(),
            "Submitting query"
        );
        let url = self.url("v1/chat")?;
        let envelope: Envelope<WireChatData> = self
            .execute("send_query", self.http.post(url).json(request))
            .await?;
        Ok(envelope.data.into_reply())
    }

    async fn fetch_history(&self, request: &HistoryRequest) -> Result<HistoryPage, ApiError> {
        debug!(
            name: "backend.fetch_history",
            conversation_id = %request.conversation_id,
            skip = request.cursor.skip,
            limit = request.limit,
            "Fetching history page"
        );
        let mut url = self.conversation_messages_url(&request.conversation_id)?;
        url.query_pairs_mut()
            .append_pair("skip", &request.cursor.skip.to_string())
            .append_pair("limit", &request.limit.to_string());

        let envelope: Envelope<WireHistoryData> =
            self.execute("fetch_history", self.http.get(url)).await?;
        Ok(envelope.data.into_page(request))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct WireChatData {
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    response: Option<WireResponse>,
    #[serde(default)]
    follow_up_questions: Vec<FollowUpQuestion>,
}

impl WireChatData {
    fn into_reply(self) -> QueryReply {
        QueryReply {
            conversation_id: self.conversation_id,
            response: self.response.unwrap_or_default().into_response(),
            follow_ups: self.follow_up_questions,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireHistoryData {
    #[serde(default)]
    messages: Vec<WireHistoryRecord>,
}

impl WireHistoryData {
    fn into_page(self, request: &HistoryRequest) -> HistoryPage {
        let turns = self.messages.len();
        let next_cursor = (turns >= request.limit).then_some(HistoryCursor {
            skip: request.cursor.skip + turns,
        });
        HistoryPage {
            messages: self
                .messages
                .into_iter()
                .flat_map(WireHistoryRecord::into_messages)
                .collect(),
            next_cursor,
        }
    }
}

/// One stored turn: the user's query and the backend's answer.
#[derive(Debug, Deserialize)]
struct WireHistoryRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    id: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    response: Option<WireResponse>,
    #[serde(default)]
    created_at: Option<String>,
}

impl WireHistoryRecord {
    fn into_messages(self) -> Vec<ChatMessage> {
        let timestamp = self
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        let mut out = Vec::with_capacity(2);
        if let Some(query) = self.query.filter(|q| !q.trim().is_empty()) {
            out.push(ChatMessage {
                id: format!("{}-q", self.id),
                body: MessageBody::Query(query),
                timestamp,
            });
        }
        if let Some(response) = self.response {
            out.push(ChatMessage {
                id: format!("{}-r", self.id),
                body: MessageBody::Response(response.into_response()),
                timestamp,
            });
        }
        out
    }
}

/// The backend sends a list of typed parts, a single part, or bare text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireResponse {
    Parts(Vec<WirePart>),
    Part(WirePart),
    Text(String),
}

impl Default for WireResponse {
    fn default() -> Self {
        Self::Parts(Vec::new())
    }
}

impl WireResponse {
    fn into_response(self) -> AiResponse {
        let parts = match self {
            Self::Parts(parts) => parts.into_iter().map(WirePart::into_part).collect(),
            Self::Part(part) => vec![part.into_part()],
            Self::Text(text) if text.trim().is_empty() => Vec::new(),
            Self::Text(text) => vec![ResponsePart::Text(text)],
        };
        AiResponse { parts }
    }
}

#[derive(Debug, Deserialize)]
struct WirePart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: serde_json::Value,
}

impl WirePart {
    fn into_part(self) -> ResponsePart {
        match self.kind.as_str() {
            "number" => match self.value {
                serde_json::Value::Number(n) => ResponsePart::Number(n),
                other => ResponsePart::Text(value_text(&other)),
            },
            "dataframe" | "table" => serde_json::from_value::<DataTable>(self.value.clone())
                .map_or_else(|_| ResponsePart::Text(value_text(&self.value)), ResponsePart::Table),
            "plot" | "image" => ResponsePart::Plot(value_text(&self.value)),
            _ => ResponsePart::Text(value_text(&self.value)),
        }
    }
}

/// Render a JSON value as display text (strings without quotes).
pub(crate) fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Error body of the backend: `{"error_code": ..., "message": ...}`, or a
/// framework-style `{"detail": ...}`.
#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    error_code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

fn backend_error(status: reqwest::StatusCode, body: &[u8]) -> ApiError {
    let parsed: Option<WireError> = serde_json::from_slice(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|e| e.error_code.as_ref())
        .filter(|c| !c.is_null())
        .map(value_text);
    let message = parsed
        .and_then(|e| e.message.or_else(|| e.detail.as_ref().map(value_text)))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let raw = String::from_utf8_lossy(body).trim().to_string();
            if raw.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                raw
            }
        });
    ApiError::Backend {
        status: status.as_u16(),
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(base, None, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn history_url_keeps_the_base_prefix() {
        let url = backend("http://backend.local/api")
            .conversation_messages_url("conv-42")
            .unwrap();
        assert_eq!(url.as_str(), "http://backend.local/api/v1/conversations/conv-42/messages");

        let url = backend("http://backend.local/")
            .conversation_messages_url("conv-42")
            .unwrap();
        assert_eq!(url.as_str(), "http://backend.local/v1/conversations/conv-42/messages");
    }

    #[test]
    fn history_url_refuses_ids_that_leave_the_endpoint() {
        let backend = backend("http://backend.local/api");
        for id in ["../../admin/users?all=1#", "..", "a/b", "x?y", "x#y", ""] {
            let err = backend.conversation_messages_url(id).unwrap_err();
            assert!(matches!(err, ApiError::InvalidRequest(_)), "{id:?} gave {err:?}");
        }
    }

    #[test]
    fn parses_typed_response_parts() {
        let data: WireChatData = serde_json::from_str(
            r#"{
                "conversation_id": "c1",
                "response": [
                    {"type": "string", "value": "Total is"},
                    {"type": "number", "value": 42},
                    {"type": "dataframe", "value": {"headers": ["city"], "rows": [["Rome"]]}},
                    {"type": "plot", "value": "data:image/png;base64,AAAA"}
                ],
                "follow_up_questions": [{"id": 1, "question": "By month?"}]
            }"#,
        )
        .unwrap();
        let reply = data.into_reply();

        assert_eq!(reply.conversation_id.as_deref(), Some("c1"));
        assert_eq!(reply.response.parts.len(), 4);
        assert_eq!(reply.response.parts[0], ResponsePart::Text("Total is".to_string()));
        assert!(matches!(reply.response.parts[1], ResponsePart::Number(_)));
        assert!(matches!(reply.response.parts[2], ResponsePart::Table(_)));
        assert!(matches!(reply.response.parts[3], ResponsePart::Plot(_)));
        assert_eq!(reply.follow_ups[0].id, "1");
    }

    #[test]
    fn bare_text_and_missing_response_are_accepted() {
        let data: WireChatData = serde_json::from_str(r#"{"response": "hi"}"#).unwrap();
        assert_eq!(data.into_reply().response, AiResponse::text("hi"));

        let data: WireChatData =
            serde_json::from_str(r#"{"response": null, "follow_up_questions": []}"#).unwrap();
        let reply = data.into_reply();
        assert!(reply.response.is_empty());
        assert!(reply.follow_ups.is_empty());
    }

    #[test]
    fn unknown_part_types_fall_back_to_text() {
        let part: WirePart = serde_json::from_str(r#"{"type": "mystery", "value": [1, 2]}"#).unwrap();
        assert_eq!(part.into_part(), ResponsePart::Text("[1,2]".to_string()));
    }

    #[test]
    fn history_records_expand_into_query_and_response() {
        let data: WireHistoryData = serde_json::from_str(
            r#"{"messages": [
                {"id": 7, "query": "q1", "response": "a1", "created_at": "2024-03-01T10:00:00.123456"},
                {"id": "8", "query": "q2", "response": [{"type": "string", "value": "a2"}]}
            ]}"#,
        )
        .unwrap();
        let request = HistoryRequest {
            conversation_id: "c".to_string(),
            cursor: HistoryCursor { skip: 4 },
            limit: 2,
        };
        let page = data.into_page(&request);

        let ids: Vec<_> = page.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["7-q", "7-r", "8-q", "8-r"]);
        assert_eq!(page.next_cursor, Some(HistoryCursor { skip: 6 }));
        assert_eq!(page.messages[0].timestamp.to_rfc3339(), "2024-03-01T10:00:00.123456+00:00");
    }

    #[test]
    fn short_page_ends_history() {
        let data: WireHistoryData = serde_json::from_str(r#"{"messages": []}"#).unwrap();
        let request = HistoryRequest {
            conversation_id: "c".to_string(),
            cursor: HistoryCursor::START,
            limit: 2,
        };
        assert_eq!(data.into_page(&request).next_cursor, None);
    }

    #[test]
    fn backend_error_uses_message_and_code() {
        let err = backend_error(
            reqwest::StatusCode::BAD_REQUEST,
            br#"{"error_code": "INVALID_QUERY", "message": "Cannot answer"}"#,
        );
        match err {
            ApiError::Backend { status, code, message } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("INVALID_QUERY"));
                assert_eq!(message, "Cannot answer");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn backend_error_falls_back_to_raw_body_or_reason() {
        let err = backend_error(reqwest::StatusCode::BAD_GATEWAY, b"upstream down");
        assert!(matches!(err, ApiError::Backend { ref message, .. } if message == "upstream down"));

        let err = backend_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, b"");
        assert!(
            matches!(err, ApiError::Backend { ref message, .. } if message == "Service Unavailable")
        );
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let backend =
            HttpBackend::new("http://localhost:8000/api", None, Duration::from_secs(1)).unwrap();
        assert_eq!(
            backend.url("v1/chat").unwrap().as_str(),
            "http://localhost:8000/api/v1/chat"
        );
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let backend = HttpBackend::new(
            "http://localhost:8000",
            Some("sk-secret".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        let rendered = format!("{backend:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
