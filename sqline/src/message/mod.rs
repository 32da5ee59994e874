//! Frontend requests and the backend response envelope.
//!
//! All communication is a stream of newline-terminated JSON messages, UTF-8
//! encoded. A request names its kind in the `qtype` field:
//!
//! ```text
//! {"qtype":"CREATE_CURSOR"}
//! {"qtype":"QUERY","id":7,"query":"SELECT 1"}
//! {"qtype":"FETCH","id":7,"num":10}
//! ```
//!
//! Every response is a single envelope line. Successful cursor creation
//! carries `status: "SUCCESS"` and `cur_id`; query and fetch responses carry
//! `fields`, `row_count` and `data`; failures carry a non-null `error` and a
//! `message`. An empty `data` array signals exhaustion.
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

use crate::row::Field;

/// Rows a `FETCH` asks for when the caller does not specify.
pub const DEFAULT_FETCH_NUM: u32 = 10;

/// Status reported on successful cursor creation.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Server-assigned opaque cursor handle.
///
/// Kept as raw JSON so numeric and string ids both round-trip untouched.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorId(Json);

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorId").field(&self.0).finish()
    }
}

/// A frontend request, one JSON line on the wire.
#[derive(Debug, Serialize)]
#[serde(tag = "qtype")]
pub enum Request<'q> {
    #[serde(rename = "CREATE_CURSOR")]
    CreateCursor,
    #[serde(rename = "QUERY")]
    Query { id: &'q CursorId, query: &'q str },
    #[serde(rename = "FETCH")]
    Fetch { id: &'q CursorId, num: u32 },
}

/// Raw response envelope.
///
/// Which fields are present depends on the request kind; typed views are
/// assembled through [`FromEnvelope`].
#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cur_id: Option<CursorId>,
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub data: Option<Vec<Vec<Json>>>,
    #[serde(default)]
    pub error: Option<Json>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// Parse one response line, without its terminator.
    pub fn parse(line: &[u8]) -> Result<Envelope, ProtocolError> {
        serde_json::from_slice(line).map_err(ProtocolError::Json)
    }

    /// Server-reported failure carried by this envelope, if any.
    pub fn error(&self) -> Option<ErrorResponse> {
        let error = self.error.as_ref()?;
        let message = match &self.message {
            Some(message) => message.clone().into_boxed_str(),
            None => match error {
                Json::String(text) => text.clone().into_boxed_str(),
                other => other.to_string().into_boxed_str(),
            },
        };
        Some(ErrorResponse { message })
    }
}

/// Parse and screen one response line.
///
/// A server-reported failure comes back as [`Err`] no matter which typed
/// response was requested.
pub(crate) fn decode<R: FromEnvelope>(line: &[u8]) -> crate::Result<R> {
    let envelope = Envelope::parse(line)?;
    if let Some(error) = envelope.error() {
        return Err(error.into());
    }
    Ok(R::from_envelope(envelope)?)
}

/// A typed response assembled from a raw [`Envelope`].
pub trait FromEnvelope: Sized {
    fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError>;
}

impl FromEnvelope for Envelope {
    fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        Ok(envelope)
    }
}

/// Successful `CREATE_CURSOR` response.
#[derive(Debug)]
pub struct CursorCreated {
    pub cur_id: CursorId,
}

impl FromEnvelope for CursorCreated {
    fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let status = envelope.status.ok_or(ProtocolError::Missing("status"))?;
        if status != STATUS_SUCCESS {
            return Err(ProtocolError::Status(status.into_boxed_str()));
        }
        let cur_id = envelope.cur_id.ok_or(ProtocolError::Missing("cur_id"))?;
        Ok(CursorCreated { cur_id })
    }
}

/// Response to `QUERY` and `FETCH`: column descriptors and a page of rows.
#[derive(Debug)]
pub struct RowSet {
    pub fields: Vec<Field>,
    pub row_count: u64,
    pub data: Vec<Vec<Json>>,
}

impl FromEnvelope for RowSet {
    fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        Ok(RowSet {
            fields: envelope.fields.ok_or(ProtocolError::Missing("fields"))?,
            row_count: envelope.row_count.ok_or(ProtocolError::Missing("row_count"))?,
            data: envelope.data.ok_or(ProtocolError::Missing("data"))?,
        })
    }
}

/// Failure reported by the server for a request.
pub struct ErrorResponse {
    message: Box<str>,
}

impl ErrorResponse {
    /// The server's message text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for ErrorResponse { }

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Malformed or unexpected response envelope.
pub enum ProtocolError {
    /// Response line is not valid JSON.
    Json(serde_json::Error),
    /// A field the response kind requires is absent.
    Missing(&'static str),
    /// Cursor creation reported a status other than `SUCCESS`.
    Status(Box<str>),
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unexpected response, ")?;
        match self {
            Self::Json(e) => write!(f, "invalid json: {e}"),
            Self::Missing(field) => write!(f, "missing field {field:?}"),
            Self::Status(status) => write!(f, "status {status:?}"),
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn cursor_id(value: Json) -> CursorId {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn request_shapes() {
        let out = serde_json::to_value(Request::CreateCursor).unwrap();
        assert_eq!(out, json!({"qtype": "CREATE_CURSOR"}));

        let id = cursor_id(json!(7));
        let out = serde_json::to_value(Request::Query { id: &id, query: "SELECT 1" }).unwrap();
        assert_eq!(out, json!({"qtype": "QUERY", "id": 7, "query": "SELECT 1"}));

        let out = serde_json::to_value(Request::Fetch { id: &id, num: 10 }).unwrap();
        assert_eq!(out, json!({"qtype": "FETCH", "id": 7, "num": 10}));
    }

    #[test]
    fn cursor_created() {
        let created: CursorCreated =
            decode(br#"{"status": "SUCCESS", "cur_id": 7}"#).unwrap();
        assert_eq!(created.cur_id, cursor_id(json!(7)));

        // string ids round-trip untouched
        let created: CursorCreated =
            decode(br#"{"status": "SUCCESS", "cur_id": "c-7"}"#).unwrap();
        assert_eq!(created.cur_id, cursor_id(json!("c-7")));
    }

    #[test]
    fn cursor_creation_failure() {
        let err = decode::<CursorCreated>(
            br#"{"status": "FAIL", "error": "no cursor slots", "message": "no cursor slots"}"#,
        )
        .unwrap_err();
        match err.kind() {
            ErrorKind::Database(response) => assert_eq!(response.message(), "no cursor slots"),
            other => panic!("expected database error, got {other:?}"),
        }

        // status-only failure still refuses to build a cursor
        let err = decode::<CursorCreated>(br#"{"status": "FAIL"}"#).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Protocol(ProtocolError::Status(_))));
    }

    #[test]
    fn error_envelope_without_message() {
        let envelope = Envelope::parse(br#"{"error": "went sideways"}"#).unwrap();
        assert_eq!(envelope.error().unwrap().message(), "went sideways");

        let envelope = Envelope::parse(br#"{"error": null, "data": []}"#).unwrap();
        assert!(envelope.error().is_none());
    }

    #[test]
    fn row_set_requires_data() {
        let set: RowSet = decode(
            br#"{"fields": ["id", "name"], "row_count": 2, "data": [[1, "a"], [2, "b"]]}"#,
        )
        .unwrap();
        assert_eq!(set.row_count, 2);
        assert_eq!(set.data.len(), 2);

        let err = decode::<RowSet>(br#"{"fields": [], "row_count": 0}"#).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Protocol(ProtocolError::Missing("data"))
        ));
    }

    #[test]
    fn junk_line() {
        let err = decode::<Envelope>(b"not json").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Protocol(ProtocolError::Json(_))));
    }
}
