//! Domain types exchanged with the event store.
//!
//! These mirror the wire messages but use Rust-native shapes: JSON payloads are
//! [`serde_json::Value`]s, timestamps are [`chrono::DateTime`]s, and absent
//! optional fields are `Option`s rather than zero values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use snafu::ResultExt;

use crate::error::{EncodeSnafu, Result};

/// Coordinate in the global append log.
///
/// Positions order first by commit position, then by prepare position.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    /// Commit position in the log.
    pub commit_position: i64,
    /// Prepare position in the log.
    pub prepare_position: i64,
}

impl Position {
    /// Creates a position from its two coordinates.
    #[must_use]
    pub const fn new(commit_position: i64, prepare_position: i64) -> Self {
        Self { commit_position, prepare_position }
    }
}

/// A `key = value` tag an event must carry to match a [`Criterion`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Creates a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Set of tags that must all match (AND).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Criterion {
    /// Tags, all of which must match.
    pub tags: Vec<Tag>,
}

impl Criterion {
    /// Creates a criterion matching events that carry every tag.
    pub fn all(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self { tags: tags.into_iter().collect() }
    }
}

/// Tag filter: events match if any criterion matches (OR of ANDs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    /// Criteria, any of which may match.
    pub criteria: Vec<Criterion>,
}

impl Query {
    /// Creates a query matching any of the criteria.
    pub fn any(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Self { criteria: criteria.into_iter().collect() }
    }

    /// Creates a query matching events carrying a single tag.
    pub fn tag(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::any([Criterion::all([Tag::new(key, value)])])
    }
}

/// Read order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Oldest first.
    #[default]
    Asc,
    /// Newest first.
    Desc,
}

/// Optimistic-concurrency precondition for an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedVersion {
    /// The stream must not exist yet. Sent as `-1`.
    NoStream,
    /// The stream must currently be at this version.
    Exact(i64),
}

impl ExpectedVersion {
    /// Returns the wire encoding of the precondition.
    #[must_use]
    pub fn to_wire(self) -> i64 {
        match self {
            Self::NoStream => -1,
            Self::Exact(version) => version,
        }
    }
}

impl From<i64> for ExpectedVersion {
    fn from(version: i64) -> Self {
        if version < 0 { Self::NoStream } else { Self::Exact(version) }
    }
}

/// An event to append.
#[derive(Debug, Clone, PartialEq)]
pub struct EventToSave {
    /// Client-assigned unique id.
    pub event_id: String,
    /// Event type name.
    pub event_type: String,
    /// JSON payload. `null` is rejected on append.
    pub data: Value,
    /// String metadata. Sent as `{}` when empty.
    pub metadata: BTreeMap<String, String>,
}

impl EventToSave {
    /// Creates an event from a JSON payload.
    pub fn new(event_id: impl Into<String>, event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            data,
            metadata: BTreeMap::new(),
        }
    }

    /// Creates an event from any serializable payload.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Encode`](crate::SdkError::Encode) if `data` cannot be
    /// represented as JSON.
    pub fn json<T: Serialize>(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        data: &T,
    ) -> Result<Self> {
        let event_id = event_id.into();
        let data = serde_json::to_value(data).context(EncodeSnafu { event_id: event_id.clone() })?;
        Ok(Self::new(event_id, event_type, data))
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A JSON field of a received event.
///
/// Malformed text is kept as [`Payload::Raw`] so one bad record never hides the
/// rest of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Well-formed JSON.
    Decoded(Value),
    /// Text that failed to parse, with the parser's message.
    Raw {
        /// Undecoded text as received.
        raw: String,
        /// Why decoding failed.
        error: String,
    },
}

impl Payload {
    /// Returns the decoded value, if decoding succeeded.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Decoded(value) => Some(value),
            Self::Raw { .. } => None,
        }
    }

    /// Returns true if the text failed to decode.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw { .. })
    }

    /// Deserializes the payload into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload does not match `T` or was malformed.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        match self {
            Self::Decoded(value) => T::deserialize(value),
            Self::Raw { raw, .. } => serde_json::from_str(raw),
        }
    }
}

/// An event read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Client-assigned unique id.
    pub event_id: String,
    /// Event type name.
    pub event_type: String,
    /// Decoded payload.
    pub data: Payload,
    /// Decoded metadata.
    pub metadata: Payload,
    /// Stream the event belongs to.
    pub stream_id: String,
    /// Stream-local version.
    pub version: i64,
    /// Global log position.
    pub position: Position,
    /// When the server stored the event.
    pub date_created: DateTime<Utc>,
}

impl Event {
    /// Returns the metadata as a string map, if it decoded to a JSON object.
    ///
    /// Non-string values are rendered as JSON text.
    #[must_use]
    pub fn metadata_map(&self) -> Option<BTreeMap<String, String>> {
        let Value::Object(object) = self.metadata.as_value()? else {
            return None;
        };
        Some(
            object
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect(),
        )
    }
}

/// Outcome of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResult {
    /// Position of the last appended event.
    pub log_position: Position,
    /// Version of the stream after the append, when reported.
    pub new_stream_version: Option<i64>,
}

/// Request to append events to one stream.
#[derive(Debug, Clone, bon::Builder)]
pub struct SaveEventsRequest {
    /// Boundary holding the stream.
    #[builder(into)]
    pub boundary: String,
    /// Stream name.
    #[builder(into)]
    pub stream: String,
    /// Concurrency precondition.
    pub expected_version: ExpectedVersion,
    /// Restricts the concurrency check to events matching this query.
    pub subset_query: Option<Query>,
    /// Events to append, in order.
    pub events: Vec<EventToSave>,
}

/// Request to read events.
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct GetEventsRequest {
    /// Boundary to read from.
    #[builder(into)]
    pub boundary: String,
    /// Restricts the read to one stream.
    #[builder(into)]
    pub stream: Option<String>,
    /// First stream version to return. Requires `stream`.
    pub from_version: Option<i64>,
    /// Tag filter.
    pub query: Option<Query>,
    /// Log position to start from.
    pub from_position: Option<Position>,
    /// Maximum number of events (default 100, must be positive).
    pub count: Option<u32>,
    /// Read order.
    #[builder(default)]
    pub direction: Direction,
}

/// Request to follow every event of a boundary.
#[derive(Debug, Clone, bon::Builder)]
pub struct SubscribeToAllRequest {
    /// Boundary to follow.
    #[builder(into)]
    pub boundary: String,
    /// Name identifying the subscriber to the server.
    #[builder(into)]
    pub subscriber_name: String,
    /// Only events after this position are delivered.
    pub after_position: Option<Position>,
    /// Tag filter.
    pub query: Option<Query>,
}

/// Request to follow one stream.
#[derive(Debug, Clone, bon::Builder)]
pub struct SubscribeToStreamRequest {
    /// Boundary holding the stream.
    #[builder(into)]
    pub boundary: String,
    /// Name identifying the subscriber to the server.
    #[builder(into)]
    pub subscriber_name: String,
    /// Stream to follow.
    #[builder(into)]
    pub stream: String,
    /// Only events after this version are delivered (default 0).
    pub after_version: Option<i64>,
    /// Tag filter.
    pub query: Option<Query>,
}

/// A user allowed to administer the event store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    /// Server-assigned id.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Login name.
    pub username: String,
    /// Granted roles.
    pub roles: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Request to create a user.
#[derive(Debug, Clone, bon::Builder)]
pub struct CreateUserRequest {
    /// Display name.
    #[builder(into)]
    pub name: String,
    /// Login name.
    #[builder(into)]
    pub username: String,
    /// Initial password.
    #[builder(into)]
    pub password: String,
    /// Granted roles.
    #[builder(default)]
    pub roles: Vec<String>,
}

/// Request to change a user's password.
#[derive(Debug, Clone, bon::Builder)]
pub struct ChangePasswordRequest {
    /// User to update.
    #[builder(into)]
    pub user_id: String,
    /// Password currently set.
    #[builder(into)]
    pub current_password: String,
    /// Replacement password.
    #[builder(into)]
    pub new_password: String,
}

/// Result of checking a username and password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsValidation {
    /// Whether the credentials are valid.
    pub success: bool,
    /// The matching user, when valid.
    pub user: Option<AdminUser>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(1, 9) < Position::new(2, 0));
        assert!(Position::new(2, 1) < Position::new(2, 2));
        assert_eq!(Position::default(), Position::new(0, 0));
    }

    #[test]
    fn test_query_tag() {
        let query = Query::tag("tenant", "acme");
        assert_eq!(query.criteria.len(), 1);
        assert_eq!(query.criteria[0].tags, vec![Tag::new("tenant", "acme")]);
    }

    #[test]
    fn test_expected_version_wire() {
        assert_eq!(ExpectedVersion::NoStream.to_wire(), -1);
        assert_eq!(ExpectedVersion::Exact(4).to_wire(), 4);
        assert_eq!(ExpectedVersion::from(-1), ExpectedVersion::NoStream);
        assert_eq!(ExpectedVersion::from(0), ExpectedVersion::Exact(0));
    }

    #[test]
    fn test_event_to_save_json() {
        #[derive(Serialize)]
        struct Created {
            x: u32,
        }

        let event = EventToSave::json("e1", "Created", &Created { x: 1 })
            .unwrap()
            .with_metadata("source", "test");
        assert_eq!(event.data, json!({"x": 1}));
        assert_eq!(event.metadata.get("source").map(String::as_str), Some("test"));
    }

    #[test]
    fn test_payload_deserialize() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Created {
            x: u32,
        }

        let payload = Payload::Decoded(json!({"x": 7}));
        assert_eq!(payload.deserialize::<Created>().unwrap(), Created { x: 7 });

        let raw = Payload::Raw { raw: "{not json".to_owned(), error: "eof".to_owned() };
        assert!(raw.is_raw());
        assert!(raw.as_value().is_none());
        assert!(raw.deserialize::<Created>().is_err());
    }

    #[test]
    fn test_get_events_builder_defaults() {
        let request = GetEventsRequest::builder().boundary("b1").stream("s1").build();
        assert_eq!(request.stream.as_deref(), Some("s1"));
        assert_eq!(request.direction, Direction::Asc);
        assert!(request.count.is_none());
    }
}
