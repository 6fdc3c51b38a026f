//! Translation between domain requests and wire messages.
//!
//! Outbound translators validate the request shape and fail with
//! [`SdkError::Validation`](crate::SdkError::Validation) before anything is sent.
//! Inbound translators never drop an event over malformed JSON: the text is kept
//! as [`Payload::Raw`] and the parse failure is handed back to the caller.

use chrono::{DateTime, Utc};
use orisun_proto::{admin as admin_wire, eventstore as wire};
use serde_json::Value;
use snafu::{IntoError, ResultExt, ensure};

use crate::{
    error::{DecodeSnafu, EncodeSnafu, Result, SdkError, ValidationSnafu},
    types::{
        AdminUser, ChangePasswordRequest, CreateUserRequest, Criterion, Direction, Event,
        GetEventsRequest, Payload, Position, Query, SaveEventsRequest, SubscribeToAllRequest,
        SubscribeToStreamRequest, Tag, WriteResult,
    },
};

/// Number of events returned by a read that does not set `count`.
pub(crate) const DEFAULT_READ_COUNT: u32 = 100;

/// Fails with `message` if `value` is empty or whitespace.
fn require(value: &str, message: &str) -> Result<()> {
    ensure!(!value.trim().is_empty(), ValidationSnafu { message });
    Ok(())
}

pub(crate) fn save_events_request(request: &SaveEventsRequest) -> Result<wire::SaveEventsRequest> {
    require(&request.boundary, "Boundary is required")?;
    require(&request.stream, "Stream name is required")?;
    ensure!(
        !request.events.is_empty(),
        ValidationSnafu { message: "At least one event is required" }
    );

    let mut events = Vec::with_capacity(request.events.len());
    for (index, event) in request.events.iter().enumerate() {
        require(&event.event_id, &format!("Event at index {index} is missing event_id"))?;
        require(&event.event_type, &format!("Event at index {index} is missing event_type"))?;
        ensure!(
            !event.data.is_null(),
            ValidationSnafu { message: format!("Event at index {index} is missing data") }
        );

        let encode = || EncodeSnafu { event_id: event.event_id.clone() };
        events.push(wire::EventToSave {
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            data: serde_json::to_string(&event.data).context(encode())?,
            metadata: serde_json::to_string(&event.metadata).context(encode())?,
        });
    }

    Ok(wire::SaveEventsRequest {
        boundary: request.boundary.clone(),
        stream: Some(wire::SaveStreamQuery {
            name: request.stream.clone(),
            expected_version: request.expected_version.to_wire(),
            subset_query: request.subset_query.as_ref().map(query_to_wire),
        }),
        events,
    })
}

pub(crate) fn get_events_request(request: &GetEventsRequest) -> Result<wire::GetEventsRequest> {
    require(&request.boundary, "Boundary is required")?;
    if let Some(ref stream) = request.stream {
        require(stream, "Stream name is required when stream is specified")?;
    }
    ensure!(
        request.from_version.is_none() || request.stream.is_some(),
        ValidationSnafu { message: "from_version requires a stream" }
    );
    if let Some(count) = request.count {
        ensure!(count > 0, ValidationSnafu { message: "Count must be greater than 0" });
    }

    let direction = match request.direction {
        Direction::Asc => wire::Direction::Asc,
        Direction::Desc => wire::Direction::Desc,
    };

    Ok(wire::GetEventsRequest {
        query: request.query.as_ref().map(query_to_wire),
        from_position: request.from_position.map(position_to_wire),
        count: request.count.unwrap_or(DEFAULT_READ_COUNT),
        direction: direction as i32,
        boundary: request.boundary.clone(),
        stream: request.stream.as_ref().map(|name| wire::GetStreamQuery {
            name: name.clone(),
            from_version: request.from_version.unwrap_or(0),
        }),
    })
}

pub(crate) fn subscribe_all_request(
    request: &SubscribeToAllRequest,
) -> Result<wire::CatchUpSubscribeToEventStoreRequest> {
    require(&request.boundary, "Boundary is required")?;
    require(&request.subscriber_name, "Subscriber name is required")?;

    Ok(wire::CatchUpSubscribeToEventStoreRequest {
        after_position: request.after_position.map(position_to_wire),
        query: request.query.as_ref().map(query_to_wire),
        subscriber_name: request.subscriber_name.clone(),
        boundary: request.boundary.clone(),
    })
}

pub(crate) fn subscribe_stream_request(
    request: &SubscribeToStreamRequest,
) -> Result<wire::CatchUpSubscribeToStreamRequest> {
    require(&request.boundary, "Boundary is required")?;
    require(&request.subscriber_name, "Subscriber name is required")?;
    require(&request.stream, "Stream name is required")?;

    Ok(wire::CatchUpSubscribeToStreamRequest {
        query: request.query.as_ref().map(query_to_wire),
        subscriber_name: request.subscriber_name.clone(),
        boundary: request.boundary.clone(),
        stream: request.stream.clone(),
        after_version: request.after_version.unwrap_or(0),
    })
}

fn query_to_wire(query: &Query) -> wire::Query {
    wire::Query {
        criteria: query
            .criteria
            .iter()
            .map(|criterion| wire::Criterion {
                tags: criterion
                    .tags
                    .iter()
                    .map(|tag| wire::Tag { key: tag.key.clone(), value: tag.value.clone() })
                    .collect(),
            })
            .collect(),
    }
}

fn position_to_wire(position: Position) -> wire::Position {
    wire::Position {
        commit_position: position.commit_position,
        prepare_position: position.prepare_position,
    }
}

fn position_from_wire(position: Option<wire::Position>) -> Position {
    position
        .map(|p| Position::new(p.commit_position, p.prepare_position))
        .unwrap_or_default()
}

pub(crate) fn write_result_from_wire(result: wire::WriteResult) -> WriteResult {
    WriteResult {
        log_position: position_from_wire(result.log_position),
        new_stream_version: result.new_stream_version,
    }
}

/// Converts a wire timestamp to an instant: `seconds * 1000 + floor(nanos / 1e6)` ms.
///
/// A missing or unrepresentable timestamp yields the current time.
pub(crate) fn timestamp_to_datetime(timestamp: Option<&prost_types::Timestamp>) -> DateTime<Utc> {
    timestamp
        .and_then(|ts| {
            let millis = ts
                .seconds
                .checked_mul(1000)?
                .checked_add(i64::from(ts.nanos).div_euclid(1_000_000))?;
            DateTime::from_timestamp_millis(millis)
        })
        .unwrap_or_else(Utc::now)
}

/// Decodes metadata text. Empty text is an empty object.
fn parse_metadata(text: &str) -> serde_json::Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(text)
}

/// Keeps malformed text as [`Payload::Raw`], handing back the parse error.
fn lenient(
    text: String,
    parsed: serde_json::Result<Value>,
) -> (Payload, Option<serde_json::Error>) {
    match parsed {
        Ok(value) => (Payload::Decoded(value), None),
        Err(e) => (Payload::Raw { raw: text, error: e.to_string() }, Some(e)),
    }
}

/// Decodes a wire event. Malformed JSON is kept as [`Payload::Raw`] and the
/// first failure is returned as [`SdkError::Decode`](crate::SdkError::Decode).
pub(crate) fn decode_event(event: wire::Event) -> (Event, Option<SdkError>) {
    let (data, data_err) = lenient(event.data.clone(), serde_json::from_str(&event.data));
    let (metadata, metadata_err) =
        lenient(event.metadata.clone(), parse_metadata(&event.metadata));

    let failure = data_err.or(metadata_err).map(|source| {
        DecodeSnafu { event_id: event.event_id.clone(), event_type: event.event_type.clone() }
            .into_error(source)
    });
    (build_event(event, data, metadata), failure)
}

/// Decodes a read result, keeping malformed JSON as [`Payload::Raw`].
pub(crate) fn event_from_wire(event: wire::Event) -> Event {
    decode_event(event).0
}

fn build_event(event: wire::Event, data: Payload, metadata: Payload) -> Event {
    Event {
        date_created: timestamp_to_datetime(event.date_created.as_ref()),
        position: position_from_wire(event.position),
        event_id: event.event_id,
        event_type: event.event_type,
        data,
        metadata,
        stream_id: event.stream_id,
        version: event.version,
    }
}

pub(crate) fn create_user_request(
    request: &CreateUserRequest,
) -> Result<admin_wire::CreateUserRequest> {
    require(&request.name, "Name is required")?;
    require(&request.username, "Username is required")?;
    require(&request.password, "Password is required")?;

    Ok(admin_wire::CreateUserRequest {
        name: request.name.clone(),
        username: request.username.clone(),
        password: request.password.clone(),
        roles: request.roles.clone(),
    })
}

pub(crate) fn delete_user_request(user_id: &str) -> Result<admin_wire::DeleteUserRequest> {
    require(user_id, "User ID is required")?;
    Ok(admin_wire::DeleteUserRequest { user_id: user_id.to_owned() })
}

pub(crate) fn change_password_request(
    request: &ChangePasswordRequest,
) -> Result<admin_wire::ChangePasswordRequest> {
    require(&request.user_id, "User ID is required")?;
    require(&request.current_password, "Current password is required")?;
    require(&request.new_password, "New password is required")?;

    Ok(admin_wire::ChangePasswordRequest {
        user_id: request.user_id.clone(),
        current_password: request.current_password.clone(),
        new_password: request.new_password.clone(),
    })
}

pub(crate) fn validate_credentials_request(
    username: &str,
    password: &str,
) -> Result<admin_wire::ValidateCredentialsRequest> {
    require(username, "Username is required")?;
    require(password, "Password is required")?;
    Ok(admin_wire::ValidateCredentialsRequest {
        username: username.to_owned(),
        password: password.to_owned(),
    })
}

pub(crate) fn event_count_request(boundary: &str) -> Result<admin_wire::GetEventCountRequest> {
    require(boundary, "Boundary is required")?;
    Ok(admin_wire::GetEventCountRequest { boundary: boundary.to_owned() })
}

pub(crate) fn admin_user_from_wire(user: admin_wire::AdminUser) -> AdminUser {
    AdminUser {
        created_at: timestamp_to_datetime(user.created_at.as_ref()),
        updated_at: timestamp_to_datetime(user.updated_at.as_ref()),
        user_id: user.user_id,
        name: user.name,
        username: user.username,
        roles: user.roles,
    }
}

/// Inverse of `query_to_wire`, used by the mock server.
pub(crate) fn query_from_wire(query: &wire::Query) -> Query {
    Query::any(query.criteria.iter().map(|criterion| {
        Criterion::all(criterion.tags.iter().map(|tag| Tag::new(&tag.key, &tag.value)))
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::{
        SdkError,
        types::{EventToSave, ExpectedVersion},
    };

    fn save_request(events: Vec<EventToSave>) -> SaveEventsRequest {
        SaveEventsRequest::builder()
            .boundary("b1")
            .stream("s1")
            .expected_version(ExpectedVersion::NoStream)
            .events(events)
            .build()
    }

    fn validation_message(err: SdkError) -> String {
        match err {
            SdkError::Validation { message } => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn wire_event(data: &str, metadata: &str) -> wire::Event {
        wire::Event {
            event_id: "e1".to_owned(),
            event_type: "Created".to_owned(),
            data: data.to_owned(),
            metadata: metadata.to_owned(),
            position: Some(wire::Position { commit_position: 5, prepare_position: 5 }),
            date_created: Some(prost_types::Timestamp {
                seconds: 1_700_000_000,
                nanos: 123_999_999,
            }),
            stream_id: "s1".to_owned(),
            version: 1,
        }
    }

    #[test]
    fn test_save_events_translation() {
        let request = SaveEventsRequest::builder()
            .boundary("b1")
            .stream("s1")
            .expected_version(ExpectedVersion::NoStream)
            .subset_query(Query::tag("k", "v"))
            .events(vec![
                EventToSave::new("e1", "Created", json!({"x": 1})).with_metadata("a", "b"),
            ])
            .build();

        let wire = save_events_request(&request).unwrap();
        let stream = wire.stream.unwrap();
        assert_eq!(wire.boundary, "b1");
        assert_eq!(stream.name, "s1");
        assert_eq!(stream.expected_version, -1);
        assert_eq!(stream.subset_query.unwrap().criteria[0].tags[0].key, "k");
        assert_eq!(wire.events[0].data, r#"{"x":1}"#);
        assert_eq!(wire.events[0].metadata, r#"{"a":"b"}"#);
    }

    #[test]
    fn test_absent_metadata_encodes_empty_object() {
        let request = save_request(vec![EventToSave::new("e1", "T", json!(1))]);
        let wire = save_events_request(&request).unwrap();
        assert_eq!(wire.events[0].metadata, "{}");
    }

    #[test]
    fn test_save_events_validation() {
        let err = save_events_request(&save_request(vec![])).unwrap_err();
        assert_eq!(validation_message(err), "At least one event is required");

        let mut request = save_request(vec![EventToSave::new("e1", "T", json!(1))]);
        request.boundary = String::new();
        assert_eq!(
            validation_message(save_events_request(&request).unwrap_err()),
            "Boundary is required"
        );

        let mut request = save_request(vec![EventToSave::new("e1", "T", json!(1))]);
        request.stream = " ".to_owned();
        assert_eq!(
            validation_message(save_events_request(&request).unwrap_err()),
            "Stream name is required"
        );

        let request = save_request(vec![
            EventToSave::new("e1", "T", json!(1)),
            EventToSave::new("", "T", json!(1)),
        ]);
        assert_eq!(
            validation_message(save_events_request(&request).unwrap_err()),
            "Event at index 1 is missing event_id"
        );

        let request = save_request(vec![EventToSave::new("e1", "", json!(1))]);
        let message = validation_message(save_events_request(&request).unwrap_err());
        assert!(message.contains("event_type"));

        let request = save_request(vec![EventToSave::new("e1", "T", Value::Null)]);
        assert_eq!(
            validation_message(save_events_request(&request).unwrap_err()),
            "Event at index 0 is missing data"
        );
    }

    #[test]
    fn test_get_events_defaults() {
        let wire = get_events_request(&GetEventsRequest::builder().boundary("b1").build()).unwrap();
        assert_eq!(wire.count, DEFAULT_READ_COUNT);
        assert_eq!(wire.direction, 0);
        assert!(wire.stream.is_none());
        assert!(wire.query.is_none());
    }

    #[test]
    fn test_get_events_stream_and_direction() {
        let request = GetEventsRequest::builder()
            .boundary("b1")
            .stream("s1")
            .from_version(3)
            .count(1)
            .direction(Direction::Desc)
            .from_position(Position::new(7, 8))
            .build();
        let wire = get_events_request(&request).unwrap();

        assert_eq!(wire.count, 1);
        assert_eq!(wire.direction, 1);
        let stream = wire.stream.unwrap();
        assert_eq!(stream.name, "s1");
        assert_eq!(stream.from_version, 3);
        assert_eq!(wire.from_position.unwrap().commit_position, 7);
    }

    #[test]
    fn test_get_events_validation() {
        let err = get_events_request(&GetEventsRequest::builder().boundary("b1").count(0).build());
        assert_eq!(validation_message(err.unwrap_err()), "Count must be greater than 0");

        let request = GetEventsRequest::builder().boundary("b1").stream("").build();
        let err = get_events_request(&request);
        assert_eq!(
            validation_message(err.unwrap_err()),
            "Stream name is required when stream is specified"
        );

        let request = GetEventsRequest::builder().boundary("b1").from_version(2).build();
        let err = get_events_request(&request);
        assert!(err.is_err());

        let err = get_events_request(&GetEventsRequest::builder().boundary("").build());
        assert_eq!(validation_message(err.unwrap_err()), "Boundary is required");
    }

    #[test]
    fn test_subscribe_validation() {
        let request = SubscribeToAllRequest::builder().boundary("b1").subscriber_name("").build();
        assert_eq!(
            validation_message(subscribe_all_request(&request).unwrap_err()),
            "Subscriber name is required"
        );

        let request = SubscribeToStreamRequest::builder()
            .boundary("b1")
            .subscriber_name("sub")
            .stream("")
            .build();
        assert_eq!(
            validation_message(subscribe_stream_request(&request).unwrap_err()),
            "Stream name is required"
        );

        let request = SubscribeToStreamRequest::builder()
            .boundary("b1")
            .subscriber_name("sub")
            .stream("s1")
            .build();
        assert_eq!(subscribe_stream_request(&request).unwrap().after_version, 0);
    }

    #[test]
    fn test_event_from_wire() {
        let event = event_from_wire(wire_event(r#"{"x":1}"#, r#"{"source":"test"}"#));

        assert_eq!(event.version, 1);
        assert_eq!(event.position, Position::new(5, 5));
        assert_eq!(event.data, Payload::Decoded(json!({"x": 1})));
        assert_eq!(event.metadata_map().unwrap().get("source").unwrap(), "test");
        assert_eq!(event.date_created.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_malformed_read_kept_raw() {
        let event = event_from_wire(wire_event("{not json", ""));

        match event.data {
            Payload::Raw { ref raw, ref error } => {
                assert_eq!(raw, "{not json");
                assert!(!error.is_empty());
            },
            ref other => panic!("expected raw payload, got {other:?}"),
        }
        assert_eq!(event.metadata, Payload::Decoded(json!({})));
    }

    #[test]
    fn test_decode_event_reports_failure() {
        let (event, failure) = decode_event(wire_event("{not json", "{}"));
        assert!(event.data.is_raw());
        match failure {
            Some(SdkError::Decode { event_id, event_type, .. }) => {
                assert_eq!(event_id, "e1");
                assert_eq!(event_type, "Created");
            },
            other => panic!("expected decode error, got {other:?}"),
        }

        let (event, failure) = decode_event(wire_event("{}", "[oops"));
        assert!(event.metadata.is_raw());
        assert!(failure.is_some());

        assert!(decode_event(wire_event("{}", "")).1.is_none());
    }

    #[test]
    fn test_timestamp_conversion() {
        let ts = prost_types::Timestamp { seconds: 2, nanos: 999_999 };
        assert_eq!(timestamp_to_datetime(Some(&ts)).timestamp_millis(), 2000);

        let before = Utc::now();
        let missing = timestamp_to_datetime(None);
        assert!(missing >= before);
    }

    #[test]
    fn test_admin_validation() {
        let request = CreateUserRequest::builder().name("n").username("").password("p").build();
        assert_eq!(
            validation_message(create_user_request(&request).unwrap_err()),
            "Username is required"
        );

        assert_eq!(validation_message(delete_user_request("").unwrap_err()), "User ID is required");

        let request = ChangePasswordRequest::builder()
            .user_id("u1")
            .current_password("old")
            .new_password("")
            .build();
        assert_eq!(
            validation_message(change_password_request(&request).unwrap_err()),
            "New password is required"
        );

        assert!(validate_credentials_request("admin", "").is_err());
        assert!(event_count_request("").is_err());
        assert_eq!(event_count_request("b1").unwrap().boundary, "b1");
    }

    #[test]
    fn test_query_round_trip() {
        let query = Query::any([
            Criterion::all([Tag::new("a", "1"), Tag::new("b", "2")]),
            Criterion::all([Tag::new("c", "3")]),
        ]);
        assert_eq!(query_from_wire(&query_to_wire(&query)), query);
    }

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_payload_survives_save_then_read(data in json_value()) {
            let request = save_request(vec![EventToSave::new("e1", "T", data.clone())]);
            let saved = save_events_request(&request).unwrap();
            let sent = &saved.events[0];

            let read = event_from_wire(wire_event(&sent.data, &sent.metadata));
            prop_assert_eq!(read.data, Payload::Decoded(data));
            prop_assert_eq!(read.metadata, Payload::Decoded(json!({})));
        }
    }
}
