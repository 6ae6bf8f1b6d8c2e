//! # Response Envelope Codec
//!
//! Every response leaving the API is wrapped into one canonical shape:
//!
//! ```json
//! {
//!   "status": "Success",
//!   "status_code": 200,
//!   "message": "Operation Successful",
//!   "data": {}
//! }
//! ```
//!
//! [`encode`] is a pure transform from `(status_code, raw payload)` to an
//! [`Envelope`]. For object payloads the message comes from a `detail` key,
//! then a `message` key, then the static default table; only the extracted
//! key is removed, and an explicit `data` key wins over the remaining
//! fields. Lists and scalars pass through as `data` verbatim.
//!
//! The codec consumes its payload by value — extraction restructures the
//! owned map and never mutates anything the caller can still observe.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Success/Error discriminator, derived solely from the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Status codes below 400.
    Success,
    /// Status codes 400 and above.
    Error,
}

impl Status {
    /// Derive the discriminator from an HTTP status code.
    pub fn from_code(status_code: u16) -> Self {
        if status_code >= 400 {
            Self::Error
        } else {
            Self::Success
        }
    }

    /// String form as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Error => "Error",
        }
    }
}

/// The canonical wire shape for every outbound response.
///
/// Constructed fresh per response and never mutated after emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// `Success` below 400, `Error` at 400 and above.
    pub status: Status,
    /// The HTTP status code, duplicated into the body.
    pub status_code: u16,
    /// Human-readable message extracted from the payload or defaulted.
    pub message: String,
    /// The payload. Always present — an empty object when the handler
    /// produced nothing.
    pub data: Value,
}

/// Default messages keyed by status code.
///
/// Codes without an entry fall back to `"An error occurred"`.
pub fn default_message(status_code: u16) -> &'static str {
    match status_code {
        200 => "Operation Successful",
        400 => "Bad Request",
        401 => "Authentication credentials were not provided.",
        403 => "You do not have permission to perform this action.",
        404 => "The requested resource was not found.",
        405 => "Method not allowed.",
        500 => "An internal server error occurred.",
        _ => "An error occurred",
    }
}

/// Render an extracted message value. Strings pass through; anything else
/// is compact-JSON stringified.
fn message_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Encode a raw handler payload into the canonical envelope.
///
/// `data` in the result is never an envelope itself: re-encoding an
/// envelope's `data` field yields the same `data` again rather than
/// nesting another wrapper layer.
pub fn encode(status_code: u16, payload: Value) -> Envelope {
    let mut message: Option<String> = None;

    let data = match payload {
        Value::Object(mut fields) => {
            if let Some(detail) = fields.remove("detail") {
                message = Some(message_text(detail));
            } else if let Some(text) = fields.remove("message") {
                message = Some(message_text(text));
            }
            match fields.remove("data") {
                Some(explicit) => explicit,
                None => Value::Object(fields),
            }
        }
        // `data` is always present: a missing payload becomes an empty object.
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    Envelope {
        status: Status::from_code(status_code),
        status_code,
        message: message.unwrap_or_else(|| default_message(status_code).to_string()),
        data,
    }
}

/// Build a raw success payload in the shape the codec expects.
///
/// Argument order is `(message, payload)`. Object payloads get the message
/// merged in; lists and scalars are wrapped under a `data` key; `None`
/// yields an empty-object `data`.
pub fn success_body(message: &str, payload: Option<Value>) -> Value {
    match payload {
        Some(Value::Object(mut fields)) => {
            fields.insert("message".to_string(), Value::String(message.to_string()));
            Value::Object(fields)
        }
        Some(other) => json!({
            "message": message,
            "data": other,
        }),
        None => json!({
            "message": message,
            "data": {},
        }),
    }
}

/// Build a raw error payload: `{"message": …, "data": …}` with `data`
/// defaulting to an empty object.
pub fn error_body(message: &str, details: Option<Value>) -> Value {
    json!({
        "message": message,
        "data": details.unwrap_or_else(|| Value::Object(Map::new())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn status_derivation_boundary() {
        assert_eq!(Status::from_code(399), Status::Success);
        assert_eq!(Status::from_code(400), Status::Error);
        assert_eq!(Status::from_code(200), Status::Success);
        assert_eq!(Status::from_code(500), Status::Error);
    }

    #[test]
    fn default_message_table() {
        assert_eq!(default_message(200), "Operation Successful");
        assert_eq!(default_message(404), "The requested resource was not found.");
        assert_eq!(default_message(405), "Method not allowed.");
        assert_eq!(default_message(201), "An error occurred");
        assert_eq!(default_message(418), "An error occurred");
    }

    #[test]
    fn encode_empty_object_uses_default_message() {
        let envelope = encode(200, json!({}));
        assert_eq!(envelope.status, Status::Success);
        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.message, "Operation Successful");
        assert_eq!(envelope.data, json!({}));

        let envelope = encode(404, json!({}));
        assert_eq!(envelope.status, Status::Error);
        assert_eq!(envelope.message, "The requested resource was not found.");
    }

    #[test]
    fn detail_beats_message_and_only_detail_is_removed() {
        let envelope = encode(400, json!({"detail": "X", "message": "Y", "extra": 1}));
        assert_eq!(envelope.message, "X");
        assert_eq!(envelope.data, json!({"message": "Y", "extra": 1}));
    }

    #[test]
    fn message_key_extracted_when_no_detail() {
        let envelope = encode(200, json!({"message": "ok", "b": 2}));
        assert_eq!(envelope.message, "ok");
        assert_eq!(envelope.data, json!({"b": 2}));
    }

    #[test]
    fn explicit_data_key_wins_over_remaining_fields() {
        let envelope = encode(200, json!({"data": {"a": 1}, "message": "ok", "b": 2}));
        assert_eq!(envelope.message, "ok");
        assert_eq!(envelope.data, json!({"a": 1}));
    }

    #[test]
    fn non_mapping_payloads_pass_through_verbatim() {
        assert_eq!(encode(200, json!([1, 2, 3])).data, json!([1, 2, 3]));
        assert_eq!(encode(200, json!("plain")).data, json!("plain"));
        assert_eq!(encode(200, json!(7)).data, json!(7));
    }

    #[test]
    fn null_payload_becomes_empty_object() {
        let envelope = encode(200, Value::Null);
        assert_eq!(envelope.data, json!({}));
        assert_eq!(envelope.message, "Operation Successful");
    }

    #[test]
    fn non_string_detail_is_stringified() {
        let envelope = encode(400, json!({"detail": {"field": "name"}}));
        assert_eq!(envelope.message, r#"{"field":"name"}"#);
    }

    #[test]
    fn reencoding_data_does_not_double_nest() {
        let first = encode(200, json!({"message": "ok", "a": 1}));
        let second = encode(200, first.data.clone());
        assert_eq!(second.data, json!({"a": 1}));
        assert!(second.data.get("status").is_none());
        assert!(second.data.get("status_code").is_none());
    }

    #[test]
    fn wire_field_names_are_the_contract() {
        let envelope = encode(200, json!({}));
        let value = serde_json::to_value(&envelope).expect("envelope serializes");
        let keys: Vec<&str> = value
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["data", "message", "status", "status_code"]);
        assert_eq!(value["status"], json!("Success"));
    }

    // ── Payload builders ─────────────────────────────────────────

    #[test]
    fn success_body_merges_message_into_objects() {
        let body = success_body("msg", Some(json!({"a": 1})));
        assert_eq!(body, json!({"a": 1, "message": "msg"}));
    }

    #[test]
    fn success_body_wraps_lists_under_data() {
        let body = success_body("msg", Some(json!([1, 2])));
        assert_eq!(body, json!({"message": "msg", "data": [1, 2]}));
    }

    #[test]
    fn success_body_wraps_scalars_under_data() {
        let body = success_body("msg", Some(json!(42)));
        assert_eq!(body, json!({"message": "msg", "data": 42}));
    }

    #[test]
    fn success_body_without_payload_yields_empty_data() {
        let body = success_body("msg", None);
        assert_eq!(body, json!({"message": "msg", "data": {}}));
    }

    #[test]
    fn error_body_defaults_details_to_empty_object() {
        assert_eq!(
            error_body("bad", None),
            json!({"message": "bad", "data": {}})
        );
        assert_eq!(
            error_body("bad", Some(json!({"details": "why"}))),
            json!({"message": "bad", "data": {"details": "why"}})
        );
    }

    #[test]
    fn success_body_then_encode_round_trip() {
        let envelope = encode(200, success_body("User created successfully", Some(json!([1]))));
        assert_eq!(envelope.message, "User created successfully");
        assert_eq!(envelope.data, json!([1]));
    }

    proptest! {
        #[test]
        fn encode_preserves_code_and_derives_status(code in 100u16..600) {
            let envelope = encode(code, json!({"x": 1}));
            prop_assert_eq!(envelope.status_code, code);
            prop_assert_eq!(envelope.status == Status::Error, code >= 400);
        }

        #[test]
        fn data_is_always_present(code in 100u16..600, n in any::<i64>()) {
            let envelope = encode(code, json!(n));
            prop_assert_eq!(envelope.data, json!(n));

            let envelope = encode(code, Value::Null);
            prop_assert!(envelope.data.is_object());
        }

        #[test]
        fn message_extraction_never_panics(code in 100u16..600, text in ".*") {
            let envelope = encode(code, json!({"detail": text.clone()}));
            prop_assert_eq!(envelope.message, text);
        }
    }
}
