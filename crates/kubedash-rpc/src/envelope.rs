//! Wire-level message envelopes and classification predicates.
//!
//! Everything that crosses the transport is a JSON value. The predicates
//! here are the sole gate between "raw decoded value" and "typed envelope":
//! they never fail on arbitrary input, they just answer no. The transport
//! also carries host-level control messages that are none of our business;
//! anything the predicates reject is ignored upstream, not treated as a
//! fault.

use kubedash_core::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name carried by broadcast envelopes, which are not method calls.
pub const BROADCAST_METHOD: &str = "";

/// Correlation id carried by broadcast envelopes.
///
/// Caller-assigned request ids start at 1, so a pending-call lookup on this
/// id can never match.
pub const BROADCAST_ID: RequestId = RequestId::new(0);

/// A method-call request, or (with [`BROADCAST_METHOD`]) a one-way push.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageRequest {
    /// Correlation id, unique among in-flight requests on one endpoint.
    pub id: RequestId,
    /// Wire name of the addressed channel.
    pub channel: String,
    /// Method to invoke; empty for broadcast envelopes.
    #[serde(default)]
    pub method: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Whether a response settles its request successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// `body` carries the result.
    Success,
    /// `error` carries the remote failure message.
    Error,
}

/// A response to a request, or a broadcast push (response-shaped, id 0).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Correlation id echoed from the request.
    pub id: RequestId,
    /// Wire name of the channel.
    pub channel: String,
    /// Method echoed from the request; empty for broadcasts.
    #[serde(default)]
    pub method: String,
    /// Arguments echoed from the request.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Success or error.
    pub status: ResponseStatus,
    /// Remote failure message; meaningful only when `status` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Result or broadcast payload; meaningful only when `status` is
    /// `Success`.
    #[serde(default)]
    pub body: Value,
}

impl MessageRequest {
    /// Whether this envelope is a broadcast push rather than a method call.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.method == BROADCAST_METHOD
    }
}

impl MessageResponse {
    /// Build a success response settling `request`.
    #[must_use]
    pub fn success(request: &MessageRequest, body: Value) -> Self {
        Self {
            id: request.id,
            channel: request.channel.clone(),
            method: request.method.clone(),
            args: request.args.clone(),
            status: ResponseStatus::Success,
            error: None,
            body,
        }
    }

    /// Build an error response settling `request`.
    #[must_use]
    pub fn error(request: &MessageRequest, message: impl Into<String>) -> Self {
        Self {
            id: request.id,
            channel: request.channel.clone(),
            method: request.method.clone(),
            args: request.args.clone(),
            status: ResponseStatus::Error,
            error: Some(message.into()),
            body: Value::Null,
        }
    }

    /// Build a broadcast push for `channel`.
    #[must_use]
    pub fn broadcast(channel: &str, body: Value) -> Self {
        Self {
            id: BROADCAST_ID,
            channel: channel.to_owned(),
            method: BROADCAST_METHOD.to_owned(),
            args: Vec::new(),
            status: ResponseStatus::Success,
            error: None,
            body,
        }
    }
}

/// True iff `value` is a non-null object with `id` and `channel` members.
///
/// Tolerant by design: `method` and `args` are not required, and member
/// types are not checked — a later typed parse decides that.
#[must_use]
pub fn is_message_request(value: &Value) -> bool {
    match value.as_object() {
        Some(obj) => obj.contains_key("id") && obj.contains_key("channel"),
        None => false,
    }
}

/// True iff `value` is request-shaped and additionally has a `status`
/// member.
#[must_use]
pub fn is_message_response(value: &Value) -> bool {
    is_message_request(value)
        && value
            .as_object()
            .is_some_and(|obj| obj.contains_key("status"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    // ── Predicates ──────────────────────────────────────────────────

    #[test]
    fn request_predicate_accepts_minimal_shape() {
        assert!(is_message_request(&json!({"id": 1, "channel": "X"})));
    }

    #[test]
    fn request_predicate_tolerates_missing_method_and_args() {
        let value = json!({"id": 7, "channel": "Y", "extra": true});
        assert!(is_message_request(&value));
    }

    #[test]
    fn request_predicate_rejects_non_objects() {
        assert!(!is_message_request(&Value::Null));
        assert!(!is_message_request(&json!(42)));
        assert!(!is_message_request(&json!("id")));
        assert!(!is_message_request(&json!([1, 2, 3])));
        assert!(!is_message_request(&json!(true)));
    }

    #[test]
    fn request_predicate_rejects_missing_members() {
        assert!(!is_message_request(&json!({})));
        assert!(!is_message_request(&json!({"id": 1})));
        assert!(!is_message_request(&json!({"channel": "X"})));
    }

    #[test]
    fn response_predicate_requires_status() {
        let without = json!({"id": 1, "channel": "X"});
        let with = json!({"id": 1, "channel": "X", "status": "success"});
        assert!(!is_message_response(&without));
        assert!(is_message_response(&with));
    }

    #[test]
    fn response_predicate_implies_request_predicate() {
        let value = json!({"id": 1, "channel": "X", "status": "error"});
        assert!(is_message_response(&value));
        assert!(is_message_request(&value));
    }

    #[test]
    fn host_control_message_matches_neither() {
        let value = json!({"command": "reload-webview"});
        assert!(!is_message_request(&value));
        assert!(!is_message_response(&value));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 32, 8, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::hash_map("[a-z]{0,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn predicates_never_panic(value in arb_json()) {
            let req = is_message_request(&value);
            let resp = is_message_response(&value);
            // Response-shape implies request-shape.
            prop_assert!(req || !resp);
        }
    }

    // ── Envelope serde ──────────────────────────────────────────────

    #[test]
    fn request_roundtrip() {
        let req = MessageRequest {
            id: RequestId::new(3),
            channel: "Echo".into(),
            method: "say".into(),
            args: vec![json!(42), json!("hi")],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(is_message_request(&value));
        assert!(!is_message_response(&value));
        let back: MessageRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back.id, RequestId::new(3));
        assert_eq!(back.channel, "Echo");
        assert_eq!(back.method, "say");
        assert_eq!(back.args.len(), 2);
    }

    #[test]
    fn request_parse_defaults_method_and_args() {
        let back: MessageRequest =
            serde_json::from_value(json!({"id": 1, "channel": "X"})).unwrap();
        assert_eq!(back.method, BROADCAST_METHOD);
        assert!(back.args.is_empty());
        assert!(back.is_broadcast());
    }

    #[test]
    fn success_response_echoes_request() {
        let req = MessageRequest {
            id: RequestId::new(9),
            channel: "Echo".into(),
            method: "say".into(),
            args: vec![json!(1)],
        };
        let resp = MessageResponse::success(&req, json!({"ok": true}));
        assert_eq!(resp.id, RequestId::new(9));
        assert_eq!(resp.channel, "Echo");
        assert_eq!(resp.method, "say");
        assert_eq!(resp.status, ResponseStatus::Success);
        assert!(resp.error.is_none());
        assert_eq!(resp.body["ok"], true);
    }

    #[test]
    fn error_response_carries_message_only() {
        let req = MessageRequest {
            id: RequestId::new(4),
            channel: "Echo".into(),
            method: "say".into(),
            args: Vec::new(),
        };
        let resp = MessageResponse::error(&req, "boom");
        assert_eq!(resp.status, ResponseStatus::Error);
        assert_eq!(resp.error.as_deref(), Some("boom"));
        assert_eq!(resp.body, Value::Null);
    }

    #[test]
    fn error_field_omitted_on_success_wire_form() {
        let req = MessageRequest {
            id: RequestId::new(1),
            channel: "X".into(),
            method: "m".into(),
            args: Vec::new(),
        };
        let json = serde_json::to_string(&MessageResponse::success(&req, json!(1))).unwrap();
        assert!(!json.contains("error"));
    }

    #[test]
    fn broadcast_envelope_shape() {
        let resp = MessageResponse::broadcast("Counts", json!([1, 2]));
        assert_eq!(resp.id, BROADCAST_ID);
        assert_eq!(resp.method, BROADCAST_METHOD);
        assert_eq!(resp.status, ResponseStatus::Success);
        let value = serde_json::to_value(&resp).unwrap();
        assert!(is_message_response(&value));
    }

    #[test]
    fn status_serializes_lowercase() {
        let value = serde_json::to_value(ResponseStatus::Success).unwrap();
        assert_eq!(value, json!("success"));
        let value = serde_json::to_value(ResponseStatus::Error).unwrap();
        assert_eq!(value, json!("error"));
    }

    #[test]
    fn wire_format_response_parse() {
        let raw = r#"{"id": 5, "channel": "Echo", "method": "say", "status": "success", "body": 42}"#;
        let resp: MessageResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.id, RequestId::new(5));
        assert_eq!(resp.status, ResponseStatus::Success);
        assert_eq!(resp.body, json!(42));
        assert!(resp.args.is_empty());
    }
}
