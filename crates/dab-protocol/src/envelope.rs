//! Request/response envelopes: correlation-id injection and response parsing.
//!
//! Every request body is a JSON object carrying a fresh `requestId`; every
//! well-formed response echoes that id and adds a numeric `status`. The
//! three-way [`EnvelopeParse`] split lets the correlator distinguish "not
//! our envelope at all" from "JSON but missing the envelope members", which
//! drive different dispatch decisions.

use crate::status::DabStatus;
use serde::Serialize;
use serde_json::{Map, Value};

/// Name of the correlation member injected into every request body and
/// echoed by the device in its response.
pub const REQUEST_ID_FIELD: &str = "requestId";

/// Name of the status member present in every well-formed response.
pub const STATUS_FIELD: &str = "status";

/// Builds the outbound request body: `payload` with the correlation id
/// injected.
#[must_use]
pub fn request_body(request_id: &str, payload: &Map<String, Value>) -> String {
    let mut body = payload.clone();
    body.insert(
        REQUEST_ID_FIELD.to_owned(),
        Value::String(request_id.to_owned()),
    );
    Value::Object(body).to_string()
}

/// A parsed, well-formed DAB response.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    /// Echoed correlation id.
    pub request_id: String,
    pub status: DabStatus,
    /// Full response body, including the operation-specific members.
    pub body: Value,
}

impl ResponseEnvelope {
    /// Deserializes the operation-specific payload out of the body.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }
}

/// Outcome of parsing an inbound payload against the response envelope.
#[derive(Debug, Clone)]
pub enum EnvelopeParse {
    /// Carries a `requestId` and a numeric `status`.
    Response(ResponseEnvelope),
    /// Valid JSON, but not a response envelope.
    Unrecognized(Value),
    /// Not valid JSON.
    Invalid,
}

/// Parses an inbound payload into the response envelope.
#[must_use]
pub fn parse_response(payload: &[u8]) -> EnvelopeParse {
    let Ok(value) = serde_json::from_slice::<Value>(payload) else {
        return EnvelopeParse::Invalid;
    };
    let request_id = value
        .get(REQUEST_ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_owned);
    let status = value
        .get(STATUS_FIELD)
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok());
    match (request_id, status) {
        (Some(request_id), Some(status)) => EnvelopeParse::Response(ResponseEnvelope {
            request_id,
            status: DabStatus::from_u16(status),
            body: value,
        }),
        _ => EnvelopeParse::Unrecognized(value),
    }
}
