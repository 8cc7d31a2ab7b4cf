//! Request and response data model for a batch.
//!
//! # Design
//! A `RequestDescriptor` is decoded from one element of the input array and
//! never mutated afterwards. The body keeps the three states the host can
//! express (field absent, explicit `null`, a value) as an enum instead of a
//! nullable field, and a present value is kept as its already-encoded JSON
//! text so the exact bytes go out on the wire.
//!
//! A `ResponseOutcome` is produced once per descriptor. Failed calls carry the
//! originating descriptor in `request` so the host can see what went wrong;
//! successful calls never do.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::error::InvokeError;

/// Status reported for an item that never received a real server response.
pub const SENTINEL_FAILURE_STATUS: u16 = 500;

/// Header name to ordered values. Ordered so that iteration and the encoded
/// output are deterministic.
pub type HeaderValues = BTreeMap<String, Vec<String>>;

/// One outbound call, as submitted by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: String,
    pub uri: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: HeaderValues,
    #[serde(default, skip_serializing_if = "RequestBody::is_absent")]
    pub body: RequestBody,
}

/// The `body` field of a request element.
///
/// `Absent` and `Null` both mean "send no payload"; they are kept apart so a
/// failure echo reproduces what the host sent.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Absent,
    Null,
    /// Already-encoded JSON text, sent verbatim.
    Raw(Box<RawValue>),
}

impl RequestBody {
    pub fn is_absent(&self) -> bool {
        matches!(self, RequestBody::Absent)
    }

    /// Bytes to put on the wire, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            RequestBody::Absent | RequestBody::Null => None,
            RequestBody::Raw(raw) => Some(raw.get().as_bytes()),
        }
    }
}

impl PartialEq for RequestBody {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RequestBody::Absent, RequestBody::Absent) | (RequestBody::Null, RequestBody::Null) => {
                true
            }
            (RequestBody::Raw(a), RequestBody::Raw(b)) => a.get() == b.get(),
            _ => false,
        }
    }
}

impl<'de> Deserialize<'de> for RequestBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the field is present; a missing field takes the
        // `Default` (`Absent`) through `#[serde(default)]`.
        let raw: Option<Box<RawValue>> = Option::deserialize(deserializer)?;
        Ok(match raw {
            None => RequestBody::Null,
            Some(raw) => RequestBody::Raw(raw),
        })
    }
}

impl Serialize for RequestBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RequestBody::Absent | RequestBody::Null => serializer.serialize_none(),
            RequestBody::Raw(raw) => raw.serialize(serializer),
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HeaderValues, D::Error> {
    Ok(Option::<HeaderValues>::deserialize(deserializer)?.unwrap_or_default())
}

/// What happened to one request: a real response or a captured failure.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseOutcome {
    pub status: u16,
    pub headers: HeaderValues,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Arc<RequestDescriptor>>,
}

impl ResponseOutcome {
    /// An outcome carrying whatever the server answered, 4xx and 5xx included.
    pub fn success(status: u16, headers: HeaderValues, body: String) -> Self {
        Self {
            status,
            headers,
            body,
            request: None,
        }
    }

    /// An outcome for a call that never produced a response.
    pub fn failure(descriptor: Arc<RequestDescriptor>, err: &InvokeError) -> Self {
        Self {
            status: SENTINEL_FAILURE_STATUS,
            headers: HeaderValues::new(),
            body: error_body(err),
            request: Some(descriptor),
        }
    }

    /// True when the call failed before a server response existed. The status
    /// cannot tell on its own since a server may legitimately answer 500.
    pub fn is_failure(&self) -> bool {
        self.request.is_some()
    }
}

/// `{"error": "Error creating request: <detail>"}`, with `<detail>` escaped.
pub(crate) fn error_body(err: &impl fmt::Display) -> String {
    serde_json::json!({ "error": format!("Error creating request: {err}") }).to_string()
}
