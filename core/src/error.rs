//! Error types for batch execution.
//!
//! # Design
//! Two layers, kept apart on purpose. `BatchError` is fatal to an invocation:
//! the envelope or an element failed to decode, the results failed to encode,
//! or the shared client could not be built. `InvokeError` belongs to one item
//! and never leaves the transport as an `Err`; it is rendered into that
//! item's `ResponseOutcome` instead.

use reqwest::header::{InvalidHeaderName, InvalidHeaderValue};
use thiserror::Error;

/// Failures that abort a whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The input is not a JSON array.
    #[error("error unmarshalling JSON: {0}")]
    Envelope(#[source] serde_json::Error),

    /// One element does not match the request schema. A single bad element
    /// rejects the batch; nothing is dispatched.
    #[error("error unmarshalling request {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("error marshalling results: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("error building HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Per-item failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeErrorKind {
    RequestConstruction,
    Transport,
    ResponseRead,
}

/// Failures of a single call. Converted into a failure outcome by the
/// transport.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("invalid method {method:?}: {reason}")]
    InvalidMethod { method: String, reason: String },

    #[error("invalid uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid header name {name:?}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },

    #[error("invalid value for header {name:?}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: InvalidHeaderValue,
    },

    #[error("{0}")]
    Send(#[source] reqwest::Error),

    #[error("reading response body: {0}")]
    ReadBody(#[source] reqwest::Error),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("request task failed: {0}")]
    Panicked(String),
}

impl InvokeError {
    pub fn kind(&self) -> InvokeErrorKind {
        match self {
            InvokeError::InvalidMethod { .. }
            | InvokeError::InvalidUri { .. }
            | InvokeError::InvalidHeaderName { .. }
            | InvokeError::InvalidHeaderValue { .. } => InvokeErrorKind::RequestConstruction,
            InvokeError::Send(_) | InvokeError::DeadlineExceeded | InvokeError::Panicked(_) => {
                InvokeErrorKind::Transport
            }
            InvokeError::ReadBody(_) => InvokeErrorKind::ResponseRead,
        }
    }
}
