//! Concurrent scatter-gather executor for batches of HTTP requests.
//!
//! # Overview
//! A host hands over a JSON array of request objects. Every request is sent
//! concurrently and the responses come back as a JSON array aligned with the
//! input: `result[i]` always belongs to `request[i]`, whatever order the
//! calls finish in.
//!
//! # Design
//! - `batch` decodes the input all-or-nothing, spawns one task per request
//!   and joins the tasks in input order.
//! - `transport` turns one descriptor into one outcome and never fails; a
//!   call that cannot complete becomes a status-500 outcome with an error
//!   body and an echo of the request.
//! - `types` holds the request/response model, including the three-state
//!   request body.
//! - `deadline` and `config` carry the optional timeout and client settings.

pub mod batch;
pub mod config;
pub mod deadline;
pub mod error;
pub mod transport;
pub mod types;

pub use batch::{decode_batch, encode_outcomes, BatchExecutor};
pub use config::ExecutorConfig;
pub use deadline::Deadline;
pub use error::{BatchError, InvokeError, InvokeErrorKind};
pub use transport::Transport;
pub use types::{HeaderValues, RequestBody, RequestDescriptor, ResponseOutcome, SENTINEL_FAILURE_STATUS};
