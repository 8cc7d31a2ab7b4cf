//! Batch coordinator: decode, fan out, join in order, encode.
//!
//! # Design
//! Decoding is all-or-nothing: if the envelope or any element is malformed the
//! batch is rejected before a single request is sent. After that, every
//! descriptor gets its own spawned task. The join handles sit in a vector
//! aligned with the input, so awaiting them front to back writes slot `i`
//! with the outcome for request `i` regardless of completion order, and no
//! lock is needed. A task that panics still fills its slot with a failure
//! outcome.

use std::sync::Arc;
use std::time::Instant;

use serde_json::value::RawValue;
use uuid::Uuid;

use crate::config::ExecutorConfig;
use crate::deadline::Deadline;
use crate::error::{BatchError, InvokeError};
use crate::transport::Transport;
use crate::types::{RequestDescriptor, ResponseOutcome};

/// Runs batches against one shared transport.
///
/// `execute*` spawn onto the current tokio runtime and must be awaited from
/// within one.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    transport: Transport,
    config: ExecutorConfig,
}

impl BatchExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self, BatchError> {
        let transport = Transport::new(&config).map_err(BatchError::Client)?;
        Ok(Self::with_transport(transport, config))
    }

    pub fn with_transport(transport: Transport, config: ExecutorConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a raw JSON batch with the configured default deadline.
    pub async fn execute(&self, raw: &[u8]) -> Result<Vec<u8>, BatchError> {
        self.execute_with_deadline(raw, Deadline::none()).await
    }

    /// Run a raw JSON batch. When `deadline` is unset the configured default
    /// timeout, if any, applies.
    pub async fn execute_with_deadline(
        &self,
        raw: &[u8],
        deadline: Deadline,
    ) -> Result<Vec<u8>, BatchError> {
        let deadline = deadline.or_timeout(self.config.default_timeout);
        let descriptors = decode_batch(raw)?;
        let outcomes = self.execute_descriptors(descriptors, deadline).await;
        encode_outcomes(&outcomes)
    }

    /// Dispatch every descriptor concurrently and return one outcome per
    /// descriptor, in input order.
    pub async fn execute_descriptors(
        &self,
        descriptors: Vec<RequestDescriptor>,
        deadline: Deadline,
    ) -> Vec<ResponseOutcome> {
        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::debug!(%batch_id, size = descriptors.len(), "dispatching batch");

        let descriptors: Vec<Arc<RequestDescriptor>> =
            descriptors.into_iter().map(Arc::new).collect();
        let handles: Vec<_> = descriptors
            .iter()
            .map(|descriptor| {
                let transport = self.transport.clone();
                let descriptor = Arc::clone(descriptor);
                tokio::spawn(async move { transport.invoke(descriptor, deadline).await })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (index, (descriptor, handle)) in descriptors.into_iter().zip(handles).enumerate() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(%batch_id, index, error = %e, "request task did not complete");
                    ResponseOutcome::failure(descriptor, &InvokeError::Panicked(e.to_string()))
                }
            };
            outcomes.push(outcome);
        }

        let failures = outcomes.iter().filter(|o| o.is_failure()).count();
        tracing::info!(
            %batch_id,
            size = outcomes.len(),
            failures,
            elapsed = ?started.elapsed(),
            "batch complete"
        );
        outcomes
    }
}

/// Decode the input array. Any malformed element rejects the whole batch.
pub fn decode_batch(raw: &[u8]) -> Result<Vec<RequestDescriptor>, BatchError> {
    let elements: Vec<Box<RawValue>> = serde_json::from_slice(raw).map_err(BatchError::Envelope)?;
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            serde_json::from_str(element.get())
                .map_err(|source| BatchError::Element { index, source })
        })
        .collect()
}

pub fn encode_outcomes(outcomes: &[ResponseOutcome]) -> Result<Vec<u8>, BatchError> {
    serde_json::to_vec(outcomes).map_err(BatchError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestBody;

    #[test]
    fn decodes_elements_in_order() {
        let raw = br#"[
            {"method":"GET","uri":"http://a/"},
            {"method":"POST","uri":"http://b/","headers":{"X":["1"]},"body":"x"}
        ]"#;
        let batch = decode_batch(raw).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].uri, "http://a/");
        assert_eq!(batch[1].method, "POST");
        assert!(matches!(batch[1].body, RequestBody::Raw(_)));
    }

    #[test]
    fn empty_array_is_empty_batch() {
        assert!(decode_batch(b"[]").unwrap().is_empty());
    }

    #[test]
    fn non_array_envelope_is_rejected() {
        let cases: [&[u8]; 4] = [br#"{"method":"GET"}"#, b"null", b"", b"[1,"];
        for raw in cases {
            let err = decode_batch(raw).unwrap_err();
            assert!(matches!(err, BatchError::Envelope(_)), "{err}");
        }
    }

    #[test]
    fn one_bad_element_rejects_batch() {
        let raw = br#"[
            {"method":"GET","uri":"http://a/"},
            {"method":"GET"},
            {"method":"GET","uri":"http://c/"}
        ]"#;
        let err = decode_batch(raw).unwrap_err();
        assert!(matches!(err, BatchError::Element { index: 1, .. }));
    }

    #[test]
    fn encodes_empty_result_as_empty_array() {
        assert_eq!(encode_outcomes(&[]).unwrap(), b"[]");
    }

    #[tokio::test]
    async fn empty_batch_round_trip() {
        let executor = BatchExecutor::new(ExecutorConfig::default()).unwrap();
        let out = executor.execute(b"[]").await.unwrap();
        assert_eq!(out, b"[]");
    }

    #[tokio::test]
    async fn malformed_element_sends_nothing() {
        let executor = BatchExecutor::new(ExecutorConfig::default()).unwrap();
        let err = executor
            .execute(br#"[{"method":"GET","uri":"http://a/"},{"uri":5}]"#)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("error unmarshalling request 1"));
    }
}
