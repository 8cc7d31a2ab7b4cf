//! Transport invoker: one descriptor in, one outcome out.
//!
//! # Design
//! `Transport` wraps a single pooled `reqwest::Client` shared by every task of
//! every batch. `invoke` is total: construction, send and body-read failures
//! are all turned into a failure `ResponseOutcome` for that item. Any status
//! the server returns, 4xx and 5xx included, is a success-shaped outcome.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Request, Url};

use crate::config::ExecutorConfig;
use crate::deadline::Deadline;
use crate::error::InvokeError;
use crate::types::{HeaderValues, RequestDescriptor, ResponseOutcome};

#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    pub fn new(config: &ExecutorConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_idle_timeout(config.pool_idle_timeout);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self::from_client(builder.build()?))
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Perform the call described by `descriptor`. Never fails; see module docs.
    pub async fn invoke(&self, descriptor: Arc<RequestDescriptor>, deadline: Deadline) -> ResponseOutcome {
        tracing::debug!(method = %descriptor.method, uri = %descriptor.uri, "dispatching request");
        let result = self.try_invoke(&descriptor, deadline).await;
        match result {
            Ok(outcome) => {
                tracing::debug!(uri = %descriptor.uri, status = outcome.status, "request completed");
                outcome
            }
            Err(err) => {
                tracing::warn!(
                    method = %descriptor.method,
                    uri = %descriptor.uri,
                    kind = ?err.kind(),
                    error = %err,
                    "request failed"
                );
                ResponseOutcome::failure(descriptor, &err)
            }
        }
    }

    async fn try_invoke(
        &self,
        descriptor: &RequestDescriptor,
        deadline: Deadline,
    ) -> Result<ResponseOutcome, InvokeError> {
        let request = build_request(descriptor)?;
        if deadline.is_expired() {
            return Err(InvokeError::DeadlineExceeded);
        }
        let exchange = async {
            let response = self.client.execute(request).await.map_err(InvokeError::Send)?;
            let status = response.status().as_u16();
            let headers = collect_headers(response.headers());
            let bytes = response.bytes().await.map_err(InvokeError::ReadBody)?;
            let body = String::from_utf8_lossy(&bytes).into_owned();
            Ok::<_, InvokeError>(ResponseOutcome::success(status, headers, body))
        };
        match deadline.instant() {
            Some(at) => tokio::time::timeout_at(at, exchange)
                .await
                .map_err(|_| InvokeError::DeadlineExceeded)?,
            None => exchange.await,
        }
    }
}

/// Turn a descriptor into a ready-to-send request.
///
/// Headers use set semantics: for each name the values are applied in order
/// and the last one stays.
pub fn build_request(descriptor: &RequestDescriptor) -> Result<Request, InvokeError> {
    let method = parse_method(&descriptor.method)?;
    let url = Url::parse(&descriptor.uri).map_err(|e| InvokeError::InvalidUri {
        uri: descriptor.uri.clone(),
        reason: e.to_string(),
    })?;

    let mut headers = HeaderMap::new();
    for (name, values) in &descriptor.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|source| InvokeError::InvalidHeaderName {
                name: name.clone(),
                source,
            })?;
        for value in values {
            let header_value =
                HeaderValue::from_str(value).map_err(|source| InvokeError::InvalidHeaderValue {
                    name: name.clone(),
                    source,
                })?;
            headers.insert(header_name.clone(), header_value);
        }
    }

    let mut request = Request::new(method, url);
    *request.headers_mut() = headers;
    if let Some(payload) = descriptor.body.payload() {
        *request.body_mut() = Some(payload.to_vec().into());
    }
    Ok(request)
}

/// An empty method means GET; anything else must be a valid token and is sent
/// exactly as given.
fn parse_method(method: &str) -> Result<Method, InvokeError> {
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.as_bytes()).map_err(|e| InvokeError::InvalidMethod {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

fn collect_headers(map: &HeaderMap) -> HeaderValues {
    let mut headers = HeaderValues::new();
    for (name, value) in map {
        headers
            .entry(canonical_header_key(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    headers
}

/// MIME canonical form: first letter and each letter after a hyphen upper
/// case, the rest lower case (`x-request-id` becomes `X-Request-Id`).
pub fn canonical_header_key(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}
