use std::{collections::BTreeMap, time::Duration};

use axum::{
    body::Bytes,
    extract::Query,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Query parameters understood by `/echo`.
#[derive(Debug, Default, Deserialize)]
pub struct EchoParams {
    /// Sleep this long before answering.
    pub delay_ms: Option<u64>,
    /// Status to answer with; defaults to 200.
    pub status: Option<u16>,
    /// Opaque tag copied into the body and the `x-echo-id` header.
    pub id: Option<String>,
}

/// What `/echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub id: Option<String>,
    pub body_len: usize,
    pub body: String,
    pub headers: BTreeMap<String, Vec<String>>,
}

pub fn app() -> Router {
    Router::new().route("/echo", any(echo))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    Query(params): Query<EchoParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(ms) = params.delay_ms {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
    let status = params
        .status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    tracing::debug!(%method, id = ?params.id, body_len = body.len(), "echo");
    let echo = Echo {
        method: method.to_string(),
        id: params.id.clone(),
        body_len: body.len(),
        body: String::from_utf8_lossy(&body).into_owned(),
        headers: seen,
    };

    let mut response = (status, Json(echo)).into_response();
    let out = response.headers_mut();
    if let Some(id) = params.id.as_deref().and_then(|id| HeaderValue::from_str(id).ok()) {
        out.insert("x-echo-id", id);
    }
    out.append("x-multi", HeaderValue::from_static("one"));
    out.append("x-multi", HeaderValue::from_static("two"));
    response
}
