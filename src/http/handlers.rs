//! Request handlers for the RPC endpoint.

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::credentials;
use super::AppState;
use crate::codec::Format;
use crate::context::Context;
use crate::dispatch::Invocation;
use crate::envelope::RpcResponse;
use crate::error::{ErrorCode, RpcError};

/// POST body: one invocation or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Batch(Vec<Invocation>),
    Single(Invocation),
}

#[derive(Debug, Deserialize)]
pub(super) struct GetParams {
    input: Option<String>,
}

fn status_of(code: ErrorCode) -> StatusCode {
    StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn reply<T: Serialize>(format: Format, status: StatusCode, body: &T) -> Response {
    match format.encode(body) {
        Ok(bytes) => (status, [(CONTENT_TYPE, format.content_type())], bytes).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn reply_error(format: Format, e: &RpcError) -> Response {
    reply(format, status_of(e.code()), &RpcResponse::error(e))
}

async fn context_for(state: &AppState, headers: &HeaderMap) -> Result<Context, RpcError> {
    let credentials = credentials::from_headers(headers);
    state.provider.create_context(&credentials).await
}

async fn single(
    state: &AppState,
    format: Format,
    headers: &HeaderMap,
    invocation: Invocation,
) -> Response {
    let ctx = match context_for(state, headers).await {
        Ok(ctx) => ctx,
        Err(e) => return reply_error(format, &e),
    };

    let response = state.dispatcher.dispatch(invocation, ctx).await;
    let status = match &response {
        RpcResponse::Result { .. } => StatusCode::OK,
        RpcResponse::Error(shape) => status_of(shape.code),
    };
    reply(format, status, &response)
}

async fn batch(
    state: &AppState,
    format: Format,
    headers: &HeaderMap,
    invocations: Vec<Invocation>,
) -> Response {
    if invocations.len() > state.max_batch_size {
        let e = RpcError::BatchTooLarge {
            size: invocations.len(),
            limit: state.max_batch_size,
        };
        tracing::warn!("Rejected batch: {}", e);
        return reply_error(format, &e);
    }

    let ctx = match context_for(state, headers).await {
        Ok(ctx) => ctx,
        Err(e) => {
            let slots = vec![RpcResponse::error(&e); invocations.len()];
            return reply(format, status_of(e.code()), &slots);
        }
    };

    let responses = state.dispatcher.dispatch_batch(invocations, ctx).await;
    let status = if responses.iter().all(RpcResponse::is_ok) {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    reply(format, status, &responses)
}

/// `POST {endpoint}`
pub(super) async fn rpc_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let format = Format::from_content_type(
        headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
    );

    let payload: Payload = match format.decode(&body) {
        Ok(payload) => payload,
        Err(e) => return reply_error(format, &e),
    };

    match payload {
        Payload::Single(invocation) => single(&state, format, &headers, invocation).await,
        Payload::Batch(invocations) => batch(&state, format, &headers, invocations).await,
    }
}

/// `GET {endpoint}/{path}?input=<json>`
pub(super) async fn rpc_get(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<GetParams>,
    headers: HeaderMap,
) -> Response {
    let input = match params.input.as_deref() {
        None | Some("") => Value::Null,
        Some(raw) => match serde_json::from_str(raw) {
            Ok(input) => input,
            Err(e) => return reply_error(Format::Json, &RpcError::from(e)),
        },
    };

    let invocation = Invocation::new(path).with_input(input);
    single(&state, Format::Json, &headers, invocation).await
}

/// `GET /health`
pub(super) async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
