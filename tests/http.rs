//! HTTP transport tests, driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use procwire_router::codec::{MsgPackCodec, MSGPACK_CONTENT_TYPE};
use procwire_router::context::{
    ContextProvider, Credentials, FnResolver, Identity, ResolveError, Session, StaticSessions,
};
use procwire_router::procedures::app_router;
use procwire_router::{http, Dispatcher, RpcResponse, ServerConfig};

const TOKEN: &str = "tok-ada";

fn dispatcher() -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(app_router().build().unwrap()))
}

fn app() -> Router {
    let sessions = StaticSessions::new().with_session(
        TOKEN,
        Session::new(Identity::new("u-1").with_name("Ada").with_email("ada@example.com")),
    );
    let config = ServerConfig::new().with_max_batch_size(3);
    http::router(&config, dispatcher(), ContextProvider::new(sessions)).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn json_request(body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/trpc").header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_route() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_single_public_call() {
    let request = json_request(json!({ "path": "general.health" }), None);
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["status"], "ok");
    assert_eq!(body["result"]["data"]["message"], "procwire server is running");
}

#[tokio::test]
async fn test_single_protected_call_status() {
    let (status, body) = send(app(), json_request(json!({ "path": "hello" }), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, body) = send(app(), json_request(json!({ "path": "hello" }), Some(TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"], "Hello from procwire, Ada!");
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (status, body) = send(app(), json_request(json!({ "path": "nope" }), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_input_is_400_with_issues() {
    let request = json_request(
        json!({ "path": "user.updateProfile", "input": { "email": "nope" } }),
        Some(TOKEN),
    );
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(body["error"]["issues"][0]["path"], "email");
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let request = Request::post("/api/trpc")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_batch_is_positional_with_multi_status() {
    let request = json_request(
        json!([
            { "path": "general.health" },
            { "path": "user.getProfile" },
            { "path": "general.health" }
        ]),
        None,
    );
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    let slots = body.as_array().unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0]["result"]["data"]["status"], "ok");
    assert_eq!(slots[1]["error"]["code"], "UNAUTHORIZED");
    assert_eq!(slots[2]["result"]["data"]["status"], "ok");
}

#[tokio::test]
async fn test_batch_all_ok_is_200() {
    let request = json_request(
        json!([{ "path": "hello" }, { "path": "user.getProfile" }]),
        Some(TOKEN),
    );
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["result"]["data"], "Hello from procwire, Ada!");
    assert_eq!(body[1]["result"]["data"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_batch_too_large() {
    let calls: Vec<Value> = (0..4).map(|_| json!({ "path": "general.health" })).collect();
    let (status, body) = send(app(), json_request(Value::Array(calls), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_session_cookie() {
    let request = Request::post("/api/trpc")
        .header(CONTENT_TYPE, "application/json")
        .header(COOKIE, format!("theme=dark; next-auth.session-token={TOKEN}"))
        .body(Body::from(json!({ "path": "user.getProfile" }).to_string()))
        .unwrap();
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["name"], "Ada");
}

#[tokio::test]
async fn test_get_with_query_input() {
    let input = json!({ "message": "hi there" }).to_string();
    let uri = format!(
        "/api/trpc/general.echo?input={}",
        input
            .bytes()
            .map(|b| format!("%{b:02X}"))
            .collect::<String>()
    );
    let request = Request::get(uri)
        .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["echo"], "hi there");
    assert_eq!(body["result"]["data"]["user"], "Ada");
}

#[tokio::test]
async fn test_get_without_input() {
    let request = Request::get("/api/trpc/general.health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["status"], "ok");
}

#[tokio::test]
async fn test_authentication_unavailable_fills_every_slot() {
    let down = ContextProvider::new(FnResolver::new(|_creds: Credentials| async {
        Err(ResolveError("identity provider timed out".into()))
    }));
    let app = http::router(&ServerConfig::new(), dispatcher(), down).unwrap();

    let request = json_request(
        json!([{ "path": "general.health" }, { "path": "hello" }]),
        Some(TOKEN),
    );
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    for slot in body.as_array().unwrap() {
        assert_eq!(slot["error"]["code"], "AUTHENTICATION_UNAVAILABLE");
    }
}

#[tokio::test]
async fn test_msgpack_round_trip() {
    let body = MsgPackCodec::encode(&json!({ "path": "user.getProfile" })).unwrap();
    let request = Request::post("/api/trpc")
        .header(CONTENT_TYPE, MSGPACK_CONTENT_TYPE)
        .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::from(body))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        MSGPACK_CONTENT_TYPE
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let decoded: RpcResponse = MsgPackCodec::decode(&bytes).unwrap();
    assert_eq!(decoded.data().unwrap()["name"], "Ada");
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = ServerConfig::new().with_endpoint("api");
    let provider = ContextProvider::new(StaticSessions::new());
    assert!(http::router(&config, dispatcher(), provider).is_err());
}
