#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use pocketbook_api::billing::BillingConfig;
use pocketbook_api::mailer::Mailer;
use pocketbook_api::{AppStateInner, router};
use pocketbook_db::Database;
use pocketbook_gateway::Dispatcher;
use pocketbook_market::{MarketClient, MarketConfig};

pub const BILLING_SECRET: &str = "test-billing-secret";

/// Router over an in-memory database, log-only mail and dead market sources.
pub fn app() -> Router {
    let dead = "http://127.0.0.1:9/unreachable".to_string();
    let market = MarketClient::new(MarketConfig {
        indices_url: dead.clone(),
        crypto_url: dead.clone(),
        fx_url: dead.clone(),
        gold_url: dead.clone(),
        holidays_url: dead,
        request_timeout: Duration::from_secs(2),
        ..MarketConfig::default()
    })
    .unwrap();

    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-jwt-secret".into(),
        cookie_secure: false,
        dispatcher: Dispatcher::new(),
        market,
        mailer: Mailer::Log,
        billing: BillingConfig {
            checkout_url: "https://pay.example.com/checkout".into(),
            public_url: "http://localhost:3000".into(),
            secret: BILLING_SECRET.into(),
        },
    });
    router(state)
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Null` for empty or non-JSON bodies.
    pub body: Value,
}

impl Reply {
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply { status, headers, body }
}

pub async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send(app, request).await
}

pub async fn register_with_email(app: &Router, username: &str, email: &str) -> Reply {
    call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "email": email,
            "username": username,
            "password": "correct horse battery",
        })),
    )
    .await
}

/// Registers a user and returns (user_id, token).
pub async fn register(app: &Router, username: &str) -> (String, String) {
    let reply = register_with_email(app, username, &format!("{}@example.com", username)).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    (
        reply.body["user_id"].as_str().unwrap().to_string(),
        reply.body["token"].as_str().unwrap().to_string(),
    )
}
