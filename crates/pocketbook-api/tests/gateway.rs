mod common;

use std::time::Duration;

use axum::Router;
use axum::http::{Method, StatusCode, header};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use common::{app, call, register};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}/gateway", addr)
}

async fn connect(url: &str, token: &str) -> Socket {
    let mut request = url.into_client_request().unwrap();
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
    let (socket, _) = tokio_tungstenite::connect_async(request).await.unwrap();
    socket
}

/// Next JSON text frame, skipping control frames.
async fn next_event(socket: &mut Socket) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("gateway closed: {:?}", other),
            }
        }
    })
    .await
    .expect("no gateway event within 5s")
}

#[tokio::test]
async fn ready_then_messages_are_forwarded() {
    let app = app();
    let url = serve(app.clone()).await;
    let (_, alice) = register(&app, "alice").await;
    let (bob_id, bob) = register(&app, "bob").await;

    let mut socket = connect(&url, &bob).await;
    let ready = next_event(&mut socket).await;
    assert_eq!(ready["type"], "Ready");
    assert_eq!(ready["data"]["username"], "bob");
    assert_eq!(ready["data"]["user_id"], bob_id);

    let sent = call(
        &app,
        Method::POST,
        "/messages",
        Some(&alice),
        Some(json!({"receiver_id": bob_id, "content": "lunch?"})),
    )
    .await;
    assert_eq!(sent.status, StatusCode::CREATED);

    let event = next_event(&mut socket).await;
    assert_eq!(event["type"], "MessageCreate");
    assert_eq!(event["data"]["sender_username"], "alice");
    assert_eq!(event["data"]["message"]["content"], "lunch?");
    assert_eq!(event["data"]["message"]["id"], sent.body["id"]);
}

#[tokio::test]
async fn upgrade_without_a_session_is_refused() {
    let url = serve(app()).await;

    let request = url.as_str().into_client_request().unwrap();
    let err = tokio_tungstenite::connect_async(request).await.unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        other => panic!("expected an HTTP rejection, got {:?}", other),
    }
}
