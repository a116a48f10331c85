pub mod auth;
pub mod billing;
pub mod calculators;
pub mod comments;
pub mod convert;
pub mod dashboard;
pub mod error;
pub mod mailer;
pub mod market;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod state;
pub mod users;

use axum::{
    Extension, Json, Router,
    extract::{State, WebSocketUpgrade},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};

use pocketbook_gateway::connection;
use pocketbook_types::api::HealthResponse;

use crate::middleware::{Claims, require_auth};
pub use crate::state::{AppState, AppStateInner};

/// Every HTTP route, with the session check applied to the protected ones.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/billing/plans", get(billing::plans))
        .route("/billing/callback", get(billing::callback))
        .route("/market/overview", get(market::overview))
        .route("/market/holidays", get(market::holidays));

    let protected_routes = Router::new()
        .route("/me", get(users::me).patch(users::update_me))
        .route("/users", get(users::search))
        .route("/users/{user_id}", get(users::get_user))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{post_id}", get(posts::get_post).delete(posts::delete_post))
        .route("/posts/{post_id}/like", post(posts::toggle_like))
        .route(
            "/posts/{post_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/comments/{comment_id}", delete(comments::delete_comment))
        .route("/messages", post(messages::send_message))
        .route("/messages/conversations", get(messages::conversations))
        .route("/messages/with/{user_id}", get(messages::conversation))
        .route("/messages/unread", get(messages::unread))
        .route("/dashboard", get(dashboard::get_dashboard).put(dashboard::save_dashboard))
        .route("/billing/checkout", post(billing::checkout))
        .route("/billing/cancel", post(billing::cancel))
        .route("/calculators/pension", post(calculators::pension))
        .route("/calculators/inheritance", post(calculators::inheritance))
        .route("/calculators/ipci", post(calculators::ipci))
        .route("/gateway", get(gateway_upgrade))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// The session was validated by `require_auth` before the upgrade.
async fn gateway_upgrade(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, dispatcher, claims.sub, claims.username)
    })
}
