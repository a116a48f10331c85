use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use pocketbook_types::api::{CreatePostRequest, LikeResponse, PostResponse};
use pocketbook_types::events::GatewayEvent;

use crate::convert;
use crate::error::{ApiError, Path, Payload, Query};
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

const MAX_TITLE: usize = 120;
const MAX_CONTENT: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: pass the `created_at` of the oldest post
    /// from the previous page to fetch older posts.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    20
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    let content = req.content.trim().to_string();
    check_length("title", &title, MAX_TITLE)?;
    check_length("content", &content, MAX_CONTENT)?;

    let image_url = req.image_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    if let Some(url) = &image_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ApiError::bad_request("image_url must be an http(s) URL"));
        }
    }

    let post_id = Uuid::new_v4().to_string();
    let author_id = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        db.insert_post(&post_id, &author_id, &title, &content, image_url.as_deref())?;
        db.get_post(&post_id, &author_id)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("post vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(convert::post(row))))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.clamp(1, 100);
    let before = query.before.as_deref().map(normalize_cursor).transpose()?;

    let viewer = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_posts(&viewer, limit, before.as_deref())).await?;

    let posts: Vec<PostResponse> = rows.into_iter().map(convert::post).collect();
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = post_id.to_string();
    let viewer = claims.sub.to_string();
    let row = run_db(&state, move |db| db.get_post(&id, &viewer))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(convert::post(row)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = post_id.to_string();
    let author = {
        let id = id.clone();
        run_db(&state, move |db| db.get_post_author(&id)).await?
    }
    .ok_or(ApiError::NotFound)?;

    if author != claims.sub.to_string() {
        return Err(ApiError::Forbidden);
    }

    run_db(&state, move |db| db.delete_post(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let like_id = Uuid::new_v4().to_string();
    let pid = post_id.to_string();
    let uid = claims.sub.to_string();

    let (author, toggled) = run_db(&state, move |db| {
        let author = db.get_post_author(&pid)?;
        let toggled = db.toggle_like(&like_id, &pid, &uid)?;
        Ok((author, toggled))
    })
    .await?;
    let (liked, like_count) = toggled.ok_or(ApiError::NotFound)?;

    if liked {
        if let Some(author_id) = author.and_then(|a| a.parse::<Uuid>().ok()) {
            if author_id != claims.sub {
                state
                    .dispatcher
                    .send_to_user(
                        author_id,
                        GatewayEvent::PostLiked {
                            post_id,
                            user_id: claims.sub,
                            username: claims.username.clone(),
                            like_count,
                        },
                    )
                    .await;
            }
        }
    }

    Ok(Json(LikeResponse { liked, like_count }))
}

/// Trimmed text must be non-empty and at most `max` characters.
pub(crate) fn check_length(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(ApiError::bad_request(format!(
            "{} must be between 1 and {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Bring a client cursor into the stored timestamp format so it compares
/// correctly as text.
fn normalize_cursor(raw: &str) -> Result<String, ApiError> {
    let parsed = pocketbook_db::parse_timestamp(raw)
        .map_err(|_| ApiError::bad_request("before must be an RFC 3339 timestamp"))?;
    Ok(parsed.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}
