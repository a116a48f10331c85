use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use pocketbook_types::api::{CommentResponse, CreateCommentRequest};
use pocketbook_types::events::GatewayEvent;

use crate::convert;
use crate::error::{ApiError, Path, Payload};
use crate::middleware::Claims;
use crate::posts::check_length;
use crate::state::{AppState, run_db};

const MAX_COMMENT: usize = 2_000;

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pid = post_id.to_string();
    let rows = run_db(&state, move |db| {
        if db.get_post_author(&pid)?.is_none() {
            return Ok(None);
        }
        db.list_comments(&pid).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    let comments: Vec<CommentResponse> = rows.into_iter().map(convert::comment).collect();
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
    Payload(req): Payload<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    check_length("content", &content, MAX_COMMENT)?;

    let comment_id = Uuid::new_v4();
    let cid = comment_id.to_string();
    let pid = post_id.to_string();
    let aid = claims.sub.to_string();

    let (post_author, row) = run_db(&state, move |db| {
        let Some(post_author) = db.get_post_author(&pid)? else {
            return Ok(None);
        };
        db.insert_comment(&cid, &pid, &aid, &content)?;
        Ok(db.get_comment(&cid)?.map(|row| (post_author, row)))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    if let Ok(post_author) = post_author.parse::<Uuid>() {
        if post_author != claims.sub {
            state
                .dispatcher
                .send_to_user(
                    post_author,
                    GatewayEvent::CommentCreate {
                        post_id,
                        comment_id,
                        author_id: claims.sub,
                        author_username: claims.username.clone(),
                    },
                )
                .await;
        }
    }

    Ok((StatusCode::CREATED, Json(convert::comment(row))))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = comment_id.to_string();
    let row = {
        let id = id.clone();
        run_db(&state, move |db| db.get_comment(&id)).await?
    }
    .ok_or(ApiError::NotFound)?;

    if row.author_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden);
    }

    run_db(&state, move |db| db.delete_comment(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
