use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use pocketbook_types::api::{PublicProfile, UpdateProfileRequest};

use crate::convert;
use crate::error::{ApiError, Path, Payload, Query};
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

const MAX_DISPLAY_NAME: usize = 64;
const MAX_BIO: usize = 500;
const SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let id = claims.sub.to_string();
    let user = run_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        // Valid token for an account that no longer exists
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(convert::profile(user)))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let display_name = req.display_name.map(|s| s.trim().to_string());
    let bio = req.bio.map(|s| s.trim().to_string());

    if display_name.as_ref().is_some_and(|s| s.chars().count() > MAX_DISPLAY_NAME) {
        return Err(ApiError::bad_request(format!(
            "display_name must be at most {} characters",
            MAX_DISPLAY_NAME
        )));
    }
    if bio.as_ref().is_some_and(|s| s.chars().count() > MAX_BIO) {
        return Err(ApiError::bad_request(format!("bio must be at most {} characters", MAX_BIO)));
    }

    let id = claims.sub.to_string();
    let user = run_db(&state, move |db| {
        db.update_profile(&id, display_name.as_deref(), bio.as_deref())?;
        db.get_user_by_id(&id)
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    Ok(Json(convert::profile(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = user_id.to_string();
    let user = run_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(convert::public_profile(user)))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let prefix = query.q.trim().to_string();
    if prefix.is_empty() {
        return Ok(Json(Vec::<PublicProfile>::new()));
    }

    let rows = run_db(&state, move |db| db.search_users(&prefix, SEARCH_LIMIT)).await?;
    let profiles: Vec<PublicProfile> = rows.into_iter().map(convert::public_profile).collect();
    Ok(Json(profiles))
}
