use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use chrono::Datelike;
use serde::Deserialize;
use tracing::warn;

use crate::error::{ApiError, Query};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HolidaysQuery {
    pub year: Option<i32>,
}

pub async fn overview(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.market.overview().await)
}

pub async fn holidays(
    State(state): State<AppState>,
    Query(query): Query<HolidaysQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let year = query.year.unwrap_or_else(|| chrono::Utc::now().year());
    if !(1900..=2100).contains(&year) {
        return Err(ApiError::bad_request("year must be between 1900 and 2100"));
    }

    let holidays = state.market.holidays(year).await.map_err(|e| {
        warn!("Holiday calendar unavailable: {:#}", e);
        ApiError::Upstream("holiday calendar".into())
    })?;
    Ok(Json(holidays))
}
