use axum::{Extension, Json, extract::State, response::IntoResponse};

use pocketbook_db::models::DashboardRow;
use pocketbook_types::api::{DashboardRequest, DashboardResponse};

use crate::convert;
use crate::error::{ApiError, Payload};
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let row = run_db(&state, move |db| db.get_dashboard(&uid)).await?;
    Ok(Json(row.map(response_from_row).unwrap_or_else(empty_dashboard)))
}

pub async fn save_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<DashboardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&req)?;

    let uid = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        db.upsert_dashboard(&uid, &req)?;
        db.get_dashboard(&uid)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("dashboard vanished after upsert"))?;

    Ok(Json(response_from_row(row)))
}

fn validate(req: &DashboardRequest) -> Result<(), ApiError> {
    let fields = [
        ("monthly_income", req.monthly_income),
        ("monthly_expenses", req.monthly_expenses),
        ("savings", req.savings),
        ("investments", req.investments),
        ("debts", req.debts),
        ("emergency_fund", req.emergency_fund),
    ];
    for (name, value) in fields {
        if !value.is_finite() || value < 0.0 {
            return Err(ApiError::bad_request(format!(
                "{} must be a finite, non-negative number",
                name
            )));
        }
    }
    Ok(())
}

fn response_from_row(row: DashboardRow) -> DashboardResponse {
    let values = DashboardRequest {
        monthly_income: row.monthly_income,
        monthly_expenses: row.monthly_expenses,
        savings: row.savings,
        investments: row.investments,
        debts: row.debts,
        emergency_fund: row.emergency_fund,
    };
    summarize(&values, Some(convert::timestamp(&row.updated_at)))
}

fn empty_dashboard() -> DashboardResponse {
    let zero = DashboardRequest {
        monthly_income: 0.0,
        monthly_expenses: 0.0,
        savings: 0.0,
        investments: 0.0,
        debts: 0.0,
        emergency_fund: 0.0,
    };
    summarize(&zero, None)
}

fn summarize(
    v: &DashboardRequest,
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
) -> DashboardResponse {
    let monthly_surplus = v.monthly_income - v.monthly_expenses;
    let savings_rate = if v.monthly_income > 0.0 {
        monthly_surplus / v.monthly_income
    } else {
        0.0
    };
    let emergency_months = (v.monthly_expenses > 0.0).then(|| v.emergency_fund / v.monthly_expenses);

    DashboardResponse {
        monthly_income: v.monthly_income,
        monthly_expenses: v.monthly_expenses,
        savings: v.savings,
        investments: v.investments,
        debts: v.debts,
        emergency_fund: v.emergency_fund,
        net_worth: v.savings + v.investments + v.emergency_fund - v.debts,
        monthly_surplus,
        savings_rate,
        emergency_months,
        updated_at,
    }
}
