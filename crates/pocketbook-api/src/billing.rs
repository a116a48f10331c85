//! Subscription checkout through a hosted payment page.
//!
//! `POST /billing/checkout` records a pending checkout and hands back the
//! provider URL to redirect the browser to. The provider sends the browser
//! back to `GET /billing/callback` with the outcome, signed with the shared
//! billing secret.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Redirect},
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, warn};
use uuid::Uuid;

use pocketbook_db::billing::CheckoutCompletion;
use pocketbook_types::api::{CheckoutRequest, CheckoutResponse, Plan};
use pocketbook_types::models::{CheckoutStatus, Tier};

use crate::convert;
use crate::error::{ApiError, Payload, Query};
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

type HmacSha256 = Hmac<Sha256>;

const SUCCESS_REDIRECT: &str = "/account?payment=success";
const FAILURE_REDIRECT: &str = "/account?payment=failed";

#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Hosted checkout page of the payment provider.
    pub checkout_url: String,
    /// Public base URL of this server, for the provider's return URL.
    pub public_url: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub checkout_id: String,
    pub status: String,
    pub signature: String,
}

pub async fn plans() -> impl IntoResponse {
    let plans: Vec<Plan> = Tier::ALL
        .into_iter()
        .map(|tier| Plan {
            tier,
            name: tier.display_name().to_string(),
            monthly_price_cents: tier.monthly_price_cents(),
        })
        .collect();
    Json(plans)
}

pub async fn checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.tier == Tier::Free {
        return Err(ApiError::bad_request("the free tier needs no checkout"));
    }

    let uid = claims.sub.to_string();
    let user = {
        let uid = uid.clone();
        run_db(&state, move |db| db.get_user_by_id(&uid)).await?
    }
    .ok_or(ApiError::Unauthorized)?;
    if convert::tier(&user.tier) == req.tier {
        return Err(ApiError::bad_request(format!("already subscribed to {}", req.tier)));
    }

    let checkout_id = Uuid::new_v4();
    let amount_cents = req.tier.monthly_price_cents();
    {
        let cid = checkout_id.to_string();
        let tier = req.tier.as_str();
        run_db(&state, move |db| db.create_checkout(&cid, &uid, tier, amount_cents)).await?;
    }

    let redirect_url = checkout_redirect_url(&state.billing, checkout_id, amount_cents)?;
    info!("Checkout {} opened for {} ({})", checkout_id, claims.username, req.tier);

    Ok(Json(CheckoutResponse {
        checkout_id,
        amount_cents,
        redirect_url,
    }))
}

/// Browser redirect back from the payment provider.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if !verify_signature(&state.billing.secret, &query.checkout_id, &query.status, &query.signature) {
        warn!("Rejected billing callback with bad signature for {}", query.checkout_id);
        return Err(ApiError::bad_request("invalid signature"));
    }
    let checkout_id: Uuid = query
        .checkout_id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid checkout_id"))?;

    let paid = query.status == CheckoutStatus::Paid.as_str();
    let cid = checkout_id.to_string();
    let completion = run_db(&state, move |db| db.complete_checkout(&cid, paid)).await?;

    let row = match completion {
        CheckoutCompletion::Missing => return Err(ApiError::NotFound),
        CheckoutCompletion::AlreadySettled(row) => {
            info!("Checkout {} already settled as {}", row.id, row.status);
            row
        }
        CheckoutCompletion::Settled(row) => {
            info!("Checkout {} settled as {}", row.id, row.status);
            if row.status == CheckoutStatus::Paid.as_str() {
                send_receipt(&state, row.user_id.clone(), row.tier.clone(), row.amount_cents);
            }
            row
        }
    };

    let target = if row.status == CheckoutStatus::Paid.as_str() {
        SUCCESS_REDIRECT
    } else {
        FAILURE_REDIRECT
    };
    Ok(Redirect::to(target))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let user = run_db(&state, move |db| {
        db.set_tier(&uid, Tier::Free.as_str())?;
        db.get_user_by_id(&uid)
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    info!("{} cancelled their subscription", claims.username);
    Ok(Json(convert::profile(user)))
}

fn send_receipt(state: &AppState, user_id: String, tier: String, amount_cents: i64) {
    let state = state.clone();
    tokio::spawn(async move {
        let user = match run_db(&state, move |db| db.get_user_by_id(&user_id)).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!("Receipt lookup failed: {}", e);
                return;
            }
        };
        let body = format!(
            "Hi {},\n\nThanks for subscribing to Pocketbook {}. You were charged {}.{:02} EUR.\n",
            user.username,
            tier,
            amount_cents / 100,
            amount_cents % 100
        );
        if let Err(e) = state.mailer.send(&user.email, "Your Pocketbook receipt", &body).await {
            warn!("Receipt email to {} failed: {:#}", user.email, e);
        }
    });
}

fn checkout_redirect_url(config: &BillingConfig, checkout_id: Uuid, amount_cents: i64) -> anyhow::Result<String> {
    let return_url = format!("{}/billing/callback", config.public_url.trim_end_matches('/'));
    let url = reqwest::Url::parse_with_params(
        &config.checkout_url,
        &[
            ("checkout_id", checkout_id.to_string()),
            ("amount", amount_cents.to_string()),
            ("return_url", return_url),
        ],
    )?;
    Ok(url.into())
}

/// Hex HMAC-SHA256 over `"{checkout_id}:{status}"`.
pub fn sign_callback(secret: &str, checkout_id: &str, status: &str) -> anyhow::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid billing secret: {}", e))?;
    mac.update(format!("{}:{}", checkout_id, status).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_signature(secret: &str, checkout_id: &str, status: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{}:{}", checkout_id, status).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_and_bind_status() {
        let sig = sign_callback("s3cret", "abc", "paid").unwrap();
        assert!(verify_signature("s3cret", "abc", "paid", &sig));
        assert!(!verify_signature("s3cret", "abc", "failed", &sig));
        assert!(!verify_signature("other", "abc", "paid", &sig));
        assert!(!verify_signature("s3cret", "abc", "paid", "not-hex"));
    }

    #[test]
    fn redirect_url_carries_checkout_params() {
        let config = BillingConfig {
            checkout_url: "https://pay.example.com/checkout".into(),
            public_url: "https://app.example.com/".into(),
            secret: "x".into(),
        };
        let id = Uuid::nil();
        let url = checkout_redirect_url(&config, id, 499).unwrap();
        assert!(url.starts_with("https://pay.example.com/checkout?checkout_id=00000000-0000-0000-0000-000000000000"));
        assert!(url.contains("amount=499"));
        assert!(url.contains("return_url=https%3A%2F%2Fapp.example.com%2Fbilling%2Fcallback"));
    }
}
