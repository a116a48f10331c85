use std::sync::Arc;

use tracing::error;

use pocketbook_db::Database;
use pocketbook_gateway::Dispatcher;
use pocketbook_market::MarketClient;

use crate::billing::BillingConfig;
use crate::error::ApiError;
use crate::mailer::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
    pub dispatcher: Dispatcher,
    pub market: MarketClient,
    pub mailer: Mailer,
    pub billing: BillingConfig,
}

/// Run blocking DB work off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::from)
}
