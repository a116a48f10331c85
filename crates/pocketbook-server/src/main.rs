mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pocketbook_api::billing::BillingConfig;
use pocketbook_api::mailer::{HttpMailer, Mailer};
use pocketbook_api::{AppState, AppStateInner};
use pocketbook_db::Database;
use pocketbook_gateway::Dispatcher;
use pocketbook_market::MarketClient;

use crate::config::Config;

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "pocketbook=debug,pocketbook_api=debug,pocketbook_db=debug,\
pocketbook_gateway=debug,pocketbook_market=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;
    info!("Database ready at {}", config.db_path.display());

    let market = MarketClient::new(config.market)?;

    let mailer = match config.mail {
        Some(mail) => Mailer::Http(HttpMailer::new(mail.api_url, mail.api_key, mail.from)?),
        None => {
            warn!("Mail provider not configured; outgoing mail will only be logged");
            Mailer::Log
        }
    };

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
        cookie_secure: config.cookie_secure,
        dispatcher: Dispatcher::new(),
        market,
        mailer,
        billing: BillingConfig {
            checkout_url: config.billing_checkout_url,
            public_url: config.public_url,
            secret: config.billing_secret,
        },
    });

    let app = pocketbook_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Pocketbook server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_every_crate() {
        for target in [
            "pocketbook_api",
            "pocketbook_db",
            "pocketbook_gateway",
            "pocketbook_market",
            "tower_http",
        ] {
            assert!(
                DEFAULT_LOG_FILTER.split(',').any(|d| d.starts_with(&format!("{}=", target))),
                "{} missing",
                target
            );
        }
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
