use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use pocketbook_market::MarketConfig;

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub cookie_secure: bool,
    pub public_url: String,
    pub billing_checkout_url: String,
    pub billing_secret: String,
    /// `None` unless all three mail variables are set.
    pub mail: Option<MailConfig>,
    pub market: MarketConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = var_or("POCKETBOOK_PORT", "3000")
            .parse()
            .context("POCKETBOOK_PORT must be a port number")?;

        let mail = match (
            var("POCKETBOOK_MAIL_API_URL"),
            var("POCKETBOOK_MAIL_API_KEY"),
            var("POCKETBOOK_MAIL_FROM"),
        ) {
            (Some(api_url), Some(api_key), Some(from)) => Some(MailConfig { api_url, api_key, from }),
            _ => None,
        };

        let defaults = MarketConfig::default();
        let market = MarketConfig {
            indices_url: var("POCKETBOOK_MARKET_INDICES_URL").unwrap_or(defaults.indices_url),
            crypto_url: var("POCKETBOOK_MARKET_CRYPTO_URL").unwrap_or(defaults.crypto_url),
            fx_url: var("POCKETBOOK_MARKET_FX_URL").unwrap_or(defaults.fx_url),
            gold_url: var("POCKETBOOK_MARKET_GOLD_URL").unwrap_or(defaults.gold_url),
            holidays_url: var("POCKETBOOK_MARKET_HOLIDAYS_URL").unwrap_or(defaults.holidays_url),
            holiday_country: var("POCKETBOOK_HOLIDAY_COUNTRY").unwrap_or(defaults.holiday_country),
            api_key: var("POCKETBOOK_MARKET_API_KEY"),
            cache_secs: var("POCKETBOOK_MARKET_CACHE_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_secs),
            request_timeout: Duration::from_secs(8),
        };

        Ok(Self {
            host: var_or("POCKETBOOK_HOST", "0.0.0.0"),
            port,
            db_path: var_or("POCKETBOOK_DB_PATH", "pocketbook.db").into(),
            jwt_secret: required_secret("POCKETBOOK_JWT_SECRET")?,
            cookie_secure: var("POCKETBOOK_COOKIE_SECURE").is_some_and(|v| parse_flag(&v)),
            public_url: var_or("POCKETBOOK_PUBLIC_URL", "http://localhost:3000"),
            billing_checkout_url: var_or(
                "POCKETBOOK_BILLING_CHECKOUT_URL",
                "https://checkout.example.com/pay",
            ),
            billing_secret: required_secret("POCKETBOOK_BILLING_SECRET")?,
            mail,
            market,
        })
    }
}

/// Unset and empty are treated the same.
fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.into())
}

fn required_secret(key: &str) -> anyhow::Result<String> {
    let value = var(key).unwrap_or_default();
    check_secret(key, &value)?;
    Ok(value)
}

fn check_secret(key: &str, value: &str) -> anyhow::Result<()> {
    if value.is_empty() || PLACEHOLDER_SECRETS.contains(&value) {
        bail!("{} is unset or still a placeholder; set it in your .env file and restart", key);
    }
    Ok(())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_secrets_are_rejected() {
        assert!(check_secret("K", "").is_err());
        assert!(check_secret("K", "dev-secret-change-me").is_err());
        assert!(check_secret("K", "6f1c0e2a9b7d").is_ok());
    }

    #[test]
    fn flags() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
    }
}
