//! Provider payload shapes and their normalisation into the overview types.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Holidays shown in the overview.
const MAX_UPCOMING_HOLIDAYS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRates {
    pub base: String,
    pub date: String,
    pub rates: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldPrice {
    pub price_per_ounce: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    pub local_name: String,
}

// -- Indices --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndicesPayload {
    quote_response: QuoteResponse,
}

#[derive(Deserialize)]
struct QuoteResponse {
    result: Vec<RawIndexQuote>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIndexQuote {
    symbol: String,
    short_name: Option<String>,
    regular_market_price: Option<f64>,
    regular_market_change_percent: Option<f64>,
}

pub fn normalize_indices(payload: serde_json::Value) -> Result<Vec<Quote>> {
    let parsed: IndicesPayload = serde_json::from_value(payload)?;
    let quotes: Vec<Quote> = parsed
        .quote_response
        .result
        .into_iter()
        .filter_map(|raw| {
            let price = raw.regular_market_price?;
            Some(Quote {
                name: raw.short_name.unwrap_or_else(|| raw.symbol.clone()),
                symbol: raw.symbol,
                price,
                change_pct: raw.regular_market_change_percent,
            })
        })
        .collect();

    if quotes.is_empty() {
        return Err(anyhow!("no priced index quotes in payload"));
    }
    Ok(quotes)
}

// -- Crypto --

#[derive(Deserialize)]
struct RawCoinPrice {
    eur: f64,
    eur_24h_change: Option<f64>,
}

pub fn normalize_crypto(payload: serde_json::Value) -> Result<Vec<Quote>> {
    let parsed: BTreeMap<String, RawCoinPrice> = serde_json::from_value(payload)?;
    if parsed.is_empty() {
        return Err(anyhow!("empty crypto payload"));
    }

    Ok(parsed
        .into_iter()
        .map(|(id, price)| Quote {
            symbol: coin_symbol(&id),
            name: capitalize(&id),
            price: price.eur,
            change_pct: price.eur_24h_change,
        })
        .collect())
}

fn coin_symbol(id: &str) -> String {
    match id {
        "bitcoin" => "BTC".into(),
        "ethereum" => "ETH".into(),
        "solana" => "SOL".into(),
        "cardano" => "ADA".into(),
        "ripple" => "XRP".into(),
        other => other.to_uppercase(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// -- FX --

pub fn normalize_fx(payload: serde_json::Value) -> Result<FxRates> {
    let rates: FxRates = serde_json::from_value(payload)?;
    if rates.rates.is_empty() {
        return Err(anyhow!("no FX rates in payload"));
    }
    Ok(rates)
}

// -- Gold --

#[derive(Deserialize)]
struct RawGold {
    base: String,
    rates: BTreeMap<String, f64>,
}

/// The provider quotes ounces of gold per unit of `base`; invert it.
pub fn normalize_gold(payload: serde_json::Value) -> Result<GoldPrice> {
    let parsed: RawGold = serde_json::from_value(payload)?;
    let ounces = parsed
        .rates
        .get("XAU")
        .copied()
        .ok_or_else(|| anyhow!("XAU rate missing"))?;
    if !(ounces.is_finite() && ounces > 0.0) {
        return Err(anyhow!("invalid XAU rate {}", ounces));
    }

    Ok(GoldPrice {
        price_per_ounce: (1.0 / ounces * 100.0).round() / 100.0,
        currency: parsed.base,
    })
}

// -- Holidays --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHoliday {
    date: NaiveDate,
    local_name: String,
    name: String,
}

/// Every holiday in the payload, sorted by date.
pub fn normalize_holidays(payload: serde_json::Value) -> Result<Vec<Holiday>> {
    let parsed: Vec<RawHoliday> = serde_json::from_value(payload)?;
    let mut holidays: Vec<Holiday> = parsed
        .into_iter()
        .map(|raw| Holiday {
            date: raw.date,
            name: raw.name,
            local_name: raw.local_name,
        })
        .collect();
    holidays.sort_by_key(|h| h.date);
    Ok(holidays)
}

/// Holidays on or after `today`, at most ten.
pub fn upcoming_holidays(payload: serde_json::Value, today: NaiveDate) -> Result<Vec<Holiday>> {
    let mut holidays = normalize_holidays(payload)?;
    holidays.retain(|h| h.date >= today);
    holidays.truncate(MAX_UPCOMING_HOLIDAYS);
    Ok(holidays)
}
