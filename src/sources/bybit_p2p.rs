//! Bybit P2P client for live parallel market adverts
//!
//! Posts the listing query for one side and normalizes the first page of
//! adverts into quotes. Numeric fields arrive as strings or numbers.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::config::P2pConfig;
use crate::sources::http::HttpFetcher;
use crate::sources::QuoteSource;
use crate::types::{Quote, Side};

pub const BYBIT_P2P_LABEL: &str = "Bybit P2P";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingRequest {
    token_id: String,
    currency_id: String,
    side: String,
    page: String,
    size: String,
    payment: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListingResponse {
    ret_code: Option<i64>,
    ret_msg: Option<String>,
    result: Option<ListingResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListingResult {
    #[serde(default)]
    items: Vec<Value>,
}

pub struct BybitP2pSource {
    http: Arc<HttpFetcher>,
    url: String,
    asset: String,
    fiat: String,
    page_size: u32,
}

impl BybitP2pSource {
    pub fn new(http: Arc<HttpFetcher>, config: &P2pConfig, asset: &str, fiat: &str) -> Self {
        Self {
            http,
            url: config.url.clone(),
            asset: asset.to_uppercase(),
            fiat: fiat.to_uppercase(),
            page_size: config.page_size,
        }
    }

    fn request(&self, side: Side) -> ListingRequest {
        ListingRequest {
            token_id: self.asset.clone(),
            currency_id: self.fiat.clone(),
            side: side.wire_code().to_string(),
            page: "1".to_string(),
            size: self.page_size.to_string(),
            payment: Vec::new(),
        }
    }
}

#[async_trait]
impl QuoteSource for BybitP2pSource {
    fn name(&self) -> &'static str {
        BYBIT_P2P_LABEL
    }

    async fn fetch_quotes(&self, side: Side) -> Result<Vec<Quote>> {
        let payload: Value = self.http.post_json(&self.url, &self.request(side)).await?;
        parse_listing(&payload, side, &self.asset, &self.fiat, Utc::now())
    }
}

/// Normalize a listing response. A non-zero `ret_code` fails the whole
/// batch; individual adverts without a usable price are dropped.
pub fn parse_listing(
    payload: &Value,
    side: Side,
    asset: &str,
    fiat: &str,
    captured_at: DateTime<Utc>,
) -> Result<Vec<Quote>> {
    let response: ListingResponse = serde_json::from_value(payload.clone())?;

    if response.ret_code != Some(0) {
        bail!(
            "P2P API error {}: {}",
            response.ret_code.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string()),
            response.ret_msg.unwrap_or_default()
        );
    }

    let items = response.result.map(|r| r.items).unwrap_or_default();
    Ok(items
        .iter()
        .filter_map(|item| parse_item(item, side, asset, fiat, captured_at))
        .collect())
}

fn parse_item(
    item: &Value,
    side: Side,
    asset: &str,
    fiat: &str,
    captured_at: DateTime<Utc>,
) -> Option<Quote> {
    let price = number(item.get("price")?)?;
    if !price.is_finite() || price <= 0.0 {
        return None;
    }

    let field = |key: &str| item.get(key).and_then(number).unwrap_or(0.0);
    let payment_methods = match item.get("payments") {
        Some(Value::Array(methods)) => methods
            .iter()
            .map(|m| match m {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };

    Some(Quote {
        side,
        price,
        min_amount: field("minAmount"),
        max_amount: field("maxAmount"),
        available: field("lastQuantity"),
        merchant: item
            .get("nickName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        completion_rate: field("recentExecuteRate"),
        recent_orders: field("recentOrderNum").max(0.0) as u64,
        payment_methods,
        asset: asset.to_string(),
        fiat: fiat.to_string(),
        timestamp: captured_at,
    })
}

/// Numbers arrive either as JSON numbers or numeric strings
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(items: Value) -> Value {
        json!({
            "ret_code": 0,
            "ret_msg": "SUCCESS",
            "result": {"count": 2, "items": items}
        })
    }

    #[test]
    fn parses_adverts() {
        let payload = listing(json!([
            {
                "price": "1650.50",
                "minAmount": "5000.00",
                "maxAmount": "2000000.00",
                "lastQuantity": "812.44",
                "nickName": "FastFx",
                "recentOrderNum": 321,
                "recentExecuteRate": 98,
                "payments": ["14", "377"]
            }
        ]));
        let now = Utc::now();
        let quotes = parse_listing(&payload, Side::Buy, "USDT", "NGN", now).unwrap();

        assert_eq!(quotes.len(), 1);
        let q = &quotes[0];
        assert_eq!(q.side, Side::Buy);
        assert_eq!(q.price, 1650.5);
        assert_eq!(q.min_amount, 5000.0);
        assert_eq!(q.max_amount, 2_000_000.0);
        assert_eq!(q.available, 812.44);
        assert_eq!(q.merchant, "FastFx");
        assert_eq!(q.recent_orders, 321);
        assert_eq!(q.completion_rate, 98.0);
        assert_eq!(q.payment_methods, "14, 377");
        assert_eq!(q.timestamp, now);
    }

    #[test]
    fn drops_adverts_without_usable_price() {
        let payload = listing(json!([
            {"nickName": "NoPrice"},
            {"price": "abc", "nickName": "Garbage"},
            {"price": "0", "nickName": "Zero"},
            {"price": 1580, "nickName": "Numeric"}
        ]));
        let quotes = parse_listing(&payload, Side::Sell, "USDT", "NGN", Utc::now()).unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].merchant, "Numeric");
        assert_eq!(quotes[0].price, 1580.0);
        assert_eq!(quotes[0].min_amount, 0.0);
    }

    #[test]
    fn api_error_fails_the_batch() {
        let payload = json!({"ret_code": 10001, "ret_msg": "params error"});
        let err = parse_listing(&payload, Side::Buy, "USDT", "NGN", Utc::now()).unwrap_err();
        assert!(err.to_string().contains("params error"));
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let payload = json!({"ret_code": 0, "ret_msg": "SUCCESS", "result": {}});
        let quotes = parse_listing(&payload, Side::Buy, "USDT", "NGN", Utc::now()).unwrap();
        assert!(quotes.is_empty());
    }

    #[test]
    fn request_uses_wire_side_codes() {
        let http = Arc::new(
            HttpFetcher::new(&crate::config::HttpConfig {
                timeout_secs: 1,
                min_delay_ms: 0,
                user_agent: "test".to_string(),
            })
            .unwrap(),
        );
        let config = P2pConfig {
            enabled: true,
            url: "https://p2p.invalid/online".to_string(),
            page_size: 20,
        };
        let source = BybitP2pSource::new(http, &config, "usdt", "ngn");

        let body = serde_json::to_value(source.request(Side::Sell)).unwrap();
        assert_eq!(
            body,
            json!({
                "tokenId": "USDT",
                "currencyId": "NGN",
                "side": "0",
                "page": "1",
                "size": "20",
                "payment": []
            })
        );
    }
}
