//! DefiLlama historical price client.

use super::{PriceSource, PriceSourceError};
use crate::domain::{ChainId, Decimal, Timestamp, TokenId};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use rust_decimal::Decimal as RustDecimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Price source backed by the public `coins.llama.fi` API.
#[derive(Debug, Clone)]
pub struct DefiLlamaPriceSource {
    client: Client,
    base_url: String,
    max_elapsed: Duration,
}

impl DefiLlamaPriceSource {
    pub fn new(base_url: String, max_elapsed: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_elapsed,
        }
    }

    /// Create with the default DefiLlama URL and a 30s retry budget.
    pub fn default_url() -> Self {
        Self::new(
            "https://coins.llama.fi".to_string(),
            Duration::from_secs(30),
        )
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, PriceSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(url).send().await.map_err(|e| {
                backoff::Error::transient(PriceSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(PriceSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(PriceSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(PriceSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(PriceSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

/// DefiLlama's chain slug for an EVM chain id.
pub fn chain_slug(chain: ChainId) -> Option<&'static str> {
    match chain.as_u64() {
        1 => Some("ethereum"),
        10 => Some("optimism"),
        56 => Some("bsc"),
        137 => Some("polygon"),
        8453 => Some("base"),
        42161 => Some("arbitrum"),
        _ => None,
    }
}

fn coin_key(slug: &str, token: &TokenId) -> String {
    format!("{}:{}", slug, token.as_str())
}

#[async_trait]
impl PriceSource for DefiLlamaPriceSource {
    async fn historical_prices(
        &self,
        tokens: &[TokenId],
        at: Timestamp,
        chain: ChainId,
    ) -> Result<HashMap<TokenId, Decimal>, PriceSourceError> {
        let slug = chain_slug(chain).ok_or(PriceSourceError::UnsupportedChain(chain))?;
        if tokens.is_empty() {
            return Ok(HashMap::new());
        }

        let coins = tokens
            .iter()
            .map(|token| coin_key(slug, token))
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}/prices/historical/{}/{}",
            self.base_url,
            at.as_secs(),
            coins
        );
        debug!("Fetching historical prices chain={}, at={}, coins={}", chain, at, coins);

        let response = self.get_json(&url).await?;
        parse_prices(&response, slug, tokens)
    }
}

/// Extract the requested tokens' prices from a `/prices/historical` body.
///
/// Keys are matched case-insensitively; tokens missing from the body are
/// left out of the result.
fn parse_prices(
    response: &serde_json::Value,
    slug: &str,
    tokens: &[TokenId],
) -> Result<HashMap<TokenId, Decimal>, PriceSourceError> {
    let coins = response
        .get("coins")
        .and_then(|v| v.as_object())
        .ok_or_else(|| PriceSourceError::ParseError("Missing coins object".to_string()))?;

    let by_key: HashMap<String, &serde_json::Value> = coins
        .iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();

    let mut prices = HashMap::new();
    for token in tokens {
        let Some(entry) = by_key.get(&coin_key(slug, token)) else {
            warn!("No historical price for {}", token);
            continue;
        };

        let raw = entry
            .get("price")
            .and_then(|v| v.as_number())
            .ok_or_else(|| PriceSourceError::ParseError(format!("Missing price for {}", token)))?;

        prices.insert(token.clone(), parse_price(raw)?);
    }

    Ok(prices)
}

/// Read a JSON number from its printed form so no binary-float rounding
/// leaks into the decimal. Small prices come back in exponent notation.
fn parse_price(raw: &serde_json::Number) -> Result<Decimal, PriceSourceError> {
    let text = raw.to_string();
    RustDecimal::from_str(&text)
        .or_else(|_| RustDecimal::from_scientific(&text))
        .map(|price| Decimal::new(price.normalize()))
        .map_err(|e| PriceSourceError::ParseError(format!("Invalid price {}: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prices_matches_case_insensitively() {
        let body = serde_json::json!({
            "coins": {
                "optimism:0x7F5c764cBc14f9669B88837ca1490cCa17c31607": {
                    "decimals": 6,
                    "symbol": "USDC",
                    "price": 1.0,
                    "timestamp": 1700000000
                },
                "optimism:0x4200000000000000000000000000000000000006": {
                    "decimals": 18,
                    "symbol": "WETH",
                    "price": 2050.5,
                    "timestamp": 1700000001
                }
            }
        });
        let usdc = TokenId::new("0x7f5c764cbc14f9669b88837ca1490cca17c31607");
        let weth = TokenId::new("0x4200000000000000000000000000000000000006");

        let prices = parse_prices(&body, "optimism", &[usdc.clone(), weth.clone()]).unwrap();
        assert_eq!(prices[&usdc], Decimal::one());
        assert_eq!(prices[&weth], Decimal::from_str_canonical("2050.5").unwrap());
    }

    #[test]
    fn test_parse_prices_keeps_printed_digits() {
        let body: serde_json::Value = serde_json::from_str(
            r#"{"coins": {
                "ethereum:0xaaa": {"price": 0.1},
                "ethereum:0xbbb": {"price": 1.5e-7},
                "ethereum:0xccc": {"price": 2}
            }}"#,
        )
        .unwrap();
        let tokens = [TokenId::new("0xaaa"), TokenId::new("0xbbb"), TokenId::new("0xccc")];

        let prices = parse_prices(&body, "ethereum", &tokens).unwrap();

        assert_eq!(prices[&tokens[0]].to_canonical_string(), "0.1");
        assert_eq!(prices[&tokens[1]].to_canonical_string(), "0.00000015");
        assert_eq!(prices[&tokens[2]].to_canonical_string(), "2");
    }

    #[test]
    fn test_parse_prices_skips_missing_tokens() {
        let body = serde_json::json!({ "coins": {} });
        let prices = parse_prices(&body, "ethereum", &[TokenId::new("0xabc")]).unwrap();
        assert!(prices.is_empty());
    }

    #[test]
    fn test_parse_prices_rejects_malformed_body() {
        let body = serde_json::json!({ "prices": [] });
        let result = parse_prices(&body, "ethereum", &[TokenId::new("0xabc")]);
        assert!(matches!(result, Err(PriceSourceError::ParseError(_))));
    }

    #[test]
    fn test_chain_slug() {
        assert_eq!(chain_slug(ChainId::new(10)), Some("optimism"));
        assert_eq!(chain_slug(ChainId::new(42161)), Some("arbitrum"));
        assert_eq!(chain_slug(ChainId::new(31337)), None);
    }

    #[tokio::test]
    async fn test_unsupported_chain_fails_without_request() {
        let source = DefiLlamaPriceSource::new(
            "http://example.invalid".to_string(),
            Duration::from_millis(1),
        );
        let result = source
            .historical_prices(&[TokenId::new("0xabc")], Timestamp::new(1), ChainId::new(31337))
            .await;
        assert_eq!(result, Err(PriceSourceError::UnsupportedChain(ChainId::new(31337))));
    }
}
