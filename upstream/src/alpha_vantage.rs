//! Alpha Vantage CURRENCY_EXCHANGE_RATE client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use ratebridge_common::{Currency, GatewayError, RateKey, RateQuote};
use ratebridge_resolver::RateGateway;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, error, instrument, warn};

/// Client name used in logs and quota errors.
pub const ALPHA_VANTAGE: &str = "Alpha Vantage API";

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage reports "Last Refreshed" in this format, without an
/// offset. The accompanying "Time Zone" field is UTC in practice.
const LAST_REFRESHED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Settings for the Alpha Vantage client.
#[derive(Debug, Clone)]
pub struct AlphaVantageConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout_seconds: 10,
        }
    }
}

/// Live gateway backed by Alpha Vantage's CURRENCY_EXCHANGE_RATE function.
pub struct AlphaVantageGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageGateway {
    /// Build the gateway and its underlying HTTP client.
    pub fn new(config: AlphaVantageConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key,
        })
    }
}

#[async_trait]
impl RateGateway for AlphaVantageGateway {
    fn name(&self) -> &str {
        ALPHA_VANTAGE
    }

    #[instrument(skip(self), fields(pair = %key))]
    async fn fetch_quote(&self, key: &RateKey) -> Result<RateQuote, GatewayError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "CURRENCY_EXCHANGE_RATE"),
                ("from_currency", key.from.code()),
                ("to_currency", key.to.code()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            error!(status = %status, "Alpha Vantage request failed");
            return Err(GatewayError::Upstream(format!(
                "{ALPHA_VANTAGE} returned status {status}"
            )));
        }

        let envelope: QuoteEnvelope = response.json().await.map_err(transport_error)?;
        let quote = quote_from_envelope(envelope)?;
        debug!(rate = %quote.rate, observed_at = %quote.observed_at, "Fetched live quote");
        Ok(quote)
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    error!(error = %err, "Alpha Vantage transport failure");
    GatewayError::Upstream(format!("{ALPHA_VANTAGE} request failed: {err}"))
}

/// 200-status envelope. Alpha Vantage reports failures in the body: an
/// "Error Message" for bad requests, a "Note" or "Information" banner when
/// the free-tier quota is exhausted.
#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "Realtime Currency Exchange Rate")]
    quote: Option<QuotePayload>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    #[serde(rename = "1. From_Currency Code")]
    from_code: String,
    #[serde(rename = "2. From_Currency Name")]
    from_name: String,
    #[serde(rename = "3. To_Currency Code")]
    to_code: String,
    #[serde(rename = "4. To_Currency Name")]
    to_name: String,
    #[serde(rename = "5. Exchange Rate")]
    rate: Decimal,
    #[serde(rename = "6. Last Refreshed")]
    last_refreshed: String,
    #[serde(rename = "7. Time Zone")]
    time_zone: String,
    #[serde(rename = "8. Bid Price")]
    bid: Decimal,
    #[serde(rename = "9. Ask Price")]
    ask: Decimal,
}

fn quote_from_envelope(envelope: QuoteEnvelope) -> Result<RateQuote, GatewayError> {
    if let Some(message) = &envelope.error_message {
        if message.contains("Invalid API call") {
            warn!(error_message = %message, "Alpha Vantage rejected the request");
            return Err(GatewayError::InvalidRequest {
                reason: message.clone(),
            });
        }
    }

    let quota_hit = [&envelope.note, &envelope.information]
        .into_iter()
        .flatten()
        .any(|notice| notice.contains("premium"));
    if quota_hit {
        warn!("Alpha Vantage call limit reached");
        return Err(GatewayError::RateLimitExceeded {
            provider: ALPHA_VANTAGE.to_string(),
        });
    }

    let payload = match envelope.quote {
        Some(payload) => payload,
        None => {
            return Err(GatewayError::Upstream(
                "response carried no exchange rate payload".to_string(),
            ))
        }
    };

    let observed_at =
        NaiveDateTime::parse_from_str(&payload.last_refreshed, LAST_REFRESHED_FORMAT)
            .map_err(|err| {
                GatewayError::Upstream(format!(
                    "could not parse last refreshed timestamp '{}': {err}",
                    payload.last_refreshed
                ))
            })?
            .and_utc();

    Ok(RateQuote {
        from: Currency::new(payload.from_code),
        from_name: payload.from_name,
        to: Currency::new(payload.to_code),
        to_name: payload.to_name,
        rate: payload.rate,
        bid: payload.bid,
        ask: payload.ask,
        observed_at,
        time_zone: payload.time_zone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn parse_envelope(json: &str) -> QuoteEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parses_realtime_exchange_rate_payload() {
        let envelope = parse_envelope(
            r#"{
                "Realtime Currency Exchange Rate": {
                    "1. From_Currency Code": "USD",
                    "2. From_Currency Name": "United States Dollar",
                    "3. To_Currency Code": "EUR",
                    "4. To_Currency Name": "Euro",
                    "5. Exchange Rate": "0.92040000",
                    "6. Last Refreshed": "2024-08-09 14:25:01",
                    "7. Time Zone": "UTC",
                    "8. Bid Price": "0.92030000",
                    "9. Ask Price": "0.92050000"
                }
            }"#,
        );

        let quote = quote_from_envelope(envelope).unwrap();

        assert_eq!(quote.from, Currency::usd());
        assert_eq!(quote.from_name, "United States Dollar");
        assert_eq!(quote.to, Currency::eur());
        assert_eq!(quote.to_name, "Euro");
        assert_eq!(quote.rate, dec!(0.9204));
        assert_eq!(quote.bid, dec!(0.9203));
        assert_eq!(quote.ask, dec!(0.9205));
        assert_eq!(
            quote.observed_at,
            Utc.with_ymd_and_hms(2024, 8, 9, 14, 25, 1).unwrap()
        );
        assert_eq!(quote.time_zone, "UTC");
    }

    #[test]
    fn test_invalid_api_call_is_invalid_request() {
        let envelope = parse_envelope(
            r#"{
                "Error Message": "Invalid API call. Please retry or visit the documentation for CURRENCY_EXCHANGE_RATE."
            }"#,
        );

        let result = quote_from_envelope(envelope);

        assert!(matches!(
            result,
            Err(GatewayError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_premium_note_is_rate_limit() {
        let envelope = parse_envelope(
            r#"{
                "Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day. Please subscribe to a premium plan."
            }"#,
        );

        let result = quote_from_envelope(envelope);

        match result {
            Err(GatewayError::RateLimitExceeded { provider }) => {
                assert_eq!(provider, ALPHA_VANTAGE);
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn test_premium_information_is_rate_limit() {
        let envelope = parse_envelope(
            r#"{
                "Information": "Please consider one of our premium plans to instantly remove all daily rate limits."
            }"#,
        );

        assert!(matches!(
            quote_from_envelope(envelope),
            Err(GatewayError::RateLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_missing_payload_is_upstream_error() {
        let envelope = parse_envelope("{}");

        assert!(matches!(
            quote_from_envelope(envelope),
            Err(GatewayError::Upstream(_))
        ));
    }

    #[test]
    fn test_unparseable_timestamp_is_upstream_error() {
        let envelope = parse_envelope(
            r#"{
                "Realtime Currency Exchange Rate": {
                    "1. From_Currency Code": "USD",
                    "2. From_Currency Name": "United States Dollar",
                    "3. To_Currency Code": "EUR",
                    "4. To_Currency Name": "Euro",
                    "5. Exchange Rate": "0.92",
                    "6. Last Refreshed": "last tuesday",
                    "7. Time Zone": "UTC",
                    "8. Bid Price": "0.91",
                    "9. Ask Price": "0.93"
                }
            }"#,
        );

        assert!(matches!(
            quote_from_envelope(envelope),
            Err(GatewayError::Upstream(_))
        ));
    }

    #[test]
    fn test_note_without_premium_is_ignored() {
        let envelope = parse_envelope(
            r#"{
                "Note": "Data is delayed by one minute.",
                "Realtime Currency Exchange Rate": {
                    "1. From_Currency Code": "GBP",
                    "2. From_Currency Name": "British Pound",
                    "3. To_Currency Code": "USD",
                    "4. To_Currency Name": "US Dollar",
                    "5. Exchange Rate": "1.27",
                    "6. Last Refreshed": "2024-08-09 15:00:00",
                    "7. Time Zone": "UTC",
                    "8. Bid Price": "1.2695",
                    "9. Ask Price": "1.2705"
                }
            }"#,
        );

        let quote = quote_from_envelope(envelope).unwrap();

        assert_eq!(quote.rate, dec!(1.27));
    }
}
