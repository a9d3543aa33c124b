//! Offline stub gateway for development and integration tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use ratebridge_common::{now, GatewayError, RateKey, RateQuote};
use ratebridge_resolver::RateGateway;
use rust_decimal::Decimal;
use tracing::debug;

/// ISO 4217 codes the stub recognizes, with English currency names.
const CURRENCIES: &[(&str, &str)] = &[
    ("AED", "UAE Dirham"),
    ("ARS", "Argentine Peso"),
    ("AUD", "Australian Dollar"),
    ("BDT", "Bangladeshi Taka"),
    ("BGN", "Bulgarian Lev"),
    ("BRL", "Brazilian Real"),
    ("CAD", "Canadian Dollar"),
    ("CHF", "Swiss Franc"),
    ("CLP", "Chilean Peso"),
    ("CNY", "Chinese Yuan"),
    ("COP", "Colombian Peso"),
    ("CZK", "Czech Koruna"),
    ("DKK", "Danish Krone"),
    ("EGP", "Egyptian Pound"),
    ("EUR", "Euro"),
    ("GBP", "British Pound"),
    ("HKD", "Hong Kong Dollar"),
    ("HUF", "Hungarian Forint"),
    ("IDR", "Indonesian Rupiah"),
    ("ILS", "Israeli New Shekel"),
    ("INR", "Indian Rupee"),
    ("ISK", "Icelandic Krona"),
    ("JPY", "Japanese Yen"),
    ("KES", "Kenyan Shilling"),
    ("KRW", "South Korean Won"),
    ("KWD", "Kuwaiti Dinar"),
    ("MXN", "Mexican Peso"),
    ("MYR", "Malaysian Ringgit"),
    ("NGN", "Nigerian Naira"),
    ("NOK", "Norwegian Krone"),
    ("NZD", "New Zealand Dollar"),
    ("PEN", "Peruvian Sol"),
    ("PHP", "Philippine Peso"),
    ("PKR", "Pakistani Rupee"),
    ("PLN", "Polish Zloty"),
    ("QAR", "Qatari Riyal"),
    ("RON", "Romanian Leu"),
    ("RUB", "Russian Ruble"),
    ("SAR", "Saudi Riyal"),
    ("SEK", "Swedish Krona"),
    ("SGD", "Singapore Dollar"),
    ("THB", "Thai Baht"),
    ("TRY", "Turkish Lira"),
    ("UAH", "Ukrainian Hryvnia"),
    ("USD", "US Dollar"),
    ("VND", "Vietnamese Dong"),
    ("ZAR", "South African Rand"),
];

/// Gateway that fabricates quotes locally.
///
/// Development stand-in for the live upstream: no API key, no network.
/// Unknown currency codes are rejected the way the live client rejects
/// them, so the error path stays exercisable offline.
pub struct StubGateway {
    calls: AtomicU64,
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
        }
    }

    fn currency_name(code: &str) -> Option<&'static str> {
        CURRENCIES
            .iter()
            .find(|(symbol, _)| *symbol == code)
            .map(|(_, name)| *name)
    }

    /// Deterministic per-call sample in a named lane, so repeated fetches
    /// vary like a live feed without pulling in an RNG.
    fn sample(&self, key: &RateKey, lane: u8, call: u64) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.from.code().hash(&mut hasher);
        key.to.code().hash(&mut hasher);
        lane.hash(&mut hasher);
        call.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateGateway for StubGateway {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch_quote(&self, key: &RateKey) -> Result<RateQuote, GatewayError> {
        let from_name =
            Self::currency_name(key.from.code()).ok_or_else(|| GatewayError::InvalidRequest {
                reason: format!("unknown currency code '{}'", key.from),
            })?;
        let to_name =
            Self::currency_name(key.to.code()).ok_or_else(|| GatewayError::InvalidRequest {
                reason: format!("unknown currency code '{}'", key.to),
            })?;

        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let rate = fake_price(self.sample(key, 0, call));
        let minutes_ago = (self.sample(key, 3, call) % 10) as i64;

        debug!(pair = %key, %rate, "Fabricated stub quote");

        Ok(RateQuote {
            from: key.from.clone(),
            from_name: from_name.to_string(),
            to: key.to.clone(),
            to_name: to_name.to_string(),
            rate,
            bid: fake_price(self.sample(key, 1, call)),
            ask: fake_price(self.sample(key, 2, call)),
            observed_at: now() - Duration::minutes(minutes_ago),
            time_zone: "UTC".to_string(),
        })
    }
}

/// Positive price below 1000, four decimal places.
fn fake_price(sample: u64) -> Decimal {
    Decimal::new((sample % 9_999_999 + 1) as i64, 4)
}
