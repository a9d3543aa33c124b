//! Quote, record and response types for exchange rates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::{Currency, RateKey};
use crate::time::Timestamp;

/// Inbound request for the rate between two currencies.
///
/// Carries the raw caller-supplied codes; `key` normalizes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRequest {
    pub from: String,
    pub to: String,
}

impl RateRequest {
    /// Create a new request.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The normalized pair key for this request.
    pub fn key(&self) -> RateKey {
        RateKey::new(Currency::new(self.from.as_str()), Currency::new(self.to.as_str()))
    }
}

/// A live quote as reported by an upstream gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub from: Currency,
    pub from_name: String,
    pub to: Currency,
    pub to_name: String,
    /// Mid exchange rate.
    pub rate: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    /// The upstream's own "last refreshed" timestamp.
    pub observed_at: Timestamp,
    /// Time zone the upstream reported for `observed_at`.
    pub time_zone: String,
}

impl RateQuote {
    /// The pair key this quote belongs to.
    pub fn key(&self) -> RateKey {
        RateKey::new(self.from.clone(), self.to.clone())
    }
}

/// A persisted rate record, one per pair key.
///
/// `created_at` is set once at first insert; `updated_at` on every
/// subsequent write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub key: RateKey,
    pub from_name: String,
    pub to_name: String,
    pub rate: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub observed_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl RateRecord {
    /// Build the record a refresh should persist for `response`.
    pub fn from_response(response: &RateResponse) -> Self {
        Self {
            key: response.key(),
            from_name: response.from_name.clone(),
            to_name: response.to_name.clone(),
            rate: response.rate,
            bid: response.bid,
            ask: response.ask,
            observed_at: response.observed_at,
            created_at: response.created_at,
            updated_at: response.updated_at,
        }
    }
}

/// The response returned to callers, identical in shape for the live and
/// stored paths so provenance is not observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateResponse {
    pub from: Currency,
    pub from_name: String,
    pub to: Currency,
    pub to_name: String,
    pub rate: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub observed_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl RateResponse {
    /// Build a response from a live quote with the given record timestamps.
    ///
    /// The caller decides `created_at`/`updated_at`; quote fields map
    /// verbatim.
    pub fn from_quote(
        quote: RateQuote,
        created_at: Timestamp,
        updated_at: Option<Timestamp>,
    ) -> Self {
        Self {
            from: quote.from,
            from_name: quote.from_name,
            to: quote.to,
            to_name: quote.to_name,
            rate: quote.rate,
            bid: quote.bid,
            ask: quote.ask,
            observed_at: quote.observed_at,
            created_at,
            updated_at,
        }
    }

    /// The pair key this response describes.
    pub fn key(&self) -> RateKey {
        RateKey::new(self.from.clone(), self.to.clone())
    }
}

impl From<RateRecord> for RateResponse {
    fn from(record: RateRecord) -> Self {
        Self {
            from: record.key.from,
            from_name: record.from_name,
            to: record.key.to,
            to_name: record.to_name,
            rate: record.rate,
            bid: record.bid,
            ask: record.ask,
            observed_at: record.observed_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
