//! RateBridge Upstream Gateways
//!
//! Forex gateway clients implementing
//! [`RateGateway`](ratebridge_resolver::RateGateway): the Alpha Vantage
//! HTTP client and an offline stub for development.

pub mod alpha_vantage;
pub mod stub;

pub use alpha_vantage::{AlphaVantageConfig, AlphaVantageGateway, ALPHA_VANTAGE};
pub use stub::StubGateway;
