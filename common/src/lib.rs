//! RateBridge Common Types
//!
//! Shared types used across the RateBridge service: currency codes and pair
//! keys, quote/record/response shapes, the error taxonomy and time helpers.

pub mod currency;
pub mod error;
pub mod rate;
pub mod time;

pub use currency::*;
pub use error::*;
pub use rate::*;
pub use time::*;
