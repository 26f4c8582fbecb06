//! RefRates Common Types
//!
//! This crate contains shared types used across RefRates, including
//! currency codes and their validation sets, anchor-relative rate tables
//! and publication timing constants.

pub mod currency;
pub mod rates;
pub mod error;
pub mod time;

pub use currency::*;
pub use rates::*;
pub use error::*;
pub use time::*;
