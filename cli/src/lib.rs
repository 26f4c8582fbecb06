//! RefRates CLI
//!
//! A thin caller around the conversion service: reads configuration from the
//! environment, performs one conversion and prints the response as JSON.

pub mod args;
pub mod config;

pub use args::Args;
pub use config::ServiceConfig;
