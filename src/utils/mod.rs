//!
//! Utility module for the harness.
//!
//! Formatting helpers used in scenario logs.
/// Amount formatting
pub mod index;

pub use index::{format_eth, format_token_amount};
