//! This is the documentation for datekeeper-rs
//!
//! The crate validates expiration dates of listed instruments and the last-deal-dates that
//! accompany them. A [`DateKeeper`](keeper::DateKeeper) holds an ordered list of validators
//! (weekly, monthly, quarterly and fixed-date) and accepts a date when any one of them does.
//!
//! - [`dates`]: calendar arithmetic on Unix timestamps.
//! - [`validators`]: the validator kinds and their shared [`ExpirationValidation`](validators::ExpirationValidation) capability.
//! - [`keeper`]: the ordered registry answering `validate` queries.
//! - [`config`]: serde configuration from which a keeper is deployed.
//! - [`access`]: accounts, roles and the call context authorizing mutations.

#[cfg(test)]
mod tests;

pub mod access;
pub mod config;
pub mod dates;
pub mod errors;
pub mod json;
pub mod keeper;
pub mod validators;

pub use crate::errors::{DateKeeperError, Result};
pub use crate::keeper::{DateKeeper, ValidatorInfo};
pub use crate::validators::{ExpirationValidation, Validator, ValidatorType};
