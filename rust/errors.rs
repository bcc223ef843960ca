//! Error taxonomy shared by every fallible entry point of the crate.

use thiserror::Error;

use crate::access::{Address, Role};
use crate::dates::Timestamp;
use crate::validators::ValidatorType;

/// Errors raised by date utilities, validators and the [`DateKeeper`](crate::keeper::DateKeeper).
///
/// Every mutating operation either completes or returns one of these with no state changed.
/// Predicates such as `validate_expiration_date` never return an error for a date which is
/// merely not valid; that is a `false` result.
#[derive(Debug, Error)]
pub enum DateKeeperError {
    /// The caller does not hold the role required by the operation.
    #[error("unauthorized: {caller} does not hold the {role} role")]
    Unauthorized {
        /// Account which attempted the call.
        caller: Address,
        /// Role required by the call.
        role: Role,
    },

    /// Dates requested for removal are not exactly a leading prefix of the ledger.
    #[error("invalid removal: {reason}")]
    InvalidRemoval {
        /// Human-readable reason.
        reason: String,
    },

    /// Dates requested for insertion are not strictly ascending after the ledger's last date.
    #[error("invalid insertion order: {reason}")]
    InvalidInsertionOrder {
        /// Human-readable reason.
        reason: String,
    },

    /// Calendar input is outside of its valid domain.
    #[error("invalid date: {reason}")]
    InvalidDate {
        /// Human-readable reason.
        reason: String,
    },

    /// Candidate expiration predates the deployment floor of a validator.
    #[error("expiration {candidate} is below the minimum allowed timestamp {floor}")]
    BelowMinimumInterval {
        /// Candidate expiration timestamp.
        candidate: Timestamp,
        /// `deployment_timestamp + min_interval_since_deployment`.
        floor: Timestamp,
    },

    /// A construction or configuration parameter is out of range.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// The same validator address was registered twice.
    #[error("validator {address} is already registered")]
    DuplicateValidator {
        /// Offending address.
        address: Address,
    },

    /// No validator is registered under the address.
    #[error("no validator registered at {address}")]
    UnknownValidator {
        /// Requested address.
        address: Address,
    },

    /// The validator registered under the address is of another kind.
    #[error("validator {address} is {found}, expected {expected}")]
    WrongValidatorType {
        /// Requested address.
        address: Address,
        /// Kind required by the caller.
        expected: ValidatorType,
        /// Kind actually registered.
        found: ValidatorType,
    },

    /// Binary state encoding or decoding failed.
    #[error("state encoding failed: {0}")]
    Encoding(String),

    /// JSON (de)serialization failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl DateKeeperError {
    pub(crate) fn invalid_date(reason: impl Into<String>) -> Self {
        DateKeeperError::InvalidDate {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(field: &'static str, reason: impl Into<String>) -> Self {
        DateKeeperError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DateKeeperError>;
