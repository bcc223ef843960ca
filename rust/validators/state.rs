use bincode::config::legacy;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};

use crate::dates::Timestamp;
use crate::errors::{DateKeeperError, Result};
use crate::validators::ValidatorType;

/// Layout version written by [`VersionedState::encode`].
pub const STATE_VERSION: u16 = 1;

/// Configuration snapshot of a weekly validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodState {
    pub deployment_timestamp: Timestamp,
    pub min_interval_since_deployment: i64,
    pub deal_date_granularity: i64,
    pub periods_in_future_enabled: u32,
    pub valid_hour: u32,
    /// ISO weekday, 1 = Monday.
    pub valid_weekday: u32,
    pub period_interval_start: i64,
    pub period_interval_end: i64,
}

/// Configuration snapshot of a monthly or quarterly validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedPeriodState {
    pub period: PeriodState,
    pub weekday_num_of_month: u32,
    pub weekday_from_end: bool,
}

/// Configuration snapshot of a fixed-date validator. The three vectors are index aligned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedState {
    pub deployment_timestamp: Timestamp,
    pub min_interval_since_deployment: i64,
    pub deal_date_granularity: i64,
    pub dates: Vec<Timestamp>,
    pub dates_interval_starts: Vec<i64>,
    pub dates_interval_ends: Vec<i64>,
}

/// Type-tagged configuration snapshot of any validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorState {
    Weekly(PeriodState),
    Monthly(ExtendedPeriodState),
    Quarterly(ExtendedPeriodState),
    Fixed(FixedState),
}

impl ValidatorState {
    pub fn validator_type(&self) -> ValidatorType {
        match self {
            ValidatorState::Weekly(_) => ValidatorType::Weekly,
            ValidatorState::Monthly(_) => ValidatorType::Monthly,
            ValidatorState::Quarterly(_) => ValidatorType::Quarterly,
            ValidatorState::Fixed(_) => ValidatorType::Fixed,
        }
    }
}

/// A [`ValidatorState`] stamped with the layout version it was written with.
///
/// The binary form is the bincode `legacy` encoding: fixed width little endian integers with
/// length-prefixed sequences, fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedState {
    pub version: u16,
    pub state: ValidatorState,
}

impl VersionedState {
    pub fn new(state: ValidatorState) -> Self {
        VersionedState {
            version: STATE_VERSION,
            state,
        }
    }

    /// Binary encoding of the snapshot.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_to_vec(self, legacy()).map_err(|e| DateKeeperError::Encoding(e.to_string()))
    }

    /// Decode a snapshot which must span all of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (state, read) = Self::decode_prefix(bytes)?;
        if read != bytes.len() {
            return Err(DateKeeperError::Encoding(format!(
                "{} trailing bytes after validator state",
                bytes.len() - read
            )));
        }
        Ok(state)
    }

    /// Decode a snapshot from the front of `bytes`, returning it with the number of bytes read.
    pub fn decode_prefix(bytes: &[u8]) -> Result<(Self, usize)> {
        let (state, read): (VersionedState, usize) = decode_from_slice(bytes, legacy())
            .map_err(|e| DateKeeperError::Encoding(e.to_string()))?;
        if state.version == 0 || state.version > STATE_VERSION {
            return Err(DateKeeperError::Encoding(format!(
                "unsupported state version {}",
                state.version
            )));
        }
        Ok((state, read))
    }
}
