//! The [`DateKeeper`]: an ordered registry of validators answering expiration queries.
//!
//! A date is valid for the keeper if *any* registered validator accepts it. Validators are asked
//! in registration order and the first one that accepts the expiration date and all of its
//! last-deal-dates decides the query.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::access::Address;
use crate::dates::Timestamp;
use crate::errors::{DateKeeperError, Result};
use crate::json::JSON;
use crate::validators::{
    ExpirationValidation, FixedValidator, Validator, ValidatorState, ValidatorType,
    VersionedState,
};

/// Number of last-deal-dates accompanying an expiration in [`DateKeeper::validate`].
pub const LAST_DEAL_DATES: usize = 3;

/// Ordered validator registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DateKeeperFields")]
pub struct DateKeeper {
    #[serde(serialize_with = "indexmap::map::serde_seq::serialize")]
    validators: IndexMap<Address, Validator>,
}

/// Serialized form of a [`DateKeeper`]: `(address, validator)` pairs in registration order.
#[derive(Deserialize)]
struct DateKeeperFields {
    validators: Vec<(Address, Validator)>,
}

impl TryFrom<DateKeeperFields> for DateKeeper {
    type Error = DateKeeperError;

    fn try_from(fields: DateKeeperFields) -> Result<Self> {
        DateKeeper::try_new(fields.validators)
    }
}

/// Read-only aggregate of every registered validator, in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub addresses: Vec<Address>,
    pub types: Vec<ValidatorType>,
    pub states: Vec<ValidatorState>,
}

impl ValidatorInfo {
    /// Concatenate the versioned binary snapshot of every state, in order.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        for state in self.states.iter() {
            bytes.extend(VersionedState::new(state.clone()).encode()?);
        }
        Ok(bytes)
    }

    /// Split a blob produced by [`ValidatorInfo::encode`] back into states, checking each one
    /// against the expected type tags.
    pub fn decode_states(types: &[ValidatorType], bytes: &[u8]) -> Result<Vec<ValidatorState>> {
        let mut states = Vec::with_capacity(types.len());
        let mut offset = 0;
        for expected in types.iter() {
            let (versioned, read) = VersionedState::decode_prefix(&bytes[offset..])?;
            let found = versioned.state.validator_type();
            if found != *expected {
                return Err(DateKeeperError::Encoding(format!(
                    "state {} is {}, expected {}",
                    states.len(),
                    found,
                    expected
                )));
            }
            states.push(versioned.state);
            offset += read;
        }
        if offset != bytes.len() {
            return Err(DateKeeperError::Encoding(format!(
                "{} trailing bytes after {} states",
                bytes.len() - offset,
                types.len()
            )));
        }
        Ok(states)
    }
}

impl DateKeeper {
    /// Register validators in priority order. Addresses must be unique.
    pub fn try_new(validators: Vec<(Address, Validator)>) -> Result<Self> {
        let mut map: IndexMap<Address, Validator> = IndexMap::with_capacity(validators.len());
        for (address, validator) in validators {
            if map.contains_key(&address) {
                return Err(DateKeeperError::DuplicateValidator { address });
            }
            info!(%address, kind = %validator.validator_type(), "registered validator");
            map.insert(address, validator);
        }
        Ok(DateKeeper { validators: map })
    }

    /// Returns whether any validator accepts `expiration_date` with all three last-deal-dates
    /// inside its trading window.
    pub fn validate(
        &self,
        now: Timestamp,
        expiration_date: Timestamp,
        last_deal_dates: &[Timestamp; LAST_DEAL_DATES],
    ) -> bool {
        for (address, validator) in self.validators.iter() {
            if !validator.validate_expiration_date(now, expiration_date) {
                continue;
            }
            if validator.validate_last_deal_dates(expiration_date, last_deal_dates) {
                debug!(%address, expiration_date, "expiration accepted");
                return true;
            }
            debug!(%address, expiration_date, "last deal dates outside trading window");
        }
        false
    }

    /// Returns whether any validator accepts `expiration_date`, ignoring last-deal-dates.
    pub fn validate_expiration_date(&self, now: Timestamp, expiration_date: Timestamp) -> bool {
        self.validators
            .values()
            .any(|v| v.validate_expiration_date(now, expiration_date))
    }

    pub fn get_validator_info(&self) -> ValidatorInfo {
        ValidatorInfo {
            addresses: self.validators.keys().copied().collect(),
            types: self.validators.values().map(|v| v.validator_type()).collect(),
            states: self
                .validators
                .values()
                .map(|v| v.get_validator_state())
                .collect(),
        }
    }

    /// The validator at registration position `index`.
    pub fn get_validator(&self, index: usize) -> Option<(&Address, &Validator)> {
        self.validators.get_index(index)
    }

    pub fn validator(&self, address: &Address) -> Option<&Validator> {
        self.validators.get(address)
    }

    /// Mutable access to a validator, for governor calls.
    pub fn validator_mut(&mut self, address: &Address) -> Result<&mut Validator> {
        self.validators
            .get_mut(address)
            .ok_or(DateKeeperError::UnknownValidator { address: *address })
    }

    /// Mutable access to a fixed-date validator, for ledger replacement.
    pub fn fixed_validator_mut(&mut self, address: &Address) -> Result<&mut FixedValidator> {
        let validator = self.validator_mut(address)?;
        let found = validator.validator_type();
        validator
            .as_fixed_mut()
            .ok_or(DateKeeperError::WrongValidatorType {
                address: *address,
                expected: ValidatorType::Fixed,
                found,
            })
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Every expiration date accepted at `now` with the kind of validator accepting it,
    /// ascending. A date accepted by several validators is listed once per validator.
    pub fn expiration_dates(&self, now: Timestamp) -> Vec<(Timestamp, ValidatorType)> {
        let mut dates: Vec<(Timestamp, ValidatorType)> = self
            .validators
            .values()
            .flat_map(|v| {
                let kind = v.validator_type();
                v.expiration_dates(now).into_iter().map(move |d| (d, kind))
            })
            .collect();
        dates.sort();
        dates
    }
}

impl JSON for DateKeeper {}
impl JSON for ValidatorInfo {}
