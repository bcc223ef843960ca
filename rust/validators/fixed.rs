use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::{CallContext, Role};
use crate::dates::Timestamp;
use crate::errors::{DateKeeperError, Result};
use crate::validators::{
    ExpirationValidation, FixedState, ValidRange, ValidatorCore, ValidatorEvent, ValidatorState,
    ValidatorType,
};

/// A fixed expiration date with its own trading window offsets.
///
/// The window of `date` is `[date - interval_end, date - interval_start]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedDate {
    pub date: Timestamp,
    pub interval_start: i64,
    pub interval_end: i64,
}

impl FixedDate {
    pub fn new(date: Timestamp, interval_start: i64, interval_end: i64) -> Self {
        FixedDate {
            date,
            interval_start,
            interval_end,
        }
    }
}

/// Zip three index aligned vectors into [`FixedDate`] entries.
pub fn zip_fixed_dates(
    dates: &[Timestamp],
    interval_starts: &[i64],
    interval_ends: &[i64],
) -> Result<Vec<FixedDate>> {
    if dates.len() != interval_starts.len() || dates.len() != interval_ends.len() {
        return Err(DateKeeperError::invalid_parameter(
            "dates",
            format!(
                "lengths differ: {} dates, {} interval starts, {} interval ends",
                dates.len(),
                interval_starts.len(),
                interval_ends.len()
            ),
        ));
    }
    Ok(dates
        .iter()
        .zip(interval_starts.iter())
        .zip(interval_ends.iter())
        .map(|((d, s), e)| FixedDate::new(*d, *s, *e))
        .collect())
}

/// One atomic ledger edit: drop a leading prefix and append a tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBatch {
    pub to_add: Vec<FixedDate>,
    pub to_remove: Vec<Timestamp>,
}

impl DateBatch {
    pub fn new(to_add: Vec<FixedDate>, to_remove: Vec<Timestamp>) -> Self {
        DateBatch { to_add, to_remove }
    }

    /// Build a batch from the parallel-array form used by [`FixedValidator::replace_dates`].
    pub fn try_from_parts(
        to_add: &[Timestamp],
        to_add_interval_starts: &[i64],
        to_add_interval_ends: &[i64],
        to_remove: &[Timestamp],
    ) -> Result<Self> {
        Ok(DateBatch {
            to_add: zip_fixed_dates(to_add, to_add_interval_starts, to_add_interval_ends)?,
            to_remove: to_remove.to_vec(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// A validator backed by an explicit ascending ledger of expiration dates.
///
/// The ledger is strictly ascending at all times. It can only be edited by removing its oldest
/// dates and appending dates after its newest one, which keeps every edit a linear operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FixedValidatorFields")]
pub struct FixedValidator {
    pub(crate) core: ValidatorCore,
    pub(crate) entries: Vec<FixedDate>,
}

/// Serialized form of a [`FixedValidator`], checked by [`FixedValidator::try_new`] on the way in.
#[derive(Deserialize)]
struct FixedValidatorFields {
    core: ValidatorCore,
    entries: Vec<FixedDate>,
}

impl TryFrom<FixedValidatorFields> for FixedValidator {
    type Error = DateKeeperError;

    fn try_from(fields: FixedValidatorFields) -> Result<Self> {
        FixedValidator::try_new(fields.core, fields.entries)
    }
}

impl FixedValidator {
    /// Create a validator with an initial ledger.
    pub fn try_new(core: ValidatorCore, entries: Vec<FixedDate>) -> Result<Self> {
        check_additions(None, &entries)?;
        Ok(FixedValidator { core, entries })
    }

    /// Create a validator from the parallel-array form.
    pub fn try_from_parts(
        core: ValidatorCore,
        dates: &[Timestamp],
        interval_starts: &[i64],
        interval_ends: &[i64],
    ) -> Result<Self> {
        Self::try_new(core, zip_fixed_dates(dates, interval_starts, interval_ends)?)
    }

    /// The ledger's dates, ascending.
    pub fn get_fixed_dates(&self) -> Vec<Timestamp> {
        self.entries.iter().map(|e| e.date).collect()
    }

    /// The ledger's interval starts, aligned with [`FixedValidator::get_fixed_dates`].
    pub fn dates_interval_starts(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.interval_start).collect()
    }

    /// The ledger's interval ends, aligned with [`FixedValidator::get_fixed_dates`].
    pub fn dates_interval_ends(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.interval_end).collect()
    }

    pub fn fixed_entries(&self) -> &[FixedDate] {
        &self.entries
    }

    /// Look up the ledger entry of `date`.
    pub fn entry(&self, date: Timestamp) -> Option<&FixedDate> {
        self.entries
            .binary_search_by_key(&date, |e| e.date)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Remove `to_remove`, which must be the oldest dates of the ledger in order, and append
    /// `to_add`, which must be strictly ascending and after the current newest date. Governor
    /// only. On any error the ledger is left unchanged.
    pub fn replace_dates(
        &mut self,
        ctx: &CallContext,
        to_add: &[Timestamp],
        to_add_interval_starts: &[i64],
        to_add_interval_ends: &[i64],
        to_remove: &[Timestamp],
    ) -> Result<ValidatorEvent> {
        if let Err(e) = ctx.require(Role::Governor) {
            warn!(caller = %ctx.caller, "rejected fixed date replacement from non-governor");
            return Err(e);
        }
        let batch = DateBatch::try_from_parts(
            to_add,
            to_add_interval_starts,
            to_add_interval_ends,
            to_remove,
        )?;
        self.commit(ctx, batch)
    }

    /// Apply a [`DateBatch`]. Governor only; all or nothing.
    pub fn apply(&mut self, ctx: &CallContext, batch: DateBatch) -> Result<ValidatorEvent> {
        if let Err(e) = ctx.require(Role::Governor) {
            warn!(caller = %ctx.caller, "rejected fixed date replacement from non-governor");
            return Err(e);
        }
        self.commit(ctx, batch)
    }

    /// Check a batch against the current ledger without changing it.
    pub fn check(&self, batch: &DateBatch) -> Result<()> {
        self.check_removal(&batch.to_remove)?;
        check_additions(self.entries.last().map(|e| e.date), &batch.to_add)
    }

    fn commit(&mut self, ctx: &CallContext, batch: DateBatch) -> Result<ValidatorEvent> {
        if let Err(e) = self.check(&batch) {
            warn!(caller = %ctx.caller, error = %e, "fixed date replacement rejected");
            return Err(e);
        }
        self.entries.drain(..batch.to_remove.len());
        let added: Vec<Timestamp> = batch.to_add.iter().map(|e| e.date).collect();
        self.entries.extend(batch.to_add);
        info!(
            caller = %ctx.caller,
            removed = batch.to_remove.len(),
            added = added.len(),
            ledger_len = self.entries.len(),
            "fixed dates replaced"
        );
        Ok(ValidatorEvent::FixedDatesReplaced {
            removed: batch.to_remove,
            added,
        })
    }

    fn check_removal(&self, to_remove: &[Timestamp]) -> Result<()> {
        if to_remove.len() > self.entries.len() {
            return Err(DateKeeperError::InvalidRemoval {
                reason: format!(
                    "cannot remove {} dates from a ledger of {}",
                    to_remove.len(),
                    self.entries.len()
                ),
            });
        }
        for (i, (date, entry)) in to_remove.iter().zip(self.entries.iter()).enumerate() {
            if *date != entry.date {
                let reason = if self.entry(*date).is_some() {
                    format!("date {} is not at position {} of the ledger", date, i)
                } else {
                    format!("date {} is not in the ledger", date)
                };
                return Err(DateKeeperError::InvalidRemoval { reason });
            }
        }
        Ok(())
    }
}

/// Validate dates appended after `last` (if any): strictly ascending and with sound intervals.
fn check_additions(last: Option<Timestamp>, to_add: &[FixedDate]) -> Result<()> {
    if let (Some(last), Some(first)) = (last, to_add.first()) {
        if first.date <= last {
            return Err(DateKeeperError::InvalidInsertionOrder {
                reason: format!(
                    "date {} is not after the ledger's last date {}",
                    first.date, last
                ),
            });
        }
    }
    if let Some((a, b)) = to_add.iter().tuple_windows().find(|(a, b)| a.date >= b.date) {
        return Err(DateKeeperError::InvalidInsertionOrder {
            reason: format!("date {} does not follow {} in ascending order", b.date, a.date),
        });
    }
    if let Some(bad) = to_add
        .iter()
        .find(|e| e.date < 0 || e.interval_start < 0 || e.interval_end < e.interval_start)
    {
        return Err(DateKeeperError::invalid_parameter(
            "interval",
            format!(
                "date {} with interval [{}, {}] must satisfy 0 <= date and 0 <= start <= end",
                bad.date, bad.interval_start, bad.interval_end
            ),
        ));
    }
    Ok(())
}

impl ExpirationValidation for FixedValidator {
    fn core(&self) -> &ValidatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ValidatorCore {
        &mut self.core
    }

    fn validator_type(&self) -> ValidatorType {
        ValidatorType::Fixed
    }

    fn is_expiration_instance(&self, _now: Timestamp, candidate: Timestamp) -> bool {
        self.entry(candidate).is_some()
    }

    fn get_valid_range(&self, expiration_date: Timestamp) -> Option<ValidRange> {
        let e = self.entry(expiration_date)?;
        Some(ValidRange {
            start: expiration_date.checked_sub(e.interval_end)?,
            end: expiration_date.checked_sub(e.interval_start)?,
            modulo: self.core.deal_date_granularity,
        })
    }

    fn expiration_dates(&self, _now: Timestamp) -> Vec<Timestamp> {
        let floor = self.core.min_allowed_expiration();
        let idx = self.entries.partition_point(|e| e.date < floor);
        self.entries[idx..].iter().map(|e| e.date).collect()
    }

    fn get_validator_state(&self) -> ValidatorState {
        ValidatorState::Fixed(FixedState {
            deployment_timestamp: self.core.deployment_timestamp,
            min_interval_since_deployment: self.core.min_interval_since_deployment,
            deal_date_granularity: self.core.deal_date_granularity,
            dates: self.get_fixed_dates(),
            dates_interval_starts: self.dates_interval_starts(),
            dates_interval_ends: self.dates_interval_ends(),
        })
    }
}

// UNIT TESTS
#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Address, RoleManager};
    use crate::dates::DAY_IN_SECONDS;
    use crate::json::JSON;

    const D1: Timestamp = 1_700_000_000;

    fn fixture_dates() -> Vec<Timestamp> {
        (0..5).map(|i| D1 + i * 7 * DAY_IN_SECONDS).collect()
    }

    fn fixture_validator() -> FixedValidator {
        let dates = fixture_dates();
        let starts = vec![DAY_IN_SECONDS; dates.len()];
        let ends = vec![3 * DAY_IN_SECONDS; dates.len()];
        let core = ValidatorCore::try_new(D1 - 30 * DAY_IN_SECONDS, 0, None).unwrap();
        FixedValidator::try_from_parts(core, &dates, &starts, &ends).unwrap()
    }

    fn governor() -> Address {
        Address::from(1)
    }

    #[test]
    fn test_try_new_requires_ascending_ledger() {
        let core = ValidatorCore::try_new(0, 0, None).unwrap();
        assert!(FixedValidator::try_from_parts(core.clone(), &[2, 1], &[0, 0], &[0, 0]).is_err());
        assert!(FixedValidator::try_from_parts(core.clone(), &[1, 1], &[0, 0], &[0, 0]).is_err());
        assert!(FixedValidator::try_from_parts(core.clone(), &[1, 2], &[0], &[0, 0]).is_err());
        assert!(FixedValidator::try_from_parts(core.clone(), &[1, 2], &[5, 0], &[0, 0]).is_err());
        assert!(FixedValidator::try_from_parts(core, &[], &[], &[]).is_ok());
    }

    #[test]
    fn test_membership_and_range() {
        let v = fixture_validator();
        for d in fixture_dates() {
            assert!(v.validate_expiration_date(0, d));
            let r = v.get_valid_range(d).unwrap();
            assert_eq!(r.start, d - 3 * DAY_IN_SECONDS);
            assert_eq!(r.end, d - DAY_IN_SECONDS);
        }
        assert!(!v.validate_expiration_date(0, D1 + 1));
        assert!(v.get_valid_range(D1 + 1).is_none());
    }

    #[test]
    fn test_replace_dates_scenario() {
        let roles = RoleManager::new(vec![governor()]);
        let ctx = CallContext::new(governor(), D1, &roles);
        let mut v = fixture_validator();
        let d = fixture_dates();
        let d5 = d[4];
        let event = v
            .replace_dates(
                &ctx,
                &[d5 + 1, d5 + 2, d5 + 3],
                &[86_400, 86_400, 86_400],
                &[172_800, 172_800, 172_800],
                &d[..3],
            )
            .unwrap();
        assert_eq!(v.get_fixed_dates(), vec![d[3], d5, d5 + 1, d5 + 2, d5 + 3]);
        assert_eq!(
            event,
            ValidatorEvent::FixedDatesReplaced {
                removed: d[..3].to_vec(),
                added: vec![d5 + 1, d5 + 2, d5 + 3]
            }
        );
        assert!(!v.validate_expiration_date(D1, d[0]));
        assert!(v.validate_expiration_date(D1, d5 + 2));
        let r = v.get_valid_range(d5 + 2).unwrap();
        assert_eq!((r.start, r.end), (d5 + 2 - 172_800, d5 + 2 - 86_400));
        // pre-existing entries keep their own intervals
        let r = v.get_valid_range(d5).unwrap();
        assert_eq!(r.start, d5 - 3 * DAY_IN_SECONDS);
    }

    #[test]
    fn test_replace_with_empty_batch_is_noop() {
        let roles = RoleManager::new(vec![governor()]);
        let ctx = CallContext::new(governor(), D1, &roles);
        let mut v = fixture_validator();
        v.replace_dates(&ctx, &[], &[], &[], &[]).unwrap();
        assert_eq!(v.get_fixed_dates(), fixture_dates());
    }

    #[test]
    fn test_remove_everything_then_append() {
        let roles = RoleManager::new(vec![governor()]);
        let ctx = CallContext::new(governor(), D1, &roles);
        let mut v = fixture_validator();
        let d = fixture_dates();
        let last = d[4];
        let to_add: Vec<Timestamp> = (1..=5).map(|i| last + i).collect();
        v.replace_dates(&ctx, &to_add, &[0; 5], &[0; 5], &d).unwrap();
        assert_eq!(v.get_fixed_dates(), to_add);
    }

    #[test]
    fn test_invalid_removals_leave_ledger_unchanged() {
        let roles = RoleManager::new(vec![governor()]);
        let ctx = CallContext::new(governor(), D1, &roles);
        let mut v = fixture_validator();
        let d = fixture_dates();
        let cases: Vec<Vec<Timestamp>> = vec![
            vec![100_500],
            d[1..3].to_vec(),
            vec![d[1], d[0]],
            vec![d[0], d[2]],
            vec![d[4]],
            d.iter().copied().chain(std::iter::once(d[4] + 1)).collect(),
        ];
        for to_remove in cases {
            let result = v.replace_dates(&ctx, &[], &[], &[], &to_remove);
            assert!(
                matches!(result, Err(DateKeeperError::InvalidRemoval { .. })),
                "{:?}",
                to_remove
            );
            assert_eq!(v.get_fixed_dates(), d);
        }
    }

    #[test]
    fn test_invalid_insertions_leave_ledger_unchanged() {
        let roles = RoleManager::new(vec![governor()]);
        let ctx = CallContext::new(governor(), D1, &roles);
        let mut v = fixture_validator();
        let d = fixture_dates();
        let last = d[4];
        let cases: Vec<Vec<Timestamp>> = vec![
            vec![100_500],
            vec![last],
            vec![last + 2, last + 1],
            vec![last + 1, last + 1],
        ];
        for to_add in cases {
            let n = to_add.len();
            let result = v.replace_dates(&ctx, &to_add, &vec![0; n], &vec![0; n], &d[..2]);
            assert!(
                matches!(result, Err(DateKeeperError::InvalidInsertionOrder { .. })),
                "{:?}",
                to_add
            );
            assert_eq!(v.get_fixed_dates(), d);
        }
        // adding after the current maximum is measured against the ledger before removal
        let result = v.replace_dates(&ctx, &[d[3]], &[0], &[0], &d);
        assert!(matches!(
            result,
            Err(DateKeeperError::InvalidInsertionOrder { .. })
        ));
        assert_eq!(v.get_fixed_dates(), d);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let roles = RoleManager::new(vec![governor()]);
        let ctx = CallContext::new(governor(), D1, &roles);
        let mut v = fixture_validator();
        let last = fixture_dates()[4];
        assert!(matches!(
            v.replace_dates(&ctx, &[last + 1], &[], &[0], &[]),
            Err(DateKeeperError::InvalidParameter { .. })
        ));
        assert_eq!(v.get_fixed_dates(), fixture_dates());
    }

    #[test]
    fn test_unauthorized_replace() {
        let roles = RoleManager::new(vec![governor()]);
        let ctx = CallContext::new(Address::from(7), D1, &roles);
        let mut v = fixture_validator();
        let d = fixture_dates();
        assert!(matches!(
            v.replace_dates(&ctx, &[], &[], &[], &d[..1]),
            Err(DateKeeperError::Unauthorized { .. })
        ));
        assert!(matches!(
            v.apply(&ctx, DateBatch::new(vec![], d[..1].to_vec())),
            Err(DateKeeperError::Unauthorized { .. })
        ));
        assert_eq!(v.get_fixed_dates(), d);
    }

    #[test]
    fn test_floor_applies_to_fixed_dates() {
        let roles = RoleManager::new(vec![governor()]);
        let ctx = CallContext::new(governor(), D1, &roles);
        let mut v = fixture_validator();
        let d = fixture_dates();
        assert_eq!(v.expiration_dates(D1), d);
        // move the floor past the first two dates
        let interval = d[1] - v.core().deployment_timestamp() + 1;
        v.set_min_interval_since_deployment(&ctx, interval).unwrap();
        assert!(!v.validate_expiration_date(D1, d[0]));
        assert!(!v.validate_expiration_date(D1, d[1]));
        assert!(v.validate_expiration_date(D1, d[2]));
        assert_eq!(v.expiration_dates(D1), d[2..].to_vec());
    }

    #[test]
    fn test_json_ledger_must_be_ascending() {
        let v = fixture_validator();
        let js = v.to_json().unwrap();
        assert_eq!(FixedValidator::from_json(&js).unwrap(), v);

        let d = fixture_dates();
        let options: Vec<(usize, Timestamp)> = vec![
            // first date moved past the second
            (0, d[1] + 1),
            // duplicate of its neighbour
            (1, d[0]),
            // before the epoch
            (0, -1),
        ];
        for (idx, date) in options {
            let mut value = serde_json::to_value(&v).unwrap();
            value["entries"][idx]["date"] = serde_json::json!(date);
            assert!(FixedValidator::from_json(&value.to_string()).is_err(), "{} {}", idx, date);
        }

        let mut value = serde_json::to_value(&v).unwrap();
        value["entries"][2]["interval_start"] = serde_json::json!(10 * DAY_IN_SECONDS);
        assert!(FixedValidator::from_json(&value.to_string()).is_err());

        let mut value = serde_json::to_value(&v).unwrap();
        value["core"]["deal_date_granularity"] = serde_json::json!(0);
        assert!(FixedValidator::from_json(&value.to_string()).is_err());
    }

    #[test]
    fn test_state_snapshot() {
        let v = fixture_validator();
        match v.get_validator_state() {
            ValidatorState::Fixed(s) => {
                assert_eq!(s.dates, fixture_dates());
                assert_eq!(s.dates_interval_starts, vec![DAY_IN_SECONDS; 5]);
                assert_eq!(s.dates_interval_ends, vec![3 * DAY_IN_SECONDS; 5]);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }
}
