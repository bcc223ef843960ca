use crate::json::JSON;
use crate::validators::{
    DateBatch, FixedValidator, MonthlyValidator, QuarterlyValidator, ValidRange, Validator,
    ValidatorEvent, ValidatorState, VersionedState, WeeklyValidator,
};

impl JSON for WeeklyValidator {}
impl JSON for MonthlyValidator {}
impl JSON for QuarterlyValidator {}
impl JSON for FixedValidator {}
impl JSON for Validator {}
impl JSON for ValidatorState {}
impl JSON for VersionedState {}
impl JSON for ValidatorEvent {}
impl JSON for ValidRange {}
impl JSON for DateBatch {}
