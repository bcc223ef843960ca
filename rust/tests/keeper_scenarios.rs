use crate::access::{Address, CallContext, Role, RoleManager};
use crate::config::{
    DateKeeperConfig, FixedConfig, MonthlyConfig, PeriodConfig, ValidatorConfig, ValidatorEntry,
};
use crate::dates::{timestamp_from_date_time, Timestamp, DAY_IN_SECONDS};
use crate::errors::DateKeeperError;
use crate::json::JSON;
use crate::keeper::{DateKeeper, ValidatorInfo};
use crate::validators::{ExpirationValidation, ValidatorType};

fn ts(y: i32, m: u32, d: u32, h: u32) -> Timestamp {
    timestamp_from_date_time(y, m, d, h, 0, 0).unwrap()
}

const GOVERNOR: u64 = 1;
const WEEKLY: u64 = 0x100;
const MONTHLY: u64 = 0x200;
const QUARTERLY: u64 = 0x300;
const FIXED: u64 = 0x400;

fn period(periods: u32) -> PeriodConfig {
    PeriodConfig {
        // Friday 4 January 2019 08:00
        initial_timestamp: ts(2019, 1, 4, 8),
        periods_in_future_enabled: periods,
        min_interval_since_deployment: 0,
        period_interval_start: DAY_IN_SECONDS,
        period_interval_end: 3 * DAY_IN_SECONDS,
        deal_date_granularity: None,
    }
}

fn deploy(roles: &RoleManager) -> DateKeeper {
    let config = DateKeeperConfig {
        validators: vec![
            ValidatorEntry {
                address: Address::from(WEEKLY),
                validator: ValidatorConfig::Weekly(period(4)),
            },
            ValidatorEntry {
                address: Address::from(MONTHLY),
                validator: ValidatorConfig::Monthly(MonthlyConfig {
                    period: period(3),
                    weekday_num_of_month: 1,
                    weekday_from_end: true,
                }),
            },
            ValidatorEntry {
                address: Address::from(QUARTERLY),
                validator: ValidatorConfig::Quarterly(MonthlyConfig {
                    period: period(2),
                    weekday_num_of_month: 1,
                    weekday_from_end: true,
                }),
            },
            ValidatorEntry {
                address: Address::from(FIXED),
                validator: ValidatorConfig::Fixed(FixedConfig {
                    min_interval_since_deployment: 0,
                    dates: vec![ts(2024, 11, 5, 16), ts(2025, 5, 6, 16)],
                    interval_starts: vec![0, 0],
                    interval_ends: vec![2 * DAY_IN_SECONDS, 2 * DAY_IN_SECONDS],
                    deal_date_granularity: None,
                }),
            },
        ],
    };
    let ctx = CallContext::new(Address::from(GOVERNOR), ts(2024, 10, 1, 0), roles);
    config.build(&ctx).unwrap()
}

#[test]
fn keeper_accepts_dates_of_any_validator() {
    let roles = RoleManager::new(vec![Address::from(GOVERNOR)]);
    let keeper = deploy(&roles);
    let now = ts(2024, 10, 16, 12);

    let options: Vec<(Timestamp, bool)> = vec![
        // weekly
        (ts(2024, 10, 18, 8), true),
        (ts(2024, 11, 8, 8), true),
        (ts(2024, 11, 15, 8), false),
        // monthly, last Friday of December
        (ts(2024, 12, 27, 8), true),
        (ts(2025, 1, 31, 8), false),
        // quarterly, last Friday of March 2025
        (ts(2025, 3, 28, 8), true),
        (ts(2025, 6, 27, 8), false),
        // fixed
        (ts(2024, 11, 5, 16), true),
        (ts(2025, 5, 6, 16), true),
        (ts(2025, 5, 7, 16), false),
    ];
    for (exp, expected) in options {
        assert_eq!(keeper.validate_expiration_date(now, exp), expected, "{}", exp);
    }

    let exp = ts(2024, 12, 27, 8);
    let ldd = exp - 2 * DAY_IN_SECONDS;
    assert!(keeper.validate(now, exp, &[ldd, exp - DAY_IN_SECONDS, exp - 3 * DAY_IN_SECONDS]));
    assert!(!keeper.validate(now, exp, &[ldd, ldd, exp]));

    let exp = ts(2024, 11, 5, 16);
    assert!(keeper.validate(now, exp, &[exp, exp - DAY_IN_SECONDS, exp - 2 * DAY_IN_SECONDS]));
    assert!(!keeper.validate(now, exp, &[exp, exp, exp - 3 * DAY_IN_SECONDS]));
}

#[test]
fn keeper_lists_expirations_in_order() {
    let roles = RoleManager::new(vec![Address::from(GOVERNOR)]);
    let keeper = deploy(&roles);
    let dates = keeper.expiration_dates(ts(2024, 10, 16, 12));
    assert!(dates.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        dates.iter().filter(|(_, t)| *t == ValidatorType::Weekly).count(),
        4
    );
    assert_eq!(dates[0], (ts(2024, 10, 18, 8), ValidatorType::Weekly));
    // 25 October is both a weekly Friday and the last Friday of October
    assert!(dates.contains(&(ts(2024, 10, 25, 8), ValidatorType::Monthly)));
    assert!(dates.contains(&(ts(2024, 10, 25, 8), ValidatorType::Weekly)));
}

#[test]
fn validator_info_round_trip() {
    let roles = RoleManager::new(vec![Address::from(GOVERNOR)]);
    let keeper = deploy(&roles);
    let info = keeper.get_validator_info();
    assert_eq!(
        info.addresses,
        vec![
            Address::from(WEEKLY),
            Address::from(MONTHLY),
            Address::from(QUARTERLY),
            Address::from(FIXED)
        ]
    );
    let blob = info.encode().unwrap();
    assert_eq!(ValidatorInfo::decode_states(&info.types, &blob).unwrap(), info.states);
    let js = info.to_json().unwrap();
    assert_eq!(ValidatorInfo::from_json(&js).unwrap(), info);
}

#[test]
fn governance_is_enforced() {
    let gov = Address::from(GOVERNOR);
    let admin = Address::from(2);
    let mut roles = RoleManager::new(vec![gov]);
    roles.appoint(&gov, Role::Admin, vec![admin]).unwrap();
    let mut keeper = deploy(&roles);
    let now = ts(2024, 10, 16, 12);
    let fixed_date = ts(2024, 11, 5, 16);

    // an admin is not a governor
    let ctx = CallContext::new(admin, now, &roles);
    assert!(matches!(
        keeper
            .fixed_validator_mut(&Address::from(FIXED))
            .unwrap()
            .replace_dates(&ctx, &[], &[], &[], &[fixed_date]),
        Err(DateKeeperError::Unauthorized {
            role: Role::Governor,
            ..
        })
    ));
    assert!(keeper
        .validator_mut(&Address::from(WEEKLY))
        .unwrap()
        .set_min_interval_since_deployment(&ctx, 1)
        .is_err());
    assert!(keeper.validate_expiration_date(now, fixed_date));

    let ctx = CallContext::new(gov, now, &roles);
    keeper
        .fixed_validator_mut(&Address::from(FIXED))
        .unwrap()
        .replace_dates(
            &ctx,
            &[ts(2025, 11, 4, 16)],
            &[0],
            &[DAY_IN_SECONDS],
            &[fixed_date],
        )
        .unwrap();
    assert!(!keeper.validate_expiration_date(now, fixed_date));
    assert!(keeper.validate_expiration_date(now, ts(2025, 11, 4, 16)));
    let (_, fixed) = keeper.get_validator(3).unwrap();
    assert_eq!(
        fixed.as_fixed().unwrap().get_fixed_dates(),
        vec![ts(2025, 5, 6, 16), ts(2025, 11, 4, 16)]
    );
}
