// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for condition bookkeeping and duration parsing
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. Conditions stay unique by type under any sequence of updates
//! 2. A transition time only moves when the status changes
//! 3. Error collection keeps every error and only fails when one was pushed
//! 4. Duration parsing never panics and agrees with simple `<n><unit>` inputs

use std::time::Duration;

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use addon_operator::controller::duration::parse_go_duration;
use addon_operator::controller::status::{ConditionBuilder, find_condition, format_time};
use addon_operator::controller::{Error, MultiError};
use addon_operator::crd::Condition;

#[derive(Clone, Debug)]
enum Op {
    Set {
        type_: &'static str,
        status: &'static str,
        reason: String,
    },
    Remove {
        type_: &'static str,
    },
}

fn condition_type() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "Available",
        "Paused",
        "Installed",
        "UpgradeStarted",
        "ReadyToBeDeleted",
    ])
}

fn condition_status() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["True", "False", "Unknown"])
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (condition_type(), condition_status(), "[A-Za-z]{1,12}").prop_map(
            |(type_, status, reason)| Op::Set {
                type_,
                status,
                reason
            }
        ),
        1 => condition_type().prop_map(|type_| Op::Remove { type_ }),
    ]
}

fn at(step: usize) -> DateTime<Utc> {
    DateTime::from_timestamp(1_714_557_600 + step as i64 * 60, 0).unwrap()
}

fn apply(conditions: Vec<Condition>, op: &Op, step: usize) -> Vec<Condition> {
    let builder = ConditionBuilder::from_existing(conditions, Some(step as i64), at(step));
    match op {
        Op::Set {
            type_,
            status,
            reason,
        } => builder.set_condition(type_, status, reason, ""),
        Op::Remove { type_ } => builder.remove_condition(type_),
    }
    .build()
}

proptest! {
    #[test]
    fn conditions_stay_unique_by_type(ops in prop::collection::vec(op(), 0..40)) {
        let mut conditions = Vec::new();
        for (step, op) in ops.iter().enumerate() {
            conditions = apply(conditions, op, step);

            let mut types: Vec<_> = conditions.iter().map(|c| c.type_.as_str()).collect();
            let total = types.len();
            types.sort_unstable();
            types.dedup();
            prop_assert_eq!(types.len(), total);
        }
    }

    #[test]
    fn transition_time_moves_only_on_status_change(ops in prop::collection::vec(op(), 1..40)) {
        let mut conditions: Vec<Condition> = Vec::new();
        for (step, op) in ops.iter().enumerate() {
            let before = conditions.clone();
            conditions = apply(conditions, op, step);

            if let Op::Set { type_, status, .. } = op {
                let after = find_condition(&conditions, type_).unwrap();
                prop_assert_eq!(after.status.as_str(), *status);
                match find_condition(&before, type_) {
                    Some(prev) if prev.status == *status => {
                        prop_assert_eq!(&after.last_transition_time, &prev.last_transition_time);
                    }
                    _ => {
                        prop_assert_eq!(&after.last_transition_time, &format_time(at(step)));
                    }
                }
            }
        }
    }

    #[test]
    fn multi_error_keeps_every_error(count in 0usize..10) {
        let mut errors = MultiError::new();
        for i in 0..count {
            errors.push(Error::TransientError(format!("failure {}", i)));
        }
        prop_assert_eq!(errors.len(), count);

        match errors.into_result(()) {
            Ok(()) => prop_assert_eq!(count, 0),
            Err(collected) => {
                prop_assert_eq!(collected.len(), count);
                let rendered = collected.to_string();
                for i in 0..count {
                    let expected = format!("failure {}", i);
                    prop_assert!(rendered.contains(&expected));
                }
            }
        }
    }

    #[test]
    fn duration_parsing_never_panics(input in "\\PC{0,16}") {
        let _ = parse_go_duration(&input);
    }

    #[test]
    fn simple_durations_parse(value in 0u64..100_000, unit in prop::sample::select(vec!["ms", "s", "m", "h"])) {
        let expected = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            _ => Duration::from_secs(value * 3600),
        };
        prop_assert_eq!(parse_go_duration(&format!("{}{}", value, unit)), Some(expected));
    }
}
