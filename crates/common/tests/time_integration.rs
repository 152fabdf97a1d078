//! Integration tests for the `time` module.
//!
//! These tests cover cron parsing/evaluation and the testing clock
//! abstractions to ensure the public APIs in `tempo_common::time` work
//! together as expected.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempo_common::time::{Clock, CronParseError, CronSchedule, MockClock, SystemClock};

/// Verifies that valid five-field expressions parse with an implicit seconds
/// field and evaluate against real timestamps.
#[test]
fn test_cron_five_field_round_trip() {
    let cases = [
        ("0 0 1 * *", "00 0 0 1 * *"),
        ("0 0 * * *", "00 0 0 * * *"),
        ("*/5 * * * *", "00 */5 * * * *"),
        ("0 9 * * 1", "00 0 9 * * 1"),
    ];

    for (input, canonical) in cases {
        let schedule = CronSchedule::parse(input).expect("expression should parse");
        assert_eq!(schedule.to_string(), canonical, "canonical form mismatch for {input}");
    }

    // Every day at midnight, seconds pinned to zero by canonicalization.
    let schedule = CronSchedule::parse("0 0 * * *").expect("expression should parse");
    let midnight = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
    let midnight_plus_one_second = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 1).unwrap();
    assert!(schedule.is_due(&midnight));
    assert!(!schedule.is_due(&midnight_plus_one_second));
}

/// Ensures malformed expressions are rejected with the parse error naming
/// the offending input.
#[test]
fn test_cron_malformed_expressions() {
    for expr in ["", "* * *", "* * * *", "* * * * * * *", "0  0 * * *"] {
        match CronSchedule::parse(expr) {
            Err(CronParseError::MalformedExpression(text)) => {
                assert_eq!(text, expr, "error should name the offending input");
            }
            other => panic!("expected MalformedExpression for {expr:?}, got {other:?}"),
        }
    }
}

/// Evaluates a schedule against a mock clock advanced through a day,
/// exercising the clock and cron APIs together the way a polling driver
/// does.
#[test]
fn test_cron_with_mock_clock() {
    let schedule = CronSchedule::parse("*/15 * * * * *").expect("expression should parse");
    let clock = MockClock::new();

    let mut matches = 0;
    for _ in 0..60 {
        if schedule.is_due(&clock.now_utc()) {
            matches += 1;
        }
        clock.advance(Duration::from_secs(1));
    }

    // Exactly four seconds per minute satisfy second % 15 == 0.
    assert_eq!(matches, 4);
}

/// The system clock and mock clock implement the same trait and can back
/// the same call sites.
#[test]
fn test_clock_trait_object_compatibility() {
    let clocks: Vec<Box<dyn Clock>> = vec![Box::new(SystemClock), Box::new(MockClock::new())];

    for clock in clocks {
        let utc = clock.now_utc();
        assert!(utc.timestamp() > 0);
    }
}
