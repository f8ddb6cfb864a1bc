//! Recurring appointment expansion.

use std::num::NonZeroU32;

use chrono::{Duration, TimeZone, Utc, Weekday};
use conflict_engine::{
    expand, expand_appointment, expand_with_limit, Appointment, EndCondition, Instant, Interval,
    RecurrencePattern, SchedulingError, ZoneId,
};
use uuid::Uuid;

fn utc(month: u32, day: u32, hour: u32, min: u32) -> Instant {
    Utc.with_ymd_and_hms(2026, month, day, hour, min, 0).unwrap()
}

fn window(start: Instant, end: Instant) -> Interval {
    Interval::new(start, end).unwrap()
}

/// A one-hour appointment starting at `start`, displayed in `zone`.
fn series(start: Instant, zone: &str, pattern: RecurrencePattern) -> Appointment {
    let mut appt = Appointment::scheduled(
        Some(Uuid::from_u128(1)),
        Uuid::from_u128(2),
        Uuid::from_u128(3),
        Interval::starting_at(start, Duration::hours(1)).unwrap(),
        ZoneId::parse(zone).unwrap(),
    );
    appt.recurrence = Some(pattern);
    appt
}

fn starts(intervals: &[Interval]) -> Vec<Instant> {
    intervals.iter().map(Interval::start).collect()
}

#[test]
fn weekly_keeps_local_time_across_dst() {
    // Mondays 09:00 Chicago: CST (UTC-6) until March 8, CDT (UTC-5) after.
    let pattern = RecurrencePattern::weekly([Weekday::Mon]);
    let appt = series(utc(3, 2, 15, 0), "America/Chicago", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(3, 1, 0, 0), utc(3, 17, 0, 0))).unwrap();

    assert_eq!(
        starts(&occurrences),
        vec![utc(3, 2, 15, 0), utc(3, 9, 14, 0), utc(3, 16, 14, 0)]
    );
    for occurrence in &occurrences {
        assert_eq!(occurrence.duration(), Duration::hours(1));
    }
}

#[test]
fn daily_series_starting_in_dst_fold() {
    // 01:30 EDT on 2026-11-01; New York repeats 01:00-02:00 that night.
    let pattern = RecurrencePattern::daily();
    let appt = series(utc(11, 1, 5, 30), "America/New_York", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(11, 1, 0, 0), utc(11, 4, 0, 0))).unwrap();

    // Later days are 01:30 EST.
    assert_eq!(
        starts(&occurrences),
        vec![utc(11, 1, 5, 30), utc(11, 2, 6, 30), utc(11, 3, 6, 30)]
    );
}

#[test]
fn series_starting_at_later_fold_reading_keeps_its_start() {
    // 01:30 EST, the second 01:30 of the night.
    let pattern = RecurrencePattern::daily();
    let appt = series(utc(11, 1, 6, 30), "America/New_York", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(11, 1, 0, 0), utc(11, 3, 0, 0))).unwrap();
    assert_eq!(starts(&occurrences), vec![utc(11, 1, 6, 30), utc(11, 2, 6, 30)]);
}

#[test]
fn daily_series_crossing_dst_fold() {
    let pattern = RecurrencePattern::daily();
    let appt = series(utc(10, 31, 5, 30), "America/New_York", pattern.clone());
    let occurrences =
        expand(&appt, &pattern, &window(utc(10, 31, 0, 0), utc(11, 3, 0, 0))).unwrap();
    assert_eq!(
        starts(&occurrences),
        vec![utc(10, 31, 5, 30), utc(11, 1, 5, 30), utc(11, 2, 6, 30)]
    );
}

#[test]
fn daily_series_crossing_dst_gap() {
    // 02:30 does not exist in New York on 2026-03-08; it is read with the
    // pre-transition offset (UTC-5), landing at 03:30 EDT.
    let pattern = RecurrencePattern::daily();
    let appt = series(utc(3, 7, 7, 30), "America/New_York", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(3, 7, 0, 0), utc(3, 10, 0, 0))).unwrap();
    assert_eq!(
        starts(&occurrences),
        vec![utc(3, 7, 7, 30), utc(3, 8, 7, 30), utc(3, 9, 6, 30)]
    );
}

#[test]
fn weekly_multiple_days() {
    let pattern = RecurrencePattern::weekly([Weekday::Mon, Weekday::Wed]);
    let appt = series(utc(3, 2, 9, 0), "UTC", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(3, 1, 0, 0), utc(3, 9, 0, 0))).unwrap();
    assert_eq!(starts(&occurrences), vec![utc(3, 2, 9, 0), utc(3, 4, 9, 0)]);
}

#[test]
fn after_occurrences_stops_at_count() {
    let pattern = RecurrencePattern::daily()
        .ending(EndCondition::AfterOccurrences(NonZeroU32::new(3).unwrap()));
    let appt = series(utc(3, 2, 9, 0), "UTC", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(3, 1, 0, 0), utc(4, 1, 0, 0))).unwrap();
    assert_eq!(
        starts(&occurrences),
        vec![utc(3, 2, 9, 0), utc(3, 3, 9, 0), utc(3, 4, 9, 0)]
    );
}

#[test]
fn on_date_is_inclusive() {
    let pattern = RecurrencePattern::daily().ending(EndCondition::OnDate(utc(3, 5, 9, 0)));
    let appt = series(utc(3, 2, 9, 0), "UTC", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(3, 1, 0, 0), utc(4, 1, 0, 0))).unwrap();
    assert_eq!(occurrences.len(), 4);
    assert_eq!(occurrences.last().unwrap().start(), utc(3, 5, 9, 0));
}

#[test]
fn never_is_bounded_by_horizon() {
    let pattern = RecurrencePattern::daily();
    let appt = series(utc(3, 2, 9, 0), "UTC", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(3, 2, 0, 0), utc(3, 12, 0, 0))).unwrap();
    assert_eq!(occurrences.len(), 10);
}

#[test]
fn every_other_week() {
    let pattern = RecurrencePattern::weekly([Weekday::Mon]).every(NonZeroU32::new(2).unwrap());
    let appt = series(utc(3, 2, 9, 0), "UTC", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(3, 1, 0, 0), utc(3, 31, 0, 0))).unwrap();
    assert_eq!(
        starts(&occurrences),
        vec![utc(3, 2, 9, 0), utc(3, 16, 9, 0), utc(3, 30, 9, 0)]
    );
}

#[test]
fn monthly_skips_short_months() {
    let pattern = RecurrencePattern::monthly_on(31);
    let appt = series(utc(1, 31, 10, 0), "UTC", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(1, 1, 0, 0), utc(6, 1, 0, 0))).unwrap();
    assert_eq!(
        starts(&occurrences),
        vec![utc(1, 31, 10, 0), utc(3, 31, 10, 0), utc(5, 31, 10, 0)]
    );
}

#[test]
fn horizon_after_series_start_drops_earlier_occurrences() {
    let pattern = RecurrencePattern::daily();
    let appt = series(utc(3, 2, 9, 0), "UTC", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(3, 10, 0, 0), utc(3, 12, 0, 0))).unwrap();
    assert_eq!(starts(&occurrences), vec![utc(3, 10, 9, 0), utc(3, 11, 9, 0)]);
}

#[test]
fn horizon_before_series_is_empty() {
    let pattern = RecurrencePattern::daily();
    let appt = series(utc(3, 20, 9, 0), "UTC", pattern.clone());
    let occurrences = expand(&appt, &pattern, &window(utc(3, 1, 0, 0), utc(3, 10, 0, 0))).unwrap();
    assert!(occurrences.is_empty());
}

#[test]
fn cap_truncates_and_complete_reports_it() {
    let pattern = RecurrencePattern::daily();
    let appt = series(utc(3, 2, 9, 0), "UTC", pattern.clone());
    let expansion =
        expand_with_limit(&appt, &pattern, &window(utc(3, 1, 0, 0), utc(5, 1, 0, 0)), 5).unwrap();
    assert_eq!(expansion.occurrences.len(), 5);
    assert!(expansion.truncated);
    assert!(matches!(
        expansion.complete(),
        Err(SchedulingError::HorizonExceeded(_))
    ));
}

#[test]
fn single_instance_expands_to_itself() {
    let appt = Appointment::scheduled(
        None,
        Uuid::from_u128(2),
        Uuid::from_u128(3),
        window(utc(3, 2, 9, 0), utc(3, 2, 10, 0)),
        ZoneId::UTC,
    );
    let inside = expand_appointment(&appt, &window(utc(3, 1, 0, 0), utc(3, 3, 0, 0)), 10).unwrap();
    assert_eq!(inside.complete().unwrap(), vec![appt.interval]);

    let outside = expand_appointment(&appt, &window(utc(3, 3, 0, 0), utc(3, 4, 0, 0)), 10).unwrap();
    assert!(outside.occurrences.is_empty());
}

#[test]
fn invalid_day_of_month_rejected() {
    let pattern = RecurrencePattern::monthly_on(0);
    let appt = series(utc(3, 2, 9, 0), "UTC", pattern.clone());
    let err = expand(&appt, &pattern, &window(utc(3, 1, 0, 0), utc(4, 1, 0, 0))).unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidRecurrence(_)));
}

#[test]
fn pattern_from_json() {
    let pattern: RecurrencePattern = serde_json::from_str(
        r#"{
            "frequency": "weekly",
            "interval": 1,
            "days_of_week": ["Tue", "Thu"],
            "end": {"type": "after_occurrences", "value": 6}
        }"#,
    )
    .unwrap();
    assert_eq!(
        pattern,
        RecurrencePattern::weekly([Weekday::Tue, Weekday::Thu])
            .ending(EndCondition::AfterOccurrences(NonZeroU32::new(6).unwrap()))
    );
}
