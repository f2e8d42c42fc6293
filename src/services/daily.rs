// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Day-of-year grouping of activities.
//!
//! Timestamps are sliced as literal characters, not parsed. An activity with
//! only a UTC start (`start_date`) is therefore bucketed by its UTC calendar
//! day, which can differ from the local day near midnight. Totals shown to
//! users depend on this exact slicing, so it is kept as-is.

use crate::models::{
    ActivityRecord, ActivitySummary, DayCounts, DayGroup, LocalDateParts,
};
use std::collections::BTreeMap;

/// Meters per statute mile.
const METERS_PER_MILE: f64 = 1609.344;

/// Sport reported when neither `sport_type` nor `type` is present.
const UNKNOWN_SPORT: &str = "UNKNOWN";

/// Slice `[start, end)` by character, clamped to the string's length.
fn slice_chars(s: &str, start: usize, end: usize) -> String {
    s.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

/// Extract the day key, full date and time of day from an activity.
///
/// Prefers `start_date_local`, falling back to `start_date` when the local
/// field is absent or empty. Returns `None` when neither is usable; such an
/// activity cannot be plotted on the calendar.
pub fn extract_local_date_parts(record: &ActivityRecord) -> Option<LocalDateParts> {
    let iso = [&record.start_date_local, &record.start_date]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .find(|value| !value.is_empty())?;

    // "2026-02-03T16:08:11Z" -> "2026-02-03" and "16:08"
    let full_date = slice_chars(iso, 0, 10);
    let time = slice_chars(iso, 11, 16);

    let month = slice_chars(&full_date, 5, 7);
    let day = slice_chars(&full_date, 8, 10);

    Some(LocalDateParts {
        key: format!("{month}-{day}"),
        full_date,
        time,
    })
}

/// Convert meters to statute miles.
pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Project an activity into its display summary.
pub fn summarize_activity(record: &ActivityRecord) -> ActivitySummary {
    summarize_with_parts(record, extract_local_date_parts(record))
}

fn summarize_with_parts(record: &ActivityRecord, parts: Option<LocalDateParts>) -> ActivitySummary {
    let sport = record
        .sport_type
        .as_ref()
        .or(record.activity_type.as_ref())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_SPORT.to_string());

    let (day_key, date_local, start_time_local) = match parts {
        Some(p) => (Some(p.key), Some(p.full_date), Some(p.time)),
        None => (None, None, None),
    };

    let distance_m = record.distance.unwrap_or(0.0);

    ActivitySummary {
        id: record.id.clone(),
        name: record.name.clone(),
        sport,
        day_key,
        date_local,
        start_time_local,
        distance_m,
        distance_mi: record.distance.map(meters_to_miles).unwrap_or(0.0),
        moving_time_s: record.moving_time.unwrap_or(0.0),
        elapsed_time_s: record.elapsed_time.unwrap_or(0.0),
        elevation_gain_m: record.total_elevation_gain.unwrap_or(0.0),
        timezone: record.timezone.clone(),
        utc_offset: record.utc_offset,
        start_latlng: record.start_latlng.clone(),
        end_latlng: record.end_latlng.clone(),
        location_city: record.location_city.clone(),
        location_state: record.location_state.clone(),
        location_country: record.location_country.clone(),
    }
}

/// Group activities by day key.
///
/// Activities without a usable start timestamp are skipped. Groups are
/// sorted by key; activities within a group by local time of day, then by
/// local date.
pub fn build_grouped_by_day(records: &[ActivityRecord]) -> Vec<DayGroup> {
    let mut buckets: BTreeMap<String, Vec<ActivitySummary>> = BTreeMap::new();

    for record in records {
        let Some(parts) = extract_local_date_parts(record) else {
            continue;
        };
        let key = parts.key.clone();
        buckets
            .entry(key)
            .or_default()
            .push(summarize_with_parts(record, Some(parts)));
    }

    buckets
        .into_iter()
        .map(|(day_key, mut activities)| {
            activities.sort_by(|a, b| {
                a.start_time_local
                    .cmp(&b.start_time_local)
                    .then_with(|| a.date_local.cmp(&b.date_local))
            });

            let total_distance_mi = activities.iter().map(|a| a.distance_mi).sum();

            DayGroup {
                day_key,
                count: activities.len() as u32,
                total_distance_mi,
                activities,
            }
        })
        .collect()
}

/// Count activities per day key, skipping those without a start timestamp.
pub fn build_day_counts(records: &[ActivityRecord]) -> DayCounts {
    let mut counts = DayCounts::new();
    for parts in records.iter().filter_map(extract_local_date_parts) {
        *counts.entry(parts.key).or_insert(0) += 1;
    }
    counts
}

/// Look up one day's group in a key-sorted grouping.
pub fn find_day<'a>(groups: &'a [DayGroup], day_key: &str) -> Option<&'a DayGroup> {
    groups
        .binary_search_by(|group| group.day_key.as_str().cmp(day_key))
        .ok()
        .map(|index| &groups[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityId;

    fn record(local: Option<&str>, utc: Option<&str>) -> ActivityRecord {
        ActivityRecord {
            start_date_local: local.map(str::to_string),
            start_date: utc.map(str::to_string),
            ..ActivityRecord::default()
        }
    }

    fn activity(id: u64, local: &str, sport: &str, distance: f64) -> ActivityRecord {
        ActivityRecord {
            id: Some(ActivityId::Numeric(id)),
            sport_type: Some(sport.to_string()),
            start_date_local: Some(local.to_string()),
            distance: Some(distance),
            ..ActivityRecord::default()
        }
    }

    #[test]
    fn test_extract_prefers_local() {
        let parts = extract_local_date_parts(&record(
            Some("2026-02-03T16:08:11Z"),
            Some("2026-02-04T00:08:11Z"),
        ))
        .unwrap();

        assert_eq!(parts.key, "02-03");
        assert_eq!(parts.full_date, "2026-02-03");
        assert_eq!(parts.time, "16:08");
    }

    #[test]
    fn test_extract_falls_back_to_utc_without_conversion() {
        let parts = extract_local_date_parts(&record(None, Some("2025-12-31T23:30:00Z"))).unwrap();
        assert_eq!(parts.key, "12-31");
        assert_eq!(parts.time, "23:30");

        let parts =
            extract_local_date_parts(&record(Some(""), Some("2025-07-04T10:00:00Z"))).unwrap();
        assert_eq!(parts.key, "07-04");
    }

    #[test]
    fn test_extract_without_timestamps() {
        assert_eq!(extract_local_date_parts(&record(None, None)), None);
        assert_eq!(extract_local_date_parts(&record(Some(""), Some(""))), None);
    }

    #[test]
    fn test_extract_short_timestamp_degrades() {
        let parts = extract_local_date_parts(&record(Some("2026-02-03"), None)).unwrap();
        assert_eq!(parts.key, "02-03");
        assert_eq!(parts.full_date, "2026-02-03");
        assert_eq!(parts.time, "");

        let parts = extract_local_date_parts(&record(Some("2026-02-03T16"), None)).unwrap();
        assert_eq!(parts.time, "16");
    }

    #[test]
    fn test_key_ignores_year() {
        let keys: Vec<String> = ["1999-03-14T08:00:00Z", "2026-03-14T21:45:00", "2010-03-14"]
            .iter()
            .map(|ts| extract_local_date_parts(&record(Some(ts), None)).unwrap().key)
            .collect();
        assert!(keys.iter().all(|k| k == "03-14"), "{keys:?}");
    }

    #[test]
    fn test_summary_resolves_sport() {
        let mut r = record(Some("2026-01-01T00:00:00Z"), None);
        assert_eq!(summarize_activity(&r).sport, "UNKNOWN");

        r.activity_type = Some("Ride".to_string());
        assert_eq!(summarize_activity(&r).sport, "Ride");

        r.sport_type = Some("GravelRide".to_string());
        assert_eq!(summarize_activity(&r).sport, "GravelRide");
    }

    #[test]
    fn test_summary_defaults_missing_numbers() {
        let summary = summarize_activity(&record(None, None));

        assert_eq!(summary.distance_m, 0.0);
        assert_eq!(summary.distance_mi, 0.0);
        assert_eq!(summary.moving_time_s, 0.0);
        assert_eq!(summary.elapsed_time_s, 0.0);
        assert_eq!(summary.elevation_gain_m, 0.0);
        assert_eq!(summary.day_key, None);
        assert_eq!(summary.date_local, None);
        assert_eq!(summary.start_time_local, None);
        assert_eq!(summary.name, None);
    }

    #[test]
    fn test_summary_passes_through_location() {
        let r = ActivityRecord {
            distance: Some(1609.344),
            moving_time: Some(600.0),
            elapsed_time: Some(660.0),
            total_elevation_gain: Some(12.5),
            timezone: Some("(GMT-08:00) America/Los_Angeles".to_string()),
            utc_offset: Some(-28800.0),
            start_latlng: Some(vec![37.4, -122.1]),
            location_city: Some("Palo Alto".to_string()),
            ..record(Some("2026-02-03T16:08:11Z"), None)
        };
        let summary = summarize_activity(&r);

        assert!((summary.distance_mi - 1.0).abs() < 1e-12);
        assert_eq!(summary.moving_time_s, 600.0);
        assert_eq!(summary.elapsed_time_s, 660.0);
        assert_eq!(summary.elevation_gain_m, 12.5);
        assert_eq!(summary.utc_offset, Some(-28800.0));
        assert_eq!(summary.start_latlng, Some(vec![37.4, -122.1]));
        assert_eq!(summary.end_latlng, None);
        assert_eq!(summary.location_city.as_deref(), Some("Palo Alto"));
        assert_eq!(summary.day_key.as_deref(), Some("02-03"));
    }

    #[test]
    fn test_same_day_across_years() {
        let records = vec![
            activity(1, "2026-02-03T16:08:11Z", "Run", 1609.344),
            activity(2, "2025-02-03T07:00:00Z", "Ride", 3218.688),
        ];

        let groups = build_grouped_by_day(&records);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.day_key, "02-03");
        assert_eq!(group.count, 2);
        assert!((group.total_distance_mi - 3.0).abs() < 1e-9);
        assert_eq!(group.activities[0].sport, "Ride");
        assert_eq!(group.activities[0].start_time_local.as_deref(), Some("07:00"));
        assert_eq!(group.activities[1].sport, "Run");
        assert_eq!(group.activities[1].start_time_local.as_deref(), Some("16:08"));

        let counts = build_day_counts(&records);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("02-03"), Some(&2));
    }

    #[test]
    fn test_undated_records_are_skipped() {
        let records = vec![
            record(None, None),
            activity(1, "2026-05-01T09:00:00Z", "Walk", 100.0),
            record(Some(""), None),
        ];

        let groups = build_grouped_by_day(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 1);

        let counts = build_day_counts(&records);
        assert_eq!(counts.values().sum::<u32>(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_grouped_by_day(&[]).is_empty());
        assert!(build_day_counts(&[]).is_empty());
    }

    fn mixed_records() -> Vec<ActivityRecord> {
        vec![
            activity(1, "2024-10-02T18:00:00Z", "Run", 5000.0),
            activity(2, "2026-01-15T06:30:00Z", "Ride", 20000.0),
            activity(3, "2023-10-02T06:30:00Z", "Hike", 8000.0),
            activity(4, "2022-10-02T06:30:00Z", "Hike", 7000.0),
            activity(5, "2025-02-28T12:00:00Z", "Swim", 1500.0),
            activity(6, "2021-01-15T06:30:00Z", "Run", 10000.0),
            record(None, Some("2020-10-02T23:59:00Z")),
            record(None, None),
        ]
    }

    #[test]
    fn test_groups_are_sorted() {
        let groups = build_grouped_by_day(&mixed_records());

        let keys: Vec<&str> = groups.iter().map(|g| g.day_key.as_str()).collect();
        assert_eq!(keys, vec!["01-15", "02-28", "10-02"]);

        for group in &groups {
            for pair in group.activities.windows(2) {
                let a = (&pair[0].start_time_local, &pair[0].date_local);
                let b = (&pair[1].start_time_local, &pair[1].date_local);
                assert!(a <= b, "{a:?} should sort before {b:?}");
            }
        }

        let october: Vec<_> = groups[2]
            .activities
            .iter()
            .map(|a| a.date_local.as_deref().unwrap())
            .collect();
        assert_eq!(
            october,
            vec!["2022-10-02", "2023-10-02", "2024-10-02", "2020-10-02"]
        );
    }

    #[test]
    fn test_counts_agree_with_groups() {
        let records = mixed_records();
        let groups = build_grouped_by_day(&records);
        let counts = build_day_counts(&records);

        assert_eq!(counts.len(), groups.len());
        for group in &groups {
            assert_eq!(counts.get(&group.day_key), Some(&group.count));
            assert_eq!(group.count as usize, group.activities.len());
        }
    }

    #[test]
    fn test_grouping_ignores_input_order() {
        let records = mixed_records();
        let mut reversed = records.clone();
        reversed.reverse();
        let mut rotated = records.clone();
        rotated.rotate_left(3);

        let expected = build_grouped_by_day(&records);
        assert_eq!(build_grouped_by_day(&reversed), expected);
        assert_eq!(build_grouped_by_day(&rotated), expected);
        assert_eq!(build_day_counts(&reversed), build_day_counts(&records));
    }

    #[test]
    fn test_find_day() {
        let groups = build_grouped_by_day(&mixed_records());

        assert_eq!(find_day(&groups, "02-28").map(|g| g.count), Some(1));
        assert_eq!(find_day(&groups, "10-02").map(|g| g.count), Some(4));
        assert!(find_day(&groups, "12-25").is_none());
        assert!(find_day(&[], "01-01").is_none());
    }
}
