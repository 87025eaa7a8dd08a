//! Timezone helpers on top of `chrono-tz`.
//!
//! Every operation takes zone ids as strings and degrades to a sentinel
//! value instead of failing, so rendering code never has to branch on errors.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::contract::model::DateTimeInput;

pub const DEFAULT_PATTERN: &str = "%Y-%m-%d %H:%M";
/// e.g. "Jan 5, 2025 at 3:04 PM"
pub const DISPLAY_PATTERN: &str = "%b %-d, %Y at %-I:%M %p";
/// Matches `<input type="datetime-local">`.
pub const INPUT_PATTERN: &str = "%Y-%m-%dT%H:%M";

pub const NOT_AVAILABLE: &str = "N/A";
pub const INVALID_DATE: &str = "Invalid Date";

pub const COMMON_TIMEZONES: [&str; 12] = [
    "UTC",
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Asia/Tokyo",
    "Asia/Kolkata",
    "Asia/Singapore",
    "Australia/Sydney",
];

const NAIVE_INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub fn resolve(tz_id: &str) -> Option<Tz> {
    tz_id.parse::<Tz>().ok()
}

pub fn is_valid_timezone(tz_id: &str) -> bool {
    resolve(tz_id).is_some()
}

pub fn common_timezones() -> &'static [&'static str] {
    &COMMON_TIMEZONES
}

/// Render `instant` in the wall clock of `tz_id`.
pub fn format(instant: Option<DateTime<Utc>>, tz_id: &str, pattern: &str) -> String {
    let Some(instant) = instant else {
        return NOT_AVAILABLE.to_string();
    };
    let Some(tz) = resolve(tz_id) else {
        return INVALID_DATE.to_string();
    };

    // An unknown specifier surfaces as fmt::Error here; format!() would panic.
    let mut out = String::new();
    match write!(out, "{}", instant.with_timezone(&tz).format(pattern)) {
        Ok(()) => out,
        Err(_) => INVALID_DATE.to_string(),
    }
}

pub fn format_for_display(instant: Option<DateTime<Utc>>, tz_id: &str) -> String {
    format(instant, tz_id, DISPLAY_PATTERN)
}

/// "UTC+5:30" style label for an offset east of UTC, in seconds.
pub fn offset_label(offset_seconds: i32) -> String {
    let total_minutes = offset_seconds / 60;
    let sign = if total_minutes >= 0 { '+' } else { '-' };
    let hours = total_minutes.abs() / 60;
    let minutes = total_minutes.abs() % 60;

    if minutes == 0 {
        format!("UTC{sign}{hours}")
    } else {
        format!("UTC{sign}{hours}:{minutes:02}")
    }
}

pub fn offset_at(tz_id: &str, at: DateTime<Utc>) -> String {
    match resolve(tz_id) {
        Some(tz) => offset_label(at.with_timezone(&tz).offset().fix().local_minus_utc()),
        None => "UTC".to_string(),
    }
}

/// Offset of `tz_id` right now; "UTC" for unknown zones.
pub fn current_offset(tz_id: &str) -> String {
    offset_at(tz_id, Utc::now())
}

/// Current wall clock of `tz_id` in `INPUT_PATTERN`, used to prefill forms.
pub fn current_date_time_for(tz_id: &str) -> String {
    format(Some(Utc::now()), tz_id, INPUT_PATTERN)
}

/// One instant rendered with `DEFAULT_PATTERN` in each of `targets`, in order.
pub fn times_for_timezones(instant: DateTime<Utc>, targets: &[&str]) -> Vec<(String, String)> {
    targets
        .iter()
        .map(|tz| (tz.to_string(), format(Some(instant), tz, DEFAULT_PATTERN)))
        .collect()
}

/// Read a zone-naive wall-clock time in `tz`.
///
/// Ambiguous times (clocks going back) take the earlier instant. Times inside
/// a spring-forward gap use the offset from before the gap, which moves the
/// wall clock forward by the gap length.
pub fn localize_in(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Some(dt.with_timezone(&Utc));
    }

    // Near the ends of the representable range there is no gap to step out
    // of, only overflow; those readings resolve to None.
    let before_gap = [Duration::hours(3), Duration::days(2)]
        .into_iter()
        .find_map(|back| {
            let earlier = naive.checked_sub_signed(back)?;
            tz.from_local_datetime(&earlier).earliest()
        })?;
    let offset = Duration::seconds(i64::from(before_gap.offset().fix().local_minus_utc()));
    Some(Utc.from_utc_datetime(&naive.checked_sub_signed(offset)?))
}

pub fn localize(naive: NaiveDateTime, tz_id: &str) -> Option<DateTime<Utc>> {
    localize_in(naive, resolve(tz_id)?)
}

/// Take the wall-clock reading of `instant` in `from_tz` and express it in `to_tz`.
pub fn convert(instant: DateTime<Utc>, from_tz: &str, to_tz: &str) -> Option<DateTime<Tz>> {
    let from = resolve(from_tz)?;
    let to = resolve(to_tz)?;

    let wall_clock = instant.with_timezone(&from).naive_local();
    let anchored = localize_in(wall_clock, from)?;
    Some(anchored.with_timezone(&to))
}

/// RFC 3339 instants win; otherwise accept a zone-naive `YYYY-MM-DDTHH:mm[:ss]`.
pub fn parse_input(raw: &str) -> Option<DateTimeInput> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(DateTimeInput::Instant(dt.with_timezone(&Utc)));
    }
    NAIVE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(DateTimeInput::Local)
}

pub fn resolve_input(input: DateTimeInput, tz_id: &str) -> Option<DateTime<Utc>> {
    match input {
        DateTimeInput::Instant(instant) => Some(instant),
        DateTimeInput::Local(naive) => localize(naive, tz_id),
    }
}

pub fn parse_date_time_input(raw: &str, tz_id: &str) -> Option<DateTime<Utc>> {
    resolve_input(parse_input(raw)?, tz_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn validates_iana_ids() {
        assert!(is_valid_timezone("UTC"));
        assert!(is_valid_timezone("Europe/Paris"));
        assert!(!is_valid_timezone("Mars/Phobos"));
        assert!(!is_valid_timezone(""));
    }

    #[test]
    fn format_sentinels() {
        assert_eq!(format(None, "UTC", DEFAULT_PATTERN), "N/A");
        assert_eq!(
            format(Some(utc(2025, 1, 1, 0, 0)), "Mars/Phobos", DEFAULT_PATTERN),
            "Invalid Date"
        );
        assert_eq!(
            format(Some(utc(2025, 1, 1, 0, 0)), "UTC", "%Q"),
            "Invalid Date"
        );
    }

    #[test]
    fn format_renders_local_wall_clock() {
        let instant = utc(2025, 1, 15, 20, 4);
        assert_eq!(format(Some(instant), "UTC", DEFAULT_PATTERN), "2025-01-15 20:04");
        assert_eq!(
            format_for_display(Some(instant), "America/New_York"),
            "Jan 15, 2025 at 3:04 PM"
        );
        assert_eq!(
            format(Some(instant), "Asia/Tokyo", INPUT_PATTERN),
            "2025-01-16T05:04"
        );
    }

    #[test]
    fn offset_labels() {
        assert_eq!(offset_label(0), "UTC+0");
        assert_eq!(offset_label(5 * 3600 + 1800), "UTC+5:30");
        assert_eq!(offset_label(-5 * 3600), "UTC-5");
        assert_eq!(offset_label(-(3 * 3600 + 1800)), "UTC-3:30");
    }

    #[test]
    fn offsets_follow_dst() {
        assert_eq!(offset_at("America/New_York", utc(2025, 1, 15, 12, 0)), "UTC-5");
        assert_eq!(offset_at("America/New_York", utc(2025, 7, 15, 12, 0)), "UTC-4");
        assert_eq!(current_offset("Asia/Kolkata"), "UTC+5:30");
        assert_eq!(current_offset("UTC"), "UTC+0");
        assert_eq!(current_offset("Nowhere/Land"), "UTC");
    }

    #[test]
    fn localize_plain_and_ambiguous_times() {
        assert_eq!(
            localize(naive(2025, 1, 15, 9, 0), "America/New_York"),
            Some(utc(2025, 1, 15, 14, 0))
        );
        // 01:30 happens twice on 2025-11-02; EDT (earlier) wins.
        assert_eq!(
            localize(naive(2025, 11, 2, 1, 30), "America/New_York"),
            Some(utc(2025, 11, 2, 5, 30))
        );
        assert_eq!(localize(naive(2025, 1, 1, 0, 0), "Mars/Phobos"), None);
    }

    #[test]
    fn localize_shifts_out_of_dst_gap() {
        // 02:30 does not exist on 2025-03-09 in New York; read as 03:30 EDT.
        let instant = localize(naive(2025, 3, 9, 2, 30), "America/New_York").unwrap();
        assert_eq!(instant, utc(2025, 3, 9, 7, 30));
        assert_eq!(
            format(Some(instant), "America/New_York", DEFAULT_PATTERN),
            "2025-03-09 03:30"
        );
    }

    #[test]
    fn convert_preserves_rendering_in_target_zone() {
        let instant = utc(2025, 6, 1, 16, 45);
        for (from, to) in [
            ("America/New_York", "Asia/Kolkata"),
            ("Europe/Berlin", "Australia/Sydney"),
            ("UTC", "America/Los_Angeles"),
        ] {
            let converted = convert(instant, from, to).unwrap();
            assert_eq!(
                format(Some(converted.with_timezone(&Utc)), to, DEFAULT_PATTERN),
                format(Some(instant), to, DEFAULT_PATTERN)
            );
        }
        assert!(convert(instant, "UTC", "Mars/Phobos").is_none());
    }

    #[test]
    fn current_time_uses_input_pattern() {
        let now = current_date_time_for("Asia/Kolkata");
        assert_eq!(now.len(), "2025-01-15T09:00".len());
        assert_eq!(now.as_bytes()[10], b'T');
        assert!(NaiveDateTime::parse_from_str(&now, INPUT_PATTERN).is_ok());
        assert_eq!(current_date_time_for("Mars/Phobos"), "Invalid Date");
    }

    #[test]
    fn one_instant_across_zones() {
        let times = times_for_timezones(
            utc(2025, 1, 15, 14, 0),
            &["UTC", "America/New_York", "Asia/Kolkata", "Mars/Phobos"],
        );
        let rendered: Vec<(&str, &str)> = times
            .iter()
            .map(|(tz, t)| (tz.as_str(), t.as_str()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("UTC", "2025-01-15 14:00"),
                ("America/New_York", "2025-01-15 09:00"),
                ("Asia/Kolkata", "2025-01-15 19:30"),
                ("Mars/Phobos", "Invalid Date"),
            ]
        );
        assert!(times_for_timezones(utc(2025, 1, 15, 14, 0), &[]).is_empty());
    }

    #[test]
    fn extreme_years_do_not_overflow() {
        assert_eq!(parse_date_time_input("-262143-01-01T00:00", "Asia/Tokyo"), None);
        // Only the absence of a panic matters at the upper end.
        let _ = parse_date_time_input("+262142-12-31T23:59", "America/New_York");
        let _ = parse_date_time_input("+262142-12-31T23:59", "Asia/Tokyo");
    }

    #[test]
    fn parses_instant_and_naive_inputs() {
        assert_eq!(
            parse_input("2025-01-15T14:00:00.000Z"),
            Some(DateTimeInput::Instant(utc(2025, 1, 15, 14, 0)))
        );
        assert_eq!(
            parse_input("2025-01-15T09:00:00-05:00"),
            Some(DateTimeInput::Instant(utc(2025, 1, 15, 14, 0)))
        );
        assert_eq!(
            parse_input("2025-01-15T09:00"),
            Some(DateTimeInput::Local(naive(2025, 1, 15, 9, 0)))
        );
        assert_eq!(parse_input("tomorrow"), None);

        assert_eq!(
            parse_date_time_input("2025-01-15T09:00", "America/New_York"),
            Some(utc(2025, 1, 15, 14, 0))
        );
        assert_eq!(
            parse_date_time_input("2025-01-15T14:00:00Z", "Mars/Phobos"),
            Some(utc(2025, 1, 15, 14, 0))
        );
    }
}
