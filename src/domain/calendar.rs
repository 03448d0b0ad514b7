use anyhow::{Context, Result};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Drop seconds and sub-second precision, keeping the offset.
pub fn zero_seconds(at: OffsetDateTime) -> OffsetDateTime {
    match Time::from_hms(at.hour(), at.minute(), 0) {
        Ok(minute) => at.replace_time(minute),
        Err(_) => at,
    }
}

/// Combine a calendar day and a wall-clock time in the given offset.
pub fn at_clock(day: Date, clock: Time, offset: UtcOffset) -> OffsetDateTime {
    PrimitiveDateTime::new(day, clock).assume_offset(offset)
}

/// Human label for a day relative to `today`: "Today", "Tomorrow",
/// "Yesterday", otherwise something like "Wed, Dec 25".
pub fn day_label(day: Date, today: Date) -> String {
    if day == today {
        return "Today".to_string();
    }
    if today.next_day() == Some(day) {
        return "Tomorrow".to_string();
    }
    if today.previous_day() == Some(day) {
        return "Yesterday".to_string();
    }
    day.format(format_description!(
        "[weekday repr:short], [month repr:short] [day padding:none]"
    ))
    .unwrap_or_else(|_| day.to_string())
}

/// Short wall-clock rendering, e.g. "9:05 AM".
pub fn clock_label(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[hour repr:12 padding:none]:[minute] [period]"
    ))
    .unwrap_or_else(|_| format!("{:02}:{:02}", at.hour(), at.minute()))
}

pub fn parse_day(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date {raw:?}, expected YYYY-MM-DD"))
}

pub fn parse_clock(raw: &str) -> Result<Time> {
    Time::parse(raw.trim(), format_description!("[hour]:[minute]"))
        .with_context(|| format!("invalid time {raw:?}, expected HH:MM"))
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, time};

    use super::*;

    #[test]
    fn zero_seconds_truncates_seconds_and_nanos() {
        let at = datetime!(2024-12-22 14:30:59.123 +09:00);
        let zeroed = zero_seconds(at);
        assert_eq!(zeroed, datetime!(2024-12-22 14:30:00 +09:00));
        assert_eq!(zeroed.offset(), at.offset());
    }

    #[test]
    fn day_labels_are_relative_to_today() {
        let today = date!(2024-12-25);
        assert_eq!(day_label(today, today), "Today");
        assert_eq!(day_label(date!(2024-12-26), today), "Tomorrow");
        assert_eq!(day_label(date!(2024-12-24), today), "Yesterday");
        assert_eq!(day_label(date!(2025-01-01), today), "Wed, Jan 1");
    }

    #[test]
    fn clock_label_uses_twelve_hour_clock() {
        assert_eq!(clock_label(datetime!(2024-12-22 9:05 UTC)), "9:05 AM");
        assert_eq!(clock_label(datetime!(2024-12-22 23:00 UTC)), "11:00 PM");
    }

    #[test]
    fn parses_cli_day_and_clock() {
        assert_eq!(parse_day("2024-12-22").unwrap(), date!(2024-12-22));
        assert_eq!(parse_clock("10:30").unwrap(), time!(10:30));
        assert!(parse_day("22/12/2024").is_err());
        assert!(parse_clock("25:00").is_err());
    }

    #[test]
    fn at_clock_assumes_offset() {
        let at = at_clock(date!(2024-12-22), time!(10:00), UtcOffset::UTC);
        assert_eq!(at, datetime!(2024-12-22 10:00 UTC));
    }
}
