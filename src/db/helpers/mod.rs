use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Days, NaiveDate, SecondsFormat, Utc};

/// Fixed-width ISO-8601 form used for every stored timestamp so that text
/// comparison in SQL matches chronological order.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// `[midnight, next midnight)` in UTC for the given calendar day.
pub fn utc_day_bounds(day: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid midnight for {day}"))?
        .and_utc();
    let end = day
        .checked_add_days(Days::new(1))
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow!("day after {day} is out of range"))?
        .and_utc();
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        assert!(format_timestamp(early) < format_timestamp(late));
        assert_eq!(format_timestamp(late), "2026-01-10T00:00:00.000Z");
    }

    #[test]
    fn parses_both_offset_spellings() {
        let a = parse_datetime("2026-01-10T08:30:00.000Z", "date").unwrap();
        let b = parse_datetime("2026-01-10T09:30:00+01:00", "date").unwrap();
        assert_eq!(a, b);
        assert!(parse_datetime("yesterday", "date").is_err());
    }

    #[test]
    fn day_bounds_cover_one_day() {
        let day = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let (start, end) = utc_day_bounds(day).unwrap();
        assert_eq!(format_timestamp(start), "2026-12-31T00:00:00.000Z");
        assert_eq!(format_timestamp(end), "2027-01-01T00:00:00.000Z");
    }
}
