//! The `D/M/YYYY HH:MM` display stamp stored next to each comment.

use anyhow::{Context, Result, anyhow};
use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;

/// Renders `ts` in `tz` as day/month/year without padding and a
/// zero-padded 24h time, e.g. `12/2/2026 10:59`.
pub fn display_stamp(ts: Timestamp, tz: &TimeZone) -> String {
    let dt = ts.to_zoned(tz.clone()).datetime();
    format!(
        "{}/{}/{} {:02}:{:02}",
        dt.day(),
        dt.month(),
        dt.year(),
        dt.hour(),
        dt.minute()
    )
}

/// Parses a display stamp back into an instant, interpreting it in `tz`.
///
/// Accepts an optional comma after the date and optional seconds.
pub fn parse_display_stamp(stamp: &str, tz: &TimeZone) -> Result<Timestamp> {
    let (date_part, time_part) = stamp
        .trim()
        .split_once(' ')
        .ok_or_else(|| anyhow!("Missing time in date stamp: {stamp:?}"))?;
    let date_part = date_part.trim_end_matches(',');

    let date: Vec<&str> = date_part.split('/').collect();
    let time: Vec<&str> = time_part.trim().split(':').collect();
    let (&[day, month, year], &[hour, minute, ref rest @ ..]) = (date.as_slice(), time.as_slice())
    else {
        return Err(anyhow!("Unrecognized date stamp: {stamp:?}"));
    };
    if rest.len() > 1 {
        return Err(anyhow!("Unrecognized date stamp: {stamp:?}"));
    }

    let field = |value: &str, what: &str| -> Result<i16> {
        value
            .trim()
            .parse::<i16>()
            .with_context(|| format!("Invalid {what} in date stamp: {stamp:?}"))
    };
    let second = match rest.first() {
        Some(s) => field(s, "second")?,
        None => 0,
    };

    let civil = DateTime::new(
        field(year, "year")?,
        i8::try_from(field(month, "month")?)?,
        i8::try_from(field(day, "day")?)?,
        i8::try_from(field(hour, "hour")?)?,
        i8::try_from(field(minute, "minute")?)?,
        i8::try_from(second)?,
        0,
    )
    .with_context(|| format!("Out of range date stamp: {stamp:?}"))?;

    let zoned = tz
        .to_zoned(civil)
        .with_context(|| format!("Cannot place date stamp in time zone: {stamp:?}"))?;
    Ok(zoned.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn display_stamp_format() {
        let ts: Timestamp = "2026-02-12T10:59:30Z".parse().unwrap();
        assert_eq!(display_stamp(ts, &TimeZone::UTC), "12/2/2026 10:59");

        let ts: Timestamp = "2026-11-03T07:05:00Z".parse().unwrap();
        assert_eq!(display_stamp(ts, &TimeZone::UTC), "3/11/2026 07:05");
    }

    #[rstest]
    #[case::plain("12/2/2026 10:59", "2026-02-12T10:59:00Z")]
    #[case::comma("12/2/2026, 10:59", "2026-02-12T10:59:00Z")]
    #[case::padded("01/02/2026 00:00", "2026-02-01T00:00:00Z")]
    #[case::seconds("12/2/2026 10:59:07", "2026-02-12T10:59:07Z")]
    fn parse_display_stamp_accepts(#[case] input: &str, #[case] expected: &str) {
        let expected: Timestamp = expected.parse().unwrap();
        assert_eq!(parse_display_stamp(input, &TimeZone::UTC).unwrap(), expected);
    }

    #[rstest]
    #[case::no_time("12/2/2026")]
    #[case::iso("2026-02-12 10:59")]
    #[case::bad_month("12/13/2026 10:59")]
    #[case::letters("aa/2/2026 10:59")]
    #[case::empty("")]
    fn parse_display_stamp_rejects(#[case] input: &str) {
        assert!(parse_display_stamp(input, &TimeZone::UTC).is_err());
    }

    // A fixed offset zone shifts the parsed instant accordingly.
    #[rstest]
    fn parse_display_stamp_uses_zone() {
        let tz = TimeZone::fixed(jiff::tz::offset(1));
        let expected: Timestamp = "2026-02-12T09:59:00Z".parse().unwrap();
        assert_eq!(parse_display_stamp("12/2/2026 10:59", &tz).unwrap(), expected);
    }
}
