//! Lenient parsers for textual wire values.
//!
//! The server sends temporal columns as text. A malformed field must not
//! abort retrieval of an otherwise valid row, so every parser here returns
//! [`None`] on bad input instead of an error.
use time::{Date, Duration, Month, PrimitiveDateTime, Time};

/// Parse `YYYY-MM-DD HH:MM:SS[.ffffff]`, space or `T` separated.
///
/// Falls back to a date-only parse (midnight) when the time part is
/// malformed or the fields are not a valid calendar datetime.
///
/// ```
/// use sqline::convert;
///
/// assert!(convert::datetime("2007-02-25 23:06:20").is_some());
/// assert!(convert::datetime("2007-02-25T23:06:20").is_some());
/// assert!(convert::datetime("2007-02-31T23:06:20").is_none());
/// assert!(convert::datetime("0000-00-00 00:00:00").is_none());
/// ```
pub fn datetime(text: &str) -> Option<PrimitiveDateTime> {
    let sep = if text.contains(' ') {
        ' '
    } else if text.contains('T') {
        'T'
    } else {
        return date(text).map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT));
    };

    match split_datetime(text, sep) {
        Some(dt) => Some(dt),
        None => date(text).map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT)),
    }
}

fn split_datetime(text: &str, sep: char) -> Option<PrimitiveDateTime> {
    let (ymd, hms) = text.split_once(sep)?;
    let (hms, frac) = match hms.split_once('.') {
        Some((hms, frac)) => (hms, frac),
        None => (hms, ""),
    };

    let date = date(ymd)?;
    let mut parts = hms.split(':');
    let hour = parts.next()?.parse().ok()?;
    let minute = parts.next()?.parse().ok()?;
    let second = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let time = Time::from_hms_micro(hour, minute, second, frac_to_micros(frac)?).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

/// Parse `YYYY-MM-DD`.
///
/// ```
/// use sqline::convert;
///
/// assert!(convert::date("2007-02-26").is_some());
/// assert!(convert::date("2007-02-31").is_none());
/// assert!(convert::date("0000-00-00").is_none());
/// ```
pub fn date(text: &str) -> Option<Date> {
    let mut parts = text.splitn(3, '-');
    let year = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// Parse `[-]HH:MM:SS[.ffffff]` as a signed duration.
///
/// Hours may exceed 24; a leading `-` negates the whole duration.
pub fn duration(text: &str) -> Option<Duration> {
    let (text, frac) = match text.split_once('.') {
        Some((text, frac)) => (text, frac),
        None => (text, ""),
    };
    let micros = i64::from(frac_to_micros(frac)?);

    let mut parts = text.split(':');
    let hours = parts.next()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let (negate, hours) = match hours.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, hours),
    };
    let hours: i64 = hours.parse().ok()?;

    let duration = Duration::hours(hours)
        + Duration::minutes(minutes)
        + Duration::seconds(seconds)
        + Duration::microseconds(micros);
    Some(duration * negate)
}

/// Parse `HH:MM:SS[.ffffff]` as a time of day.
///
/// Unlike [`duration`], hours are constrained to a valid 0-23 clock.
pub fn time(text: &str) -> Option<Time> {
    let (text, frac) = match text.split_once('.') {
        Some((text, frac)) => (text, frac),
        None => (text, ""),
    };

    let mut parts = text.split(':');
    let hour = parts.next()?.parse().ok()?;
    let minute = parts.next()?.parse().ok()?;
    let second = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Time::from_hms_micro(hour, minute, second, frac_to_micros(frac)?).ok()
}

/// Parse a timestamp column, either `YYYY-MM-DD HH:MM:SS` or the legacy
/// compact digit string `YYYYMMDDHHMMSS`.
///
/// Compact input shorter than 14 digits is right-padded with zeros.
///
/// ```
/// use sqline::convert;
///
/// assert_eq!(
///     convert::timestamp("20070225223217"),
///     convert::datetime("2007-02-25 22:32:17"),
/// );
/// assert!(convert::timestamp("00000000000000").is_none());
/// ```
pub fn timestamp(text: &str) -> Option<PrimitiveDateTime> {
    if text.as_bytes().get(4) == Some(&b'-') {
        return datetime(text);
    }
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // pad short input, ignore anything past the seconds field
    let take = text.len().min(14);
    let mut digits = [b'0'; 14];
    digits[..take].copy_from_slice(&text.as_bytes()[..take]);
    let field = |range: std::ops::Range<usize>| -> u8 {
        // digits only, two chars each
        (digits[range.start] - b'0') * 10 + (digits[range.start + 1] - b'0')
    };

    let year: i32 = std::str::from_utf8(&digits[..4]).ok()?.parse().ok()?;
    let date = Date::from_calendar_date(year, Month::try_from(field(4..6)).ok()?, field(6..8)).ok()?;
    let time = Time::from_hms(field(8..10), field(10..12), field(12..14)).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

/// Split a comma-joined token into its members.
pub fn set(text: &str) -> Vec<String> {
    text.split(',').map(str::to_owned).collect()
}

/// Scale a bare fractional tail to microseconds.
///
/// `"25"` means a quarter second, not 25 microseconds.
fn frac_to_micros(frac: &str) -> Option<u32> {
    if frac.is_empty() {
        return Some(0);
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let scaled: f64 = format!("0.{frac}").parse().ok()?;
    Some((scaled * 1e6) as u32)
}

#[cfg(test)]
mod test {
    use super::*;
    use time::Month;

    #[test]
    fn datetime_separators() {
        let expected = PrimitiveDateTime::new(
            Date::from_calendar_date(2007, Month::February, 25).unwrap(),
            Time::from_hms(23, 6, 20).unwrap(),
        );
        assert_eq!(datetime("2007-02-25 23:06:20"), Some(expected));
        assert_eq!(datetime("2007-02-25T23:06:20"), Some(expected));
    }

    #[test]
    fn datetime_fractional_seconds() {
        let dt = datetime("2007-02-25 23:06:20.25").unwrap();
        assert_eq!(dt.microsecond(), 250_000);
    }

    #[test]
    fn datetime_bare_date() {
        let dt = datetime("2007-02-25").unwrap();
        assert_eq!(dt.time(), Time::MIDNIGHT);
    }

    #[test]
    fn datetime_invalid() {
        assert_eq!(datetime("2007-02-31T23:06:20"), None);
        assert_eq!(datetime("0000-00-00 00:00:00"), None);
        assert_eq!(datetime("random crap"), None);
    }

    #[test]
    fn date_calendar_validity() {
        let d = date("2007-02-26").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2007, Month::February, 26));

        assert_eq!(date("2007-02-31"), None);
        assert_eq!(date("0000-00-00"), None);
        assert_eq!(date("2007-02"), None);
    }

    #[test]
    fn duration_past_midnight() {
        assert_eq!(
            duration("25:06:17"),
            Some(Duration::hours(25) + Duration::minutes(6) + Duration::seconds(17)),
        );
        assert_eq!(
            duration("-25:06:17"),
            Some(-(Duration::hours(25) + Duration::minutes(6) + Duration::seconds(17))),
        );
        assert_eq!(
            duration("00:00:01.5"),
            Some(Duration::seconds(1) + Duration::microseconds(500_000)),
        );
        assert_eq!(duration("random crap"), None);
    }

    #[test]
    fn time_of_day_bounds() {
        assert_eq!(time("15:06:17"), Time::from_hms(15, 6, 17).ok());
        assert_eq!(time("25:06:17"), None);
        assert_eq!(time("-15:06:17"), None);
        assert_eq!(time("random crap"), None);
    }

    #[test]
    fn timestamp_compact_and_expanded() {
        assert_eq!(timestamp("20070225223217"), datetime("2007-02-25 22:32:17"));
        assert_eq!(timestamp("2007-02-25 22:32:17"), datetime("2007-02-25 22:32:17"));

        // short input pads to month/day zero, an invalid calendar date
        assert_eq!(timestamp("2007"), None);
        assert_eq!(timestamp("00000000000000"), None);
        assert_eq!(timestamp("2007-02-31 22:32:17"), None);
    }

    #[test]
    fn timestamp_padding() {
        let dt = timestamp("200702252232").unwrap();
        assert_eq!(dt.second(), 0);

        // digits past the seconds field are ignored
        assert_eq!(timestamp("20070225223217999"), datetime("2007-02-25 22:32:17"));
    }

    #[test]
    fn set_members() {
        assert_eq!(set("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(set("solo"), vec!["solo"]);
    }
}
