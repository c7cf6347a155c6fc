//! Duration parsing and clock formatting
//!
//! Durations in workout text are written as `1:30`, `2min`, `2 m`, `45s`,
//! `45sec` or a bare number of seconds. Parsing is lenient: the first
//! recognizable number in the input wins and anything else is ignored.

/// Iterate the maximal ASCII digit runs of `bytes` as `(start, end)` offsets.
pub(crate) fn digit_runs(bytes: &[u8]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos < bytes.len() && !bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return None;
        }
        let start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        Some((start, pos))
    })
}

/// Decimal value of an all-digit slice, saturating at `u32::MAX`.
pub(crate) fn parse_digits(digits: &[u8]) -> u32 {
    digits.iter().fold(0u32, |acc, b| {
        acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
    })
}

/// First number anywhere in `s`.
pub(crate) fn first_number(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    digit_runs(bytes)
        .next()
        .map(|(start, end)| parse_digits(&bytes[start..end]))
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Parse a duration string into whole seconds.
///
/// `M:SS` is tried first, then a number followed by `m`/`min`, then the first
/// bare number. Returns 0 when the input holds no digits.
pub fn parse_time_duration(s: &str) -> u32 {
    let bytes = s.as_bytes();

    for (start, end) in digit_runs(bytes) {
        if bytes.get(end) == Some(&b':')
            && bytes.get(end + 1).is_some_and(u8::is_ascii_digit)
        {
            let mins = parse_digits(&bytes[start..end]);
            let secs_end = digit_runs(&bytes[end + 1..])
                .next()
                .map_or(end + 1, |(_, len)| end + 1 + len);
            let secs = parse_digits(&bytes[end + 1..secs_end]);
            return mins.saturating_mul(60).saturating_add(secs);
        }
    }

    for (start, end) in digit_runs(bytes) {
        let unit = skip_whitespace(bytes, end);
        if matches!(bytes.get(unit), Some(b'm' | b'M')) {
            return parse_digits(&bytes[start..end]).saturating_mul(60);
        }
    }

    first_number(s).unwrap_or(0)
}

/// `MM:SS` with unbounded minutes (3661 -> `61:01`).
pub fn format_time(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `MM:SS.hh` with hundredths truncated, never rounded up.
pub fn format_time_millis(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let mins = (secs / 60.0).floor() as u64;
    let whole = (secs % 60.0).floor() as u64;
    let hundredths = ((secs % 1.0) * 100.0).floor() as u64;
    format!("{mins:02}:{whole:02}.{hundredths:02}")
}

/// Whole seconds for display: floor when counting up.
pub fn floor_secs(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    }
}

/// Whole seconds for display: ceil when counting down.
pub fn ceil_secs(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.ceil() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_durations() {
        assert_eq!(parse_time_duration("1:30"), 90);
        assert_eq!(parse_time_duration("0:30"), 30);
        assert_eq!(parse_time_duration("10:00"), 600);
        assert_eq!(parse_time_duration("rest 1:30"), 90);
    }

    #[test]
    fn parses_minute_durations() {
        assert_eq!(parse_time_duration("1min"), 60);
        assert_eq!(parse_time_duration("2m"), 120);
        assert_eq!(parse_time_duration("5 min"), 300);
        assert_eq!(parse_time_duration("1MIN"), 60);
        assert_eq!(parse_time_duration("amrap 12min"), 720);
    }

    #[test]
    fn parses_second_durations() {
        assert_eq!(parse_time_duration("30s"), 30);
        assert_eq!(parse_time_duration("45sec"), 45);
        assert_eq!(parse_time_duration("60"), 60);
        assert_eq!(parse_time_duration("30S"), 30);
        assert_eq!(parse_time_duration("20s work"), 20);
    }

    #[test]
    fn minute_unit_applies_to_its_own_number() {
        // the first digit run is not followed by a unit, the second one is
        assert_eq!(parse_time_duration("rest 3 then 2min"), 120);
    }

    #[test]
    fn invalid_duration_is_zero() {
        assert_eq!(parse_time_duration(""), 0);
        assert_eq!(parse_time_duration("abc"), 0);
    }

    #[test]
    fn huge_numbers_saturate() {
        assert_eq!(parse_time_duration("99999999999999min"), u32::MAX);
    }

    #[test]
    fn formats_clock() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(59), "00:59");
        assert_eq!(format_time(90), "01:30");
        assert_eq!(format_time(600), "10:00");
        assert_eq!(format_time(3661), "61:01");
    }

    #[test]
    fn formats_clock_with_hundredths() {
        assert_eq!(format_time_millis(0.0), "00:00.00");
        assert_eq!(format_time_millis(1.5), "00:01.50");
        assert_eq!(format_time_millis(30.25), "00:30.25");
        assert_eq!(format_time_millis(60.5), "01:00.50");
        assert_eq!(format_time_millis(1.05), "00:01.05");

        let result = format_time_millis(90.33);
        assert!(result == "01:30.32" || result == "01:30.33", "got {result}");
    }

    #[test]
    fn canonical_round_trip() {
        assert_eq!(format_time(u64::from(parse_time_duration("1:30"))), "01:30");
        assert_eq!(format_time(u64::from(parse_time_duration("2min"))), "02:00");
        assert_eq!(format_time(u64::from(parse_time_duration("45s"))), "00:45");
    }
}
