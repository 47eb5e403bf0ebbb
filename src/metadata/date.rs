//! Lenient date parsing for textual date tags.
//!
//! Time zones are always explicit: a zone written in the string wins, then
//! the caller-supplied zone, then UTC. Nothing depends on the process's
//! local time zone.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

/// Date-time layouts tried in priority order.
const DATE_TIME_PATTERNS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y:%m:%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse `text` as a date.
///
/// A fractional-seconds part written in the string (`12:34:56.789`)
/// takes precedence over `sub_second`, which holds only the digits after
/// the decimal point, as Exif SubSecTime tags do.
pub fn parse_date(
    text: &str,
    sub_second: Option<&str>,
    time_zone: Option<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    let mut text = text
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string();

    let mut sub_second = sub_second.map(str::to_string);
    if let Some((digits, stripped)) = split_sub_second(&text) {
        sub_second = Some(digits);
        text = stripped;
    }

    let mut zone = time_zone;
    if let Some((offset, stripped)) = split_time_zone(&text) {
        zone = Some(offset);
        text = stripped;
    }
    let zone = zone.unwrap_or_else(utc);

    let naive = parse_naive(text.trim())?;
    let date = zone.from_local_datetime(&naive).single()?;

    match sub_second.as_deref().and_then(sub_second_millis) {
        Some(millis) => date.checked_add_signed(Duration::milliseconds(millis)),
        None => Some(date),
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    for pattern in DATE_TIME_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(dt);
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    // yyyy-MM
    if let Some((year, month)) = text.split_once('-') {
        if year.len() == 4 && all_digits(year) && all_digits(month) && month.len() <= 2 {
            return NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)?
                .and_hms_opt(0, 0, 0);
        }
    }

    // yyyyMMdd
    if text.len() == 8 && all_digits(text) {
        return NaiveDate::from_ymd_opt(
            text[0..4].parse().ok()?,
            text[4..6].parse().ok()?,
            text[6..8].parse().ok()?,
        )?
        .and_hms_opt(0, 0, 0);
    }

    // yyyy
    if text.len() == 4 && all_digits(text) {
        return NaiveDate::from_ymd_opt(text.parse().ok()?, 1, 1)?.and_hms_opt(0, 0, 0);
    }

    None
}

/// Find `HH:MM:SS.fff` and split off the fractional digits.
fn split_sub_second(text: &str) -> Option<(String, String)> {
    let bytes = text.as_bytes();
    for dot in 8..bytes.len() {
        if bytes[dot] != b'.' || !is_clock(&bytes[dot - 8..dot]) {
            continue;
        }
        let end = bytes[dot + 1..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |p| dot + 1 + p);
        if end == dot + 1 {
            continue;
        }
        let digits = text[dot + 1..end].to_string();
        let stripped = format!("{}{}", &text[..dot], &text[end..]);
        return Some((digits, stripped));
    }
    None
}

fn is_clock(b: &[u8]) -> bool {
    b.len() == 8
        && b[2] == b':'
        && b[5] == b':'
        && [0, 1, 3, 4, 6, 7].iter().all(|&i| b[i].is_ascii_digit())
}

/// Split a trailing `Z`, `±HH:MM` or `±HHMM` zone designator.
fn split_time_zone(text: &str) -> Option<(FixedOffset, String)> {
    if let Some(stripped) = text.strip_suffix('Z') {
        return Some((utc(), stripped.to_string()));
    }

    let bytes = text.as_bytes();
    let digits = |s: &[u8]| s.iter().all(u8::is_ascii_digit);
    let (start, hours, minutes) = if bytes.len() >= 6
        && bytes[bytes.len() - 3] == b':'
        && digits(&bytes[bytes.len() - 5..bytes.len() - 3])
        && digits(&bytes[bytes.len() - 2..])
    {
        let s = bytes.len() - 6;
        (s, &text[s + 1..s + 3], &text[s + 4..s + 6])
    } else if bytes.len() >= 5 && digits(&bytes[bytes.len() - 4..]) {
        let s = bytes.len() - 5;
        (s, &text[s + 1..s + 3], &text[s + 3..s + 5])
    } else {
        return None;
    };

    let sign = match bytes[start] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some((offset, text[..start].to_string()))
}

fn sub_second_millis(digits: &str) -> Option<i64> {
    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // milliseconds are the first three digits, right-padded with zeros
    let millis = format!("{:0<3}", &digits[..digits.len().min(3)]);
    millis.parse().ok()
}
