//! Mbox envelope separator (`From `) line scanning.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::Result;
use crate::model::entity::Envelope;
use crate::parser::header::decode_bytes;
use crate::parser::lines::LineReader;
use crate::stream::Stream;

/// Peek the next line; if it is an mbox separator, consume it and return
/// its metadata. Otherwise leave the reader untouched.
///
/// Idempotent: a non-matching call changes nothing, so calling again is a
/// no-op.
pub(crate) fn scan<S: Stream>(reader: &mut LineReader<S>) -> Result<Option<Envelope>> {
    let (offset, raw) = match reader.peek_line()? {
        Some(line) if is_separator(line.content()) => {
            (line.offset(), decode_bytes(line.content()))
        }
        _ => return Ok(None),
    };
    reader.next_line()?;

    let rest = raw.trim_start_matches('\u{feff}');
    let rest = &rest["From ".len()..];
    let mut fields = rest.splitn(2, char::is_whitespace);
    let sender = fields.next().unwrap_or("").to_string();
    let date = fields.next().and_then(parse_separator_date);

    Ok(Some(Envelope {
        offset,
        sender,
        raw,
        date,
    }))
}

/// Check whether a line is an mbox separator (`From ` at the start).
pub(crate) fn is_separator(line: &[u8]) -> bool {
    // Skip BOM if present at very start
    let line = if line.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &line[3..]
    } else {
        line
    };
    line.starts_with(b"From ")
}

/// Check whether a line has the full separator shape: marker, sender
/// token, and a timestamp that parses.
///
/// Body scanning must use this rather than [`is_separator`]: an ordinary
/// body line such as `From my perspective ...` starts with the marker but
/// carries no timestamp, and must not split the message.
pub(crate) fn is_message_separator(line: &[u8]) -> bool {
    if !is_separator(line) {
        return false;
    }
    let text = decode_bytes(line);
    let rest = text.trim_start_matches('\u{feff}');
    let rest = &rest["From ".len()..];
    let mut fields = rest.splitn(2, char::is_whitespace);
    let sender = fields.next().unwrap_or("");
    !sender.is_empty() && fields.next().and_then(parse_separator_date).is_some()
}

/// Best-effort parse of the separator's timestamp field.
///
/// Mbox writers emit asctime (`Thu Jan  1 00:00:00 2024`) or occasionally
/// RFC 2822 shapes; anything else yields `None` without complaint.
fn parse_separator_date(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let no_dow = strip_day_of_week(trimmed);
    let formats = [
        "%b %e %H:%M:%S %Y",
        "%b %d %H:%M:%S %Y",
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
    ];
    for fmt in &formats {
        if let Ok(dt) = DateTime::parse_from_str(&no_dow, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&no_dow, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    None
}

/// Strip leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    let days = [
        "Mon,", "Tue,", "Wed,", "Thu,", "Fri,", "Sat,", "Sun,", "Mon ", "Tue ", "Wed ", "Thu ",
        "Fri ", "Sat ", "Sun ",
    ];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim().to_string();
        }
    }
    s.to_string()
}
