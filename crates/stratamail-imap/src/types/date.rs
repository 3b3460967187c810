//! Envelope date parsing.
//!
//! Envelope dates are RFC 2822 in theory and anything in practice. Besides
//! the standard form this accepts a trailing `(zone comment)`, the IMAP
//! internal-date layout, and common zone abbreviations such as `CEST` or
//! `JST` in place of a numeric offset.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};

/// Fallback layouts tried after RFC 2822.
const FORMATS: &[&str] = &[
    "%d-%b-%Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M %z",
];

/// Zone abbreviations seen in the wild, mapped to numeric offsets.
static ZONE_OFFSETS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("UT", "+0000"),
        ("UTC", "+0000"),
        ("GMT", "+0000"),
        ("Z", "+0000"),
        ("WET", "+0000"),
        ("WEST", "+0100"),
        ("BST", "+0100"),
        ("CET", "+0100"),
        ("MET", "+0100"),
        ("WAT", "+0100"),
        ("CEST", "+0200"),
        ("MEST", "+0200"),
        ("EET", "+0200"),
        ("SAST", "+0200"),
        ("CAT", "+0200"),
        ("EEST", "+0300"),
        ("MSK", "+0300"),
        ("EAT", "+0300"),
        ("IST", "+0530"),
        ("ICT", "+0700"),
        ("WIB", "+0700"),
        ("HKT", "+0800"),
        ("SGT", "+0800"),
        ("PHT", "+0800"),
        ("AWST", "+0800"),
        ("JST", "+0900"),
        ("KST", "+0900"),
        ("ACST", "+0930"),
        ("AEST", "+1000"),
        ("AEDT", "+1100"),
        ("NZST", "+1200"),
        ("NZDT", "+1300"),
        ("NST", "-0330"),
        ("NDT", "-0230"),
        ("AST", "-0400"),
        ("ADT", "-0300"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("AKST", "-0900"),
        ("AKDT", "-0800"),
        ("HST", "-1000"),
    ])
});

/// Parses an envelope date into UTC.
///
/// Returns `None` when no known layout matches.
#[must_use]
pub fn parse_envelope_date(text: &str) -> Option<DateTime<Utc>> {
    let normalized = strip_comment(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if normalized.is_empty() {
        return None;
    }

    let parsed = parse_known_layouts(&normalized).or_else(|| {
        let (head, zone) = normalized.rsplit_once(' ')?;
        let offset = ZONE_OFFSETS.get(zone.to_ascii_uppercase().as_str())?;
        parse_known_layouts(&format!("{head} {offset}"))
    });

    if parsed.is_none() {
        tracing::warn!(date = text, "unparsable envelope date");
    }
    parsed
}

fn parse_known_layouts(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text)
        .ok()
        .or_else(|| {
            FORMATS
                .iter()
                .find_map(|layout| DateTime::parse_from_str(text, layout).ok())
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Removes a trailing parenthesized comment such as `(PDT)`.
fn strip_comment(text: &str) -> &str {
    let text = text.trim();
    match text.rfind('(') {
        Some(open) if text.ends_with(')') => text[..open].trim_end(),
        _ => text,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_rfc2822() {
        assert_eq!(
            parse_envelope_date("Fri, 9 Sep 2011 15:38:52 -0700"),
            Some(utc(2011, 9, 9, 22, 38, 52))
        );
    }

    #[test]
    fn test_trailing_comment() {
        assert_eq!(
            parse_envelope_date("Tue, 1 Jul 2003 10:52:37 +0200 (CEST)"),
            Some(utc(2003, 7, 1, 8, 52, 37))
        );
    }

    #[test]
    fn test_zone_abbreviation() {
        assert_eq!(
            parse_envelope_date("Mon, 3 Jan 2022 08:00:00 CEST"),
            Some(utc(2022, 1, 3, 6, 0, 0))
        );
        assert_eq!(
            parse_envelope_date("Wed, 2 Feb 2022 10:00:00 PST"),
            Some(utc(2022, 2, 2, 18, 0, 0))
        );
        assert_eq!(
            parse_envelope_date("2 Feb 2022 10:00:00 jst"),
            Some(utc(2022, 2, 2, 1, 0, 0))
        );
    }

    #[test]
    fn test_internal_date_layout() {
        assert_eq!(
            parse_envelope_date("17-Jul-1996 02:44:25 -0700"),
            Some(utc(1996, 7, 17, 9, 44, 25))
        );
    }

    #[test]
    fn test_extra_whitespace() {
        assert_eq!(
            parse_envelope_date("  Fri,  9 Sep 2011   15:38:52 -0700 "),
            Some(utc(2011, 9, 9, 22, 38, 52))
        );
    }

    #[test]
    fn test_unparsable() {
        assert_eq!(parse_envelope_date(""), None);
        assert_eq!(parse_envelope_date("yesterday"), None);
        assert_eq!(parse_envelope_date("Fri, 9 Sep 2011 15:38:52 XYZT"), None);
    }
}
