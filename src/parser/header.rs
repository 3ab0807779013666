//! RFC 5322 header handling: unfolding, RFC 2047 text decoding, and
//! RFC 2822 date parsing.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// The envelope `From ` line carries its date in the trailing characters;
/// Google Takeout archives put it in the last 30. This heuristic is
/// archive-format-specific and deliberately not generalized.
pub const ENVELOPE_DATE_SUFFIX_LEN: usize = 30;

/// Unfolded message headers with original-case names.
///
/// Lookups are case-insensitive and return the first matching header, so
/// archives that spell a header `From`, `from`, or `FROM` all behave the
/// same. Iteration yields every header in archive order with its original
/// casing, which is what the verbatim `headers` table stores.
#[derive(Debug, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    /// Parse a raw header block.
    ///
    /// Bytes are decoded as UTF-8 with a Windows-1252 fallback (which
    /// accepts every byte, so decoding never fails). Continuation lines
    /// (starting with space or tab) are joined to the preceding header.
    /// Lines without a colon that are not continuations are skipped.
    pub fn parse(raw: &[u8]) -> Self {
        let text = decode_header_bytes(raw);
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(last) = entries.last_mut() {
                    last.1.push(' ');
                    last.1.push_str(line.trim());
                }
            } else if let Some(colon) = line.find(':') {
                let name = line[..colon].trim().to_string();
                let value = line[colon + 1..].trim().to_string();
                entries.push((name, value));
            }
        }

        Self { entries }
    }

    /// First value for a header name, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Like [`HeaderMap::get`] but substitutes an empty string when absent.
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    /// Every header in archive order, original casing preserved.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every
/// byte). A UTF-8 BOM is stripped.
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Decode RFC 2047 encoded-words in a header value and normalize whitespace.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`.
///
/// Decoding is delegated to `mail-parser` by wrapping the value in a
/// minimal message; embedded sequences it cannot convert are left as-is
/// rather than failing the caller. Runs of whitespace collapse to one
/// space.
pub fn decode_text(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if trimmed.contains("=?") {
        let fake_msg = format!("Subject: {trimmed}\n\n");
        let parser = mail_parser::MessageParser::default();
        if let Some(parsed) = parser.parse(fake_msg.as_bytes()) {
            if let Some(subject) = parsed.subject() {
                return normalize_whitespace(subject);
            }
        }
    }

    normalize_whitespace(trimmed)
}

/// Collapse runs of whitespace (including stray CR/LF) to single spaces.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The trailing slice of an envelope `From ` line used as a date fallback.
///
/// Returns the last [`ENVELOPE_DATE_SUFFIX_LEN`] characters of the trimmed
/// line (the whole line when shorter).
pub fn envelope_date(envelope_line: &str) -> &str {
    let trimmed = envelope_line.trim();
    let chars = trimmed.chars().count();
    if chars <= ENVELOPE_DATE_SUFFIX_LEN {
        return trimmed;
    }
    let (idx, _) = trimmed
        .char_indices()
        .nth(chars - ENVELOPE_DATE_SUFFIX_LEN)
        .unwrap_or((0, ' '));
    &trimmed[idx..]
}

/// Parse an RFC-2822-style date string with timezone and convert to UTC.
///
/// Accepts the common variants found in real archives: standard RFC 2822,
/// ISO 8601 / RFC 3339, asctime-with-timezone (as used on envelope `From `
/// lines), named-timezone suffixes, and missing day-of-week prefixes.
/// Returns `None` rather than failing on garbage.
pub fn parse_date_utc(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let no_dow = strip_day_of_week(trimmed);

    // Offset-bearing formats first, then naive formats assumed UTC.
    // "%b %d %H:%M:%S %z %Y" is the envelope-line (asctime + zone) shape.
    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%b %d %H:%M:%S %z %Y",
        "%Y-%m-%d %H:%M:%S %z",
    ];
    let naive_formats = [
        "%d %b %Y %H:%M:%S",
        "%b %d %H:%M:%S %Y",
        "%Y-%m-%d %H:%M:%S",
    ];

    for candidate in [no_dow.as_str(), &replace_named_tz(&no_dow)] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }
    }
    for fmt in &naive_formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&no_dow, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    // Last resort: mail-parser's own date parser.
    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    warn!(date = trimmed, "Could not parse date");
    None
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    use mail_parser::MessageParser;

    let fake_msg = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let rfc3339 = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&rfc3339)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Strip a leading day-of-week prefix (e.g. "Thu, " or "Thu ").
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

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    let tzs = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CET", "+0100"),
        ("CEST", "+0200"),
        ("JST", "+0900"),
    ];
    let mut result = s.to_string();
    for (name, offset) in &tzs {
        if result.ends_with(name) {
            let pos = result.len() - name.len();
            result.replace_range(pos.., offset);
            return result;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_unfold() {
        let raw = b"Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = HeaderMap::parse(raw);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("subject"), Some("This is a long subject line"));
        assert_eq!(headers.get("From"), Some("user@example.com"));
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let headers = HeaderMap::parse(b"FROM: a@b.com\nTo: c@d.com\n");
        assert_eq!(headers.get("from"), Some("a@b.com"));
        assert_eq!(headers.get("TO"), Some("c@d.com"));
        assert_eq!(headers.get_or_empty("cc"), "");
    }

    #[test]
    fn test_iter_preserves_original_case_and_order() {
        let headers = HeaderMap::parse(b"X-GM-THRID: 123\nFROM: a@b.com\n");
        let collected: Vec<(&str, &str)> = headers.iter().collect();
        assert_eq!(collected[0], ("X-GM-THRID", "123"));
        assert_eq!(collected[1], ("FROM", "a@b.com"));
    }

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_text("=?UTF-8?B?SG9sYSBtdW5kbw==?="), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_text("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        assert_eq!(decode_text("Re: =?UTF-8?B?SG9sYQ==?= there"), "Re: Hola there");
    }

    #[test]
    fn test_decode_plain_text_passthrough() {
        assert_eq!(decode_text("  Nothing   encoded here "), "Nothing encoded here");
    }

    #[test]
    fn test_decode_garbage_does_not_fail() {
        let out = decode_text("=?bogus-charset?X?????=");
        assert!(!out.is_empty());
    }

    #[test]
    fn test_envelope_date_suffix() {
        let line = "From 1234567890@talk.google.com Mon Jul 18 22:11:00 +0000 2011";
        assert_eq!(envelope_date(line), "Mon Jul 18 22:11:00 +0000 2011");

        // Shorter than the suffix length: whole line
        assert_eq!(envelope_date("short"), "short");
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date_utc("Thu, 04 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-04 10:00:00");
    }

    #[test]
    fn test_parse_date_applies_tz_offset() {
        let dt = parse_date_utc("Thu, 04 Jan 2024 10:00:00 -0500").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "15:00:00");
    }

    #[test]
    fn test_parse_date_envelope_style() {
        // asctime-with-zone, as found on Takeout chat envelope lines
        let dt = parse_date_utc("Mon Jul 18 22:11:00 +0000 2011").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2011-07-18");
    }

    #[test]
    fn test_parse_date_named_tz() {
        assert!(parse_date_utc("Thu, 04 Jan 2024 10:00:00 EST").is_some());
    }

    #[test]
    fn test_parse_date_iso8601() {
        assert!(parse_date_utc("2024-01-04T10:00:00Z").is_some());
    }

    #[test]
    fn test_parse_date_garbage_is_none() {
        assert!(parse_date_utc("not a date at all").is_none());
        assert!(parse_date_utc("").is_none());
    }
}
