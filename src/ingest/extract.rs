//! Per-message record extraction.
//!
//! Turns one raw archive message into the rows the store accepts. No field
//! may fail the whole extraction: absent headers become empty strings,
//! undecodable text is decoded lossily, and unparseable dates degrade to
//! the empty string. The one hard contract is message_key uniqueness,
//! which the streaming reader guarantees by construction.

use crate::identity::IdentityRegistry;
use crate::model::address::EmailAddress;
use crate::model::record::{HeaderRecord, MessageRecord, RecipientOrigin, RecipientRecord};
use crate::parser::header::{decode_text, envelope_date, parse_date_utc, HeaderMap};

/// Stored timestamp format: ISO-8601 UTC with a space separator, which
/// SQLite's strftime() accepts directly.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything extracted from one message.
#[derive(Debug)]
pub struct Extracted {
    pub message: MessageRecord,
    pub recipients: Vec<RecipientRecord>,
    pub headers: Vec<HeaderRecord>,
}

/// Extract the storage rows for a single message.
///
/// Participant addresses are resolved through the registry; the headers
/// table is filled verbatim and is exempt from identity substitution.
pub fn extract(
    message_key: u64,
    envelope: &str,
    headers: &HeaderMap,
    registry: &mut IdentityRegistry,
) -> Extracted {
    let from = resolve_summary(headers.get_or_empty("From"), registry);

    let (to, recipients) = resolve_recipients(
        message_key,
        headers.get_or_empty("To"),
        headers.get_or_empty("CC"),
        registry,
    );

    let message = MessageRecord {
        message_key,
        from,
        to,
        subject: decode_text(headers.get_or_empty("Subject")),
        date: extract_date(headers, envelope),
        thread_id: headers.get_or_empty("X-GM-THRID").to_string(),
        labels: decode_text(headers.get_or_empty("X-Gmail-Labels")),
    };

    let header_rows = headers
        .iter()
        .map(|(name, value)| HeaderRecord {
            message_key,
            header: name.to_string(),
            value: value.to_string(),
        })
        .collect();

    Extracted {
        message,
        recipients,
        headers: header_rows,
    }
}

/// Resolve every address in a header value and return the comma-joined
/// `Name <address>` summary over the unique entries.
fn resolve_summary(raw: &str, registry: &mut IdentityRegistry) -> String {
    let mut seen: Vec<EmailAddress> = Vec::new();
    let mut parts: Vec<String> = Vec::new();

    for parsed in EmailAddress::parse_list(&decode_text(raw)) {
        let (name, address) = registry.resolve(&parsed.address, &parsed.name);
        if !seen.contains(&parsed) {
            seen.push(parsed);
            parts.push(EmailAddress { name, address }.display());
        }
    }

    parts.join(", ")
}

/// Resolve the To and CC lists into recipient rows, deduplicated across
/// both headers by raw `(name, address)` pair, plus the To summary string.
///
/// Every raw entry still passes through the registry — duplicates only
/// skip the extra row, not resolution, so display names are observed even
/// when a reused address arrives with a different name (and then discarded
/// per first-write-wins).
fn resolve_recipients(
    message_key: u64,
    to_raw: &str,
    cc_raw: &str,
    registry: &mut IdentityRegistry,
) -> (String, Vec<RecipientRecord>) {
    let mut seen: Vec<EmailAddress> = Vec::new();
    let mut rows: Vec<RecipientRecord> = Vec::new();
    let mut to_parts: Vec<String> = Vec::new();

    let lists = [
        (to_raw, RecipientOrigin::To),
        (cc_raw, RecipientOrigin::Cc),
    ];

    for (raw, origin) in lists {
        for parsed in EmailAddress::parse_list(&decode_text(raw)) {
            let (name, address) = registry.resolve(&parsed.address, &parsed.name);
            if seen.contains(&parsed) {
                continue;
            }
            seen.push(parsed);
            if origin == RecipientOrigin::To {
                to_parts.push(
                    EmailAddress {
                        name: name.clone(),
                        address: address.clone(),
                    }
                    .display(),
                );
            }
            rows.push(RecipientRecord {
                message_key,
                name,
                address,
                origin,
            });
        }
    }

    (to_parts.join(", "), rows)
}

/// Extract the message date as an ISO-8601 UTC string, or empty.
///
/// The Date header is preferred; when absent or unparseable, the trailing
/// characters of the envelope `From ` line are tried as a heuristic
/// fallback. Downstream consumers treat empty as "unknown", never epoch.
fn extract_date(headers: &HeaderMap, envelope: &str) -> String {
    let from_header = headers.get("Date").and_then(parse_date_utc);

    from_header
        .or_else(|| parse_date_utc(envelope_date(envelope)))
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> IdentityRegistry {
        IdentityRegistry::new(false, vec!["gmail.com".to_string()])
    }

    fn headers(raw: &str) -> HeaderMap {
        HeaderMap::parse(raw.as_bytes())
    }

    const ENVELOPE: &str = "From alice@gmail.com Thu Jan 04 10:00:00 +0000 2024";

    #[test]
    fn test_extracts_basic_fields() {
        let h = headers(
            "From: Alice <alice@gmail.com>\n\
             To: Bob <bob@x.com>\n\
             Subject: Lunch?\n\
             Date: Thu, 04 Jan 2024 10:00:00 +0000\n\
             X-GM-THRID: 1234567\n\
             X-Gmail-Labels: Inbox,Important\n",
        );
        let mut reg = registry();
        let out = extract(0, ENVELOPE, &h, &mut reg);

        assert_eq!(out.message.message_key, 0);
        assert_eq!(out.message.from, "Alice <alice@gmail.com>");
        assert_eq!(out.message.to, "Bob <bob@x.com>");
        assert_eq!(out.message.subject, "Lunch?");
        assert_eq!(out.message.date, "2024-01-04 10:00:00");
        assert_eq!(out.message.thread_id, "1234567");
        assert_eq!(out.message.labels, "Inbox,Important");
    }

    #[test]
    fn test_headers_table_is_verbatim() {
        let h = headers("From: =?UTF-8?B?SG9sYQ==?= <a@b.com>\nX-GM-THRID: 9\n");
        let mut reg = registry();
        let out = extract(0, ENVELOPE, &h, &mut reg);

        assert_eq!(out.headers.len(), 2);
        // Transport encoding intact, no decode, no pseudonyms
        assert_eq!(out.headers[0].header, "From");
        assert_eq!(out.headers[0].value, "=?UTF-8?B?SG9sYQ==?= <a@b.com>");
    }

    #[test]
    fn test_recipients_dedup_across_to_and_cc() {
        let h = headers(
            "From: a@x.com\n\
             To: Bob <bob@x.com>, Carol <carol@y.com>\n\
             CC: Bob <bob@x.com>, dave@z.com\n",
        );
        let mut reg = registry();
        let out = extract(3, ENVELOPE, &h, &mut reg);

        // bob appears once (To wins), carol once, dave once
        assert_eq!(out.recipients.len(), 3);
        assert_eq!(out.recipients[0].address, "bob@x.com");
        assert_eq!(out.recipients[0].origin, RecipientOrigin::To);
        assert_eq!(out.recipients[2].address, "dave@z.com");
        assert_eq!(out.recipients[2].origin, RecipientOrigin::Cc);
        // CC entries do not leak into the To summary
        assert_eq!(out.message.to, "Bob <bob@x.com>, Carol <carol@y.com>");
    }

    #[test]
    fn test_duplicate_resolution_still_observes_names() {
        // Same address twice with different names: one row, but the first
        // name wins in the registry.
        let h = headers("From: a@x.com\nTo: Bob <bob@x.com>, Bobby <bob@x.com>\n");
        let mut reg = registry();
        let out = extract(0, ENVELOPE, &h, &mut reg);

        // Raw pairs differ, so both entries survive dedup; the registry
        // returns the first-seen name for both.
        assert_eq!(out.recipients.len(), 2);
        assert_eq!(out.recipients[0].name, "Bob");
        assert_eq!(out.recipients[1].name, "Bob");
    }

    #[test]
    fn test_date_falls_back_to_envelope_line() {
        let h = headers("From: a@x.com\nSubject: chat\n");
        let mut reg = registry();
        let out = extract(0, ENVELOPE, &h, &mut reg);
        assert_eq!(out.message.date, "2024-01-04 10:00:00");
    }

    #[test]
    fn test_unparseable_dates_yield_empty_string() {
        let h = headers("From: a@x.com\nDate: total garbage\n");
        let mut reg = registry();
        let out = extract(0, "From a@x.com no date here either", &h, &mut reg);
        assert_eq!(out.message.date, "");
    }

    #[test]
    fn test_missing_headers_become_empty_fields() {
        let h = headers("X-Something-Else: 1\n");
        let mut reg = registry();
        let out = extract(0, "", &h, &mut reg);
        assert_eq!(out.message.from, "");
        assert_eq!(out.message.to, "");
        assert_eq!(out.message.subject, "");
        assert_eq!(out.message.thread_id, "");
        assert_eq!(out.message.labels, "");
        assert!(out.recipients.is_empty());
    }

    #[test]
    fn test_encoded_subject_is_decoded() {
        let h = headers("From: a@x.com\nSubject: =?UTF-8?Q?Caf=C3=A9_con_le=C3=B1a?=\n");
        let mut reg = registry();
        let out = extract(0, ENVELOPE, &h, &mut reg);
        assert_eq!(out.message.subject, "Café con leña");
    }
}
