//! Address canonicalization.
//!
//! A canonical address is the identity key for deduplication: the same
//! mailbox written as `A.Lice@GMAIL.COM`, `alice@gmail.com/TalkGadget9A` or
//! `alice@gmail.com` must collapse to one key.

/// Sentinel domain appended to inputs that carry no `@` (chat peers and
/// malformed headers show up this way).
pub const FALLBACK_DOMAIN: &str = "domain-not-found.tld";

/// Canonicalize a raw header address into a lowercase `local@domain` key.
///
/// - The string is split on the first `@`. Without one, the sentinel
///   [`FALLBACK_DOMAIN`] is appended instead of rejecting the input.
/// - The domain is truncated at the first `/` (messaging-protocol resource
///   qualifiers like `/TalkGadget...`).
/// - Local part and domain are case-folded.
/// - For domains in `dot_insensitive_providers`, literal `.` characters are
///   removed from the local part.
///
/// Pure and deterministic, never fails, and idempotent:
/// `canonicalize(canonicalize(x)) == canonicalize(x)`.
pub fn canonicalize(raw: &str, dot_insensitive_providers: &[String]) -> String {
    let lowered = raw.trim().to_lowercase();

    match lowered.split_once('@') {
        None => format!("{lowered}@{FALLBACK_DOMAIN}"),
        Some((local, domain)) => {
            let domain = domain.split('/').next().unwrap_or(domain);
            if dot_insensitive_providers.iter().any(|p| p == domain) {
                format!("{}@{domain}", local.replace('.', ""))
            } else {
                format!("{local}@{domain}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn providers() -> Vec<String> {
        vec!["gmail.com".to_string()]
    }

    #[test]
    fn test_strips_resource_part() {
        assert_eq!(
            canonicalize("a@b.com/resource123", &providers()),
            "a@b.com"
        );
        assert_eq!(
            canonicalize("alice@gmail.com/TalkGadget9A8B", &providers()),
            "alice@gmail.com"
        );
    }

    #[test]
    fn test_case_folds_local_and_domain() {
        assert_eq!(
            canonicalize("A.Lice@GMAIL.COM", &providers()),
            "alice@gmail.com"
        );
        assert_eq!(
            canonicalize("Bob@Example.COM", &providers()),
            "bob@example.com"
        );
    }

    #[test]
    fn test_dot_folding_only_for_configured_providers() {
        assert_eq!(canonicalize("a.b@gmail.com", &providers()), "ab@gmail.com");
        assert_eq!(
            canonicalize("a.b@example.com", &providers()),
            "a.b@example.com"
        );
        // No providers configured: dots survive everywhere
        assert_eq!(canonicalize("a.b@gmail.com", &[]), "a.b@gmail.com");
    }

    #[test]
    fn test_missing_at_gets_sentinel_domain() {
        let canon = canonicalize("not-an-address", &providers());
        assert!(!canon.is_empty());
        assert!(canon.ends_with("@domain-not-found.tld"));
        assert_eq!(canon, "not-an-address@domain-not-found.tld");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "A.Lice@GMAIL.COM/TalkGadget",
            "not-an-address",
            "Bob@Example.COM",
            "weird@@double.at",
            "",
            "  spaced@out.org  ",
        ];
        for input in inputs {
            let once = canonicalize(input, &providers());
            let twice = canonicalize(&once, &providers());
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_splits_on_first_at() {
        assert_eq!(
            canonicalize("weird@@double.at", &providers()),
            "weird@@double.at"
        );
    }
}
