//! Email address parsing (RFC 5322 §3.4).

/// A raw (display name, address) pair as it appears in a header.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub name: String,
    /// The bare address (`user@domain`, or whatever the header carried).
    pub address: String,
}

impl EmailAddress {
    /// Parse a single address from a header value.
    ///
    /// Supported forms: `user@domain`, `<user@domain>`, `Name <user@domain>`,
    /// `"Quoted, Name" <user@domain>`. An unrecognized string is stored as-is
    /// in `address` — parsing never fails.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        // "Name <address>" or "<address>"
        if let Some(open) = trimmed.rfind('<') {
            if let Some(close) = trimmed.rfind('>') {
                if close > open {
                    return Self {
                        name: strip_quotes(&trimmed[..open]),
                        address: trimmed[open + 1..close].trim().to_string(),
                    };
                }
            }
        }

        // Bare address or fallback: everything is the address
        Self {
            name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// Parse a comma-separated address list, respecting quoted commas
    /// (`"Last, First" <a@b.com>, other@c.com`) and commas inside angle
    /// brackets. Empty segments are skipped.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut segment = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;

        for ch in raw.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    segment.push(ch);
                }
                '<' if !in_quotes => {
                    in_angle = true;
                    segment.push(ch);
                }
                '>' if !in_quotes => {
                    in_angle = false;
                    segment.push(ch);
                }
                ',' if !in_quotes && !in_angle => {
                    push_nonempty(&mut results, &segment);
                    segment.clear();
                }
                _ => segment.push(ch),
            }
        }
        push_nonempty(&mut results, &segment);

        results
    }

    /// Format for display: `"Name <address>"`, or just `"address"` when the
    /// name is empty.
    pub fn display(&self) -> String {
        if self.name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.name, self.address)
        }
    }
}

fn push_nonempty(results: &mut Vec<EmailAddress>, segment: &str) {
    let parsed = EmailAddress::parse(segment);
    if !parsed.address.is_empty() {
        results.push(parsed);
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map(|inner| inner.trim().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("user@example.com");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.name, "");
    }

    #[test]
    fn test_parse_angle_address() {
        let addr = EmailAddress::parse("<user@example.com>");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("User One <user1@example.com>");
        assert_eq!(addr.address, "user1@example.com");
        assert_eq!(addr.name, "User One");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Last, First\" <user@example.com>");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.name, "Last, First");
    }

    #[test]
    fn test_parse_chat_resource_address() {
        // Google Talk peers carry a resource part after the domain.
        let addr = EmailAddress::parse("Bob <bob@gmail.com/TalkGadget123ABC>");
        assert_eq!(addr.address, "bob@gmail.com/TalkGadget123ABC");
        assert_eq!(addr.name, "Bob");
    }

    #[test]
    fn test_parse_list() {
        let list =
            EmailAddress::parse_list("User One <a@b.com>, User Two <c@d.com>, plain@addr.com");
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].address, "a@b.com");
        assert_eq!(list[1].name, "User Two");
        assert_eq!(list[2].address, "plain@addr.com");
    }

    #[test]
    fn test_parse_list_with_quoted_comma() {
        let list = EmailAddress::parse_list("\"Last, First\" <a@b.com>, other@c.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "Last, First");
        assert_eq!(list[0].address, "a@b.com");
    }

    #[test]
    fn test_parse_list_skips_empty_segments() {
        let list = EmailAddress::parse_list("a@b.com,, ,c@d.com");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_display() {
        let addr = EmailAddress {
            name: "Alice".to_string(),
            address: "alice@example.com".to_string(),
        };
        assert_eq!(addr.display(), "Alice <alice@example.com>");

        let bare = EmailAddress {
            name: String::new(),
            address: "alice@example.com".to_string(),
        };
        assert_eq!(bare.display(), "alice@example.com");
    }

    #[test]
    fn test_parse_empty() {
        let addr = EmailAddress::parse("");
        assert_eq!(addr.address, "");
    }
}
