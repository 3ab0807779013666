//! Per-import-run identity registry.
//!
//! Maps canonical addresses to resolved identities, allocating surrogates
//! lazily when pseudonymization is enabled. The registry is exclusively
//! owned by one pipeline instance for the lifetime of a run and discarded
//! at run end; the only durable output is [`IdentityRegistry::into_mappings`].

use std::collections::HashMap;

use crate::identity::canonical::canonicalize;
use crate::identity::names::SurrogateNames;
use crate::model::record::IdentityMapping;

/// A resolved identity held in the registry arena.
#[derive(Debug, Clone)]
struct Identity {
    /// Canonical address — the identity key.
    canonical: String,
    /// First display name observed for this address (first-write-wins).
    real_name: String,
    /// Name substituted into message records; equals `real_name` when
    /// pseudonymization is off.
    effective_name: String,
    /// Address substituted into message records; equals `canonical` when
    /// pseudonymization is off.
    effective_address: String,
}

/// Stateful identity map for a single import run.
///
/// `resolve` is an atomic get-or-create: the first occurrence of a canonical
/// address fixes its display name and (when pseudonymizing) allocates its
/// surrogate; every later occurrence returns the identical pair.
#[derive(Debug)]
pub struct IdentityRegistry {
    pseudonymize: bool,
    providers: Vec<String>,
    /// Canonical address → handle into `identities`.
    index: HashMap<String, usize>,
    identities: Vec<Identity>,
    /// Real domain → surrogate domain token, assigned in first-seen order.
    domain_tokens: HashMap<String, String>,
    names: SurrogateNames,
}

impl IdentityRegistry {
    pub fn new(pseudonymize: bool, dot_insensitive_providers: Vec<String>) -> Self {
        Self {
            pseudonymize,
            providers: dot_insensitive_providers,
            index: HashMap::new(),
            identities: Vec::new(),
            domain_tokens: HashMap::new(),
            names: SurrogateNames::new(),
        }
    }

    /// Resolve a raw header address to its effective `(name, address)` pair.
    ///
    /// Malformed addresses are sanitized by the canonicalizer and never
    /// fail; a missing display name is treated as the empty string.
    pub fn resolve(&mut self, raw_address: &str, display_name: &str) -> (String, String) {
        let canonical = canonicalize(raw_address, &self.providers);
        let handle = self.get_or_create(canonical, display_name);
        let identity = &self.identities[handle];
        (
            identity.effective_name.clone(),
            identity.effective_address.clone(),
        )
    }

    /// Number of distinct identities resolved so far.
    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Look up or insert the identity for `canonical`, returning its stable
    /// arena handle.
    fn get_or_create(&mut self, canonical: String, display_name: &str) -> usize {
        if let Some(&handle) = self.index.get(&canonical) {
            return handle;
        }

        let real_name = display_name.trim().to_string();
        let (effective_name, effective_address) = if self.pseudonymize {
            let surrogate_name = self.names.next_name();
            let local = SurrogateNames::local_part(&surrogate_name);
            let domain = self.surrogate_domain(&canonical);
            (surrogate_name, format!("{local}@{domain}"))
        } else {
            (real_name.clone(), canonical.clone())
        };

        let handle = self.identities.len();
        self.identities.push(Identity {
            canonical: canonical.clone(),
            real_name,
            effective_name,
            effective_address,
        });
        self.index.insert(canonical, handle);
        handle
    }

    /// Surrogate domain token for the real domain of `canonical`: one token
    /// per distinct real domain, `domain{N}.tld` in first-seen order, so
    /// domain-level grouping survives anonymization.
    fn surrogate_domain(&mut self, canonical: &str) -> String {
        let real_domain = canonical.rsplit_once('@').map(|(_, d)| d).unwrap_or("");
        if let Some(token) = self.domain_tokens.get(real_domain) {
            return token.clone();
        }
        let token = format!("domain{}.tld", self.domain_tokens.len() + 1);
        self.domain_tokens
            .insert(real_domain.to_string(), token.clone());
        token
    }

    /// Consume the registry and return one mapping per resolved identity,
    /// in first-seen order.
    ///
    /// Taking `self` by value enforces the end-of-run contract at compile
    /// time: no further `resolve` calls are possible once the mapping has
    /// been exported.
    pub fn into_mappings(self) -> Vec<IdentityMapping> {
        self.identities
            .into_iter()
            .map(|identity| IdentityMapping {
                real_address: identity.canonical,
                surrogate_address: identity.effective_address,
                real_name: identity.real_name,
                surrogate_name: identity.effective_name,
            })
            .collect()
    }
}
