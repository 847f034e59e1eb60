//! Join scan rows to their owning agency by base domain.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::agency::{AgencyRef, AgencyRoster, DomainAgencyBinding};

/// Resolves a scan row's base domain to an [`AgencyRef`].
///
/// Bindings are indexed once; when the inventory lists the same domain more
/// than once, the first binding in inventory order wins, exactly as an
/// in-order scan of the binding list would.
#[derive(Debug, Clone)]
pub struct AgencyResolver {
    by_domain: HashMap<String, String>,
    roster: AgencyRoster,
    duplicate_domains: usize,
}

impl AgencyResolver {
    pub fn new(bindings: &[DomainAgencyBinding], roster: AgencyRoster) -> Self {
        let mut by_domain: HashMap<String, String> = HashMap::with_capacity(bindings.len());
        let mut duplicate_domains = 0;

        for binding in bindings {
            match by_domain.get(&binding.domain) {
                Some(first) => {
                    duplicate_domains += 1;
                    if *first != binding.agency_name {
                        debug!(
                            "Domain {} listed again under '{}'; keeping first agency '{}'",
                            binding.domain, binding.agency_name, first
                        );
                    }
                }
                None => {
                    by_domain.insert(binding.domain.clone(), binding.agency_name.clone());
                }
            }
        }

        if duplicate_domains > 0 {
            warn!(
                "Domain inventory contains {} repeated domain rows; first listing wins",
                duplicate_domains
            );
        }

        Self {
            by_domain,
            roster,
            duplicate_domains,
        }
    }

    /// Canonical agency name for a base domain, or "" when no binding matches.
    pub fn agency_name(&self, base_domain: &str) -> &str {
        self.by_domain
            .get(&base_domain.to_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Agency name plus roster identifier for a base domain.
    pub fn resolve(&self, base_domain: &str) -> AgencyRef {
        self.roster.agency_ref(self.agency_name(base_domain))
    }

    pub fn roster(&self) -> &AgencyRoster {
        &self.roster
    }

    /// Number of inventory rows whose domain was already bound by an earlier row.
    pub fn duplicate_domains(&self) -> usize {
        self.duplicate_domains
    }
}
