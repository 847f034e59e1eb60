//! Agency Name Normalization
//!
//! Turns the federal domain inventory and the agency roster into the lookup
//! tables the rest of the loader joins against:
//! - Canonical agency names: `&` -> `and`, `/` -> space, `U. S.` -> `U.S.`,
//!   commas removed (single pass, in that order)
//! - Domain -> agency bindings, lower-cased domain, input order preserved
//! - The distinct set of canonical agency names seen in the inventory
//! - The roster mapping canonical agency name -> agency identifier

use std::collections::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rewrites applied to every raw agency name, in this order.
const AGENCY_NAME_REWRITES: &[(&str, &str)] = &[
    ("&", "and"),
    ("/", " "),
    ("U. S.", "U.S."),
    (",", ""),
];

/// Canonicalize an agency name as it appears in the domain inventory.
///
/// This is a single pass over the rewrite table, not a fixpoint: text produced
/// by an earlier rewrite is only seen by the rewrites that follow it.
pub fn canonicalize_agency_name(raw: &str) -> String {
    AGENCY_NAME_REWRITES
        .iter()
        .fold(raw.to_string(), |name, (from, to)| name.replace(from, to))
}

/// The owning agency of a domain as stored on every scan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgencyRef {
    pub id: String,
    pub name: String,
}

impl AgencyRef {
    /// True when the domain could not be attributed to any agency.
    pub fn is_unresolved(&self) -> bool {
        self.name.is_empty()
    }
}

/// One row of the cleaned inventory: a lower-cased domain and its canonical agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainAgencyBinding {
    pub domain: String,
    pub agency_name: String,
}

/// Authoritative agency name -> identifier mapping.
///
/// Identifiers are opaque strings. Names are matched exactly as they appear
/// in the roster file, which is maintained in canonical form.
#[derive(Debug, Clone, Default)]
pub struct AgencyRoster {
    ids: HashMap<String, String>,
}

impl AgencyRoster {
    /// Build a roster from (name, identifier) pairs. A repeated name keeps the
    /// last identifier seen.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut ids = HashMap::new();
        for (name, id) in pairs {
            if let Some(previous) = ids.insert(name.clone(), id) {
                debug!("Roster entry '{}' repeated; replacing identifier '{}'", name, previous);
            }
        }
        Self { ids }
    }

    pub fn identifier_for(&self, agency_name: &str) -> Option<&str> {
        self.ids.get(agency_name).map(String::as_str)
    }

    pub fn contains(&self, agency_name: &str) -> bool {
        self.ids.contains_key(agency_name)
    }

    /// Attach an identifier to a resolved agency name. Names missing from the
    /// roster (including the empty name) become their own identifier.
    pub fn agency_ref(&self, agency_name: &str) -> AgencyRef {
        let id = self.identifier_for(agency_name).unwrap_or(agency_name);
        AgencyRef {
            id: id.to_string(),
            name: agency_name.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Result of normalizing the domain inventory.
#[derive(Debug, Clone, Default)]
pub struct NormalizedInventory {
    /// One binding per input row, in input order. Duplicate domains are kept.
    pub bindings: Vec<DomainAgencyBinding>,
    /// Every distinct canonical agency name seen. No defined order.
    pub unique_agencies: HashSet<String>,
}

impl NormalizedInventory {
    /// Unique agency names in sorted order, for reproducible exports.
    pub fn sorted_agencies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.unique_agencies.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Normalize (domain, raw agency name) inventory rows.
pub fn normalize_inventory<I>(rows: I) -> NormalizedInventory
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut inventory = NormalizedInventory::default();

    for (domain, raw_agency) in rows {
        let agency_name = canonicalize_agency_name(&raw_agency);
        inventory.unique_agencies.insert(agency_name.clone());
        inventory.bindings.push(DomainAgencyBinding {
            domain: domain.to_lowercase(),
            agency_name,
        });
    }

    debug!(
        "Normalized {} inventory rows into {} distinct agencies",
        inventory.bindings.len(),
        inventory.unique_agencies.len()
    );
    inventory
}
