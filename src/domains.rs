//! Domain -> agency mapping collection.
//!
//! Every inventory domain is upserted into the `domains` collection with its
//! owning agency, then documents left over from earlier refreshes are removed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::agency::{AgencyRef, AgencyRoster, NormalizedInventory};
use crate::store::{DocumentStore, StoreError};

pub const DOMAINS_COLLECTION: &str = "domains";

/// One document of the `domains` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainRecord {
    #[serde(rename = "_id")]
    pub domain: String,
    pub agency: AgencyRef,
    /// The agency appears in the roster.
    pub stakeholder: bool,
    pub scan_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainRefreshSummary {
    pub upserted: usize,
    pub stakeholders: usize,
    pub deleted: usize,
}

/// Rebuild the `domains` collection from the normalized inventory.
///
/// Unlike scan snapshots, `now` is stored as-is rather than truncated: it only
/// identifies which documents belong to this refresh.
pub fn refresh_domain_mapping<S>(
    store: &mut S,
    inventory: &NormalizedInventory,
    roster: &AgencyRoster,
    now: DateTime<Utc>,
) -> Result<DomainRefreshSummary, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let mut summary = DomainRefreshSummary::default();
    let mut stamp: Option<String> = None;

    for binding in &inventory.bindings {
        let stakeholder = roster.contains(&binding.agency_name);
        let record = DomainRecord {
            domain: binding.domain.clone(),
            agency: roster.agency_ref(&binding.agency_name),
            stakeholder,
            scan_date: now,
        };
        let document = serde_json::to_value(&record)?;
        if stamp.is_none() {
            stamp = document
                .get("scan_date")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }

        store.upsert_by_id(DOMAINS_COLLECTION, &document)?;
        summary.upserted += 1;
        if stakeholder {
            summary.stakeholders += 1;
        } else {
            debug!("Agency '{}' of {} is not in the roster", binding.agency_name, binding.domain);
        }
    }

    let keep = match stamp {
        Some(stamp) => stamp,
        None => serde_json::to_value(now)?
            .as_str()
            .map(str::to_string)
            .unwrap_or_default(),
    };
    summary.deleted = store.delete_stale(DOMAINS_COLLECTION, &keep)?;

    info!(
        "Deleted {} old domain records from {}",
        summary.deleted,
        store.describe()
    );
    Ok(summary)
}
