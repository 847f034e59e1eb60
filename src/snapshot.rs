//! Snapshot writer: rotate the `latest` flag and insert one typed document
//! per scan row.
//!
//! A run computes its scan date once and hands it to every record, so all
//! documents of one snapshot share the same `scan_date`.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::resolver::AgencyResolver;
use crate::scan::{RawRow, ScanError, ScanKind, BASE_DOMAIN, DOMAIN};
use crate::store::{DocumentStore, StoreError};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Scan date for a run started at `now`: midnight UTC of the same day.
pub fn scan_date(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// Counts reported after a snapshot has been written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub collection: String,
    pub scan_date: DateTime<Utc>,
    /// Documents from earlier runs whose `latest` flag was cleared.
    pub latest_cleared: usize,
    pub inserted: usize,
    /// Placeholder rows that produced no document.
    pub skipped: usize,
    /// Inserted documents whose base domain matched no inventory row.
    pub unresolved: usize,
}

/// Receives progress while rows are written.
pub trait SnapshotObserver {
    fn row_written(&self, _domain: &str) {}
}

impl SnapshotObserver for () {}

/// Write one snapshot of `kind` scan results.
///
/// The `latest` rotation happens first, then rows are sorted by `Domain` and
/// inserted in that order. Any row that fails to type aborts the run. Whether
/// documents inserted before the failure survive depends on the store: a
/// transactional store rolls the whole snapshot back, other stores keep them.
pub fn write_snapshot<S>(
    store: &mut S,
    kind: ScanKind,
    mut rows: Vec<RawRow>,
    resolver: &AgencyResolver,
    scan_date: DateTime<Utc>,
    observer: &dyn SnapshotObserver,
) -> Result<SnapshotSummary, SnapshotError>
where
    S: DocumentStore + ?Sized,
{
    let collection = kind.collection();
    let latest_cleared = store.begin_snapshot(collection)?;

    rows.sort_by(|a, b| a.text(DOMAIN).ok().cmp(&b.text(DOMAIN).ok()));

    let mut summary = SnapshotSummary {
        collection: collection.to_string(),
        scan_date,
        latest_cleared,
        inserted: 0,
        skipped: 0,
        unresolved: 0,
    };

    match insert_rows(store, kind, &rows, resolver, scan_date, observer, &mut summary) {
        Ok(()) => {
            store.finish_snapshot(collection)?;
            info!(
                "Snapshot of {} complete: {} inserted, {} skipped, {} unresolved",
                collection, summary.inserted, summary.skipped, summary.unresolved
            );
            Ok(summary)
        }
        Err(e) => {
            warn!(
                "Snapshot of {} failed after {} inserts: {}",
                collection, summary.inserted, e
            );
            if let Err(abort_err) = store.abort_snapshot(collection) {
                warn!("Failed to abort snapshot of {}: {}", collection, abort_err);
            }
            Err(e)
        }
    }
}

fn insert_rows<S>(
    store: &mut S,
    kind: ScanKind,
    rows: &[RawRow],
    resolver: &AgencyResolver,
    scan_date: DateTime<Utc>,
    observer: &dyn SnapshotObserver,
    summary: &mut SnapshotSummary,
) -> Result<(), SnapshotError>
where
    S: DocumentStore + ?Sized,
{
    let collection = kind.collection();

    for row in rows {
        let base_domain = row
            .text(BASE_DOMAIN)
            .map_err(|source| ScanError::field(row, source))?;
        let agency = resolver.resolve(base_domain);
        let unresolved = agency.is_unresolved();

        let Some(document) = kind.type_row(row, agency, scan_date)? else {
            debug!("Skipping placeholder {} row for {}", kind, row.label());
            summary.skipped += 1;
            continue;
        };

        store.insert_one(collection, &document)?;
        summary.inserted += 1;
        if unresolved {
            debug!("No agency found for base domain {}", base_domain);
            summary.unresolved += 1;
        }
        observer.row_written(row.label());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agency::{normalize_inventory, AgencyRoster};
    use crate::scan::tests::{https_row, scan_date as fixed_date, sslyze_row};
    use crate::store::{DocumentFilter, MemoryDocumentStore, SqliteDocumentStore, SqliteStoreOptions};
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn example_resolver() -> AgencyResolver {
        let inventory = normalize_inventory(vec![
            ("example.gov".to_string(), "Department of Example".to_string()),
            ("z.gov".to_string(), "Zed Commission".to_string()),
        ]);
        let roster = AgencyRoster::from_pairs(vec![(
            "Department of Example".to_string(),
            "DOE1".to_string(),
        )]);
        AgencyResolver::new(&inventory.bindings, roster)
    }

    #[derive(Default)]
    struct Recorder {
        domains: RefCell<Vec<String>>,
    }

    impl SnapshotObserver for Recorder {
        fn row_written(&self, domain: &str) {
            self.domains.borrow_mut().push(domain.to_string());
        }
    }

    #[test]
    fn test_scan_date_truncates_to_midnight_utc() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 17, 42, 9).unwrap();
        assert_eq!(scan_date(now), Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap());
        assert_eq!(scan_date(scan_date(now)), scan_date(now));
    }

    #[test]
    fn test_end_to_end_example_record() {
        let mut store = MemoryDocumentStore::new();
        let summary = write_snapshot(
            &mut store,
            ScanKind::Pshtt,
            vec![https_row("example.gov", "example.gov")],
            &example_resolver(),
            fixed_date(),
            &(),
        )
        .unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.unresolved, 0);

        let docs = store.find("https_scan", &DocumentFilter::latest()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["agency"]["id"], "DOE1");
        assert_eq!(docs[0]["agency"]["name"], "Department of Example");
        assert_eq!(docs[0]["live"], true);
        assert_eq!(docs[0]["hsts_max_age"], -1);
        assert_eq!(docs[0]["is_base_domain"], true);
        assert_eq!(docs[0]["latest"], true);
    }

    #[test]
    fn test_rows_inserted_in_domain_order() {
        let mut store = MemoryDocumentStore::new();
        let recorder = Recorder::default();
        write_snapshot(
            &mut store,
            ScanKind::Pshtt,
            vec![https_row("z.gov", "z.gov"), https_row("a.gov", "a.gov")],
            &example_resolver(),
            fixed_date(),
            &recorder,
        )
        .unwrap();

        assert_eq!(*recorder.domains.borrow(), vec!["a.gov", "z.gov"]);
        let docs = store.find("https_scan", &DocumentFilter::default()).unwrap();
        assert_eq!(docs[0]["domain"], "a.gov");
        assert_eq!(docs[1]["domain"], "z.gov");
    }

    #[test]
    fn test_unresolved_domains_get_empty_agency() {
        let mut store = MemoryDocumentStore::new();
        let summary = write_snapshot(
            &mut store,
            ScanKind::Pshtt,
            vec![https_row("nowhere.gov", "nowhere.gov")],
            &example_resolver(),
            fixed_date(),
            &(),
        )
        .unwrap();

        assert_eq!(summary.unresolved, 1);
        let docs = store.find("https_scan", &DocumentFilter::latest()).unwrap();
        assert_eq!(docs[0]["agency"]["id"], "");
        assert_eq!(docs[0]["agency"]["name"], "");
    }

    #[test]
    fn test_second_run_retires_first() {
        let mut store = MemoryDocumentStore::new();
        let resolver = example_resolver();
        let first = Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap();

        write_snapshot(
            &mut store,
            ScanKind::Pshtt,
            vec![https_row("a.gov", "a.gov"), https_row("b.gov", "b.gov")],
            &resolver,
            first,
            &(),
        )
        .unwrap();
        let summary = write_snapshot(
            &mut store,
            ScanKind::Pshtt,
            vec![https_row("a.gov", "a.gov")],
            &resolver,
            fixed_date(),
            &(),
        )
        .unwrap();

        assert_eq!(summary.latest_cleared, 2);
        let a = store
            .find("https_scan", &DocumentFilter::latest().for_domain("a.gov"))
            .unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0]["scan_date"], "2026-10-18T00:00:00Z");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_sslyze_placeholders_are_skipped() {
        let mut store = MemoryDocumentStore::new();
        let mut placeholder = sslyze_row("b.gov", "b.gov");
        placeholder.set("Scanned Port", "");

        let summary = write_snapshot(
            &mut store,
            ScanKind::Sslyze,
            vec![sslyze_row("a.gov", "a.gov"), placeholder],
            &example_resolver(),
            fixed_date(),
            &(),
        )
        .unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.collection, "sslyze_scan");
    }

    fn failing_rows() -> Vec<RawRow> {
        let mut bad = https_row("m.gov", "m.gov");
        bad.set("HSTS Max Age", "abc");
        vec![https_row("a.gov", "a.gov"), bad, https_row("z.gov", "z.gov")]
    }

    #[test]
    fn test_bad_integer_aborts_leaving_partial_snapshot() {
        let mut store = MemoryDocumentStore::new();
        let err = write_snapshot(
            &mut store,
            ScanKind::Pshtt,
            failing_rows(),
            &example_resolver(),
            fixed_date(),
            &(),
        )
        .unwrap_err();

        assert!(matches!(err, SnapshotError::Scan(_)));
        assert!(err.to_string().contains("m.gov"));
        // Rows sorted before the failing one were already written.
        let docs = store.find("https_scan", &DocumentFilter::latest()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["domain"], "a.gov");
    }

    #[test]
    fn test_bad_integer_rolls_back_atomic_snapshot() {
        let tmp = TempDir::new().unwrap();
        let options = SqliteStoreOptions {
            atomic_snapshot: true,
            ..SqliteStoreOptions::default()
        };
        let mut store = SqliteDocumentStore::open(&tmp.path().join("scan.db"), options).unwrap();
        let resolver = example_resolver();

        write_snapshot(
            &mut store,
            ScanKind::Pshtt,
            vec![https_row("a.gov", "a.gov")],
            &resolver,
            Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap(),
            &(),
        )
        .unwrap();

        assert!(write_snapshot(
            &mut store,
            ScanKind::Pshtt,
            failing_rows(),
            &resolver,
            fixed_date(),
            &(),
        )
        .is_err());

        // The previous snapshot is still current and nothing new was kept.
        let docs = store.find("https_scan", &DocumentFilter::latest()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["scan_date"], "2026-10-17T00:00:00Z");
        assert_eq!(store.count("https_scan").unwrap(), 1);
    }

    #[test]
    fn test_missing_base_domain_column_is_fatal() {
        let mut store = MemoryDocumentStore::new();
        let row = RawRow::from_pairs([("Domain", "a.gov")]);
        let err = write_snapshot(
            &mut store,
            ScanKind::Pshtt,
            vec![row],
            &example_resolver(),
            fixed_date(),
            &(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Base Domain"));
    }
}
