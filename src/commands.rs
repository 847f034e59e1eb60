//! Command implementations shared by the binary and integration tests.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::Path;

use crate::agency::{normalize_inventory, AgencyRoster, NormalizedInventory};
use crate::config::AppConfig;
use crate::domains::{refresh_domain_mapping, DomainRefreshSummary};
use crate::export;
use crate::logger::RunLogger;
use crate::resolver::AgencyResolver;
use crate::scan::ScanKind;
use crate::snapshot::{scan_date, write_snapshot, SnapshotSummary};
use crate::sources;
use crate::store::{DocumentFilter, DocumentStore, SqliteDocumentStore};

/// Roster and normalized inventory for one run.
pub struct AgencyData {
    pub roster: AgencyRoster,
    pub inventory: NormalizedInventory,
}

pub fn load_agency_data(config: &AppConfig, logger: &RunLogger) -> Result<AgencyData> {
    let roster = AgencyRoster::from_pairs(sources::read_roster(&config.agencies_path())?);
    let inventory = normalize_inventory(sources::read_inventory(&config.current_federal_path())?);

    logger.log_inputs_loaded(roster.len(), inventory.bindings.len(), inventory.unique_agencies.len());
    Ok(AgencyData { roster, inventory })
}

/// Write the byproduct exports the config enables.
pub fn write_exports(config: &AppConfig, inventory: &NormalizedInventory, logger: &RunLogger) -> Result<()> {
    if config.exports.write_unique_agencies {
        let path = config.unique_agencies_path();
        export::export_unique_agencies(inventory, &path)?;
        logger.log_export_success(&path);
    }
    if config.exports.write_clean_inventory {
        let path = config.clean_inventory_path();
        export::export_clean_inventory(inventory, &path)?;
        logger.log_export_success(&path);
    }
    Ok(())
}

pub fn open_store(config: &AppConfig) -> Result<SqliteDocumentStore> {
    let path = config.database_path();
    SqliteDocumentStore::open(&path, config.store_options())
        .with_context(|| format!("Failed to open document store {}", path.display()))
}

/// Load one scanner's results as a new snapshot.
///
/// The results file is read before the store is touched, so a missing or
/// unreadable file leaves the current snapshot in place.
pub fn run_load(
    config: &AppConfig,
    logger: &RunLogger,
    kind: ScanKind,
    results: Option<&Path>,
    skip_exports: bool,
    now: DateTime<Utc>,
) -> Result<SnapshotSummary> {
    logger.log_run_start(&format!("{} load", kind));
    let date = scan_date(now);

    let agencies = load_agency_data(config, logger)?;
    if !skip_exports {
        write_exports(config, &agencies.inventory, logger)?;
    }
    let resolver = AgencyResolver::new(&agencies.inventory.bindings, agencies.roster);
    logger.log_duplicate_domains(resolver.duplicate_domains());

    let results_path = match results {
        Some(path) => path.to_path_buf(),
        None => config.results_path(kind),
    };
    let rows = sources::read_scan_rows(&results_path)?;
    logger.log_rows_read(&results_path, rows.len());

    let mut store = open_store(config)?;
    logger.log_import_start(&store.describe());

    logger.start_progress(rows.len() as u64);
    let outcome = write_snapshot(&mut store, kind, rows, &resolver, date, logger);
    logger.finish_progress();

    let summary = outcome.with_context(|| {
        format!("Failed to write {} snapshot to {}", kind, kind.collection())
    })?;
    logger.log_snapshot_complete(&summary);
    Ok(summary)
}

/// Rebuild the domain -> agency mapping collection.
pub fn run_domains(config: &AppConfig, logger: &RunLogger, now: DateTime<Utc>) -> Result<DomainRefreshSummary> {
    logger.log_run_start("domain mapping refresh");

    let agencies = load_agency_data(config, logger)?;
    let mut store = open_store(config)?;
    logger.log_import_start(&store.describe());

    let summary = refresh_domain_mapping(&mut store, &agencies.inventory, &agencies.roster, now)
        .context("Failed to refresh domain mapping")?;
    logger.log_domains_refreshed(&summary);
    Ok(summary)
}

/// Print latest documents of a scanner's collection; returns how many.
pub fn run_latest<W: Write>(config: &AppConfig, kind: ScanKind, domain: Option<&str>, out: W) -> Result<usize> {
    let store = open_store(config)?;
    let mut filter = DocumentFilter::latest();
    if let Some(domain) = domain {
        filter = filter.for_domain(domain);
    }

    let documents = store
        .find(kind.collection(), &filter)
        .with_context(|| format!("Failed to read {}", kind.collection()))?;
    export::write_json_lines(&documents, out)?;
    Ok(documents.len())
}
