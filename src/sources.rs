//! CSV input readers for the agency roster, the domain inventory and scan
//! results files.
//!
//! Supports:
//! - Roster files: two positional columns (agency name, identifier), no header
//! - Inventory files: header row with at least "Domain Name" and "Agency"
//! - Scan results files: header row, every column kept as text

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::scan::RawRow;

/// One row of the domain inventory. Other columns are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InventoryRow {
    #[serde(rename = "Domain Name")]
    pub domain_name: String,
    #[serde(rename = "Agency")]
    pub agency: String,
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open input file: {}", path.display()))
}

/// Parse (agency name, identifier) pairs from roster content.
pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut pairs = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.context("Failed to parse roster record")?;
        match (record.get(0), record.get(1)) {
            (Some(name), Some(id)) => pairs.push((name.to_string(), id.to_string())),
            _ => bail!(
                "Roster record {} has {} column(s); expected agency name and identifier",
                index + 1,
                record.len()
            ),
        }
    }
    Ok(pairs)
}

pub fn read_roster(path: &Path) -> Result<Vec<(String, String)>> {
    let pairs = parse_roster(open(path)?)
        .with_context(|| format!("Failed to read agency roster: {}", path.display()))?;
    debug!("Read {} roster entries from {}", pairs.len(), path.display());
    Ok(pairs)
}

/// Parse (domain, raw agency name) pairs from inventory content, in file order.
pub fn parse_inventory<R: Read>(reader: R) -> Result<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in reader.deserialize::<InventoryRow>() {
        let row = result.context("Failed to parse inventory record")?;
        rows.push((row.domain_name, row.agency));
    }
    Ok(rows)
}

pub fn read_inventory(path: &Path) -> Result<Vec<(String, String)>> {
    let rows = parse_inventory(open(path)?)
        .with_context(|| format!("Failed to read domain inventory: {}", path.display()))?;
    debug!("Read {} inventory rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parse scan result rows keyed by header name.
pub fn parse_scan_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<RawRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to parse scan result record {}", index + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_scan_rows(path: &Path) -> Result<Vec<RawRow>> {
    let rows = parse_scan_rows(open(path)?)
        .with_context(|| format!("Failed to read scan results: {}", path.display()))?;
    debug!("Read {} scan rows from {}", rows.len(), path.display());
    Ok(rows)
}
