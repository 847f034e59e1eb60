use crate::agency::{DomainAgencyBinding, NormalizedInventory};
use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

fn create(output_path: &Path) -> Result<File> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export directory: {}", parent.display()))?;
    }
    File::create(output_path)
        .with_context(|| format!("Failed to create export file: {}", output_path.display()))
}

/// Write one canonical agency name per line, sorted.
pub fn write_unique_agencies<W: Write>(inventory: &NormalizedInventory, out: W) -> Result<usize> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);
    let names = inventory.sorted_agencies();
    for name in &names {
        wtr.write_record([name])?;
    }
    wtr.flush()?;
    Ok(names.len())
}

/// Write the cleaned inventory as (domain, canonical agency) rows in input order.
pub fn write_clean_inventory<W: Write>(bindings: &[DomainAgencyBinding], out: W) -> Result<usize> {
    let mut wtr = Writer::from_writer(out);
    for binding in bindings {
        wtr.write_record([&binding.domain, &binding.agency_name])?;
    }
    wtr.flush()?;
    Ok(bindings.len())
}

pub fn export_unique_agencies(inventory: &NormalizedInventory, output_path: &Path) -> Result<()> {
    debug!("Exporting {} unique agencies to {}", inventory.unique_agencies.len(), output_path.display());
    let count = write_unique_agencies(inventory, create(output_path)?)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    info!("Exported {} unique agencies to {}", count, output_path.display());
    Ok(())
}

pub fn export_clean_inventory(inventory: &NormalizedInventory, output_path: &Path) -> Result<()> {
    debug!("Exporting {} clean inventory rows to {}", inventory.bindings.len(), output_path.display());
    let count = write_clean_inventory(&inventory.bindings, create(output_path)?)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    info!("Exported {} clean inventory rows to {}", count, output_path.display());
    Ok(())
}

/// Print documents as one compact JSON object per line.
pub fn write_json_lines<W: Write>(documents: &[Value], mut out: W) -> Result<()> {
    for document in documents {
        serde_json::to_writer(&mut out, document)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agency::normalize_inventory;
    use serde_json::json;

    fn inventory() -> NormalizedInventory {
        normalize_inventory(vec![
            ("Z.gov".to_string(), "Zed Commission".to_string()),
            ("a.gov".to_string(), "Office of A, B & C".to_string()),
            ("b.gov".to_string(), "Zed Commission".to_string()),
        ])
    }

    #[test]
    fn test_unique_agencies_sorted_one_per_line() {
        let mut out = Vec::new();
        let count = write_unique_agencies(&inventory(), &mut out).unwrap();

        assert_eq!(count, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "Office of A B and C\nZed Commission\n");
    }

    #[test]
    fn test_clean_inventory_in_input_order() {
        let mut out = Vec::new();
        write_clean_inventory(&inventory().bindings, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "z.gov,Zed Commission\na.gov,Office of A B and C\nb.gov,Zed Commission\n"
        );
    }

    #[test]
    fn test_export_creates_parent_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("shared").join("artifacts").join("unique-agencies.csv");
        export_unique_agencies(&inventory(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_json_lines() {
        let mut out = Vec::new();
        write_json_lines(&[json!({"domain": "a.gov"}), json!({"domain": "b.gov"})], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"domain\":\"a.gov\"}\n{\"domain\":\"b.gov\"}\n"
        );
    }
}
