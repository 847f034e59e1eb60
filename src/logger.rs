use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::domains::DomainRefreshSummary;
use crate::snapshot::{SnapshotObserver, SnapshotSummary};

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,    // Only progress bar and final summary
    Summary = 1,   // Run stages (default)
    Detailed = 2,  // Per-stage counts and warnings
    Debug = 3,     // Everything
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }
}

/// User-facing narration of a run, separate from `tracing` diagnostics.
#[derive(Clone)]
pub struct RunLogger {
    verbosity: VerbosityLevel,
    progress_bar: Arc<Mutex<Option<ProgressBar>>>,
    run_metadata: Arc<Mutex<RunMetadata>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_file_path: Option<PathBuf>,
}

#[derive(Default, Clone)]
struct RunMetadata {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    store: String,
    rows_read: usize,
    duplicate_domains: usize,
    snapshot: Option<SnapshotSummary>,
    domains: Option<DomainRefreshSummary>,
    exports: Vec<String>,
}

impl RunLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(Mutex::new(None)),
            run_metadata: Arc::new(Mutex::new(RunMetadata::default())),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: PathBuf) -> Self {
        Self {
            log_file_path: Some(log_file_path),
            ..Self::new(verbosity)
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("WARN", message);
        }
    }

    /// Errors are shown at every verbosity.
    pub fn error(&self, message: &str) {
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let msg = format!("[{}] {}: {}", Utc::now().format("%H:%M:%S%.3f"), level, message);

        if self.log_file_path.is_some() {
            if let Ok(mut buffer) = self.log_buffer.lock() {
                buffer.push(msg.clone());
            }
        }

        // Print above an active progress bar instead of through it
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref().filter(|pb| !pb.is_hidden()) {
                pb.println(msg);
                return;
            }
        }

        eprintln!("{}", msg);
    }

    fn with_metadata(&self, update: impl FnOnce(&mut RunMetadata)) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            update(&mut metadata);
        }
    }

    // Progress bar over row inserts
    pub fn start_progress(&self, total_rows: u64) {
        let pb = if self.verbosity == VerbosityLevel::Silent || total_rows == 0 {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total_rows)
        };

        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        if let Ok(mut guard) = self.progress_bar.lock() {
            *guard = Some(pb);
        }
    }

    pub fn advance_progress(&self, message: &str) {
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message.to_string());
                pb.inc(1);
            }
        }
    }

    pub fn finish_progress(&self) {
        if let Ok(mut guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    // Run stages

    pub fn log_run_start(&self, what: &str) {
        self.with_metadata(|m| m.start_time = Some(Instant::now()));
        self.debug(&format!("Starting {}", what));
    }

    pub fn log_inputs_loaded(&self, roster_entries: usize, inventory_rows: usize, unique_agencies: usize) {
        self.info(&format!(
            "Loaded {} roster entries and {} inventory rows ({} distinct agencies)",
            roster_entries, inventory_rows, unique_agencies
        ));
    }

    pub fn log_duplicate_domains(&self, count: usize) {
        self.with_metadata(|m| m.duplicate_domains = count);
        if count > 0 {
            self.warn(&format!(
                "{} inventory rows repeat an earlier domain; the first listing is used",
                count
            ));
        }
    }

    pub fn log_rows_read(&self, path: &Path, count: usize) {
        self.with_metadata(|m| m.rows_read = count);
        self.info(&format!("Read {} scan rows from {}", count, path.display()));
    }

    pub fn log_import_start(&self, store: &str) {
        self.with_metadata(|m| m.store = store.to_string());
        self.info(&format!("Importing to {}...", store));
    }

    pub fn log_snapshot_complete(&self, summary: &SnapshotSummary) {
        self.with_metadata(|m| {
            m.end_time = Some(Instant::now());
            m.snapshot = Some(summary.clone());
        });
        let store = self.store_description();
        self.detail_snapshot(summary);
        self.info(&format!(
            "Successfully imported {} documents to {}",
            summary.inserted, store
        ));
    }

    fn detail_snapshot(&self, summary: &SnapshotSummary) {
        self.debug(&format!(
            "Cleared latest flag on {} earlier documents in {}",
            summary.latest_cleared, summary.collection
        ));
        if summary.skipped > 0 {
            self.debug(&format!("Skipped {} placeholder rows", summary.skipped));
        }
        if summary.unresolved > 0 {
            self.warn(&format!(
                "{} documents have no owning agency (base domain not in inventory)",
                summary.unresolved
            ));
        }
    }

    pub fn log_domains_refreshed(&self, summary: &DomainRefreshSummary) {
        self.with_metadata(|m| {
            m.end_time = Some(Instant::now());
            m.domains = Some(summary.clone());
        });
        let store = self.store_description();
        self.info(&format!(
            "Upserted {} domain records to {} ({} roster stakeholders)",
            summary.upserted, store, summary.stakeholders
        ));
        self.info(&format!("Deleted {} old domain records from {}", summary.deleted, store));
    }

    pub fn log_export_success(&self, path: &Path) {
        let path = path.display().to_string();
        self.info(&format!("Export completed: {}", path));
        self.with_metadata(|m| m.exports.push(path));
    }

    fn store_description(&self) -> String {
        self.run_metadata
            .lock()
            .map(|m| m.store.clone())
            .unwrap_or_default()
    }

    /// Final summary, printed at every verbosity.
    pub fn print_final_summary(&self) {
        let Ok(metadata) = self.run_metadata.lock() else {
            return;
        };

        println!("\n=== RUN SUMMARY ===");

        if let (Some(start), Some(end)) = (metadata.start_time, metadata.end_time) {
            println!("Run Duration: {:.2}s", end.duration_since(start).as_secs_f64());
        }
        if !metadata.store.is_empty() {
            println!("Document Store: {}", metadata.store);
        }

        if let Some(snapshot) = &metadata.snapshot {
            println!("Collection: {}", snapshot.collection);
            println!("Scan Date: {}", snapshot.scan_date.format("%Y-%m-%d"));
            println!("Rows Read: {}", metadata.rows_read);
            println!("Latest Flags Cleared: {}", snapshot.latest_cleared);
            println!("Documents Inserted: {}", snapshot.inserted);
            println!("Rows Skipped: {}", snapshot.skipped);
            println!("Unresolved Agencies: {}", snapshot.unresolved);
        }

        if let Some(domains) = &metadata.domains {
            println!("Domain Records Upserted: {}", domains.upserted);
            println!("Roster Stakeholders: {}", domains.stakeholders);
            println!("Old Domain Records Deleted: {}", domains.deleted);
        }

        if metadata.duplicate_domains > 0 {
            println!("Repeated Inventory Domains: {}", metadata.duplicate_domains);
        }
        for export in &metadata.exports {
            println!("Exported: {}", export);
        }

        println!("===================\n");
    }

    /// Export all collected logs to the configured file
    pub fn export_logs(&self) -> io::Result<()> {
        let Some(log_file_path) = &self.log_file_path else {
            return Ok(());
        };
        let Ok(buffer) = self.log_buffer.lock() else {
            return Ok(());
        };

        if let Some(parent) = log_file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)?;

        for log_entry in buffer.iter() {
            writeln!(file, "{}", log_entry)?;
        }

        file.flush()
    }

    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }

    pub fn get_log_count(&self) -> usize {
        self.log_buffer.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl SnapshotObserver for RunLogger {
    fn row_written(&self, domain: &str) {
        self.advance_progress(domain);
    }
}
