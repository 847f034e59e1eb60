//! Typed scan records.
//!
//! Each scan kind turns one raw CSV row into the document stored for it:
//! tri-state booleans, integers with a -1 stand-in for "empty", strings passed
//! through, plus the shared identity (domain, base domain, agency) and the
//! snapshot stamp (scan date, latest flag).

pub mod https;
pub mod row;
pub mod sslyze;
pub mod trustymail;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::agency::AgencyRef;
pub use https::HttpsScanRecord;
pub use row::{FieldError, RawRow};
pub use sslyze::SslyzeRecord;
pub use trustymail::{ReportUri, TrustymailRecord};

/// Column holding the scanned host name; also the snapshot sort key.
pub const DOMAIN: &str = "Domain";
/// Column holding the registrable domain used to find the owning agency.
pub const BASE_DOMAIN: &str = "Base Domain";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("row for domain '{domain}': {source}")]
    Field {
        domain: String,
        #[source]
        source: FieldError,
    },

    #[error("failed to encode document for domain '{domain}': {source}")]
    Encode {
        domain: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ScanError {
    pub fn field(row: &RawRow, source: FieldError) -> Self {
        ScanError::Field {
            domain: row.label().to_string(),
            source,
        }
    }
}

/// Which scanner produced a results file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ScanKind {
    /// HTTPS and HSTS posture
    Pshtt,
    /// Mail (SPF, DMARC, STARTTLS) posture
    Trustymail,
    /// TLS protocol, cipher and certificate posture
    Sslyze,
}

impl std::fmt::Display for ScanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl ScanKind {
    pub const ALL: [ScanKind; 3] = [ScanKind::Pshtt, ScanKind::Trustymail, ScanKind::Sslyze];

    pub fn name(&self) -> &'static str {
        match self {
            ScanKind::Pshtt => "pshtt",
            ScanKind::Trustymail => "trustymail",
            ScanKind::Sslyze => "sslyze",
        }
    }

    /// Document store collection holding this kind's snapshots.
    pub fn collection(&self) -> &'static str {
        match self {
            ScanKind::Pshtt => "https_scan",
            ScanKind::Trustymail => "trustymail",
            ScanKind::Sslyze => "sslyze_scan",
        }
    }

    /// File name of this kind's results inside the results directory.
    pub fn results_file_name(&self) -> String {
        format!("{}.csv", self.name())
    }

    /// Type one raw row into its document. `Ok(None)` means the row is a
    /// placeholder the scanner emits for hosts it had nothing to scan on.
    pub fn type_row(
        &self,
        row: &RawRow,
        agency: AgencyRef,
        scan_date: DateTime<Utc>,
    ) -> Result<Option<Value>, ScanError> {
        let typed = match self {
            ScanKind::Pshtt => HttpsScanRecord::from_row(row, agency, scan_date)
                .map(|record| to_document(row, &record)),
            ScanKind::Trustymail => TrustymailRecord::from_row(row, agency, scan_date)
                .map(|record| to_document(row, &record)),
            ScanKind::Sslyze => match SslyzeRecord::is_placeholder(row) {
                Ok(true) => return Ok(None),
                Ok(false) => SslyzeRecord::from_row(row, agency, scan_date)
                    .map(|record| to_document(row, &record)),
                Err(e) => Err(e),
            },
        };

        match typed {
            Ok(document) => document.map(Some),
            Err(source) => Err(ScanError::field(row, source)),
        }
    }
}

fn to_document<T: Serialize>(row: &RawRow, record: &T) -> Result<Value, ScanError> {
    serde_json::to_value(record).map_err(|source| ScanError::Encode {
        domain: row.label().to_string(),
        source,
    })
}

/// Host identity and owning agency, shared by every scan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIdentity {
    pub domain: String,
    pub base_domain: String,
    pub is_base_domain: bool,
    pub agency: AgencyRef,
}

impl ScanIdentity {
    pub fn from_row(row: &RawRow, agency: AgencyRef) -> Result<Self, FieldError> {
        let domain = row.text(DOMAIN)?;
        let base_domain = row.text(BASE_DOMAIN)?;
        Ok(Self {
            domain: domain.to_string(),
            base_domain: base_domain.to_string(),
            is_base_domain: domain == base_domain,
            agency,
        })
    }
}

/// Snapshot membership of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStamp {
    pub scan_date: DateTime<Utc>,
    pub latest: bool,
}

impl SnapshotStamp {
    /// Stamp for a document inserted by the current run.
    pub fn current(scan_date: DateTime<Utc>) -> Self {
        Self {
            scan_date,
            latest: true,
        }
    }
}
