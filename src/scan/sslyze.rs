//! TLS configuration and certificate records (sslyze results).

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::row::{FieldError, RawRow};
use super::{ScanIdentity, SnapshotStamp};
use crate::agency::AgencyRef;

/// Column that is empty when the scanner found nothing to connect to.
pub const SCANNED_PORT: &str = "Scanned Port";

/// One document of the `sslyze_scan` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SslyzeRecord {
    #[serde(flatten)]
    pub identity: ScanIdentity,
    pub scanned_hostname: String,
    pub scanned_port: i64,
    pub starttls_smtp: Option<bool>,
    pub sslv2: Option<bool>,
    pub sslv3: Option<bool>,
    pub tlsv1_0: Option<bool>,
    pub tlsv1_1: Option<bool>,
    pub tlsv1_2: Option<bool>,
    pub tlsv1_3: Option<bool>,
    pub any_forward_secrecy: Option<bool>,
    pub all_forward_secrecy: Option<bool>,
    pub any_rc4: Option<bool>,
    pub all_rc4: Option<bool>,
    pub any_3des: Option<bool>,
    pub key_type: String,
    pub key_length: i64,
    pub signature_algorithm: String,
    pub sha1_in_served_chain: Option<bool>,
    /// Stored under the key existing consumers already query.
    #[serde(rename = "sha1_in_construsted_chain")]
    pub sha1_in_constructed_chain: Option<bool>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub highest_served_issuer: String,
    pub highest_constructed_issuer: String,
    pub is_symantec_cert: Option<bool>,
    pub symantec_distrust_date: String,
    pub errors: String,
    #[serde(flatten)]
    pub stamp: SnapshotStamp,
}

impl SslyzeRecord {
    /// Rows with no scanned port are placeholders for hosts without web or
    /// mail servers and produce no record.
    pub fn is_placeholder(row: &RawRow) -> Result<bool, FieldError> {
        Ok(row.text(SCANNED_PORT)?.is_empty())
    }

    pub fn from_row(
        row: &RawRow,
        agency: AgencyRef,
        scan_date: DateTime<Utc>,
    ) -> Result<Self, FieldError> {
        let text = |column: &str| row.text(column).map(str::to_string);

        Ok(Self {
            identity: ScanIdentity::from_row(row, agency)?,
            scanned_hostname: text("Scanned Hostname")?,
            scanned_port: row.integer(SCANNED_PORT)?,
            starttls_smtp: row.flag("STARTTLS SMTP")?,
            sslv2: row.flag("SSLv2")?,
            sslv3: row.flag("SSLv3")?,
            tlsv1_0: row.flag("TLSv1.0")?,
            tlsv1_1: row.flag("TLSv1.1")?,
            tlsv1_2: row.flag("TLSv1.2")?,
            tlsv1_3: row.flag("TLSv1.3")?,
            any_forward_secrecy: row.flag("Any Forward Secrecy")?,
            all_forward_secrecy: row.flag("All Forward Secrecy")?,
            any_rc4: row.flag("Any RC4")?,
            all_rc4: row.flag("All RC4")?,
            any_3des: row.flag("Any 3DES")?,
            key_type: text("Key Type")?,
            key_length: row.integer("Key Length")?,
            signature_algorithm: text("Signature Algorithm")?,
            sha1_in_served_chain: row.flag("SHA-1 in Served Chain")?,
            sha1_in_constructed_chain: row.flag("SHA-1 in Constructed Chain")?,
            not_before: row.timestamp("Not Before")?,
            not_after: row.timestamp("Not After")?,
            highest_served_issuer: text("Highest Served Issuer")?,
            highest_constructed_issuer: text("Highest Constructed Issuer")?,
            is_symantec_cert: row.flag("Is Symantec Cert")?,
            symantec_distrust_date: text("Symantec Distrust Date")?,
            errors: text("Errors")?,
            stamp: SnapshotStamp::current(scan_date),
        })
    }
}
