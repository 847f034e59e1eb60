//! Mail security records (trustymail results).

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::row::{FieldError, RawRow};
use super::{ScanIdentity, SnapshotStamp};
use crate::agency::AgencyRef;

/// A DMARC `rua`/`ruf` entry split into its URI and optional size modifier
/// (RFC 7489 section 6.2, e.g. `mailto:dmarc@example.gov!10m`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportUri {
    pub uri: String,
    pub modifier: Option<String>,
}

impl ReportUri {
    pub fn parse(text: &str) -> Self {
        let mut pieces = text.split('!');
        let uri = pieces.next().unwrap_or_default().to_string();
        let modifier = pieces.next().map(str::to_string);
        Self { uri, modifier }
    }
}

/// Split a comma separated report URI list. Empty entries are dropped before
/// trimming, so a whitespace-only entry survives as an empty URI.
pub fn split_report_uris(list: &str) -> Vec<ReportUri> {
    list.split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| ReportUri::parse(entry.trim()))
        .collect()
}

/// One document of the `trustymail` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrustymailRecord {
    #[serde(flatten)]
    pub identity: ScanIdentity,
    pub live: Option<bool>,
    pub mx_record: Option<bool>,
    pub mail_servers: String,
    pub mail_server_ports_tested: String,
    pub domain_supports_smtp: Option<bool>,
    pub domain_supports_smtp_results: String,
    pub domain_supports_starttls: Option<bool>,
    pub domain_supports_starttls_results: String,
    pub spf_record: Option<bool>,
    pub valid_spf: Option<bool>,
    pub spf_results: String,
    pub dmarc_record: Option<bool>,
    pub valid_dmarc: Option<bool>,
    pub dmarc_results: String,
    pub dmarc_record_base_domain: Option<bool>,
    pub valid_dmarc_base_domain: Option<bool>,
    pub dmarc_results_base_domain: String,
    pub dmarc_policy: String,
    pub dmarc_subdomain_policy: String,
    /// Percentage, or -1 when the record carried no `pct` tag.
    pub dmarc_policy_percentage: i64,
    pub aggregate_report_uris: Vec<ReportUri>,
    pub forensic_report_uris: Vec<ReportUri>,
    pub has_aggregate_report_uri: Option<bool>,
    pub has_forensic_report_uri: Option<bool>,
    pub syntax_errors: String,
    pub debug_info: String,
    #[serde(flatten)]
    pub stamp: SnapshotStamp,
}

impl TrustymailRecord {
    pub fn from_row(
        row: &RawRow,
        agency: AgencyRef,
        scan_date: DateTime<Utc>,
    ) -> Result<Self, FieldError> {
        let text = |column: &str| row.text(column).map(str::to_string);

        Ok(Self {
            identity: ScanIdentity::from_row(row, agency)?,
            live: row.flag("Live")?,
            mx_record: row.flag("MX Record")?,
            mail_servers: text("Mail Servers")?,
            mail_server_ports_tested: text("Mail Server Ports Tested")?,
            domain_supports_smtp: row.flag("Domain Supports SMTP")?,
            domain_supports_smtp_results: text("Domain Supports SMTP Results")?,
            domain_supports_starttls: row.flag("Domain Supports STARTTLS")?,
            domain_supports_starttls_results: text("Domain Supports STARTTLS Results")?,
            spf_record: row.flag("SPF Record")?,
            valid_spf: row.flag("Valid SPF")?,
            spf_results: text("SPF Results")?,
            dmarc_record: row.flag("DMARC Record")?,
            valid_dmarc: row.flag("Valid DMARC")?,
            dmarc_results: text("DMARC Results")?,
            dmarc_record_base_domain: row.flag("DMARC Record on Base Domain")?,
            valid_dmarc_base_domain: row.flag("Valid DMARC Record on Base Domain")?,
            dmarc_results_base_domain: text("DMARC Results on Base Domain")?,
            dmarc_policy: text("DMARC Policy")?,
            dmarc_subdomain_policy: text("DMARC Subdomain Policy")?,
            dmarc_policy_percentage: row.integer("DMARC Policy Percentage")?,
            aggregate_report_uris: split_report_uris(row.text("DMARC Aggregate Report URIs")?),
            forensic_report_uris: split_report_uris(row.text("DMARC Forensic Report URIs")?),
            has_aggregate_report_uri: row.flag("DMARC Has Aggregate Report URI")?,
            has_forensic_report_uri: row.flag("DMARC Has Forensic Report URI")?,
            syntax_errors: text("Syntax Errors")?,
            debug_info: text("Debug Info")?,
            stamp: SnapshotStamp::current(scan_date),
        })
    }
}
