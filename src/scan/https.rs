//! HTTPS / HSTS posture records (pshtt results).

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::row::{FieldError, RawRow};
use super::{ScanIdentity, SnapshotStamp};
use crate::agency::AgencyRef;

/// One document of the `https_scan` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpsScanRecord {
    #[serde(flatten)]
    pub identity: ScanIdentity,
    pub canonical_url: String,
    pub live: Option<bool>,
    pub https_live: Option<bool>,
    pub https_full_connection: Option<bool>,
    pub https_client_auth_required: Option<bool>,
    pub redirect: Option<bool>,
    pub redirect_to: String,
    pub valid_https: Option<bool>,
    pub defaults_https: Option<bool>,
    pub downgrades_https: Option<bool>,
    pub strictly_forces_https: Option<bool>,
    pub https_bad_chain: Option<bool>,
    pub https_bad_hostname: Option<bool>,
    pub https_expired_cert: Option<bool>,
    pub https_self_signed_cert: Option<bool>,
    pub hsts: Option<bool>,
    pub hsts_header: String,
    /// Seconds, or -1 when the scan reported no max-age.
    pub hsts_max_age: i64,
    pub hsts_entire_domain: Option<bool>,
    pub hsts_preload_ready: Option<bool>,
    pub hsts_preload_pending: Option<bool>,
    pub hsts_preloaded: Option<bool>,
    pub hsts_base_domain_preloaded: Option<bool>,
    pub domain_supports_https: Option<bool>,
    pub domain_enforces_https: Option<bool>,
    pub domain_uses_strong_hsts: Option<bool>,
    pub unknown_error: Option<bool>,
    #[serde(flatten)]
    pub stamp: SnapshotStamp,
}

impl HttpsScanRecord {
    pub fn from_row(
        row: &RawRow,
        agency: AgencyRef,
        scan_date: DateTime<Utc>,
    ) -> Result<Self, FieldError> {
        Ok(Self {
            identity: ScanIdentity::from_row(row, agency)?,
            canonical_url: row.text("Canonical URL")?.to_string(),
            live: row.flag("Live")?,
            https_live: row.flag("HTTPS Live")?,
            https_full_connection: row.flag("HTTPS Full Connection")?,
            https_client_auth_required: row.flag("HTTPS Client Auth Required")?,
            redirect: row.flag("Redirect")?,
            redirect_to: row.text("Redirect To")?.to_string(),
            valid_https: row.flag("Valid HTTPS")?,
            defaults_https: row.flag("Defaults to HTTPS")?,
            downgrades_https: row.flag("Downgrades HTTPS")?,
            strictly_forces_https: row.flag("Strictly Forces HTTPS")?,
            https_bad_chain: row.flag("HTTPS Bad Chain")?,
            https_bad_hostname: row.flag("HTTPS Bad Hostname")?,
            https_expired_cert: row.flag("HTTPS Expired Cert")?,
            https_self_signed_cert: row.flag("HTTPS Self Signed Cert")?,
            hsts: row.flag("HSTS")?,
            hsts_header: row.text_without_semicolons("HSTS Header")?,
            hsts_max_age: row.integer("HSTS Max Age")?,
            hsts_entire_domain: row.flag("HSTS Entire Domain")?,
            hsts_preload_ready: row.flag("HSTS Preload Ready")?,
            hsts_preload_pending: row.flag("HSTS Preload Pending")?,
            hsts_preloaded: row.flag("HSTS Preloaded")?,
            hsts_base_domain_preloaded: row.flag("Base Domain HSTS Preloaded")?,
            domain_supports_https: row.flag("Domain Supports HTTPS")?,
            domain_enforces_https: row.flag("Domain Enforces HTTPS")?,
            domain_uses_strong_hsts: row.flag("Domain Uses Strong HSTS")?,
            unknown_error: row.flag("Unknown Error")?,
            stamp: SnapshotStamp::current(scan_date),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::tests::{https_row, scan_date};

    fn agency() -> AgencyRef {
        AgencyRef {
            id: "DOE1".to_string(),
            name: "Department of Example".to_string(),
        }
    }

    #[test]
    fn test_example_row_is_typed() {
        let row = https_row("example.gov", "example.gov");
        let record = HttpsScanRecord::from_row(&row, agency(), scan_date()).unwrap();

        assert_eq!(record.identity.agency, agency());
        assert!(record.identity.is_base_domain);
        assert_eq!(record.live, Some(true));
        assert_eq!(record.hsts_max_age, -1);
        assert!(record.stamp.latest);
        assert_eq!(record.stamp.scan_date, scan_date());
    }

    #[test]
    fn test_subdomain_is_not_base_domain() {
        let row = https_row("www.example.gov", "example.gov");
        let record = HttpsScanRecord::from_row(&row, agency(), scan_date()).unwrap();
        assert!(!record.identity.is_base_domain);
        assert_eq!(record.identity.base_domain, "example.gov");
    }

    #[test]
    fn test_hsts_fields() {
        let mut row = https_row("example.gov", "example.gov");
        row.set("HSTS Header", "max-age=31536000; includeSubDomains; preload");
        row.set("HSTS Max Age", "31536000");
        row.set("HSTS", "False");
        row.set("HSTS Preloaded", "Maybe");

        let record = HttpsScanRecord::from_row(&row, agency(), scan_date()).unwrap();
        assert_eq!(record.hsts_header, "max-age=31536000 includeSubDomains preload");
        assert_eq!(record.hsts_max_age, 31_536_000);
        assert_eq!(record.hsts, Some(false));
        assert_eq!(record.hsts_preloaded, None);
    }

    #[test]
    fn test_bad_max_age_fails() {
        let mut row = https_row("example.gov", "example.gov");
        row.set("HSTS Max Age", "forever");
        let err = HttpsScanRecord::from_row(&row, agency(), scan_date()).unwrap_err();
        assert!(matches!(err, FieldError::InvalidInteger { .. }));
    }

    #[test]
    fn test_document_field_names() {
        let row = https_row("example.gov", "example.gov");
        let record = HttpsScanRecord::from_row(&row, agency(), scan_date()).unwrap();
        let doc = serde_json::to_value(&record).unwrap();

        assert_eq!(doc["domain"], "example.gov");
        assert_eq!(doc["agency"]["id"], "DOE1");
        assert_eq!(doc["hsts_base_domain_preloaded"], serde_json::Value::Null);
        assert_eq!(doc["defaults_https"], true);
        assert_eq!(doc["scan_date"], "2026-10-18T00:00:00Z");
        assert_eq!(doc["latest"], true);
    }
}
