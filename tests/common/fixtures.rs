use std::fs;
use std::path::{Path, PathBuf};

use scan_snapshot::config::AppConfig;
use tempfile::TempDir;

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn load_fixture(relative: &str) -> String {
    fs::read_to_string(fixture_path(relative))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", relative))
}

/// A throwaway home directory laid out like a production deployment, with
/// the fixture inputs copied into place and a config pointing at it.
pub struct TestHome {
    pub dir: TempDir,
    pub atomic_snapshot: bool,
}

impl TestHome {
    pub fn new() -> Self {
        let home = Self {
            dir: TempDir::new().expect("create temp dir"),
            atomic_snapshot: false,
        };
        home.copy_fixture("agencies.csv", "include/agencies.csv");
        home.copy_fixture("current-federal.csv", "shared/artifacts/current-federal_modified.csv");
        for kind in ["pshtt", "trustymail", "sslyze"] {
            home.copy_fixture(
                &format!("{}.csv", kind),
                &format!("shared/artifacts/results/{}.csv", kind),
            );
        }
        home.write_config();
        home
    }

    pub fn atomic() -> Self {
        let mut home = Self::new();
        home.atomic_snapshot = true;
        home.write_config();
        home
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn copy_fixture(&self, fixture: &str, relative: &str) {
        let dst = self.join(relative);
        fs::create_dir_all(dst.parent().unwrap()).unwrap();
        fs::copy(fixture_path(fixture), &dst)
            .unwrap_or_else(|e| panic!("Failed to copy fixture {}: {}", fixture, e));
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.join(relative)).unwrap();
    }

    pub fn config_path(&self) -> PathBuf {
        self.join("config/scan-snapshot.toml")
    }

    pub fn config_toml(&self) -> String {
        format!(
            r#"
[paths]
home_dir = "{home}"
agencies_file = "include/agencies.csv"
current_federal_file = "shared/artifacts/current-federal_modified.csv"
unique_agencies_file = "shared/artifacts/unique-agencies.csv"
clean_current_federal_file = "shared/artifacts/clean-current-federal.csv"
results_dir = "shared/artifacts/results"

[database]
path = "shared/scan.db"
name = "scan"
atomic_snapshot = {atomic}
"#,
            home = self.path().display().to_string().replace('\\', "/"),
            atomic = self.atomic_snapshot,
        )
    }

    fn write_config(&self) {
        let path = self.config_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, self.config_toml()).unwrap();
    }

    pub fn config(&self) -> AppConfig {
        let config = AppConfig::from_toml(&self.config_toml()).expect("test config should parse");
        config.validate().expect("test config should validate");
        config
    }
}
