#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use volley_ingest::cache::ParquetCache;
use volley_ingest::config::{LoaderConfig, StaleCachePolicy};
use volley_ingest::domain::Domain;
use volley_ingest::loader::Loader;

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Throwaway data root laid out like the dashboard's `data/` directory.
pub struct DataRoot {
    dir: TempDir,
}

impl DataRoot {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_source(&self, domain: Domain, file_name: &str, contents: &str) -> PathBuf {
        let dir = domain.profile().source_dir(self.path());
        fs::create_dir_all(&dir).expect("create source dir");
        let path = dir.join(file_name);
        fs::write(&path, contents).expect("write source file");
        path
    }

    pub fn write_historical(&self, domain: Domain, contents: &str) -> PathBuf {
        let path = domain
            .profile()
            .historical_path(self.path())
            .expect("domain has a historical file");
        fs::write(&path, contents).expect("write historical file");
        path
    }

    pub fn config(&self) -> LoaderConfig {
        LoaderConfig::default()
            .with_data_root(self.path())
            .with_parallelism(2)
    }

    pub fn loader(&self) -> Loader<ParquetCache> {
        Loader::from_config(self.config())
    }

    pub fn loader_with_policy(&self, policy: StaleCachePolicy) -> Loader<ParquetCache> {
        Loader::from_config(self.config().with_stale_policy(policy))
    }
}
