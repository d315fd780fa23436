use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::aggregate::collect_source_files;
use crate::cache::remove_if_present;
use crate::domain::{Domain, DomainProfile};
use crate::table::Table;

const MANIFEST_VERSION: u32 = 1;

/// Sidecar written next to a domain's cache file. Loading never consults it;
/// callers use `is_stale` when they want to know whether sources changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub domain: Domain,
    pub built_at: String,
    pub rows: usize,
    pub columns: usize,
    pub fingerprint: String,
}

impl CacheManifest {
    pub fn new(domain: Domain, table: &Table, fingerprint: String) -> Self {
        Self {
            version: MANIFEST_VERSION,
            domain,
            built_at: Utc::now().to_rfc3339(),
            rows: table.row_count(),
            columns: table.column_count(),
            fingerprint,
        }
    }
}

pub fn manifest_path(root: &Path, domain: Domain) -> PathBuf {
    domain
        .profile()
        .cache_path(root)
        .with_extension("manifest.json")
}

/// SHA-256 over the sorted source listing (name, size, mtime) plus the
/// historical file when present.
pub fn fingerprint_sources(root: &Path, profile: &DomainProfile) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut paths = collect_source_files(&profile.source_dir(root))?;
    if let Some(historical) = profile.historical_path(root)
        && historical.is_file()
    {
        paths.push(historical);
    }
    for path in &paths {
        let meta = fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(meta.len().to_le_bytes());
        hasher.update(mtime.to_le_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_manifest(root: &Path, manifest: &CacheManifest) -> Result<()> {
    let path = manifest_path(root, manifest.domain);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serialize cache manifest")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

pub fn read_manifest(root: &Path, domain: Domain) -> Option<CacheManifest> {
    let raw = fs::read_to_string(manifest_path(root, domain)).ok()?;
    let manifest = serde_json::from_str::<CacheManifest>(&raw).ok()?;
    if manifest.version != MANIFEST_VERSION {
        return None;
    }
    Some(manifest)
}

pub fn remove_manifest(root: &Path, domain: Domain) -> Result<bool> {
    remove_if_present(&manifest_path(root, domain))
}

/// True when no manifest exists or the sources no longer hash to the
/// recorded fingerprint.
pub fn is_stale(root: &Path, domain: Domain) -> Result<bool> {
    let Some(manifest) = read_manifest(root, domain) else {
        return Ok(true);
    };
    let current = fingerprint_sources(root, domain.profile())?;
    Ok(current != manifest.fingerprint)
}
