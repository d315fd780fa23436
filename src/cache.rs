use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};

use crate::domain::Domain;
use crate::parquet_io;
use crate::table::Table;

pub trait CacheStore: Send + Sync {
    fn read(&self, domain: Domain) -> Result<Option<Table>>;
    fn write(&self, domain: Domain, table: &Table) -> Result<()>;
    fn invalidate(&self, domain: Domain) -> Result<bool>;
    fn exists(&self, domain: Domain) -> bool;
}

#[derive(Debug, Clone)]
pub struct ParquetCache {
    root: PathBuf,
}

impl ParquetCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, domain: Domain) -> PathBuf {
        domain.profile().cache_path(&self.root)
    }
}

impl CacheStore for ParquetCache {
    fn read(&self, domain: Domain) -> Result<Option<Table>> {
        let path = self.path_for(domain);
        if !path.is_file() {
            return Ok(None);
        }
        parquet_io::read_table(&path)
            .with_context(|| format!("read cache {}", path.display()))
            .map(Some)
    }

    fn write(&self, domain: Domain, table: &Table) -> Result<()> {
        let path = self.path_for(domain);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let tmp = path.with_extension("parquet.tmp");
        if let Err(err) = parquet_io::write_table(&tmp, table) {
            let _ = fs::remove_file(&tmp);
            return Err(err.context(format!("write cache {}", tmp.display())));
        }
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(err).with_context(|| format!("swap cache {}", path.display()));
        }
        Ok(())
    }

    fn invalidate(&self, domain: Domain) -> Result<bool> {
        remove_if_present(&self.path_for(domain))
    }

    fn exists(&self, domain: Domain) -> bool {
        self.path_for(domain).is_file()
    }
}

pub(crate) fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<Domain, Table>>,
    reject_writes: bool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self {
            entries: Mutex::default(),
            reject_writes: true,
        }
    }

    pub fn seed(&self, domain: Domain, table: Table) -> Result<()> {
        self.lock()?.insert(domain, table);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Domain, Table>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory cache lock poisoned"))
    }
}

impl CacheStore for MemoryCache {
    fn read(&self, domain: Domain) -> Result<Option<Table>> {
        Ok(self.lock()?.get(&domain).cloned())
    }

    fn write(&self, domain: Domain, table: &Table) -> Result<()> {
        if self.reject_writes {
            return Err(anyhow!("cache is read-only"));
        }
        self.lock()?.insert(domain, table.clone());
        Ok(())
    }

    fn invalidate(&self, domain: Domain) -> Result<bool> {
        Ok(self.lock()?.remove(&domain).is_some())
    }

    fn exists(&self, domain: Domain) -> bool {
        self.lock().map(|g| g.contains_key(&domain)).unwrap_or(false)
    }
}
