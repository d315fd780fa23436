use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::aggregate;
use crate::cache::{CacheStore, ParquetCache};
use crate::config::{LoaderConfig, StaleCachePolicy};
use crate::domain::Domain;
use crate::manifest::{self, CacheManifest};
use crate::table::Table;

pub struct Loader<C: CacheStore> {
    config: LoaderConfig,
    cache: C,
    pool: Option<rayon::ThreadPool>,
}

impl Loader<ParquetCache> {
    pub fn from_config(config: LoaderConfig) -> Self {
        let cache = ParquetCache::new(config.data_root.clone());
        Self::with_cache(config, cache)
    }
}

impl<C: CacheStore> Loader<C> {
    pub fn with_cache(config: LoaderConfig, cache: C) -> Self {
        let pool = build_ingest_pool(config.parallelism);
        Self {
            config,
            cache,
            pool,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn load(&self, domain: Domain, force_rebuild: bool) -> Result<Table> {
        if !force_rebuild {
            match self.cache.read(domain) {
                Ok(Some(table)) => {
                    info!(%domain, rows = table.row_count(), "serving cached dataset");
                    return Ok(table);
                }
                Ok(None) => {}
                Err(err) => warn!(%domain, error = %err, "cache read failed, rebuilding"),
            }
        }

        let combined = self.build(domain)?;
        if combined.is_empty() {
            return self.empty_result(domain, combined);
        }

        match self.cache.write(domain, &combined) {
            Ok(()) => self.record_manifest(domain, &combined),
            Err(err) => warn!(%domain, error = %err, "failed to write cache"),
        }
        Ok(combined)
    }

    pub fn build(&self, domain: Domain) -> Result<Table> {
        let root = &self.config.data_root;
        let profile = domain.profile();
        let build = || aggregate::build_domain(root, profile);
        let combined = match self.pool.as_ref() {
            Some(pool) => pool.install(build),
            None => build(),
        };
        combined.with_context(|| format!("build {domain} dataset"))
    }

    /// Deletes the cache entry and its manifest. Returns whether a cache
    /// entry existed.
    pub fn invalidate(&self, domain: Domain) -> Result<bool> {
        let existed = self.cache.invalidate(domain)?;
        manifest::remove_manifest(&self.config.data_root, domain)?;
        info!(%domain, existed, "cache invalidated");
        Ok(existed)
    }

    pub fn is_stale(&self, domain: Domain) -> Result<bool> {
        manifest::is_stale(&self.config.data_root, domain)
    }

    fn empty_result(&self, domain: Domain, empty: Table) -> Result<Table> {
        if self.config.stale_policy == StaleCachePolicy::ServeStale {
            match self.cache.read(domain) {
                Ok(Some(stale)) => {
                    warn!(%domain, rows = stale.row_count(), "no source rows, serving stale cache");
                    return Ok(stale);
                }
                Ok(None) => {}
                Err(err) => warn!(%domain, error = %err, "stale cache unreadable"),
            }
        }
        warn!(%domain, "no data found");
        Ok(empty)
    }

    fn record_manifest(&self, domain: Domain, table: &Table) {
        let root = &self.config.data_root;
        let written = manifest::fingerprint_sources(root, domain.profile())
            .and_then(|fp| manifest::write_manifest(root, &CacheManifest::new(domain, table, fp)));
        if let Err(err) = written {
            warn!(%domain, error = %err, "failed to write cache manifest");
        }
    }
}

fn build_ingest_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}
