use std::env;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_PARALLELISM: usize = 4;

/// What `load` returns when aggregation finds no rows but an older cache
/// file is still on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleCachePolicy {
    #[default]
    ReturnEmpty,
    ServeStale,
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub data_root: PathBuf,
    pub parallelism: usize,
    pub stale_policy: StaleCachePolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_DIR),
            parallelism: DEFAULT_PARALLELISM,
            stale_policy: StaleCachePolicy::ReturnEmpty,
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> Self {
        let data_root = env::var("VOLLEY_DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let parallelism = env::var("INGEST_PARALLELISM")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PARALLELISM)
            .clamp(1, 16);
        let stale_policy = match env::var("SERVE_STALE_CACHE").as_deref().map(str::trim) {
            Ok("1") | Ok("true") | Ok("yes") => StaleCachePolicy::ServeStale,
            _ => StaleCachePolicy::ReturnEmpty,
        };
        Self {
            data_root,
            parallelism,
            stale_policy,
        }
    }

    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    pub fn with_stale_policy(mut self, policy: StaleCachePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = threads.clamp(1, 16);
        self
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}
