pub mod aggregate;
pub mod cache;
pub mod config;
pub mod domain;
pub mod export;
pub mod file_meta;
pub mod loader;
pub mod logging;
pub mod manifest;
pub mod normalize;
pub mod parquet_io;
pub mod schema;
pub mod summary;
pub mod table;

pub use cache::{CacheStore, MemoryCache, ParquetCache};
pub use config::{LoaderConfig, StaleCachePolicy};
pub use domain::Domain;
pub use loader::Loader;
pub use schema::ColumnKind;
pub use table::{Column, Table, Value};
