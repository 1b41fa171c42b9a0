//! Store configuration.
//!
//! A [`StoreConfig`] can be built in code or read from a file through the
//! `config` crate. Environment variables prefixed with `QUADSTORE_` override
//! values from the file, e.g. `QUADSTORE_FETCH_SIZE=1000`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file, or `None` for a private in-memory database.
    pub path: Option<PathBuf>,
    /// Capacity of the connection's prepared statement cache.
    pub statement_cache_capacity: usize,
    /// Number of rows a cursor fetches per round trip.
    pub fetch_size: usize,
    /// Whether materialized edge sets get one covering index per role order.
    pub index_materialized_edges: bool,
    /// Deepest operator nesting rendered into one statement; deeper
    /// compositions are materialized in steps before they run.
    pub max_plan_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            statement_cache_capacity: 64,
            fetch_size: 512,
            index_materialized_edges: true,
            max_plan_depth: 64,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Reads the configuration from the given file (any format the `config`
    /// crate recognizes by extension) layered under `QUADSTORE_*` variables.
    pub fn load(file: impl AsRef<Path>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(file.as_ref()).required(false))
            .add_source(Environment::with_prefix("QUADSTORE"))
            .build()?;
        let loaded: StoreConfig = settings.try_deserialize()?;
        Ok(loaded.sanitized())
    }

    // a zero page size or depth would never make progress
    pub(crate) fn sanitized(mut self) -> Self {
        self.fetch_size = self.fetch_size.max(1);
        self.max_plan_depth = self.max_plan_depth.max(1);
        self
    }
}
