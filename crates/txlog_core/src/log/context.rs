//! Collaborators shared by everything that touches log files.

use super::tracer::{DatabaseTracer, NullTracer};
use crate::config::Config;
use crate::store_id::StoreId;
use std::sync::Arc;
use txlog_storage::FileSystem;

/// The file system, store identity, tracer and configuration used when
/// creating and opening log files.
#[derive(Clone)]
pub struct LogFilesContext {
    fs: Arc<dyn FileSystem>,
    store_id: Option<StoreId>,
    tracer: Arc<dyn DatabaseTracer>,
    config: Config,
}

impl LogFilesContext {
    /// Creates a context with a [`NullTracer`] and default configuration.
    pub fn new(fs: Arc<dyn FileSystem>, store_id: Option<StoreId>) -> Self {
        Self {
            fs,
            store_id,
            tracer: Arc::new(NullTracer),
            config: Config::default(),
        }
    }

    /// Replaces the tracer.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn DatabaseTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Returns the file system.
    #[must_use]
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Returns the store identity stamped into new headers.
    #[must_use]
    pub fn store_id(&self) -> Option<&StoreId> {
        self.store_id.as_ref()
    }

    /// Returns the tracer.
    #[must_use]
    pub fn tracer(&self) -> &Arc<dyn DatabaseTracer> {
        &self.tracer
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl std::fmt::Debug for LogFilesContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFilesContext")
            .field("fs", &self.fs)
            .field("store_id", &self.store_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
