//! Creation and opening of physical log channels.

use super::cache::LogHeaderCache;
use super::channel::LogVersionedChannel;
use super::context::LogFilesContext;
use super::files::LogFilesHelper;
use super::header::LogHeader;
use super::reader::{read_log_header, read_log_header_from_file};
use super::writer::write_log_header;
use crate::error::{CoreError, CoreResult};
use std::path::Path;
use std::sync::Arc;
use txlog_storage::StoreChannel;

/// Creates and opens log channels for logical log versions.
///
/// The allocator does not lock. Callers serialize creation and rotation of
/// the writable log file; read-only channels may be opened concurrently.
#[derive(Debug)]
pub struct LogChannelAllocator {
    context: LogFilesContext,
    files: LogFilesHelper,
    header_cache: Arc<LogHeaderCache>,
}

impl LogChannelAllocator {
    /// Creates an allocator for the log files described by `files`.
    pub fn new(
        context: LogFilesContext,
        files: LogFilesHelper,
        header_cache: Arc<LogHeaderCache>,
    ) -> Self {
        Self {
            context,
            files,
            header_cache,
        }
    }

    /// Returns the file naming helper.
    #[must_use]
    pub fn files(&self) -> &LogFilesHelper {
        &self.files
    }

    /// Returns the header cache.
    #[must_use]
    pub fn header_cache(&self) -> &Arc<LogHeaderCache> {
        &self.header_cache
    }

    /// Opens log file `version` for writing, creating it if needed.
    ///
    /// If the file has no complete header, a current-format header is
    /// written at offset 0 and flushed. `last_committed_tx_id` is only
    /// invoked in that case.
    ///
    /// # Errors
    ///
    /// Propagates storage errors, and `UnsupportedFormat` if an existing
    /// header has an unknown format.
    pub fn create_log_channel<F>(
        &self,
        version: u64,
        last_committed_tx_id: F,
    ) -> CoreResult<LogVersionedChannel>
    where
        F: FnOnce() -> u64,
    {
        let fs = self.context.fs();
        let path = self.files.log_file_for_version(version);

        fs.mkdirs(self.files.directory())?;
        let existed = fs.file_exists(&path);
        let mut channel = fs.write(&path)?;
        if existed {
            self.advise_sequential_access(channel.as_ref(), &path);
        } else {
            self.try_preallocate(channel.as_mut(), &path);
        }

        let header = match read_log_header(channel.as_ref(), false, Some(&path))? {
            Some(header) => header,
            None => {
                let _event = self.context.tracer().create_log_file();
                let header = LogHeader::for_new_file(
                    version,
                    last_committed_tx_id(),
                    self.context.store_id().cloned(),
                );
                write_log_header(channel.as_mut(), &header)?;
                channel.flush()?;
                tracing::debug!(version, path = %path.display(), "wrote log header");
                self.header_cache.put_header(version, header.clone());
                header
            }
        };

        tracing::debug!(version, format = %header.format(), "created log channel");
        Ok(LogVersionedChannel::new(
            channel,
            path,
            version,
            header.format(),
            Arc::clone(self.context.tracer()),
        ))
    }

    /// Opens existing log file `version` read-only.
    ///
    /// With `raw` set, no access hint is issued.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchFile` if the file is missing, `IncompleteHeader` if
    /// its header is cut short, and `IllegalState` if it has no header or
    /// the header belongs to another log version.
    pub fn open_log_channel(&self, version: u64, raw: bool) -> CoreResult<LogVersionedChannel> {
        let fs = self.context.fs();
        let path = self.files.log_file_for_version(version);
        if !fs.file_exists(&path) {
            return Err(CoreError::NoSuchFile { path });
        }

        self.context.tracer().open_log_file();
        // The channel is dropped, and so closed, on every error path below.
        let channel = fs.read(&path)?;
        let header = read_log_header(channel.as_ref(), true, Some(&path))?;
        let header = match header {
            Some(header) if header.log_version() == version => header,
            other => {
                let found = other.map_or_else(|| "none".to_string(), |h| h.to_string());
                return Err(CoreError::illegal_state(format!(
                    "unexpected log file header in {}, expected header version: {version}, header: {found}",
                    path.display()
                )));
            }
        };

        if !raw {
            self.advise_sequential_access(channel.as_ref(), &path);
        }

        tracing::debug!(version, path = %path.display(), "opened log channel");
        Ok(LogVersionedChannel::new(
            channel,
            path,
            version,
            header.format(),
            Arc::clone(self.context.tracer()),
        ))
    }

    /// Returns the header of log file `version`, reading it through the
    /// header cache.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchFile` if the file is missing and `IncompleteHeader`
    /// if its header is cut short.
    pub fn read_header(&self, version: u64) -> CoreResult<Option<LogHeader>> {
        if let Some(header) = self.header_cache.get_header(version) {
            return Ok(Some(header));
        }
        let path = self.files.log_file_for_version(version);
        let header = read_log_header_from_file(self.context.fs().as_ref(), &path)?;
        if let Some(header) = &header {
            self.header_cache.put_header(version, header.clone());
        }
        Ok(header)
    }

    fn advise_sequential_access(&self, channel: &dyn StoreChannel, path: &Path) {
        if !self.context.config().advise_sequential_access {
            return;
        }
        if let Err(e) = channel.advise_sequential_access() {
            tracing::warn!(path = %path.display(), error = %e, "sequential access hint failed");
        }
    }

    fn try_preallocate(&self, channel: &mut dyn StoreChannel, path: &Path) {
        let config = self.context.config();
        if !config.try_preallocate_logs {
            return;
        }
        if let Err(e) = channel.preallocate(config.preallocation_size) {
            tracing::warn!(
                path = %path.display(),
                size = config.preallocation_size,
                error = %e,
                "log file pre-allocation failed"
            );
        }
    }
}
