//! Log and upgrade configuration.

/// Default pre-allocation size for new log files, equal to the default
/// rotation threshold.
pub const DEFAULT_PREALLOCATION_SIZE: u64 = 256 * 1024 * 1024; // 256 MB

/// Configuration for log file handling and store upgrades.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether an out-of-date store may be upgraded in place.
    pub allow_upgrade: bool,

    /// Whether to pre-allocate space for brand new log files.
    pub try_preallocate_logs: bool,

    /// Number of bytes to pre-allocate for a new log file.
    pub preallocation_size: u64,

    /// Whether to hint the OS that log files are read sequentially.
    pub advise_sequential_access: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_upgrade: false,
            try_preallocate_logs: true,
            preallocation_size: DEFAULT_PREALLOCATION_SIZE,
            advise_sequential_access: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether an out-of-date store may be upgraded.
    #[must_use]
    pub const fn allow_upgrade(mut self, value: bool) -> Self {
        self.allow_upgrade = value;
        self
    }

    /// Sets whether new log files are pre-allocated.
    #[must_use]
    pub const fn try_preallocate_logs(mut self, value: bool) -> Self {
        self.try_preallocate_logs = value;
        self
    }

    /// Sets the pre-allocation size for new log files.
    #[must_use]
    pub const fn preallocation_size(mut self, size: u64) -> Self {
        self.preallocation_size = size;
        self
    }

    /// Sets whether sequential-access hints are issued.
    #[must_use]
    pub const fn advise_sequential_access(mut self, value: bool) -> Self {
        self.advise_sequential_access = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(!config.allow_upgrade);
        assert!(config.try_preallocate_logs);
        assert!(config.advise_sequential_access);
        assert_eq!(config.preallocation_size, DEFAULT_PREALLOCATION_SIZE);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .allow_upgrade(true)
            .try_preallocate_logs(false)
            .preallocation_size(1024);

        assert!(config.allow_upgrade);
        assert!(!config.try_preallocate_logs);
        assert_eq!(config.preallocation_size, 1024);
    }
}
