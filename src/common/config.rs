use std::time::Duration;

use super::error::{DbError, Result};

/// Size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default buffer pool capacity (number of cached pages)
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;

/// How long a blocked lock request sleeps before re-checking its lock
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Storage engine configuration.
///
/// Page size is fixed for the lifetime of every file opened with a given
/// configuration, since page offsets are computed from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Bytes per page
    pub page_size: usize,
    /// Maximum number of pages held by the buffer pool
    pub buffer_pool_pages: usize,
    /// Upper bound on a single wait inside the lock manager
    pub lock_retry_interval: Duration,
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_buffer_pool_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }

    pub fn with_lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(DbError::InvalidConfig("page_size must be non-zero".into()));
        }
        if self.buffer_pool_pages == 0 {
            return Err(DbError::InvalidConfig(
                "buffer_pool_pages must be non-zero".into(),
            ));
        }
        if self.lock_retry_interval.is_zero() {
            return Err(DbError::InvalidConfig(
                "lock_retry_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_pool_pages: DEFAULT_BUFFER_POOL_PAGES,
            lock_retry_interval: DEFAULT_LOCK_RETRY_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.buffer_pool_pages, DEFAULT_BUFFER_POOL_PAGES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = StorageConfig::new()
            .with_page_size(512)
            .with_buffer_pool_pages(3)
            .with_lock_retry_interval(Duration::from_millis(1));
        assert_eq!(config.page_size, 512);
        assert_eq!(config.buffer_pool_pages, 3);
        assert_eq!(config.lock_retry_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        assert!(matches!(
            StorageConfig::new().with_page_size(0).validate(),
            Err(DbError::InvalidConfig(_))
        ));
        assert!(matches!(
            StorageConfig::new().with_buffer_pool_pages(0).validate(),
            Err(DbError::InvalidConfig(_))
        ));
    }
}
