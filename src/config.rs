//! Configuration for blockvfs
//!
//! Centralized configuration with sensible defaults.

/// Default block size in bytes.
///
/// Should equal or be a whole multiple of the engine's page size so that a
/// page write touches a single block; correctness does not depend on it.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Main configuration for a blockvfs instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Fixed size of every stored block, in bytes. Only the highest-indexed
    /// block of a file may be shorter, and only because the declared file
    /// size truncates it.
    pub block_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the block size (in bytes, must be non-zero)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    pub fn build(self) -> Config {
        assert!(self.config.block_size > 0, "block_size must be non-zero");
        self.config
    }
}
