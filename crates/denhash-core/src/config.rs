//! Configuration for the DenHash engine
//!
//! Tunes durability and record size limits for a single database file.

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Durably sync after every append (slower, crash-safe per write).
    /// When false, data reaches the OS page cache immediately and persistent
    /// storage at close or explicit sync.
    pub sync_writes: bool,
    /// Maximum key size in bytes
    pub max_key_size: usize,
    /// Maximum value size in bytes
    pub max_value_size: usize,
}

impl Config {
    /// Durable preset: one fdatasync per write
    pub fn durable() -> Self {
        Self {
            sync_writes: true,
            max_key_size: 4096,
            max_value_size: 32 * 1024 * 1024,
        }
    }

    /// Fast preset: sync at close or on demand
    pub fn fast() -> Self {
        Self {
            sync_writes: false,
            max_key_size: 4096,
            max_value_size: 32 * 1024 * 1024,
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.max_key_size == 0 || self.max_key_size > 4096 {
            return Err("max_key_size must be in [1, 4096]".into());
        }
        if self.max_value_size == 0 || self.max_value_size > 128 * 1024 * 1024 {
            return Err("max_value_size must be in [1, 128MB]".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::fast() }
}
