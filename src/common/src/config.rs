use crate::{CrustyError, PAGE_SIZE, PAGE_SLOTS};
use std::fs;
use std::path::Path;

/// Engine settings. Every field has a default, so a config file only names
/// what it overrides.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of a storage block in bytes.
    pub page_size: usize,
    /// Buffers a transaction may use for chunks, partitions and sort runs.
    pub buffer_pool_size: usize,
    /// Where the shell keeps its line history.
    pub history_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            page_size: PAGE_SIZE,
            buffer_pool_size: PAGE_SLOTS,
            history_file: String::from("history.txt"),
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config file.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CrustyError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parses a JSON config document.
    pub fn from_json(contents: &str) -> Result<Self, CrustyError> {
        let config: EngineConfig = serde_json::from_str(contents)
            .map_err(|e| CrustyError::ValidationError(format!("Bad config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the operators cannot work with.
    pub fn validate(&self) -> Result<(), CrustyError> {
        if self.page_size < 64 {
            return Err(CrustyError::ValidationError(format!(
                "page_size must be at least 64 bytes, got {}",
                self.page_size
            )));
        }
        if self.buffer_pool_size < 3 {
            return Err(CrustyError::ValidationError(format!(
                "buffer_pool_size must be at least 3, got {}",
                self.buffer_pool_size
            )));
        }
        Ok(())
    }
}
