//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::ForgeConfig;

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<ForgeConfig> {
    store.load()
}

/// Save configuration.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_config(store: &impl ConfigStore, config: &ForgeConfig) -> Result<()> {
    store.save(config)
}
