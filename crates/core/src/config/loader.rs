//! Config path resolution
//!
//! Handles resolving paths for configuration files based on the plugin's location.

use std::path::{Path, PathBuf};

/// File name of the user settings
pub const CONFIG_FILE: &str = "langswap.toml";

/// File name of a deployed gamedata override
pub const GAMEDATA_FILE: &str = "langswap.games.json";

/// Returns the configs directory below the plugin directory.
///
/// Path: `<plugin dir>/configs/`
pub fn configs_dir(plugin_dir: &Path) -> PathBuf {
    plugin_dir.join("configs")
}

/// Returns the user settings path.
///
/// Path: `<plugin dir>/configs/langswap.toml`
pub fn config_path(plugin_dir: &Path) -> PathBuf {
    configs_dir(plugin_dir).join(CONFIG_FILE)
}

/// Returns the gamedata override path.
///
/// Path: `<plugin dir>/gamedata/langswap.games.json`
pub fn gamedata_path(plugin_dir: &Path) -> PathBuf {
    plugin_dir.join("gamedata").join(GAMEDATA_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_below_plugin_dir() {
        let base = PathBuf::from("/host/plugins/langswap");
        assert!(config_path(&base).ends_with("configs/langswap.toml"));
        assert!(gamedata_path(&base).ends_with("gamedata/langswap.games.json"));
        assert!(config_path(&base).starts_with(&base));
    }
}
