// src/infra/paths.rs — Filesystem locations
//
// WALKLY_HOME, when set, holds both config and data. Otherwise config lives
// in ~/.walkly/ and data in the platform data dir (XDG_DATA_HOME/walkly).

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the WALKLY_HOME override, if set.
fn walkly_home() -> Option<PathBuf> {
    std::env::var_os("WALKLY_HOME").map(PathBuf::from)
}

/// Configuration directory: $WALKLY_HOME/ or ~/.walkly/
pub fn config_dir() -> PathBuf {
    if let Some(home) = walkly_home() {
        return home;
    }
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(".walkly"),
        None => PathBuf::from(".walkly"),
    }
}

/// Data directory: $WALKLY_HOME/data/ or ~/.local/share/walkly/
pub fn data_dir() -> PathBuf {
    if let Some(home) = walkly_home() {
        return home.join("data");
    }
    match ProjectDirs::from("", "", "walkly") {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Database path
pub fn db_path() -> PathBuf {
    data_dir().join("walkly.db")
}

/// Ensure the data directory exists.
pub async fn ensure_dirs() -> anyhow::Result<()> {
    tokio::fs::create_dir_all(data_dir()).await?;
    Ok(())
}
