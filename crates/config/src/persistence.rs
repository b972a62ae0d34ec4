//! Reading and writing ghtt's local files.
//!
//! Two kinds of files live on disk: the configuration, searched in
//!
//! 1. `./ghtt.json5` or `./ghtt.json`
//! 2. `~/.config/ghtt/config.json5` or `~/.config/ghtt/config.json`
//!
//! and the credential file (`~/.local/share/ghtt/credentials.json` on
//! Linux), which only ever holds encrypted values.
//!
//! Files are parsed as JSON5, which accepts plain JSON too, and written as
//! pretty-printed JSON since serde_json5 cannot serialize.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ConfigError, Result};

/// Local file names, in priority order.
const LOCAL_FILE_NAMES: &[&str] = &["ghtt.json5", "ghtt.json"];

/// Directory name under the platform config and data directories.
const APP_DIR: &str = "ghtt";

/// User config file names, in priority order.
const USER_FILE_NAMES: &[&str] = &["config.json5", "config.json"];

/// Name of the credential file in the user data directory.
const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Finds the configuration file, if any.
///
/// # Examples
///
/// ```no_run
/// use ghtt_config::persistence::find_config_file;
///
/// if let Some(path) = find_config_file() {
///     println!("Found config at: {}", path.display());
/// }
/// ```
#[must_use]
pub fn find_config_file() -> Option<PathBuf> {
    let local = LOCAL_FILE_NAMES.iter().map(PathBuf::from);
    let user = dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .into_iter()
        .flat_map(|dir| USER_FILE_NAMES.iter().map(move |name| dir.join(name)));
    local.chain(user).find(|path| path.exists())
}

/// Returns the user configuration directory, typically `~/.config/ghtt/`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn user_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Returns the path `ghtt` writes a new user configuration to.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_user_config_path() -> Result<PathBuf> {
    Ok(user_config_dir()?.join(USER_FILE_NAMES[0]))
}

/// Returns the default credential file path.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_credentials_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join(CREDENTIALS_FILE_NAME))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Reads and parses a JSON5 or JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
///
/// # Examples
///
/// ```no_run
/// use ghtt_config::persistence::read_config_file;
/// use ghtt_config::Config;
///
/// # fn main() -> ghtt_config::Result<()> {
/// let config: Config = read_config_file("ghtt.json5")?;
/// # Ok(())
/// # }
/// ```
pub fn read_config_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = read_file(path.as_ref())?;
    serde_json5::from_str(&content).map_err(ConfigError::from)
}

/// Reads a file to a string.
pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a value as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized or the file cannot
/// be written.
pub fn write_config_file<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    create_parent(path)?;
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content).map_err(|source| write_error(path, source))
}

/// Writes a value as pretty JSON to a file only its owner can access.
///
/// A new file is created with mode `0600`. An existing file is restricted
/// to `0600` before the content is written.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized or the file cannot
/// be written.
pub fn write_private_file<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    create_parent(path)?;
    let content = serde_json::to_string_pretty(value)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|source| write_error(path, source))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|source| write_error(path, source))?;
    }
    file.write_all(content.as_bytes())
        .map_err(|source| write_error(path, source))
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(|source| write_error(path, source))
        }
        None => Ok(()),
    }
}

fn write_error(path: &Path, source: std::io::Error) -> ConfigError {
    ConfigError::WriteFile {
        path: path.to_path_buf(),
        source,
    }
}
