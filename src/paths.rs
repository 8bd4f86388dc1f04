//! Path resolution for driftwood
//!
//! # Environment Variables
//!
//! - `DRIFTWOOD_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For state_dir():
//! 1. `DRIFTWOOD_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/driftwood` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\driftwood`
//!    - macOS/Linux: `~/.local/state/driftwood`
//!
//! The state file and the emulated remote directory default to locations
//! inside the state directory unless the configuration names them.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "DRIFTWOOD_STATE_DIR";

const APP_NAME: &str = "driftwood";

/// Get the driftwood state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_NAME);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join(APP_NAME);
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_NAME);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Default location of the state file
pub fn state_file() -> Result<PathBuf> {
    Ok(state_dir()?.join("state.json"))
}

/// Default directory for the emulated remote system
pub fn remote_dir() -> Result<PathBuf> {
    Ok(state_dir()?.join("remote"))
}

/// Expand ~ and environment variables in a path string.
///
/// ```ignore
/// let state = paths::expand("~/.driftwood/state.json");
/// let remote = paths::expand("$HOME/remote");
/// ```
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Run `f` with `key` set to `value`, restoring the previous value after
    ///
    /// Tests touching the same variable must not run concurrently.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: only this module's tests read these variables
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: as above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_state_dir_env_override() {
        with_env_var(ENV_STATE_DIR, "/custom/state/path", || {
            assert_eq!(state_dir().unwrap(), PathBuf::from("/custom/state/path"));
            assert_eq!(
                state_file().unwrap(),
                PathBuf::from("/custom/state/path/state.json")
            );
            assert_eq!(remote_dir().unwrap(), PathBuf::from("/custom/state/path/remote"));
        });
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/driftwood"), home.join("driftwood"));
    }

    #[test]
    fn test_expand_plain_path() {
        assert_eq!(expand("/tmp/state.json"), PathBuf::from("/tmp/state.json"));
    }

    #[test]
    fn test_expand_unknown_variable_is_left_alone() {
        assert_eq!(
            expand("$DRIFTWOOD_SURELY_UNSET_VAR/x"),
            PathBuf::from("$DRIFTWOOD_SURELY_UNSET_VAR/x")
        );
    }
}
