//! Config file location.
//!
//! Precedence, highest first:
//!
//! 1. `--dir <DIR>` → `<DIR>/config.toml`
//! 2. `EPGSYNC_CONFIG` → that file
//! 3. `XDG_CONFIG_HOME` (absolute) → `$XDG_CONFIG_HOME/epgsync/config.toml`
//! 4. `HOME` → `~/.config/epgsync/config.toml`

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

/// Environment variable naming the config file directly.
const CONFIG_ENV: &str = "EPGSYNC_CONFIG";

/// Directory name under the XDG config home.
const APP_DIR: &str = "epgsync";

/// Config file name.
const CONFIG_FILE: &str = "config.toml";

/// Resolves the config file path from `--dir` and the process environment.
///
/// # Errors
///
/// Returns an error if neither `--dir`, `EPGSYNC_CONFIG`, `XDG_CONFIG_HOME`
/// nor `HOME` yields a location.
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    resolve_with(dir, |key| std::env::var(key).ok())
}

/// Resolution against an arbitrary environment lookup.
fn resolve_with(dir: Option<&PathBuf>, env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join(CONFIG_FILE));
    }

    // Empty values count as unset.
    let var = |key: &str| env(key).filter(|v| !v.is_empty());

    if let Some(file) = var(CONFIG_ENV) {
        return Ok(PathBuf::from(file));
    }

    // A relative XDG_CONFIG_HOME is invalid and ignored.
    if let Some(xdg) = var("XDG_CONFIG_HOME").filter(|v| Path::new(v).is_absolute()) {
        return Ok(PathBuf::from(xdg).join(APP_DIR).join(CONFIG_FILE));
    }

    match var("HOME") {
        Some(home) => Ok(PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE)),
        None => bail!("cannot locate config: set --dir, {CONFIG_ENV}, XDG_CONFIG_HOME or HOME"),
    }
}
