//! Default browser profile discovery.

use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// User data directories tried in order, relative to the platform base dir.
#[cfg(target_os = "linux")]
const CANDIDATES: &[&str] = &["google-chrome", "chromium"];
#[cfg(target_os = "macos")]
const CANDIDATES: &[&str] = &["Google/Chrome"];
#[cfg(target_os = "windows")]
const CANDIDATES: &[&str] = &["Google/Chrome/User Data"];
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CANDIDATES: &[&str] = &[];

/// Platform directory the candidates live under: `~/.config` on Linux,
/// `~/Library/Application Support` on macOS, `%LOCALAPPDATA%` on Windows.
fn base_dir(dirs: &BaseDirs) -> &Path {
    if cfg!(target_os = "windows") {
        dirs.data_local_dir()
    } else {
        dirs.config_dir()
    }
}

/// Candidate profile directories for this OS, most preferred first.
pub fn candidate_profile_dirs() -> Vec<PathBuf> {
    let Some(dirs) = BaseDirs::new() else {
        return Vec::new();
    };
    let base = base_dir(&dirs);
    CANDIDATES.iter().map(|candidate| base.join(candidate)).collect()
}

/// First candidate profile directory that exists.
pub fn default_profile_dir() -> Option<PathBuf> {
    first_existing(candidate_profile_dirs())
}

/// An explicit directory wins; otherwise the OS default, if any.
pub fn resolve_profile_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(default_profile_dir)
}

fn first_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|dir| dir.is_dir())
}
