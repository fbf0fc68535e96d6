use std::env;
use std::path::{Path, PathBuf};

fn normalize_env_path(value: Option<String>) -> Option<PathBuf> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

pub fn home_dir() -> Option<PathBuf> {
    normalize_env_path(env::var("HOME").ok())
        .or_else(|| normalize_env_path(env::var("USERPROFILE").ok()))
}

/// Directory holding the running executable; stands in for the install dir.
pub fn exe_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
}

pub fn expand_home_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if let Some(str_path) = path.to_str() {
        if let Some(rest) = str_path.strip_prefix("~/") {
            if let Some(home) = home_dir() {
                return home.join(rest);
            }
        }
        if str_path == "~" {
            if let Some(home) = home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}
