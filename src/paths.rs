//! Platform-appropriate state directory resolution.
//!
//! Mirrors the source's app-data root convention: progress records, lock
//! files, and tokenizer artifacts all live under one directory per platform.

use std::path::PathBuf;

const APP_NAME: &str = "llmloom";

/// Root directory for progress records, lock files, and tokenizer artifacts.
///
/// Windows: `%APPDATA%/<appname>/`
/// macOS: `~/Library/Application Support/<appname>/`
/// Linux: `$XDG_CONFIG_HOME/<appname>/` or `~/.config/<appname>/`
pub fn state_dir() -> crate::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        crate::EngineError::InvalidConfig {
            field: "state_dir".to_string(),
            message: "could not determine platform config directory".to_string(),
        }
    })?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn progress_path(fingerprint: &str) -> crate::Result<PathBuf> {
    Ok(state_dir()?.join(format!("{fingerprint}.json")))
}

pub fn lock_path(fingerprint: &str) -> crate::Result<PathBuf> {
    Ok(state_dir()?.join(format!("{fingerprint}.lock")))
}

pub fn tokenizer_definition_path(name: &str) -> crate::Result<PathBuf> {
    Ok(state_dir()?.join("models").join(format!("{name}.json")))
}

pub fn tokenizer_config_path(name: &str) -> crate::Result<PathBuf> {
    Ok(state_dir()?.join("models").join(format!("{name}_config.json")))
}
