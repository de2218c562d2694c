use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::board::FormatPreference;
use crate::paths;

/// Root configuration structure for kifield.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KifieldConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via kifield.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Pre-filled answer for the "old field name" prompt.
    #[serde(default = "default_old_name")]
    pub default_old_name: String,

    /// Pre-filled answer for the "new field name" prompt.
    #[serde(default = "default_new_name")]
    pub default_new_name: String,

    #[serde(default)]
    pub copy_instead: bool,

    /// Copy the board to `<file>.<timestamp>.bak` before overwriting it.
    #[serde(default = "default_backup")]
    pub backup: bool,

    #[serde(default)]
    pub format: FormatPreference,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            default_old_name: default_old_name(),
            default_new_name: default_new_name(),
            copy_instead: false,
            backup: default_backup(),
            format: FormatPreference::default(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_old_name() -> String {
    "OLDname".to_string()
}

fn default_new_name() -> String {
    "NEWname".to_string()
}

fn default_backup() -> bool {
    true
}

/// Keys accepted by `config set`.
pub const KEYS: &[&str] = &[
    "default_old_name",
    "default_new_name",
    "copy_instead",
    "backup",
    "format",
];

// =============================================================================
// Loading / saving
// =============================================================================

/// Load defaults, merging file config with built-in defaults.
/// If kifield.json is missing or invalid, silently returns built-in defaults.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

/// Load the full kifield.json config, falling back to defaults on any error.
pub fn load_config() -> KifieldConfig {
    load_config_from_file().unwrap_or_default()
}

/// Attempt to load config from kifield.json file.
fn load_config_from_file() -> crate::Result<KifieldConfig> {
    let path = paths::kifield_json()?;
    load_config_from(&path)
}

pub(crate) fn load_config_from(path: &Path) -> crate::Result<KifieldConfig> {
    if !path.exists() {
        return Err(crate::Error::other("kifield.json not found"));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| crate::Error::config_invalid_json(path.display().to_string(), e))
}

/// Save config to kifield.json file (creates if missing).
pub fn save_config(config: &KifieldConfig) -> crate::Result<()> {
    let path = paths::kifield_json()?;
    save_config_to(config, &path)
}

pub(crate) fn save_config_to(config: &KifieldConfig, path: &Path) -> crate::Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
        })?;
    }

    let content = serde_json::to_string_pretty(config).map_err(|e| {
        crate::Error::internal_json(e.to_string(), Some("serialize kifield.json".to_string()))
    })?;

    fs::write(path, content).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("write {}", path.display())))
    })?;

    Ok(())
}

/// Check if kifield.json file exists
pub fn config_exists() -> bool {
    paths::kifield_json().map(|p| p.exists()).unwrap_or(false)
}

/// Delete kifield.json file (reset to defaults)
pub fn reset_config() -> crate::Result<bool> {
    let path = paths::kifield_json()?;

    if path.exists() {
        fs::remove_file(&path).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("delete {}", path.display())))
        })?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Get the path to kifield.json (for display purposes)
pub fn config_path() -> crate::Result<String> {
    Ok(paths::kifield_json()?.display().to_string())
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> Defaults {
    Defaults::default()
}

/// Set one key on `defaults` from its string form.
pub fn set_value(defaults: &mut Defaults, key: &str, value: &str) -> crate::Result<()> {
    match key {
        "default_old_name" => defaults.default_old_name = value.to_string(),
        "default_new_name" => defaults.default_new_name = value.to_string(),
        "copy_instead" => defaults.copy_instead = parse_bool(key, value)?,
        "backup" => defaults.backup = parse_bool(key, value)?,
        "format" => defaults.format = FormatPreference::from_str(value)?,
        _ => {
            return Err(crate::Error::config_invalid_value(
                key,
                Some(value.to_string()),
                format!("Unknown key. Use one of: {}", KEYS.join(", ")),
            ))
        }
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(crate::Error::config_invalid_value(
            key,
            Some(value.to_string()),
            "Expected true or false",
        )),
    }
}
