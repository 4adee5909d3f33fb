//! Runtime settings read from the environment (and `.env`).
//!
//! | Variable              | Default       |
//! |-----------------------|---------------|
//! | `PARCELDESK_PORT`     | `3000`        |
//! | `PARCELDESK_DATA_DIR` | `.parceldesk` |
//! | `PARCELDESK_CSV_BOM`  | `true`        |

use std::env;
use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};
use crate::transform::pipeline::ExportOptions;

pub const PORT_VAR: &str = "PARCELDESK_PORT";
pub const DATA_DIR_VAR: &str = "PARCELDESK_DATA_DIR";
pub const CSV_BOM_VAR: &str = "PARCELDESK_CSV_BOM";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = ".parceldesk";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    /// Directory of the ledger store.
    pub data_dir: PathBuf,
    pub export: ExportOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            export: ExportOptions::default(),
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any variable source; unset or empty variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Settings::default();

        if let Some(port) = get(PORT_VAR) {
            settings.port = port.parse().map_err(|_| invalid(PORT_VAR, &port))?;
        }
        if let Some(dir) = get(DATA_DIR_VAR) {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(bom) = get(CSV_BOM_VAR) {
            settings.export.include_bom = parse_flag(&bom).ok_or_else(|| invalid(CSV_BOM_VAR, &bom))?;
        }

        Ok(settings)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 3000);
        assert!(settings.export.include_bom);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (PORT_VAR, "8080"),
            (DATA_DIR_VAR, "/var/lib/parceldesk"),
            (CSV_BOM_VAR, "off"),
        ]))
        .unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.data_dir, PathBuf::from("/var/lib/parceldesk"));
        assert!(!settings.export.include_bom);
    }

    #[test]
    fn test_empty_value_keeps_default() {
        let settings = Settings::from_lookup(lookup(&[(PORT_VAR, "  ")])).unwrap();
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn test_invalid_values() {
        let err = Settings::from_lookup(lookup(&[(PORT_VAR, "http")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for PARCELDESK_PORT: 'http'");
        assert!(Settings::from_lookup(lookup(&[(CSV_BOM_VAR, "maybe")])).is_err());
    }
}
