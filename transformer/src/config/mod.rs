//! Runtime settings from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.
//!
//! | Variable                  | Default     |
//! |---------------------------|-------------|
//! | `RISREPORT_PHYSICIAN`     | `TBD`       |
//! | `RISREPORT_DOWNLOADS_DIR` | `downloads` |
//! | `RISREPORT_ATOMIC_WRITE`  | `false`     |
//! | `RISREPORT_SCHEMA`        | unset       |

use std::env;
use std::path::PathBuf;

use crate::models::DEFAULT_PHYSICIAN;
use crate::writer::WriteMode;

pub const ENV_PHYSICIAN: &str = "RISREPORT_PHYSICIAN";
pub const ENV_DOWNLOADS_DIR: &str = "RISREPORT_DOWNLOADS_DIR";
pub const ENV_ATOMIC_WRITE: &str = "RISREPORT_ATOMIC_WRITE";
pub const ENV_SCHEMA: &str = "RISREPORT_SCHEMA";

/// Directory the portal export lands in
const DEFAULT_DOWNLOADS_DIR: &str = "downloads";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub physician: String,
    pub downloads_dir: PathBuf,
    pub write_mode: WriteMode,
    pub schema_path: Option<PathBuf>,
}

impl Settings {
    /// Load `.env` (if any) and read settings from the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let physician = non_empty(ENV_PHYSICIAN).unwrap_or_else(|| DEFAULT_PHYSICIAN.to_string());
        let downloads_dir = non_empty(ENV_DOWNLOADS_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOADS_DIR));
        let write_mode = if non_empty(ENV_ATOMIC_WRITE).is_some_and(|v| parse_flag(&v)) {
            WriteMode::Atomic
        } else {
            WriteMode::Direct
        };
        let schema_path = non_empty(ENV_SCHEMA).map(PathBuf::from);

        Self {
            physician,
            downloads_dir,
            write_mode,
            schema_path,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.physician, "TBD");
        assert_eq!(settings.downloads_dir, PathBuf::from("downloads"));
        assert_eq!(settings.write_mode, WriteMode::Direct);
        assert!(settings.schema_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_PHYSICIAN, "Dr. Ruiz"),
            (ENV_DOWNLOADS_DIR, "/tmp/exports"),
            (ENV_ATOMIC_WRITE, "Yes"),
            (ENV_SCHEMA, "schema.json"),
        ]));
        assert_eq!(settings.physician, "Dr. Ruiz");
        assert_eq!(settings.downloads_dir, PathBuf::from("/tmp/exports"));
        assert_eq!(settings.write_mode, WriteMode::Atomic);
        assert_eq!(settings.schema_path, Some(PathBuf::from("schema.json")));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[(ENV_PHYSICIAN, "  "), (ENV_ATOMIC_WRITE, "0")]));
        assert_eq!(settings.physician, "TBD");
        assert_eq!(settings.write_mode, WriteMode::Direct);
    }
}
