//! Startup options.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "stamp-edit.json";

/// Options read from `stamp-edit.json` in the working directory. Missing
/// fields, a missing file, and a malformed file all fall back to defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Directory scanned once at startup for stamp assets.
    pub stamps_dir: PathBuf,
    /// Base size of the stamp cursor box before scaling.
    pub cursor_size: (f32, f32),
    /// Name of the export subdirectory created next to the originals.
    pub export_dir_name: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            stamps_dir: PathBuf::from("./stamps"),
            cursor_size: (32.0, 32.0),
            export_dir_name: "edited".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn load() -> Self {
        match std::fs::read_to_string(CONFIG_FILE) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("ignoring malformed {CONFIG_FILE}: {err}");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.stamps_dir, PathBuf::from("./stamps"));
        assert_eq!(config.cursor_size, (32.0, 32.0));
        assert_eq!(config.export_dir_name, "edited");
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let config: EditorConfig =
            serde_json::from_str(r#"{ "stamps_dir": "/opt/stamps" }"#).unwrap();
        assert_eq!(config.stamps_dir, PathBuf::from("/opt/stamps"));
        assert_eq!(config.cursor_size, (32.0, 32.0));
    }

    #[test]
    fn round_trip() {
        let config = EditorConfig {
            cursor_size: (48.0, 48.0),
            ..EditorConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: EditorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cursor_size, (48.0, 48.0));
    }
}
