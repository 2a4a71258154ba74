// Preference file handling.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::theme::PreferenceStorage;

/// On-disk shape of the preference file.
#[derive(Serialize, Deserialize, Default)]
struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theme: Option<String>,
}

/// Failure to persist a preference. The theme store treats these as
/// non-fatal and keeps the in-memory value.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("could not write preference file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The theme preference persisted as JSON in the user's home directory.
///
/// Reads are tolerant: a missing, unreadable, or malformed file simply
/// yields no stored value and the caller falls back to detection. Writes
/// replace the whole file.
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    /// Preference file at its standard location, `~/.survey_client.json`.
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    /// Preference file at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".survey_client.json")
    }
}

impl Default for FilePreferences {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStorage for FilePreferences {
    fn read(&self) -> Option<String> {
        let content = fs::read_to_string(&self.path).ok()?;
        let preferences: Preferences = serde_json::from_str(&content).unwrap_or_default();
        preferences.theme
    }

    fn write(&self, value: &str) -> Result<(), PreferenceError> {
        let preferences = Preferences {
            theme: Some(value.to_string()),
        };
        let content = serde_json::to_string_pretty(&preferences)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
