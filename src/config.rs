use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use anyhow::{Result, anyhow, Context};

/// User-supplied model name and API key.
///
/// Stored as a single JSON record under the platform config directory. The
/// on-disk keys (`modelName` / `apiKey`) match the record the web front end
/// kept in local storage, so an exported settings file is interchangeable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub model_name: String,
    pub api_key: String,
}

impl Settings {
    pub fn new(model_name: &str, api_key: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Both fields present and non-blank.
    pub fn is_complete(&self) -> bool {
        !self.model_name.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Load settings, treating a missing or unreadable record as absent.
    ///
    /// A corrupt file is logged and reported as `None` rather than an error;
    /// the caller's recovery path is the same either way (send the user to
    /// the settings screen).
    pub fn load() -> Option<Self> {
        let path = Self::settings_path().ok()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to read settings file");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "corrupt settings file, treating as absent");
                None
            }
        }
    }

    /// Persist the whole record. Either the new record is fully written or
    /// the old one is left untouched: the JSON is written to a temp file in
    /// the same directory and renamed over the target.
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("settings path has no parent directory"))?;
        fs::create_dir_all(parent)?;

        let content = serde_json::to_string_pretty(self)?;
        let tmp = tempfile::NamedTempFile::new_in(parent)
            .context("could not create temporary settings file")?;
        fs::write(tmp.path(), content)?;
        tmp.persist(path)
            .map_err(|err| anyhow!("could not persist settings file: {}", err.error))?;
        Ok(())
    }

    fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("merdi").join("settings.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = Settings::new("openai/gpt-4o", "sk-or-v1-abc");
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn on_disk_keys_match_external_contract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        Settings::new("gpt-4o", "key").save_to(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["modelName"], "gpt-4o");
        assert_eq!(raw["apiKey"], "key");
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load_from(&dir.path().join("nope.json")).is_none());
    }

    #[test]
    fn corrupt_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        assert!(Settings::load_from(&path).is_none());
    }

    #[test]
    fn save_overwrites_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        Settings::new("claude-3-5-sonnet-20241022", "old-key")
            .save_to(&path)
            .unwrap();
        Settings::new("gpt-4o", "new-key").save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.model_name, "gpt-4o");
        assert_eq!(loaded.api_key, "new-key");
    }

    #[test]
    fn completeness_requires_both_fields() {
        assert!(Settings::new("gpt-4o", "key").is_complete());
        assert!(!Settings::new("", "key").is_complete());
        assert!(!Settings::new("gpt-4o", "   ").is_complete());
        assert!(!Settings::default().is_complete());
    }
}
