use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Static engine configuration.
///
/// Defaults mirror the live deployment: the host's chunked main script, a
/// CDN mirror keyed by the captured build identifier, and a 100ms poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host application version the substitute script was built against.
    pub supported_version: String,
    /// Pattern matching the host's primary script URL; the single capture
    /// group is the build identifier used to pick the mirrored substitute.
    pub script_pattern: String,
    /// Substitute URL is `substitute_prefix + identifier + substitute_suffix`.
    pub substitute_prefix: String,
    pub substitute_suffix: String,
    /// Suffix appended to a reissued original URL so it is never intercepted
    /// a second time.
    pub bypass_marker: String,
    /// Fixed poll cadence. No back-off; condition reads are cheap.
    pub poll_interval_ms: u64,
    /// Ticks the substitute script is given to load before the failsafe
    /// reverts to the original.
    pub substitute_grace_ticks: u32,
    /// Script/stylesheet pair for the notification library.
    pub notify_script_url: String,
    pub notify_style_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            supported_version: "1.0.1".to_string(),
            script_pattern: r"^https://slowroads\.io/static/js/main\.([0-9a-f]+)\.chunk\.js$"
                .to_string(),
            substitute_prefix:
                "https://cdn.jsdelivr.net/gh/Opinion/slowroads-handling-editor@userscript-v1.2/dist/main.modified."
                    .to_string(),
            substitute_suffix: ".chunk.js".to_string(),
            bypass_marker: "?ignore".to_string(),
            poll_interval_ms: 100,
            substitute_grace_ticks: 100,
            notify_script_url: "https://cdn.jsdelivr.net/npm/toastify-js".to_string(),
            notify_style_url: "https://cdn.jsdelivr.net/npm/toastify-js/src/toastify.min.css"
                .to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, or the defaults when no path is given.
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings json: {}", path.display()))?;
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)
            .context("failed to serialize settings to JSON")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write settings file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() -> Result<()> {
        let settings = Settings::from_json_file(None)?;
        assert_eq!(settings.supported_version, "1.0.1");
        assert_eq!(settings.poll_interval_ms, 100);
        assert_eq!(settings.bypass_marker, "?ignore");
        Ok(())
    }

    #[test]
    fn json_file_roundtrip_overrides_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.supported_version = "1.0.2".to_string();
        settings.poll_interval_ms = 500;
        settings.save_to_path(&path)?;

        let reloaded = Settings::from_json_file(Some(&path))?;
        assert_eq!(reloaded.supported_version, "1.0.2");
        assert_eq!(reloaded.poll_interval_ms, 500);
        // Fields absent from the file fall back to defaults via serde(default).
        assert_eq!(reloaded.substitute_suffix, ".chunk.js");
        Ok(())
    }

    #[test]
    fn partial_json_fills_in_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "poll_interval_ms": 500 }"#)?;

        let settings = Settings::from_json_file(Some(&path))?;
        assert_eq!(settings.poll_interval_ms, 500);
        assert_eq!(settings.supported_version, "1.0.1");
        Ok(())
    }
}
