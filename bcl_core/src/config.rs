//! Configuration for the bin collection reminder.
//!
//! The configuration is read from a TOML file once at startup and passed
//! into each step; nothing reads ambient global state.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::profile::ProfileSelection;

fn default_calendar_file() -> PathBuf {
    PathBuf::from("collections.ics")
}

fn default_port() -> u16 {
    // the OpenRGB SDK server default
    6742
}

fn default_client_name() -> String {
    String::from("bin-lights")
}

/// Runtime configuration, immutable for the duration of a run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Calendar feed to fetch; the local calendar file is used when unset.
    pub calendar_url: Option<String>,
    /// Local calendar file, resolved relative to the configuration file.
    #[serde(default = "default_calendar_file")]
    pub calendar_file: PathBuf,
    /// Bark device key; push notifications are disabled when unset.
    pub notification_key: Option<String>,
    pub lighting: LightingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightingConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    pub combined_profile: String,
    pub recycling_profile: String,
    pub rubbish_profile: String,
}

impl Config {
    /// Load the configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Path of the local calendar file, resolved against the directory the
    /// configuration file lives in.
    pub fn calendar_path(&self, config_path: &Path) -> PathBuf {
        if self.calendar_file.is_absolute() {
            self.calendar_file.clone()
        } else {
            config_path
                .parent()
                .unwrap_or(Path::new("."))
                .join(&self.calendar_file)
        }
    }
}

impl LightingConfig {
    /// The configured profile name for a selection, if it maps to one.
    pub fn profile_name(&self, selection: ProfileSelection) -> Option<&str> {
        match selection {
            ProfileSelection::RecyclingAndRubbish => Some(&self.combined_profile),
            ProfileSelection::RecyclingOnly => Some(&self.recycling_profile),
            ProfileSelection::RubbishOnly => Some(&self.rubbish_profile),
            ProfileSelection::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use crate::config::Config;
    use crate::profile::ProfileSelection;

    static FULL: &str = r#"
calendar_url = "https://example.org/waste.ics"
calendar_file = "waste.ics"
notification_key = "bark-device-key"

[lighting]
host = "192.168.1.20"
port = 1234
client_name = "pc-lights"
combined_profile = "Bins Both"
recycling_profile = "Bins Recycling"
rubbish_profile = "Bins Rubbish"
"#;

    static MINIMAL: &str = r#"
[lighting]
host = "127.0.0.1"
combined_profile = "Bins Both"
recycling_profile = "Bins Recycling"
rubbish_profile = "Bins Rubbish"
"#;

    #[test]
    fn test_parse_full() {
        let config: Config = toml::from_str(FULL).unwrap();
        assert_eq!(
            config.calendar_url.as_deref(),
            Some("https://example.org/waste.ics")
        );
        assert_eq!(config.calendar_file, PathBuf::from("waste.ics"));
        assert_eq!(config.notification_key.as_deref(), Some("bark-device-key"));
        assert_eq!(config.lighting.host, "192.168.1.20");
        assert_eq!(config.lighting.port, 1234);
        assert_eq!(config.lighting.client_name, "pc-lights");
    }

    #[test]
    fn test_parse_minimal_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.calendar_url, None);
        assert_eq!(config.calendar_file, PathBuf::from("collections.ics"));
        assert_eq!(config.notification_key, None);
        assert_eq!(config.lighting.port, 6742);
        assert_eq!(config.lighting.client_name, "bin-lights");
    }

    #[test]
    fn test_calendar_path_resolution() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(
            config.calendar_path(Path::new("/etc/bin-lights/config.toml")),
            PathBuf::from("/etc/bin-lights/collections.ics")
        );
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.calendar_file = PathBuf::from("/var/lib/waste.ics");
        assert_eq!(
            config.calendar_path(Path::new("config.toml")),
            PathBuf::from("/var/lib/waste.ics")
        );
    }

    #[test]
    fn test_profile_name() {
        let config: Config = toml::from_str(FULL).unwrap();
        assert_eq!(
            config
                .lighting
                .profile_name(ProfileSelection::RecyclingAndRubbish),
            Some("Bins Both")
        );
        assert_eq!(
            config.lighting.profile_name(ProfileSelection::RecyclingOnly),
            Some("Bins Recycling")
        );
        assert_eq!(
            config.lighting.profile_name(ProfileSelection::RubbishOnly),
            Some("Bins Rubbish")
        );
        assert_eq!(config.lighting.profile_name(ProfileSelection::Unknown), None);
    }
}
