use crate::error::ConfigError;
use crate::models::ReminderType;
use crate::voice::intent::Strictness;
use crate::voice::resolver::MatchStrategy;
use chrono::NaiveTime;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "voicetask";

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub instance_url: Option<String>,
    pub api_key: Option<String>,
    /// Keep tasks in memory instead of talking to a backend.
    pub offline: bool,
    pub log_file: Option<PathBuf>,
    pub voice: VoiceConfig,
    pub reminders: ReminderConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    /// Report unrecognized commands instead of turning them into new tasks.
    pub strict: bool,
    pub fuzzy_matching: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        VoiceConfig {
            strict: false,
            fuzzy_matching: true,
        }
    }
}

impl VoiceConfig {
    pub fn strictness(&self) -> Strictness {
        if self.strict {
            Strictness::Strict
        } else {
            Strictness::Lenient
        }
    }

    pub fn match_strategy(&self) -> MatchStrategy {
        if self.fuzzy_matching {
            MatchStrategy::Fuzzy
        } else {
            MatchStrategy::Substring
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub kind: ReminderType,
    pub time: Option<String>,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    pub fn default_log_file() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(env::temp_dir)
            .join(APP_DIR)
            .join("voicetask.log")
    }

    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Config, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("INSTANCE_URL") {
            self.instance_url = Some(url);
        }
        if let Some(key) = var("API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(offline) = var("VOICETASK_OFFLINE") {
            self.offline = matches!(offline.as_str(), "1" | "true" | "yes");
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(time) = &self.reminders.time {
            NaiveTime::parse_from_str(time, "%H:%M")
                .map_err(|_| ConfigError::ReminderTime(time.clone()))?;
        }
        if !self.offline {
            if self.instance_url.is_none() {
                return Err(ConfigError::Missing("INSTANCE_URL"));
            }
            if self.api_key.is_none() {
                return Err(ConfigError::Missing("API_KEY"));
            }
        }
        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(Self::default_log_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
            instance_url = "https://tasks.example.com"
            api_key = "secret"

            [voice]
            strict = true
            fuzzy_matching = false

            [reminders]
            enabled = true
            kind = "manual"
            time = "08:30"
        "#;
        let config = Config::from_toml(raw).unwrap();
        assert_eq!(config.voice.strictness(), Strictness::Strict);
        assert_eq!(config.voice.match_strategy(), MatchStrategy::Substring);
        assert_eq!(config.reminders.kind, ReminderType::Manual);
        assert_eq!(config.reminders.time.as_deref(), Some("08:30"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.voice.strictness(), Strictness::Lenient);
        assert_eq!(config.voice.match_strategy(), MatchStrategy::Fuzzy);
        assert!(!config.reminders.enabled);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml(r#"instance_url = "http://file""#).unwrap();
        config.apply_env(|key| match key {
            "INSTANCE_URL" => Some("http://env".to_string()),
            "VOICETASK_OFFLINE" => Some("true".to_string()),
            _ => None,
        });
        assert_eq!(config.instance_url.as_deref(), Some("http://env"));
        assert!(config.offline);
    }

    #[test]
    fn test_missing_api_key_is_rejected_online() {
        let config = Config::from_toml(r#"instance_url = "http://x""#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("API_KEY"))
        ));
    }

    #[test]
    fn test_bad_reminder_time_is_rejected() {
        let config = Config::from_toml("offline = true\n[reminders]\ntime = \"25:99\"").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ReminderTime(_))
        ));
    }
}
