use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::storage::default_data_path;

/// Longest accepted session lifetime, one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProviderKind {
    /// Users registered with `timetracker add-user`, kept in the data file.
    #[default]
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub bind: String,
    pub data_path: Option<PathBuf>,
    pub log_level: String,
    pub identity: IdentityProviderKind,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            data_path: None,
            log_level: "info".to_string(),
            identity: IdentityProviderKind::Local,
            session_ttl_hours: default_session_ttl_hours(),
            secure_cookies: false,
        }
    }
}

impl Settings {
    pub fn resolved_data_path(&self) -> Option<PathBuf> {
        self.data_path.clone().or_else(default_data_path)
    }

    pub fn session_ttl(&self) -> Duration {
        let hours = self.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS);
        Duration::try_hours(hours).unwrap_or(Duration::MAX)
    }

    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
            return Err(format!(
                "session_ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}, got {}",
                self.session_ttl_hours
            ));
        }
        Ok(())
    }
}

/// Reads the config file, falling back to defaults when it does not exist.
pub fn load(path: Option<PathBuf>) -> Result<Settings, io::Error> {
    let Some(path) = path.or_else(config_path) else {
        return Ok(Settings::default());
    };
    match fs::read_to_string(&path) {
        Ok(contents) => parse(&contents),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(err) => Err(err),
    }
}

fn parse(contents: &str) -> Result<Settings, io::Error> {
    let settings: Settings = serde_json::from_str(contents)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    settings
        .validate()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok(settings)
}

fn config_path() -> Option<PathBuf> {
    if let Ok(value) = env::var("TIMETRACKER_CONFIG") {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value));
        }
    }

    let mut path = dirs::home_dir()?;
    path.push(".timetracker.json");
    Some(path)
}

const fn default_session_ttl_hours() -> i64 {
    24 * 14
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let settings = parse(r#"{"bind": "0.0.0.0:9000"}"#).unwrap();
        assert_eq!(settings.bind, "0.0.0.0:9000");
        assert_eq!(settings.identity, IdentityProviderKind::Local);
        assert_eq!(settings.session_ttl_hours, 336);
        assert!(!settings.secure_cookies);
    }

    #[test]
    fn unknown_identity_provider_is_rejected() {
        assert!(parse(r#"{"identity": "ldap"}"#).is_err());
    }

    #[test]
    fn session_ttl_out_of_range_is_rejected() {
        for value in ["0", "-5", "10000000000", "9223372036854775807"] {
            let err = parse(&format!(r#"{{"session_ttl_hours": {value}}}"#)).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
            assert!(err.to_string().contains("session_ttl_hours"), "{err}");
        }
        let settings = parse(r#"{"session_ttl_hours": 8760}"#).unwrap();
        assert_eq!(settings.session_ttl(), Duration::hours(8760));
    }

    #[test]
    fn session_ttl_is_clamped_when_set_in_code() {
        let negative = Settings {
            session_ttl_hours: -1,
            ..Settings::default()
        };
        assert_eq!(negative.session_ttl(), Duration::hours(1));
        let huge = Settings {
            session_ttl_hours: i64::MAX,
            ..Settings::default()
        };
        assert_eq!(huge.session_ttl(), Duration::hours(MAX_SESSION_TTL_HOURS));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load(Some(dir.path().join("absent.json"))).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn explicit_data_path_wins() {
        let settings = Settings {
            data_path: Some(PathBuf::from("/tmp/tt.json")),
            ..Settings::default()
        };
        assert_eq!(
            settings.resolved_data_path(),
            Some(PathBuf::from("/tmp/tt.json"))
        );
    }
}
