//! Settings loading and validation.
//!
//! Settings are merged with [`figment`], lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. the settings file (`.json`, or `.toml` by extension),
//! 3. environment variables prefixed `DRIVESORT_` (nested keys separated by a
//!    double underscore, e.g. `DRIVESORT_RETRY__ATTEMPTS=5`),
//! 4. explicit overrides set through [`Loader::set`] (command-line flags).
//!
//! The settings file written for earlier releases used PascalCase keys
//! (`ApplicationId`, `RedirectUri`, `PhotosFolderPath`); those are still
//! understood.
//!
//! ```json
//! {
//!     "application_id": "00000000-0000-0000-0000-000000000000",
//!     "redirect_uri": "http://localhost",
//!     "photos_folder_path": "/Pictures/Camera Roll",
//!     "refresh_token": "M.C105_BAY...",
//!     "retry": { "attempts": 3, "delay_secs": 3 }
//! }
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use drivesort_storage::validate_path;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "DRIVESORT_";
const FILE_NAME: &str = "settings.json";
const LEGACY_KEYS: [(&str, &str); 3] = [
    ("ApplicationId", "application_id"),
    ("RedirectUri", "redirect_uri"),
    ("PhotosFolderPath", "photos_folder_path"),
];

/// How the delay between move attempts grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry
    #[default]
    Fixed,
    /// Delay doubles after every attempt, capped at `max_delay_secs`
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per move, including the first one
    pub attempts: u32,
    pub delay_secs: u64,
    pub backoff: BackoffKind,
    pub max_delay_secs: u64,
}
impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_secs: 3,
            backoff: BackoffKind::Fixed,
            max_delay_secs: 60,
        }
    }
}
impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

/// Which credential to hand to the token provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// A ready-to-use bearer token
    AccessToken(String),
    /// A refresh token to redeem against the identity platform
    RefreshToken(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub application_id: String,
    pub redirect_uri: String,
    /// Drive path of the folder to organize
    pub photos_folder_path: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub retry: RetrySettings,
}
impl Settings {
    /// The credential to use; an explicit access token wins over a refresh
    /// token.
    pub fn credential(&self) -> Option<Credential> {
        let present = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        present(&self.access_token)
            .map(Credential::AccessToken)
            .or_else(|| present(&self.refresh_token).map(Credential::RefreshToken))
    }

    /// Checks that every setting the organizer needs is present and usable,
    /// normalizing the source folder path in the process.
    pub fn validate(mut self) -> Result<Self> {
        if self.application_id.trim().is_empty() {
            exn::bail!(ErrorKind::Missing("application_id"));
        }
        if self.redirect_uri.trim().is_empty() {
            exn::bail!(ErrorKind::Missing("redirect_uri"));
        }
        if self.photos_folder_path.trim().is_empty() {
            exn::bail!(ErrorKind::Missing("photos_folder_path"));
        }
        self.photos_folder_path =
            validate_path(&self.photos_folder_path).or_raise(|| ErrorKind::Invalid("photos_folder_path"))?;
        if self.credential().is_none() {
            exn::bail!(ErrorKind::Missing("access_token or refresh_token"));
        }
        if self.retry.attempts == 0 {
            exn::bail!(ErrorKind::Invalid("retry.attempts"));
        }
        if self.retry.max_delay_secs < self.retry.delay_secs {
            exn::bail!(ErrorKind::Invalid("retry.max_delay_secs"));
        }
        Ok(self)
    }
}

/// Where settings are read from when no path is given: `settings.json` in the
/// platform configuration directory if it exists, otherwise in the current
/// working directory.
pub fn default_path() -> PathBuf {
    ProjectDirs::from("", "", "drivesort")
        .map(|dirs| dirs.config_dir().join(FILE_NAME))
        .filter(|path| path.is_file())
        .unwrap_or_else(|| PathBuf::from(FILE_NAME))
}

/// Builds the layered settings figment.
pub struct Loader {
    figment: Figment,
}
impl Loader {
    /// Start from the settings file at `path`, or [`default_path()`] when
    /// `None`. An explicit path must exist; the default one may be absent, in
    /// which case settings come from the environment alone.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_path(), false),
        };
        if explicit && !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path));
        }
        tracing::debug!(path = %path.display(), exists = path.is_file(), "Loading settings");
        Ok(Self::from_figment(Figment::from(Serialized::defaults(Defaults::default())).merge(file_provider(&path))))
    }

    /// Start from an arbitrary figment (the environment layer is still added
    /// on top). Mostly useful for tests.
    pub fn from_figment(figment: Figment) -> Self {
        let figment = with_legacy_keys(figment).merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self { figment }
    }

    /// Override a single key, e.g. from a command-line flag.
    pub fn set(mut self, key: &str, value: impl Serialize) -> Self {
        self.figment = self.figment.merge(Serialized::default(key, value));
        self
    }

    pub fn load(self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().or_raise(|| ErrorKind::Parse)?;
        settings.validate()
    }
}

/// Only the keys without legacy spellings get defaults; seeding the others
/// would hide a PascalCase key in the settings file.
#[derive(Default, Serialize)]
struct Defaults {
    retry: RetrySettings,
}

fn file_provider(path: &Path) -> Figment {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Figment::from(Toml::file(path)),
        _ => Figment::from(Json::file(path)),
    }
}

/// Copies PascalCase keys to their snake_case names, unless the snake_case
/// key is already set.
fn with_legacy_keys(figment: Figment) -> Figment {
    LEGACY_KEYS.iter().fold(figment, |figment, (legacy, key)| match figment.find_value(legacy) {
        Ok(value) if figment.find_value(key).is_err() => figment.merge(Serialized::default(key, value)),
        _ => figment,
    })
}
