use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use skiff_client::Credentials;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Toml(String),
    #[error("not logged in; run `skiff auth login`")]
    NotLoggedIn,
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
}

impl From<toml::de::Error> for CredentialsError {
    fn from(value: toml::de::Error) -> Self {
        CredentialsError::Toml(value.to_string())
    }
}

impl From<toml::ser::Error> for CredentialsError {
    fn from(value: toml::ser::Error) -> Self {
        CredentialsError::Toml(value.to_string())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub user: String,
    pub api_key: String,
    #[serde(default)]
    pub host: Option<String>,
}

impl StoredProfile {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user.clone(), self.api_key.clone())
    }
}

impl fmt::Debug for StoredProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredProfile")
            .field("user", &self.user)
            .field("api_key", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

/// Named API-key profiles persisted as TOML, readable only by the owner.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CredentialsStore {
    #[serde(default)]
    pub current_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, StoredProfile>,
}

impl CredentialsStore {
    pub fn default_path() -> Result<PathBuf, CredentialsError> {
        let base = BaseDirs::new()
            .ok_or_else(|| CredentialsError::Config("unable to determine home directory".into()))?;
        Ok(base.home_dir().join(".skiff").join("credentials"))
    }

    pub fn load() -> Result<Self, CredentialsError> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, CredentialsError> {
        if !path.exists() {
            return Ok(CredentialsStore::default());
        }
        let raw = fs::read_to_string(path)?;
        let mut store: CredentialsStore = toml::from_str(&raw)?;
        store.compact();
        Ok(store)
    }

    pub fn save(&self) -> Result<(), CredentialsError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CredentialsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let serialized = toml::to_string_pretty(self)?;
        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(serialized.as_bytes())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        tracing::debug!(target: "skiff::auth", path = %path.display(), "credentials saved");
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<&StoredProfile> {
        self.profiles.get(name)
    }

    pub fn upsert_profile(&mut self, name: String, profile: StoredProfile, set_current: bool) {
        self.profiles.insert(name.clone(), profile);
        if set_current || self.current_profile.is_none() {
            self.current_profile = Some(name);
        }
    }

    pub fn remove_profile(&mut self, name: &str) -> Option<StoredProfile> {
        let removed = self.profiles.remove(name);
        if self.current_profile.as_deref() == Some(name) {
            self.current_profile = self.profiles.keys().next().cloned();
        }
        removed
    }

    /// Picks the explicitly requested profile, else the current one.
    pub fn resolve(
        &self,
        requested: Option<&str>,
    ) -> Result<(&str, &StoredProfile), CredentialsError> {
        match requested {
            Some(name) => self
                .profiles
                .get_key_value(name)
                .map(|(name, profile)| (name.as_str(), profile))
                .ok_or_else(|| CredentialsError::ProfileNotFound(name.to_string())),
            None => {
                let name = self
                    .current_profile
                    .as_deref()
                    .ok_or(CredentialsError::NotLoggedIn)?;
                self.profiles
                    .get_key_value(name)
                    .map(|(name, profile)| (name.as_str(), profile))
                    .ok_or(CredentialsError::NotLoggedIn)
            }
        }
    }

    /// Drops a dangling current profile.
    pub fn compact(&mut self) {
        let dangling = self
            .current_profile
            .as_ref()
            .is_some_and(|name| !self.profiles.contains_key(name));
        if dangling {
            self.current_profile = self.profiles.keys().next().cloned();
        }
    }
}
