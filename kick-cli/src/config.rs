//! On-disk configuration and credential storage.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use kick_api::{BoxError, Credential, CredentialSink, KickConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

const CONFIG_FILE: &str = "config.toml";

/// Contents of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub kick: KickConfig,
    /// Last credential obtained by `kick authorize`, kept current on refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
}

impl AppConfig {
    /// `<config dir>/kick/config.toml`, or `./kick.toml` when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("kick").join(CONFIG_FILE),
            None => PathBuf::from("kick.toml"),
        }
    }

    /// Read `path`; a missing file yields the defaults.
    pub async fn read(path: &Path) -> anyhow::Result<Self> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub async fn write(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self).context("Failed to serialize config")?;
        tokio::fs::write(path, text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Writes refreshed credentials back into the config file.
///
/// Only the `credential` table is replaced; everything else is re-read from
/// disk so environment and flag overrides never end up in the file.
pub struct CredentialFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn store(&self, credential: &Credential) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut config = AppConfig::read(&self.path).await?;
        config.credential = Some(credential.clone());
        config.write(&self.path).await?;
        debug!(path = %self.path.display(), "Credential stored");
        Ok(())
    }
}

#[async_trait]
impl CredentialSink for CredentialFile {
    async fn persist(&self, credential: &Credential) -> Result<(), BoxError> {
        self.store(credential).await.map_err(BoxError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::read(&dir.path().join("nope.toml")).await.unwrap();
        assert!(config.credential.is_none());
        assert_eq!(config.kick.webhook.port, 3000);
    }

    #[tokio::test]
    async fn test_store_keeps_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(
            &path,
            "[kick]\nclient_id = \"abc\"\nscopes = [\"user:read\"]\n",
        )
        .await
        .unwrap();

        let expires = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let credential =
            Credential::new("access", Some("refresh".to_string())).with_expires_at(expires);
        let file = CredentialFile::new(&path);
        file.persist(&credential).await.unwrap();

        let config = AppConfig::read(&path).await.unwrap();
        assert_eq!(config.kick.client_id, "abc");
        assert_eq!(config.kick.scopes, ["user:read"]);
        assert_eq!(config.credential, Some(credential));
    }

    #[tokio::test]
    async fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        tokio::fs::write(&path, "kick = 3").await.unwrap();
        assert!(AppConfig::read(&path).await.is_err());
    }
}
