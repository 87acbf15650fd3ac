//! Credential resolution for repositories and registries
//!
//! Inline username/password pairs win. Otherwise the `serverId` is looked up
//! in the settings store and its password goes through the secret
//! dispatcher:
//! - `{env:NAME}` reads an environment variable
//! - `{base64:DATA}` decodes base64
//! - any other `{...}` value is an unknown cipher and fails
//! - plain strings are used as-is

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};

/// Environment variable overriding the settings store location
pub const SETTINGS_ENV: &str = "HELMDEPLOY_SETTINGS";

/// Resolved basic credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

/// A server entry of the settings store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Named server credentials, loaded from `settings.yaml`
///
/// ```yaml
/// servers:
///   - id: chartmuseum
///     username: deployer
///     password: "{env:CHARTMUSEUM_PASSWORD}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStore {
    #[serde(default)]
    pub servers: Vec<Server>,
}

impl ServerStore {
    /// Default location: `{config_dir}/helmdeploy/settings.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("helmdeploy").join("settings.yaml"))
    }

    /// Load from an explicit path, the environment override, or the default
    /// location. A missing file yields an empty store.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(SETTINGS_ENV)
                .map(PathBuf::from)
                .or_else(Self::default_path),
        };

        match path {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                tracing::debug!("No settings file at {}", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| RepoError::InvalidSettings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }
}

/// Turns a stored password into its clear-text value
pub trait SecretDecryptor: Send + Sync {
    fn decrypt(&self, value: &str) -> std::result::Result<String, String>;
}

/// `{env:NAME}` / `{base64:DATA}` dispatcher
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSecretDecryptor;

impl SecretDecryptor for DefaultSecretDecryptor {
    fn decrypt(&self, value: &str) -> std::result::Result<String, String> {
        let Some(inner) = value
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        else {
            return Ok(value.to_string());
        };

        match inner.split_once(':') {
            Some(("env", name)) => {
                std::env::var(name).map_err(|_| format!("environment variable {} is not set", name))
            }
            Some(("base64", data)) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data.trim())
                    .map_err(|e| format!("invalid base64: {}", e))?;
                String::from_utf8(bytes).map_err(|_| "decoded secret is not UTF-8".to_string())
            }
            Some((cipher, _)) => Err(format!("unknown cipher '{}'", cipher)),
            None => Err("encrypted value without cipher prefix".to_string()),
        }
    }
}

/// Resolves the credentials of a repo or registry entry
pub struct CredentialResolver {
    store: ServerStore,
    decryptor: Box<dyn SecretDecryptor>,
}

impl CredentialResolver {
    pub fn new(store: ServerStore) -> Self {
        Self {
            store,
            decryptor: Box::new(DefaultSecretDecryptor),
        }
    }

    pub fn with_decryptor(mut self, decryptor: impl SecretDecryptor + 'static) -> Self {
        self.decryptor = Box::new(decryptor);
        self
    }

    pub fn store(&self) -> &ServerStore {
        &self.store
    }

    /// Explicit credentials first, then the server referenced by `server_id`
    ///
    /// Explicit credentials are used only when both username and password are
    /// set. An unknown server id is logged and treated as anonymous; a
    /// password that cannot be decrypted is an error.
    pub fn resolve(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        server_id: Option<&str>,
    ) -> Result<Option<Credentials>> {
        match (username, password) {
            (Some(username), Some(password)) => {
                return Ok(Some(Credentials::new(username, password)));
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "Ignoring incomplete inline credentials; username and password must both be set"
                );
            }
            (None, None) => {}
        }

        let Some(server_id) = server_id else {
            return Ok(None);
        };

        let Some(server) = self.store.get(server_id) else {
            tracing::warn!(
                "No server definition found for {}. Please check your settings file.",
                server_id
            );
            return Ok(None);
        };

        let password = match server.password.as_deref() {
            Some(stored) => self.decryptor.decrypt(stored).map_err(|message| {
                RepoError::DecryptionFailed {
                    server_id: server_id.to_string(),
                    message,
                }
            })?,
            None => String::new(),
        };

        Ok(Some(Credentials::new(
            server.username.clone().unwrap_or_default(),
            password,
        )))
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new(ServerStore::default())
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("servers", &self.store.servers.len())
            .finish_non_exhaustive()
    }
}
