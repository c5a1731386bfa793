//! Per-user session file holding the login token and gateway URL.
//!
//! Saves merge shallowly into whatever the file already holds, so keys
//! written by other tools survive.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{BimoError, BimoResult};

const SESSION_FILE_NAME: &str = "config.json";

/// Contents of the session file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "gatewayUrl", default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reads and writes `config.json` under the session directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE_NAME),
        }
    }

    /// Store rooted at the configured session directory.
    pub fn from_config(config: &AppConfig) -> BimoResult<Self> {
        config
            .session_dir()
            .map(Self::new)
            .ok_or(BimoError::NoSessionDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the session. A missing or unreadable file is an empty session.
    pub fn load(&self) -> SessionState {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %self.path.display(), error = %err, "Ignoring malformed session file");
                SessionState::default()
            }),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "No session file");
                SessionState::default()
            }
        }
    }

    /// Merges the provided fields into the file, leaving other keys untouched.
    pub fn save(&self, token: Option<&str>, gateway_url: Option<&str>) -> BimoResult<()> {
        let mut merged = match fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(token) = token {
            merged.insert("token".to_string(), Value::String(token.to_string()));
        }
        if let Some(gateway_url) = gateway_url {
            merged.insert("gatewayUrl".to_string(), Value::String(gateway_url.to_string()));
        }

        let rendered = serde_json::to_string_pretty(&Value::Object(merged)).map_err(|source| {
            BimoError::SessionFormat {
                path: self.path.clone(),
                source,
            }
        })?;
        self.write(rendered.as_bytes())
            .map_err(|source| BimoError::Session {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn write(&self, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(contents)?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        assert_eq!(store.load(), SessionState::default());
    }

    #[test]
    fn save_creates_directory_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join(".bimo"));
        store
            .save(Some("tok-1"), Some("https://gw.example/v1"))
            .unwrap();

        let state = store.load();
        assert_eq!(state.token.as_deref(), Some("tok-1"));
        assert_eq!(state.gateway_url.as_deref(), Some("https://gw.example/v1"));
    }

    #[test]
    fn save_merges_shallowly_and_keeps_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        fs::write(
            store.path(),
            r#"{"token":"old","theme":"dark","gatewayUrl":"https://old.example/v1"}"#,
        )
        .unwrap();

        store.save(Some("new"), None).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["token"], "new");
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["gatewayUrl"], "https://old.example/v1");
        assert_eq!(store.load().extra.get("theme"), Some(&Value::from("dark")));
    }

    #[test]
    fn malformed_file_loads_as_empty_and_is_replaced_on_save() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        fs::write(store.path(), "{oops").unwrap();

        assert_eq!(store.load(), SessionState::default());
        store.save(Some("t"), None).unwrap();
        assert_eq!(store.load().token.as_deref(), Some("t"));
    }
}
