//! Client configuration.
//!
//! Provides a unified `ClientConfig` used by every front end to discover the
//! Firebase project, the local cache location, and map sync tuning. Values
//! come from a JSON file, the process environment, or both (environment wins).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::map::MapSyncConfig;
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_PROJECT_ID: &str = "PASSPORTER_FIREBASE_PROJECT_ID";
pub const ENV_API_KEY: &str = "PASSPORTER_FIREBASE_API_KEY";
pub const ENV_FIRESTORE_URL: &str = "PASSPORTER_FIRESTORE_URL";
pub const ENV_IDENTITY_URL: &str = "PASSPORTER_IDENTITY_URL";
pub const ENV_DB_PATH: &str = "PASSPORTER_DB_PATH";
pub const ENV_POLL_INTERVAL_SECS: &str = "PASSPORTER_POLL_INTERVAL_SECS";
pub const ENV_MIN_ZOOM: &str = "PASSPORTER_MIN_ZOOM";

const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Client configuration.
///
/// These values are safe-to-ship public identifiers. Secrets such as session
/// tokens never live here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub firebase_project_id: Option<String>,
    #[serde(default)]
    pub firebase_api_key: Option<String>,
    /// Override for the Firestore REST root (emulators)
    #[serde(default)]
    pub firestore_url: Option<String>,
    /// Override for the Identity Toolkit REST root (emulators)
    #[serde(default)]
    pub identity_url: Option<String>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub map: MapSyncConfig,
}

impl ClientConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup (testable without env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            firebase_project_id: normalize_text_option(lookup(ENV_PROJECT_ID)),
            firebase_api_key: normalize_text_option(lookup(ENV_API_KEY)),
            firestore_url: normalize_text_option(lookup(ENV_FIRESTORE_URL)),
            identity_url: normalize_text_option(lookup(ENV_IDENTITY_URL)),
            db_path: normalize_text_option(lookup(ENV_DB_PATH)).map(PathBuf::from),
            poll_interval_secs: normalize_text_option(lookup(ENV_POLL_INTERVAL_SECS))
                .and_then(|raw| raw.parse().ok()),
            map: MapSyncConfig::default(),
        };
        if let Some(min_zoom) =
            normalize_text_option(lookup(ENV_MIN_ZOOM)).and_then(|raw| raw.parse().ok())
        {
            config.map.min_zoom = min_zoom;
        }
        config
    }

    /// Overlay `other` on top of `self`; set values in `other` win.
    #[must_use]
    pub fn merged_with(self, other: Self) -> Self {
        let map = if other.map == MapSyncConfig::default() {
            self.map
        } else {
            other.map
        };
        Self {
            firebase_project_id: other.firebase_project_id.or(self.firebase_project_id),
            firebase_api_key: other.firebase_api_key.or(self.firebase_api_key),
            firestore_url: other.firestore_url.or(self.firestore_url),
            identity_url: other.identity_url.or(self.identity_url),
            db_path: other.db_path.or(self.db_path),
            poll_interval_secs: other.poll_interval_secs.or(self.poll_interval_secs),
            map,
        }
    }

    /// Polling interval for live subscriptions against the REST backend.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        )
    }

    /// Resolve the Firebase endpoints, failing when the project is not set up.
    pub fn firebase(&self) -> Result<FirebaseConfig> {
        let project_id = normalize_text_option(self.firebase_project_id.clone())
            .ok_or(Error::NotConfigured("firebase project id"))?;
        let api_key = normalize_text_option(self.firebase_api_key.clone())
            .ok_or(Error::NotConfigured("firebase api key"))?;

        let firestore_root = normalize_root(self.firestore_url.clone(), DEFAULT_FIRESTORE_URL)?;
        let identity_root = normalize_root(self.identity_url.clone(), DEFAULT_IDENTITY_URL)?;

        Ok(FirebaseConfig {
            documents_url: format!(
                "{firestore_root}/projects/{project_id}/databases/(default)/documents"
            ),
            identity_url: identity_root,
            secure_token_url: DEFAULT_SECURE_TOKEN_URL.to_string(),
            project_id,
            api_key,
        })
    }
}

/// Resolved Firebase endpoints for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub api_key: String,
    /// `.../projects/{id}/databases/(default)/documents`
    pub documents_url: String,
    pub identity_url: String,
    pub secure_token_url: String,
}

fn normalize_root(raw: Option<String>, default: &str) -> Result<String> {
    let Some(value) = normalize_text_option(raw) else {
        return Ok(default.to_string());
    };
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::validation(
            "url",
            format!("'{value}' must include http:// or https://"),
        ))
    }
}
