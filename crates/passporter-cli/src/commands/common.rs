use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use passporter_core::auth::FirebaseAuthClient;
use passporter_core::config::{ClientConfig, FirebaseConfig};
use passporter_core::firestore::FirestoreClient;
use passporter_core::models::{LatLng, LatLngBounds};
use passporter_core::services::{BorderPointService, CacheService};
use passporter_core::store::{FirestoreBorderPointStore, MirroredBorderPointStore, PointsStream};
use passporter_core::{BorderPoint, BorderPointId, BorderStatus, BorderUpdate, User};

use crate::auth::KeychainSessionStore;
use crate::error::CliError;

pub type RemoteStore = MirroredBorderPointStore<FirestoreBorderPointStore>;

/// Everything a command needs: resolved config, the cache and the auth client.
pub struct Context {
    pub config: ClientConfig,
    pub firebase: FirebaseConfig,
    pub cache: CacheService,
    pub auth: FirebaseAuthClient<KeychainSessionStore>,
}

impl Context {
    pub async fn open(config_path: Option<&Path>, db_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config = load_config(config_path)?;
        let firebase = config.firebase().map_err(|error| match error {
            passporter_core::Error::NotConfigured(_) => CliError::NotConfigured,
            other => CliError::Core(other),
        })?;
        tracing::debug!("Using Firebase project {}", firebase.project_id);
        let cache = open_cache(&resolve_db_path(db_path, &config)).await?;
        let auth = FirebaseAuthClient::new(
            &firebase,
            cache.clone(),
            KeychainSessionStore::new(&firebase.project_id),
        )
        .await?;
        Ok(Self {
            config,
            firebase,
            cache,
            auth,
        })
    }

    /// Remote store mirrored into the cache, authenticated when a session exists.
    pub async fn store(&self) -> Result<Arc<RemoteStore>, CliError> {
        let client = match self.auth.authorized_firestore().await? {
            Some(client) => client,
            None => FirestoreClient::new(&self.firebase)?,
        };
        let remote = FirestoreBorderPointStore::new(client, self.config.poll_interval());
        Ok(Arc::new(MirroredBorderPointStore::new(remote, self.cache.clone())))
    }

    pub async fn service(&self) -> Result<BorderPointService<RemoteStore>, CliError> {
        Ok(BorderPointService::new(self.store().await?))
    }

    /// The signed-in user, refreshing the stored session if needed.
    pub async fn signed_in_user(&self) -> Result<User, CliError> {
        if self.auth.restore_session().await?.is_none() {
            return Err(CliError::NotSignedIn);
        }
        self.auth.current_user().ok_or(CliError::NotSignedIn)
    }
}

/// Configuration from the optional file, overlaid with the environment.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, CliError> {
    let file = match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    Ok(file.merged_with(ClientConfig::from_env()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &ClientConfig) -> PathBuf {
    cli_db_path
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("passporter")
        .join("cache.db")
}

pub async fn open_cache(path: &Path) -> Result<CacheService, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(CacheService::open_path(path.to_path_buf()).await?)
}

/// First emission of a subscription, i.e. a one-shot fetch.
pub async fn first_snapshot(mut stream: PointsStream) -> Result<Vec<BorderPoint>, CliError> {
    match stream.next().await {
        Some(snapshot) => Ok(snapshot?),
        None => Ok(Vec::new()),
    }
}

pub fn normalize_point_id(id: &str) -> Result<BorderPointId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyPointId)
    } else {
        Ok(BorderPointId::from(trimmed))
    }
}

pub fn parse_status(raw: &str) -> Result<BorderStatus, CliError> {
    Ok(raw.parse::<BorderStatus>()?)
}

fn parse_coordinates(what: &'static str, raw: &str) -> Result<Vec<f64>, CliError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| CliError::InvalidArgument {
                    what,
                    value: raw.to_string(),
                    reason: "expected comma-separated numbers",
                })
        })
        .collect()
}

/// Parse `south,west,north,east`.
pub fn parse_bounds(raw: &str) -> Result<LatLngBounds, CliError> {
    let invalid = |reason| CliError::InvalidArgument {
        what: "bounds",
        value: raw.to_string(),
        reason,
    };
    let values = parse_coordinates("bounds", raw)?;
    let [south, west, north, east] = values[..] else {
        return Err(invalid("expected south,west,north,east"));
    };
    let bounds = LatLngBounds::new(LatLng::new(south, west), LatLng::new(north, east));
    if !bounds.south_west.is_valid() || !bounds.north_east.is_valid() {
        return Err(invalid("coordinates out of range"));
    }
    if south > north {
        return Err(invalid("south edge is above the north edge"));
    }
    Ok(bounds)
}

/// Parse `lat,lng;lat,lng;...`.
pub fn parse_track(raw: &str) -> Result<Vec<LatLng>, CliError> {
    let track = raw
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let values = parse_coordinates("track", segment)?;
            let [latitude, longitude] = values[..] else {
                return Err(CliError::InvalidArgument {
                    what: "track",
                    value: segment.to_string(),
                    reason: "expected lat,lng",
                });
            };
            let position = LatLng::new(latitude, longitude);
            if position.is_valid() {
                Ok(position)
            } else {
                Err(CliError::InvalidArgument {
                    what: "track",
                    value: segment.to_string(),
                    reason: "coordinates out of range",
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if track.is_empty() {
        Err(CliError::MissingArgument("track positions"))
    } else {
        Ok(track)
    }
}

pub fn format_point_lines(points: &[BorderPoint]) -> Vec<String> {
    points
        .iter()
        .map(|point| {
            let id = point.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            format!(
                "{short_id:<13}  {:<10}  {:<40}  {}",
                point.status.as_str(),
                truncate(&point.label(), 40),
                point.location()
            )
        })
        .collect()
}

pub fn format_point_details(point: &BorderPoint) -> Vec<String> {
    let mut lines = vec![
        point.label(),
        format!("id:        {}", point.id),
        format!("status:    {}", point.status),
        format!("location:  {}", point.location()),
        format!(
            "updated:   {}",
            format_relative_time(point.updated_at, Utc::now().timestamp_millis())
        ),
    ];
    if let Some(comment) = &point.status_comment {
        lines.push(format!("comment:   {comment}"));
    }
    if let Some(description) = &point.description {
        lines.push(String::new());
        lines.push(description.clone());
    }
    lines
}

pub fn format_update_lines(updates: &[BorderUpdate], now_ms: i64) -> Vec<String> {
    updates
        .iter()
        .map(|update| {
            let when = format_relative_time(update.timestamp, now_ms);
            let who = update
                .reporter_name
                .as_deref()
                .unwrap_or(&update.reporter_id);
            if update.message.is_empty() {
                format!("{when:<10}  {:<10}  {who}", update.status.as_str())
            } else {
                format!(
                    "{when:<10}  {:<10}  {who}: {}",
                    update.status.as_str(),
                    update.message
                )
            }
        })
        .collect()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated = text
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
