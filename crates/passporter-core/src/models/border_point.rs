//! Border point model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::geo::LatLng;

/// Identifier of a border point.
///
/// Ids coming from the remote store are accepted verbatim; ids generated on the
/// client use UUID v7 so they sort by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BorderPointId(String);

impl BorderPointId {
    /// Generate a new client-side id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BorderPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BorderPointId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(crate::Error::validation(
                "id",
                "border point id must be non-empty and must not contain '/'",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for BorderPointId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Operational status of a crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorderStatus {
    Open,
    Closed,
    Restricted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl BorderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Restricted => "RESTRICTED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for BorderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BorderStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "RESTRICTED" => Ok(Self::Restricted),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(crate::Error::validation(
                "status",
                format!("unknown status '{other}'"),
            )),
        }
    }
}

/// Kinds of traffic a crossing admits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficType {
    Pedestrian,
    Car,
    Truck,
    Bus,
    Bicycle,
    Motorcycle,
    Train,
}

/// Seasonal variant of the opening schedule
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeasonalHours {
    pub name: String,
    /// `YYYY-MM-DD` or `MM-DD` for recurring seasons
    pub start_date: String,
    pub end_date: String,
    pub hours: String,
}

/// A period during which the crossing is closed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClosurePeriod {
    pub start_date: String,
    pub end_date: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperatingHours {
    /// Regular schedule, e.g. "24/7" or "06:00-22:00"
    pub regular: Option<String>,
    pub seasonal: Vec<SeasonalHours>,
    pub closures: Vec<ClosurePeriod>,
}

/// Road conditions on each side of the crossing
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoadConditions {
    pub approach_a: Option<String>,
    pub approach_b: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Accessibility {
    pub traffic_types: Vec<TrafficType>,
    pub road_conditions: Option<RoadConditions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Facilities {
    pub amenities: Vec<String>,
    pub services: Vec<String>,
}

/// A border crossing point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderPoint {
    pub id: BorderPointId,
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// ISO 3166-1 alpha-2 code of the first country
    #[serde(default)]
    pub country_a: String,
    /// ISO 3166-1 alpha-2 code of the second country
    #[serde(default)]
    pub country_b: String,
    #[serde(default)]
    pub status: BorderStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status_comment: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    /// Creation timestamp (Unix ms)
    #[serde(default)]
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub operating_hours: Option<OperatingHours>,
    #[serde(default)]
    pub accessibility: Option<Accessibility>,
    #[serde(default)]
    pub facilities: Option<Facilities>,
    /// Soft delete flag; records are never physically removed
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<i64>,
    #[serde(default)]
    pub deleted_by: Option<String>,
}

impl BorderPoint {
    /// Create a new point with unknown status and a generated id
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        location: LatLng,
        country_a: impl Into<String>,
        country_b: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: BorderPointId::generate(),
            name: name.into(),
            latitude: location.latitude,
            longitude: location.longitude,
            country_a: country_a.into(),
            country_b: country_b.into(),
            status: BorderStatus::Unknown,
            description: None,
            status_comment: None,
            created_by: None,
            data_source: None,
            source_id: None,
            created_at: now,
            updated_at: now,
            operating_hours: None,
            accessibility: None,
            facilities: None,
            deleted: false,
            deleted_at: None,
            deleted_by: None,
        }
    }

    pub const fn location(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Mark this record as soft-deleted by `actor_id` at `at` (Unix ms)
    pub fn mark_deleted(&mut self, actor_id: impl Into<String>, at: i64) {
        self.deleted = true;
        self.deleted_at = Some(at);
        self.deleted_by = Some(actor_id.into());
        self.updated_at = at;
    }

    /// Short label like "Name (AT-SI)"
    pub fn label(&self) -> String {
        format!("{} ({}-{})", self.name, self.country_a, self.country_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(BorderPointId::generate(), BorderPointId::generate());
    }

    #[test]
    fn id_parse_rejects_path_separators() {
        assert!("abc/def".parse::<BorderPointId>().is_err());
        assert!("  ".parse::<BorderPointId>().is_err());
        assert_eq!(
            " karawanken ".parse::<BorderPointId>().unwrap().as_str(),
            "karawanken"
        );
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("open".parse::<BorderStatus>().unwrap(), BorderStatus::Open);
        assert_eq!(
            "Restricted".parse::<BorderStatus>().unwrap(),
            BorderStatus::Restricted
        );
        assert!("ajar".parse::<BorderStatus>().is_err());
    }

    #[test]
    fn unknown_remote_status_deserializes_as_unknown() {
        let status: BorderStatus = serde_json::from_str("\"PARTIALLY_OPEN\"").unwrap();
        assert_eq!(status, BorderStatus::Unknown);
    }

    #[test]
    fn deserializes_sparse_remote_document() {
        let json = r#"{
            "id": "karawanken",
            "latitude": 46.44,
            "longitude": 14.02,
            "countryA": "AT",
            "countryB": "SI",
            "status": "OPEN",
            "operatingHours": { "regular": "24/7" },
            "accessibility": { "trafficTypes": ["CAR", "TRUCK"] }
        }"#;
        let point: BorderPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.id.as_str(), "karawanken");
        assert_eq!(point.status, BorderStatus::Open);
        assert!(!point.deleted);
        assert_eq!(
            point.operating_hours.unwrap().regular.as_deref(),
            Some("24/7")
        );
        assert_eq!(
            point.accessibility.unwrap().traffic_types,
            vec![TrafficType::Car, TrafficType::Truck]
        );
    }

    #[test]
    fn mark_deleted_sets_metadata() {
        let mut point = BorderPoint::new("Loibl", LatLng::new(46.43, 14.26), "AT", "SI");
        point.mark_deleted("user-1", 1_700_000_000_000);
        assert!(point.deleted);
        assert_eq!(point.deleted_at, Some(1_700_000_000_000));
        assert_eq!(point.deleted_by.as_deref(), Some("user-1"));
        assert_eq!(point.updated_at, 1_700_000_000_000);
    }
}
