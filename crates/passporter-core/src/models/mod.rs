//! Data models for PassPorter

mod border_point;
mod border_update;
mod geo;
mod user;

pub use border_point::{
    Accessibility, BorderPoint, BorderPointId, BorderStatus, ClosurePeriod, Facilities,
    OperatingHours, RoadConditions, SeasonalHours, TrafficType,
};
pub use border_update::{sort_newest_first, BorderUpdate};
pub use geo::{CameraPosition, LatLng, LatLngBounds};
pub use user::{User, DEFAULT_LANGUAGE};
