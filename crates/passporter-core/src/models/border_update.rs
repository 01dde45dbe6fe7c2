//! Status reports attached to a border point

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::border_point::{BorderPointId, BorderStatus};

/// An append-only status report for one border point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderUpdate {
    pub id: String,
    pub border_point_id: BorderPointId,
    pub status: BorderStatus,
    #[serde(default)]
    pub message: String,
    /// Report time (Unix ms)
    pub timestamp: i64,
    pub reporter_id: String,
    #[serde(default)]
    pub reporter_name: Option<String>,
}

impl BorderUpdate {
    #[must_use]
    pub fn new(
        border_point_id: BorderPointId,
        status: BorderStatus,
        message: impl Into<String>,
        reporter_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            border_point_id,
            status,
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            reporter_id: reporter_id.into(),
            reporter_name: None,
        }
    }
}

/// Sort updates for display, newest first.
pub fn sort_newest_first(updates: &mut [BorderUpdate]) {
    updates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_at(id: &str, timestamp: i64) -> BorderUpdate {
        BorderUpdate {
            id: id.to_string(),
            border_point_id: BorderPointId::from("p1"),
            status: BorderStatus::Open,
            message: String::new(),
            timestamp,
            reporter_id: "u1".to_string(),
            reporter_name: None,
        }
    }

    #[test]
    fn sorts_newest_first() {
        let mut updates = vec![update_at("a", 10), update_at("b", 30), update_at("c", 20)];
        sort_newest_first(&mut updates);
        let ids: Vec<_> = updates.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn new_update_is_stamped() {
        let update = BorderUpdate::new(
            BorderPointId::from("p1"),
            BorderStatus::Closed,
            "Queue 3h",
            "u1",
        );
        assert!(update.timestamp > 0);
        assert_eq!(update.status, BorderStatus::Closed);
        assert!(!update.id.is_empty());
    }
}
