//! User-facing border point use cases.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{
    Accessibility, BorderPoint, BorderPointId, BorderStatus, BorderUpdate, Facilities, LatLng,
    OperatingHours, User,
};
use crate::store::BorderPointStore;
use crate::util::{normalize_text_option, unix_millis_now};
use crate::{validation, Error, Result};

/// Provenance tag for points submitted from the app
pub const USER_DATA_SOURCE: &str = "user";

/// A point as entered by the user, before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderPointDraft {
    pub name: String,
    pub location: LatLng,
    pub country_a: String,
    pub country_b: String,
    #[serde(default)]
    pub status: BorderStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status_comment: Option<String>,
    #[serde(default)]
    pub operating_hours: Option<OperatingHours>,
    #[serde(default)]
    pub accessibility: Option<Accessibility>,
    #[serde(default)]
    pub facilities: Option<Facilities>,
}

impl BorderPointDraft {
    pub fn new(
        name: impl Into<String>,
        location: LatLng,
        country_a: impl Into<String>,
        country_b: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            country_a: country_a.into(),
            country_b: country_b.into(),
            status: BorderStatus::Unknown,
            description: None,
            status_comment: None,
            operating_hours: None,
            accessibility: None,
            facilities: None,
        }
    }

    fn into_point(self) -> BorderPoint {
        let mut point = BorderPoint::new(
            self.name.trim(),
            self.location,
            self.country_a.trim().to_ascii_uppercase(),
            self.country_b.trim().to_ascii_uppercase(),
        );
        point.status = self.status;
        point.description = normalize_text_option(self.description);
        point.status_comment = normalize_text_option(self.status_comment);
        point.operating_hours = self.operating_hours;
        point.accessibility = self.accessibility;
        point.facilities = self.facilities;
        point
    }
}

/// Validated create/edit/delete/report flows over any store.
pub struct BorderPointService<S> {
    store: Arc<S>,
}

impl<S> Clone for BorderPointService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: BorderPointStore> BorderPointService<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up a point that has not been deleted.
    pub async fn find(&self, id: &BorderPointId) -> Result<BorderPoint> {
        match self.store.get(id).await? {
            Some(point) if !point.deleted => Ok(point),
            _ => Err(Error::NotFound(format!("border point {id}"))),
        }
    }

    /// Create a new point owned by `actor`.
    pub async fn submit(&self, draft: BorderPointDraft, actor: &User) -> Result<BorderPoint> {
        let mut point = draft.into_point();
        validation::border_point(&point)?;

        point.created_by = Some(actor.id.clone());
        point.data_source = Some(USER_DATA_SOURCE.to_string());

        self.store.create(&point).await?;
        tracing::info!("{} submitted border point {}", actor.label(), point.id);
        Ok(point)
    }

    /// Replace an existing point with `point`.
    pub async fn edit(&self, mut point: BorderPoint, actor: &User) -> Result<BorderPoint> {
        point.name = point.name.trim().to_string();
        point.description = normalize_text_option(point.description.take());
        point.status_comment = normalize_text_option(point.status_comment.take());
        validation::border_point(&point)?;

        let existing = self.find(&point.id).await?;
        // Provenance and deletion metadata are not editable
        point.created_by = existing.created_by;
        point.created_at = existing.created_at;
        point.data_source = existing.data_source;
        point.source_id = existing.source_id;
        point.deleted = false;
        point.deleted_at = None;
        point.deleted_by = None;
        point.updated_at = unix_millis_now().max(existing.updated_at);

        self.store.update(&point).await?;
        tracing::info!("{} edited border point {}", actor.label(), point.id);
        Ok(point)
    }

    /// Soft-delete a point.
    pub async fn remove(&self, id: &BorderPointId, actor: &User) -> Result<()> {
        self.find(id).await?;
        self.store.soft_delete(id, &actor.id).await?;
        tracing::info!("{} removed border point {id}", actor.label());
        Ok(())
    }

    /// Append a status report for a live point.
    pub async fn report_status(
        &self,
        point_id: &BorderPointId,
        status: BorderStatus,
        message: &str,
        reporter: &User,
    ) -> Result<BorderUpdate> {
        let message = validation::update_message(message)?;
        self.find(point_id).await?;

        let mut update = BorderUpdate::new(point_id.clone(), status, message, &reporter.id);
        update.reporter_name = reporter.display_name.clone();
        self.store.add_update(&update).await?;
        tracing::info!(
            "{} reported {} for border point {point_id}",
            reporter.label(),
            status.as_str()
        );
        Ok(update)
    }
}
