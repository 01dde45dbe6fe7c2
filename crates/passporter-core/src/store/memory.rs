//! In-process store for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::{BorderPointStore, PointsStream, UpdatesStream};
use crate::models::{sort_newest_first, BorderPoint, BorderPointId, BorderUpdate, LatLngBounds};
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// Serves one snapshot per subscription, then ends
#[derive(Default)]
pub struct MemoryStore {
    pub points: Mutex<HashMap<BorderPointId, BorderPoint>>,
    pub updates: Mutex<Vec<BorderUpdate>>,
    pub fail_writes: bool,
}

impl MemoryStore {
    fn snapshot(&self, keep: impl Fn(&BorderPoint) -> bool) -> Vec<BorderPoint> {
        let mut points: Vec<_> = self
            .points
            .lock()
            .unwrap()
            .values()
            .filter(|p| !p.deleted && keep(p))
            .cloned()
            .collect();
        points.sort_by(|a, b| a.id.cmp(&b.id));
        points
    }
}

#[async_trait]
impl BorderPointStore for MemoryStore {
    fn subscribe_all(&self) -> PointsStream {
        stream::iter(vec![Ok(self.snapshot(|_| true))]).boxed()
    }

    fn subscribe_bounded(&self, bounds: LatLngBounds) -> PointsStream {
        stream::iter(vec![Ok(self.snapshot(|p| bounds.contains(p.location())))]).boxed()
    }

    async fn get(&self, id: &BorderPointId) -> Result<Option<BorderPoint>> {
        Ok(self.points.lock().unwrap().get(id).cloned())
    }

    async fn create(&self, point: &BorderPoint) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Network("offline".into()));
        }
        self.points
            .lock()
            .unwrap()
            .insert(point.id.clone(), point.clone());
        Ok(())
    }

    async fn update(&self, point: &BorderPoint) -> Result<()> {
        let mut points = self.points.lock().unwrap();
        if !points.contains_key(&point.id) {
            return Err(Error::NotFound(point.id.to_string()));
        }
        points.insert(point.id.clone(), point.clone());
        Ok(())
    }

    async fn soft_delete(&self, id: &BorderPointId, actor_id: &str) -> Result<()> {
        let mut points = self.points.lock().unwrap();
        let point = points
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        point.mark_deleted(actor_id, unix_millis_now());
        Ok(())
    }

    fn subscribe_updates(&self, id: &BorderPointId) -> UpdatesStream {
        let mut updates: Vec<_> = self
            .updates
            .lock()
            .unwrap()
            .iter()
            .filter(|u| &u.border_point_id == id)
            .cloned()
            .collect();
        sort_newest_first(&mut updates);
        stream::iter(vec![Ok(updates)]).boxed()
    }

    async fn add_update(&self, update: &BorderUpdate) -> Result<()> {
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }
}
