//! Firestore-backed border point store.
//!
//! The REST API has no push listeners, so live subscriptions poll on an
//! interval and emit only when the snapshot changed.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::time::{interval, Interval, MissedTickBehavior};

use super::{BorderPointStore, PointsStream, UpdatesStream};
use crate::firestore::{FieldFilter, FilterOp, FirestoreClient};
use crate::models::{sort_newest_first, BorderPoint, BorderPointId, BorderUpdate, LatLngBounds};
use crate::util::unix_millis_now;
use crate::{Error, Result};

const POINTS_COLLECTION: &str = "borderPoints";
const UPDATES_COLLECTION: &str = "borderUpdates";

/// Remote store over Firestore's REST API
#[derive(Debug, Clone)]
pub struct FirestoreBorderPointStore {
    client: FirestoreClient,
    poll_interval: Duration,
}

impl FirestoreBorderPointStore {
    pub const fn new(client: FirestoreClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    async fn fetch_all(client: FirestoreClient) -> Result<Vec<BorderPoint>> {
        let points = client
            .list_documents::<BorderPoint>(POINTS_COLLECTION)
            .await?;
        Ok(visible_sorted(points, |_| true))
    }

    async fn fetch_bounded(
        client: FirestoreClient,
        bounds: LatLngBounds,
    ) -> Result<Vec<BorderPoint>> {
        // Firestore allows range filters on a single field; longitude is
        // filtered locally
        let filters = [
            FieldFilter::new(
                "latitude",
                FilterOp::GreaterThanOrEqual,
                bounds.south_west.latitude,
            ),
            FieldFilter::new(
                "latitude",
                FilterOp::LessThanOrEqual,
                bounds.north_east.latitude,
            ),
        ];
        let points = client
            .run_query::<BorderPoint>(POINTS_COLLECTION, &filters)
            .await?;
        Ok(visible_sorted(points, |point| {
            bounds.contains(point.location())
        }))
    }

    async fn fetch_updates(
        client: FirestoreClient,
        id: BorderPointId,
    ) -> Result<Vec<BorderUpdate>> {
        let filters = [FieldFilter::new(
            "borderPointId",
            FilterOp::Equal,
            id.as_str(),
        )];
        let mut updates = client
            .run_query::<BorderUpdate>(UPDATES_COLLECTION, &filters)
            .await?;
        sort_newest_first(&mut updates);
        Ok(updates)
    }
}

#[async_trait]
impl BorderPointStore for FirestoreBorderPointStore {
    fn subscribe_all(&self) -> PointsStream {
        let client = self.client.clone();
        poll_stream(self.poll_interval, move || {
            Self::fetch_all(client.clone())
        })
    }

    fn subscribe_bounded(&self, bounds: LatLngBounds) -> PointsStream {
        let client = self.client.clone();
        poll_stream(self.poll_interval, move || {
            Self::fetch_bounded(client.clone(), bounds)
        })
    }

    async fn get(&self, id: &BorderPointId) -> Result<Option<BorderPoint>> {
        self.client
            .get_document(POINTS_COLLECTION, id.as_str())
            .await
    }

    async fn create(&self, point: &BorderPoint) -> Result<()> {
        self.client
            .create_document(POINTS_COLLECTION, point.id.as_str(), point)
            .await?;
        tracing::info!("Created border point {}", point.id);
        Ok(())
    }

    async fn update(&self, point: &BorderPoint) -> Result<()> {
        self.client
            .update_document(POINTS_COLLECTION, point.id.as_str(), point)
            .await?;
        tracing::info!("Updated border point {}", point.id);
        Ok(())
    }

    async fn soft_delete(&self, id: &BorderPointId, actor_id: &str) -> Result<()> {
        let mut point = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        point.mark_deleted(actor_id, unix_millis_now());
        self.client
            .update_document(POINTS_COLLECTION, id.as_str(), &point)
            .await?;
        tracing::info!("Soft-deleted border point {id} by {actor_id}");
        Ok(())
    }

    fn subscribe_updates(&self, id: &BorderPointId) -> UpdatesStream {
        let client = self.client.clone();
        let id = id.clone();
        poll_stream(self.poll_interval, move || {
            Self::fetch_updates(client.clone(), id.clone())
        })
    }

    async fn add_update(&self, update: &BorderUpdate) -> Result<()> {
        self.client
            .create_document(UPDATES_COLLECTION, &update.id, update)
            .await
    }
}

/// Drop soft-deleted and filtered-out points; sort by id so unchanged
/// snapshots compare equal between polls.
fn visible_sorted(
    points: Vec<BorderPoint>,
    keep: impl Fn(&BorderPoint) -> bool,
) -> Vec<BorderPoint> {
    let mut visible: Vec<_> = points
        .into_iter()
        .filter(|point| !point.deleted && keep(point))
        .collect();
    visible.sort_by(|a, b| a.id.cmp(&b.id));
    visible
}

struct PollState<T, F> {
    fetch: F,
    period: Duration,
    ticker: Option<Interval>,
    last: Option<T>,
    failed: bool,
}

/// Turn a fetch function into a live subscription.
///
/// The first fetch always emits; later fetches emit only on change. A failed
/// fetch emits its error and ends the stream.
pub(crate) fn poll_stream<T, F, Fut>(period: Duration, fetch: F) -> BoxStream<'static, Result<T>>
where
    T: Clone + PartialEq + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let state = PollState {
        fetch,
        period,
        ticker: None,
        last: None,
        failed: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.failed {
            return None;
        }
        loop {
            let period = state.period;
            let ticker = state.ticker.get_or_insert_with(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            ticker.tick().await;

            match (state.fetch)().await {
                Ok(snapshot) => {
                    if state.last.as_ref() == Some(&snapshot) {
                        continue;
                    }
                    state.last = Some(snapshot.clone());
                    return Some((Ok(snapshot), state));
                }
                Err(error) => {
                    tracing::warn!("Live subscription poll failed: {error}");
                    state.failed = true;
                    return Some((Err(error), state));
                }
            }
        }
    })
    .boxed()
}
