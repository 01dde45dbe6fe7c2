//! Services layered over the store and the local cache.

mod border_points;
mod cache;

pub use border_points::{BorderPointDraft, BorderPointService, USER_DATA_SOURCE};
pub use cache::CacheService;
