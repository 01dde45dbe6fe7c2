//! passporter-core - Core library for PassPorter
//!
//! This crate contains the shared models, local cache, remote store and auth
//! clients, location sources, and the map sync orchestrator used by every
//! PassPorter front end.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod firestore;
pub mod location;
pub mod map;
pub mod models;
pub mod services;
pub mod store;
pub mod util;
pub mod validation;

pub use error::{Error, Result};
pub use models::{BorderPoint, BorderPointId, BorderStatus, BorderUpdate, User};
