//! Local cache database for PassPorter

mod border_point_repository;
mod border_update_repository;
mod connection;
mod migrations;
mod user_repository;

pub use border_point_repository::{BorderPointRepository, LibSqlBorderPointRepository};
pub use border_update_repository::{BorderUpdateRepository, LibSqlBorderUpdateRepository};
pub use connection::Database;
pub use user_repository::{LibSqlUserRepository, UserRepository};
