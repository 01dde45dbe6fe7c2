pub mod auth_cmd;
pub mod common;
pub mod points;
pub mod report;
pub mod updates;
pub mod watch;
