use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::StreamExt;
use passporter_core::store::BorderPointStore;
use passporter_core::BorderUpdate;

use crate::commands::common::{
    format_update_lines, load_config, normalize_point_id, open_cache, resolve_db_path, Context,
};
use crate::error::CliError;

pub async fn run_updates(
    id: &str,
    limit: usize,
    offline: bool,
    as_json: bool,
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let id = normalize_point_id(id)?;

    let updates = if offline {
        let config = load_config(config_path)?;
        let cache = open_cache(&resolve_db_path(db_path, &config)).await?;
        cache.list_updates(&id, limit).await?
    } else {
        let context = Context::open(config_path, db_path).await?;
        let store = context.store().await?;
        let mut updates: Vec<BorderUpdate> = match store.subscribe_updates(&id).next().await {
            Some(updates) => updates?,
            None => Vec::new(),
        };
        updates.truncate(limit);
        updates
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&updates)?);
    } else if updates.is_empty() {
        println!("No status reports for {id}");
    } else {
        for line in format_update_lines(&updates, Utc::now().timestamp_millis()) {
            println!("{line}");
        }
    }
    Ok(())
}
