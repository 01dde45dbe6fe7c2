use std::path::{Path, PathBuf};

use passporter_core::models::LatLng;
use passporter_core::services::{BorderPointDraft, CacheService};
use passporter_core::store::BorderPointStore;
use passporter_core::BorderPoint;

use crate::cli::{PointEdits, PointFields, PointsCommands};
use crate::commands::common::{
    first_snapshot, format_point_details, format_point_lines, load_config, normalize_point_id,
    open_cache, parse_bounds, parse_status, resolve_db_path, Context,
};
use crate::error::CliError;

pub async fn run_points(
    command: PointsCommands,
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    match command {
        PointsCommands::List {
            limit,
            bounds,
            offline,
            json,
        } => {
            let points = if offline {
                let config = load_config(config_path)?;
                let cache = open_cache(&resolve_db_path(db_path, &config)).await?;
                list_cached_points(&cache, limit, bounds.as_deref()).await?
            } else {
                let context = Context::open(config_path, db_path).await?;
                list_remote_points(&context, limit, bounds.as_deref()).await?
            };
            print_points(&points, json)
        }
        PointsCommands::Show { id, json } => {
            let id = normalize_point_id(&id)?;
            let context = Context::open(config_path, db_path).await?;
            let point = context.service().await?.find(&id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&point)?);
            } else {
                for line in format_point_details(&point) {
                    println!("{line}");
                }
            }
            Ok(())
        }
        PointsCommands::Add { fields } => {
            let draft = draft_from_fields(fields)?;
            let context = Context::open(config_path, db_path).await?;
            let user = context.signed_in_user().await?;
            let point = context.service().await?.submit(draft, &user).await?;
            println!("{}", point.id);
            Ok(())
        }
        PointsCommands::Edit { id, fields } => {
            let id = normalize_point_id(&id)?;
            let context = Context::open(config_path, db_path).await?;
            let user = context.signed_in_user().await?;
            let service = context.service().await?;
            let point = apply_edits(service.find(&id).await?, fields)?;
            let point = service.edit(point, &user).await?;
            println!("{}", point.id);
            Ok(())
        }
        PointsCommands::Delete { id } => {
            let id = normalize_point_id(&id)?;
            let context = Context::open(config_path, db_path).await?;
            let user = context.signed_in_user().await?;
            context.service().await?.remove(&id, &user).await?;
            println!("{id}");
            Ok(())
        }
    }
}

async fn list_remote_points(
    context: &Context,
    limit: usize,
    bounds: Option<&str>,
) -> Result<Vec<BorderPoint>, CliError> {
    let store = context.store().await?;
    let stream = match bounds {
        Some(raw) => store.subscribe_bounded(parse_bounds(raw)?),
        None => store.subscribe_all(),
    };
    let mut points = first_snapshot(stream).await?;
    points.truncate(limit);
    Ok(points)
}

pub async fn list_cached_points(
    cache: &CacheService,
    limit: usize,
    bounds: Option<&str>,
) -> Result<Vec<BorderPoint>, CliError> {
    match bounds {
        Some(raw) => {
            let mut points = cache.list_points_within(&parse_bounds(raw)?).await?;
            points.truncate(limit);
            Ok(points)
        }
        None => Ok(cache.list_points(limit, 0).await?),
    }
}

fn print_points(points: &[BorderPoint], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(points)?);
    } else if points.is_empty() {
        println!("No border points found");
    } else {
        for line in format_point_lines(points) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn draft_from_fields(fields: PointFields) -> Result<BorderPointDraft, CliError> {
    let mut draft = BorderPointDraft::new(
        fields.name,
        LatLng::new(fields.lat, fields.lng),
        fields.country_a,
        fields.country_b,
    );
    if let Some(status) = fields.status.as_deref() {
        draft.status = parse_status(status)?;
    }
    draft.description = fields.description;
    draft.status_comment = fields.comment;
    Ok(draft)
}

/// Overlay the given flags on a stored point. Empty text clears a field.
pub fn apply_edits(mut point: BorderPoint, edits: PointEdits) -> Result<BorderPoint, CliError> {
    if let Some(name) = edits.name {
        point.name = name;
    }
    if let Some(latitude) = edits.lat {
        point.latitude = latitude;
    }
    if let Some(longitude) = edits.lng {
        point.longitude = longitude;
    }
    if let Some(country_a) = edits.country_a {
        point.country_a = country_a.trim().to_ascii_uppercase();
    }
    if let Some(country_b) = edits.country_b {
        point.country_b = country_b.trim().to_ascii_uppercase();
    }
    if let Some(status) = edits.status.as_deref() {
        point.status = parse_status(status)?;
    }
    if let Some(description) = edits.description {
        point.description = Some(description);
    }
    if let Some(comment) = edits.comment {
        point.status_comment = Some(comment);
    }
    Ok(point)
}
