use std::future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use passporter_core::location::ReplayLocationSource;
use passporter_core::map::{MapSync, MapUiState};

use crate::commands::common::{parse_bounds, parse_track, Context};
use crate::error::CliError;

pub struct WatchOptions {
    pub track: String,
    pub step_secs: u64,
    pub bounds: Option<String>,
    pub zoom: f32,
    pub duration_secs: Option<u64>,
    pub no_permission: bool,
}

pub async fn run_watch(
    options: WatchOptions,
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let track = parse_track(&options.track)?;
    let bounds = options.bounds.as_deref().map(parse_bounds).transpose()?;

    let context = Context::open(config_path, db_path).await?;
    let location = ReplayLocationSource::new(track, Duration::from_secs(options.step_secs.max(1)))
        .repeating()
        .with_permission(!options.no_permission);
    let sync = MapSync::new(
        context.store().await?,
        Arc::new(location),
        context.config.map.clone(),
    );

    let mut states = sync.subscribe();
    sync.start().await;
    if let Some(bounds) = bounds {
        sync.on_bounds_change(bounds, options.zoom).await;
    }
    let initial = states.borrow_and_update().clone();
    print_state(&initial)?;

    let deadline = async {
        match options.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => future::pending().await,
        }
    };
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(deadline, interrupted);

    loop {
        tokio::select! {
            () = &mut deadline => break,
            _ = &mut interrupted => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                print_state(&state)?;
            }
        }
    }

    tracing::info!("Stopping map watch");
    sync.shutdown().await;
    Ok(())
}

fn print_state(state: &MapUiState) -> Result<(), CliError> {
    println!("{}", serde_json::to_string(state)?);
    Ok(())
}
