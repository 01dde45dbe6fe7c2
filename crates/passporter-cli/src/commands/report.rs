use std::path::{Path, PathBuf};

use crate::commands::common::{normalize_point_id, parse_status, Context};
use crate::error::CliError;

pub async fn run_report(
    id: &str,
    status: &str,
    message: &[String],
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let id = normalize_point_id(id)?;
    let status = parse_status(status)?;
    let message = message.join(" ");

    let context = Context::open(config_path, db_path).await?;
    let user = context.signed_in_user().await?;
    let update = context
        .service()
        .await?
        .report_status(&id, status, &message, &user)
        .await?;

    println!("{}", update.id);
    Ok(())
}
