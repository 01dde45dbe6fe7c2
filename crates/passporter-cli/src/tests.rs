use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use passporter_core::config::ClientConfig;
use passporter_core::models::LatLng;
use passporter_core::{BorderPoint, BorderPointId, BorderStatus, BorderUpdate, User};
use pretty_assertions::assert_eq;

use crate::cli::{AuthCommands, Cli, Commands, PointEdits, PointFields, PointsCommands};
use crate::commands::auth_cmd::status_label;
use crate::commands::common::{
    format_point_lines, format_relative_time, format_update_lines, normalize_point_id, open_cache,
    parse_bounds, parse_status, parse_track, resolve_db_path,
};
use crate::commands::points::{apply_edits, draft_from_fields, list_cached_points};
use crate::error::CliError;

fn karawanken() -> BorderPoint {
    let mut point = BorderPoint::new("Karawanken", LatLng::new(46.44, 14.02), "AT", "SI");
    point.id = BorderPointId::from("0190-karawanken");
    point
}

#[test]
fn parse_bounds_reads_four_edges() {
    let bounds = parse_bounds(" 46.0, 13.5 ,47.0,14.5").unwrap();
    assert_eq!(bounds.south_west, LatLng::new(46.0, 13.5));
    assert_eq!(bounds.north_east, LatLng::new(47.0, 14.5));
}

#[test]
fn parse_bounds_allows_antimeridian_crossing() {
    let bounds = parse_bounds("-20,170,-10,-170").unwrap();
    assert!(bounds.crosses_antimeridian());
}

#[test]
fn parse_bounds_rejects_malformed_input() {
    assert!(matches!(
        parse_bounds("46,13,47"),
        Err(CliError::InvalidArgument { what: "bounds", .. })
    ));
    assert!(matches!(
        parse_bounds("north,west,south,east"),
        Err(CliError::InvalidArgument { what: "bounds", .. })
    ));
    assert!(matches!(
        parse_bounds("47,13,46,14"),
        Err(CliError::InvalidArgument { what: "bounds", .. })
    ));
    assert!(matches!(
        parse_bounds("46,13,95,14"),
        Err(CliError::InvalidArgument { what: "bounds", .. })
    ));
}

#[test]
fn parse_track_reads_positions_in_order() {
    let track = parse_track("46.5,14.1; 46.6,14.2;").unwrap();
    assert_eq!(track, vec![LatLng::new(46.5, 14.1), LatLng::new(46.6, 14.2)]);
}

#[test]
fn parse_track_rejects_empty_and_bad_segments() {
    assert!(matches!(
        parse_track(" ; "),
        Err(CliError::MissingArgument(_))
    ));
    assert!(matches!(
        parse_track("46.5"),
        Err(CliError::InvalidArgument { what: "track", .. })
    ));
    assert!(matches!(
        parse_track("46.5,200"),
        Err(CliError::InvalidArgument { what: "track", .. })
    ));
}

#[test]
fn normalize_point_id_trims_and_rejects_empty() {
    assert_eq!(
        normalize_point_id("  abc  ").unwrap(),
        BorderPointId::from("abc")
    );
    assert!(matches!(
        normalize_point_id(" \t "),
        Err(CliError::EmptyPointId)
    ));
}

#[test]
fn parse_status_is_case_insensitive() {
    assert_eq!(parse_status("open").unwrap(), BorderStatus::Open);
    assert!(matches!(
        parse_status("ajar"),
        Err(CliError::Core(passporter_core::Error::Validation { field: "status", .. }))
    ));
}

#[test]
fn draft_from_fields_carries_optional_values() {
    let draft = draft_from_fields(PointFields {
        name: "Loibl".to_string(),
        lat: 46.43,
        lng: 14.26,
        country_a: "AT".to_string(),
        country_b: "SI".to_string(),
        status: Some("restricted".to_string()),
        description: None,
        comment: Some("Cars only".to_string()),
    })
    .unwrap();

    assert_eq!(draft.location, LatLng::new(46.43, 14.26));
    assert_eq!(draft.status, BorderStatus::Restricted);
    assert_eq!(draft.status_comment.as_deref(), Some("Cars only"));
}

#[test]
fn apply_edits_overlays_only_given_flags() {
    let original = karawanken();
    let edited = apply_edits(
        original.clone(),
        PointEdits {
            status: Some("closed".to_string()),
            country_b: Some(" it ".to_string()),
            comment: Some(String::new()),
            ..PointEdits::default()
        },
    )
    .unwrap();

    assert_eq!(edited.status, BorderStatus::Closed);
    assert_eq!(edited.country_b, "IT");
    assert_eq!(edited.status_comment.as_deref(), Some(""));
    assert_eq!(edited.name, original.name);
    assert_eq!(edited.location(), original.location());
}

#[test]
fn apply_edits_rejects_unknown_status() {
    let result = apply_edits(
        karawanken(),
        PointEdits {
            status: Some("maybe".to_string()),
            ..PointEdits::default()
        },
    );
    assert!(result.is_err());
}

#[test]
fn format_point_lines_shortens_ids() {
    let mut point = karawanken();
    point.id = BorderPointId::from("0190f3b2-1c2d-7abc-9def-0123456789ab");
    point.status = BorderStatus::Open;

    let lines = format_point_lines(&[point]);

    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("0190f3b2-1c2d  OPEN"));
    assert!(lines[0].contains("Karawanken (AT-SI)"));
}

#[test]
fn format_update_lines_prefers_reporter_name() {
    let now = 1_700_000_000_000;
    let mut named = BorderUpdate::new(karawanken().id, BorderStatus::Open, "Queue 10 min", "uid-ana");
    named.reporter_name = Some("Ana".to_string());
    named.timestamp = now - 5 * 60_000;
    let mut anonymous = BorderUpdate::new(karawanken().id, BorderStatus::Closed, "", "uid-bo");
    anonymous.timestamp = now - 3 * 3_600_000;

    let lines = format_update_lines(&[named, anonymous], now);

    assert_eq!(lines[0], "5m ago      OPEN        Ana: Queue 10 min");
    assert_eq!(lines[1], "3h ago      CLOSED      uid-bo");
}

#[test]
fn format_relative_time_buckets() {
    let now = 1_700_000_000_000;
    assert_eq!(format_relative_time(now - 10_000, now), "just now");
    assert_eq!(format_relative_time(now - 2 * 86_400_000, now), "2d ago");
    assert_eq!(format_relative_time(now - 21 * 86_400_000, now), "3w ago");
    assert_eq!(format_relative_time(now + 60_000, now), "just now");
}

#[test]
fn status_label_falls_back_to_session_email() {
    let mut user = User::new("uid-ana", None);
    user.display_name = Some("Ana".to_string());

    assert_eq!(status_label(Some(&user), Some("ana@example.com")), "Ana");
    assert_eq!(status_label(None, Some("ana@example.com")), "ana@example.com");
    assert_eq!(status_label(None, None), "(unknown account)");
}

#[test]
fn resolve_db_path_prefers_flag_then_config() {
    let config = ClientConfig {
        db_path: Some(PathBuf::from("/tmp/from-config.db")),
        ..ClientConfig::default()
    };

    assert_eq!(
        resolve_db_path(Some(PathBuf::from("/tmp/flag.db")), &config),
        PathBuf::from("/tmp/flag.db")
    );
    assert_eq!(
        resolve_db_path(None, &config),
        PathBuf::from("/tmp/from-config.db")
    );
    assert!(resolve_db_path(None, &ClientConfig::default()).ends_with("passporter/cache.db"));
}

#[test]
fn cli_parses_nested_point_commands() {
    let cli = Cli::try_parse_from([
        "passporter",
        "points",
        "add",
        "--name",
        "Paso Jama",
        "--lat",
        "-22.91",
        "--lng",
        "-67.47",
        "--country-a",
        "CL",
        "--country-b",
        "BO",
    ])
    .unwrap();

    let Commands::Points(PointsCommands::Add { fields }) = cli.command else {
        panic!("expected points add");
    };
    assert_eq!(fields.name, "Paso Jama");
    assert!((fields.lat + 22.91).abs() < f64::EPSILON);
}

#[test]
fn cli_federated_login_needs_token_and_no_email() {
    assert!(Cli::try_parse_from(["passporter", "auth", "login", "--provider", "google"]).is_err());
    assert!(Cli::try_parse_from([
        "passporter",
        "auth",
        "login",
        "--provider",
        "google",
        "--token",
        "t",
        "--email",
        "ana@example.com",
    ])
    .is_err());

    let cli = Cli::try_parse_from([
        "passporter",
        "auth",
        "login",
        "--provider",
        "apple",
        "--token",
        "t",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Auth(AuthCommands::Login { provider: Some(_), .. })
    ));
}

#[test]
fn cli_global_db_path_follows_subcommand() {
    let cli = Cli::try_parse_from([
        "passporter",
        "updates",
        "abc",
        "--offline",
        "--db-path",
        "/tmp/x.db",
    ])
    .unwrap();
    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x.db")));
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_listing_reads_cached_points() {
    let db_path = unique_test_db_path();
    let cache = open_cache(&db_path).await.unwrap();

    let inside = karawanken();
    let mut outside = BorderPoint::new("Ventimiglia", LatLng::new(43.79, 7.53), "FR", "IT");
    outside.id = BorderPointId::from("0190-ventimiglia");
    let mut removed = BorderPoint::new("Wurzen", LatLng::new(46.52, 13.74), "AT", "SI");
    removed.id = BorderPointId::from("0190-wurzen");
    removed.mark_deleted("uid-ana", removed.updated_at);
    cache
        .upsert_points(&[inside.clone(), outside.clone(), removed])
        .await
        .unwrap();

    let all = list_cached_points(&cache, 10, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let bounded = list_cached_points(&cache, 10, Some("46,13,47,15"))
        .await
        .unwrap();
    assert_eq!(bounded, vec![inside]);

    let limited = list_cached_points(&cache, 1, None).await.unwrap();
    assert_eq!(limited.len(), 1);

    drop(cache);
    cleanup_db_files(&db_path);
}

fn unique_test_db_path() -> PathBuf {
    static NEXT_TEST_DB_ID: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let sequence = NEXT_TEST_DB_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!("passporter-cli-test-{timestamp}-{sequence}"))
        .join("cache.db")
}

fn cleanup_db_files(path: &PathBuf) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::remove_dir_all(parent);
    }
}
