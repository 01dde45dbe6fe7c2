use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "passporter")]
#[command(about = "Browse and report on border crossing points from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local cache database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional JSON configuration file (environment values override it)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse and manage border points
    #[command(subcommand)]
    Points(PointsCommands),
    /// Report the current status of a border point
    Report {
        /// Border point ID
        id: String,
        /// OPEN, CLOSED, RESTRICTED or UNKNOWN
        status: String,
        /// Optional message, e.g. queue length
        message: Vec<String>,
    },
    /// Show status reports for a border point, newest first
    Updates {
        /// Border point ID
        id: String,
        /// Number of reports to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Read from the local cache without contacting the server
        #[arg(long)]
        offline: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in, register and manage the stored session
    #[command(subcommand)]
    Auth(AuthCommands),
    /// Run the live map sync and print every state change as JSON
    Watch {
        /// Replayed device track as `lat,lng;lat,lng;...`
        #[arg(long, value_name = "TRACK")]
        track: String,
        /// Seconds between replayed positions
        #[arg(long, default_value = "5")]
        step_secs: u64,
        /// Viewport as `south,west,north,east`
        #[arg(long, value_name = "BOUNDS")]
        bounds: Option<String>,
        /// Zoom level of the viewport
        #[arg(long, default_value = "10")]
        zoom: f32,
        /// Stop after this many seconds (runs until Ctrl-C when omitted)
        #[arg(long)]
        duration_secs: Option<u64>,
        /// Simulate missing location permission
        #[arg(long)]
        no_permission: bool,
    },
}

#[derive(Subcommand)]
pub enum PointsCommands {
    /// List border points
    List {
        /// Number of points to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only points inside `south,west,north,east`
        #[arg(long, value_name = "BOUNDS")]
        bounds: Option<String>,
        /// Read from the local cache without contacting the server
        #[arg(long)]
        offline: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one border point
    Show {
        /// Border point ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Submit a new border point
    Add {
        #[command(flatten)]
        fields: PointFields,
    },
    /// Edit an existing border point
    Edit {
        /// Border point ID
        id: String,
        #[command(flatten)]
        fields: PointEdits,
    },
    /// Delete a border point
    Delete {
        /// Border point ID
        id: String,
    },
}

#[derive(clap::Args)]
pub struct PointFields {
    #[arg(long)]
    pub name: String,
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,
    /// Two-letter code of the first country
    #[arg(long)]
    pub country_a: String,
    /// Two-letter code of the second country
    #[arg(long)]
    pub country_b: String,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(clap::Args, Default)]
pub struct PointEdits {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<f64>,
    #[arg(long)]
    pub country_a: Option<String>,
    #[arg(long)]
    pub country_b: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    /// New description; an empty value clears it
    #[arg(long)]
    pub description: Option<String>,
    /// New status comment; an empty value clears it
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password, or with a provider token
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// google, facebook or apple
        #[arg(long, requires = "token", conflicts_with = "email")]
        provider: Option<String>,
        /// Token issued by the provider
        #[arg(long)]
        token: Option<String>,
    },
    /// Create a new account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, default_value = "en")]
        language: String,
    },
    /// Send a password reset email
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Status,
}
