// src/cli/mod.rs — CLI definition (clap derive)

pub mod history;
pub mod migrate;
pub mod replay;
pub mod route;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::geo::Coordinate;
use crate::route::{Complexity, RouteGenerationOptions};

#[derive(Parser)]
#[command(name = "walkly", about = "Loop routes and tracked walks", version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when WALKLY_LOG / RUST_LOG are unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one loop route around a point
    Route {
        #[command(flatten)]
        args: RouteArgs,
        /// Print the route as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate several alternative loops, cycling complexity
    Alternatives {
        #[command(flatten)]
        args: RouteArgs,
        /// Number of suggestions
        #[arg(long, default_value = "3")]
        count: usize,
    },
    /// Walk a recorded GPS track through the session engine and save it
    Replay {
        /// JSON array of {"lat", "lng"[, "accuracy"]} objects
        track: PathBuf,
        /// Walk title (default "Walk <date>")
        #[arg(long)]
        title: Option<String>,
        /// Target loop length in minutes for the planned route
        #[arg(long, default_value = "30")]
        duration: f64,
        /// Delay between replayed fixes
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
        /// Pin a moment with this note at the last position before ending
        #[arg(long)]
        moment: Option<String>,
        /// Override [user] id from config
        #[arg(long)]
        user: Option<String>,
    },
    /// List saved walks, newest first
    History {
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Override [user] id from config
        #[arg(long)]
        user: Option<String>,
    },
    /// Show one saved walk with its moments
    Show {
        id: i64,
        /// Print the walk as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved walk and its moments
    Delete { id: i64 },
    /// Database migration status / rollback
    Migrate {
        /// Show migration status only
        #[arg(long)]
        status: bool,
        /// Revert the most recent migration
        #[arg(long)]
        rollback: bool,
    },
}

#[derive(Args, Clone, Debug)]
pub struct RouteArgs {
    /// Start latitude
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
    /// Start longitude
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,
    /// Walk length in minutes
    #[arg(long, conflicts_with = "distance")]
    pub duration: Option<f64>,
    /// Walk length in kilometers
    #[arg(long)]
    pub distance: Option<f64>,
    /// simple | medium | complex
    #[arg(long, default_value = "medium")]
    pub complexity: Complexity,
    /// Allow highways in the route
    #[arg(long)]
    pub allow_highways: bool,
    /// Allow toll roads in the route
    #[arg(long)]
    pub allow_tolls: bool,
    /// Fix waypoint jitter for reproducible shapes
    #[arg(long)]
    pub seed: Option<u64>,
}

impl RouteArgs {
    pub fn to_options(&self) -> anyhow::Result<RouteGenerationOptions> {
        let start = Coordinate::new(self.lat, self.lng);
        if !start.is_valid() {
            anyhow::bail!("invalid start coordinate {start}");
        }
        Ok(RouteGenerationOptions {
            start_location: Some(start),
            duration_minutes: self.duration,
            preferred_distance_km: self.distance,
            complexity: self.complexity,
            avoid_highways: !self.allow_highways,
            avoid_tolls: !self.allow_tolls,
        })
    }
}
