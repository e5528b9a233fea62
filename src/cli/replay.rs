// src/cli/replay.rs — `walkly replay`: drive a full walk from a recorded track

use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::history::{open_store, resolve_user};
use super::route::print_route;
use crate::geo::format::{format_distance, format_duration, format_pace, format_speed};
use crate::geo::{trail_length, Coordinate};
use crate::geolocation::ReplaySource;
use crate::infra::config::Config;
use crate::infra::errors::WalkError;
use crate::route::waypoints::estimate_duration_minutes;
use crate::route::{resolver, GeneratedRoute, RouteGenerationOptions, RouteGenerator, RoutePlanner};
use crate::session::{spawn_engine, EngineDeps, EngineHandle, EngineSettings, Phase, SaveReport};

/// Offers the recorded track itself as the planned loop.
pub struct RecordedTrackPlanner {
    track: Vec<Coordinate>,
    speed_kmh: f64,
}

impl RecordedTrackPlanner {
    pub fn new(track: Vec<Coordinate>, speed_kmh: f64) -> Self {
        Self { track, speed_kmh }
    }
}

#[async_trait]
impl RoutePlanner for RecordedTrackPlanner {
    async fn generate(&self, _options: &RouteGenerationOptions) -> Result<GeneratedRoute, WalkError> {
        if self.track.len() < 2 {
            return Err(WalkError::no_route("recorded track has fewer than two points"));
        }
        let distance = trail_length(&self.track);
        Ok(GeneratedRoute {
            coordinates: self.track.clone(),
            waypoints: Vec::new(),
            distance,
            duration: estimate_duration_minutes(distance / 1000.0, self.speed_kmh) * 60.0,
            instructions: None,
        })
    }

    async fn generate_alternatives(
        &self,
        options: &RouteGenerationOptions,
        count: usize,
    ) -> Vec<Result<GeneratedRoute, WalkError>> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.generate(options).await);
        }
        out
    }
}

pub struct ReplayArgs {
    pub title: Option<String>,
    pub duration_minutes: f64,
    pub interval: Duration,
    pub moment: Option<String>,
    pub user: Option<String>,
}

pub async fn run_replay(track: &Path, args: ReplayArgs, config: &Config) -> anyhow::Result<()> {
    let user_id = resolve_user(config, args.user)?;
    let source = Arc::new(ReplaySource::from_json_file(track, args.interval)?);
    if source.len() < 2 {
        anyhow::bail!("track {} needs at least two points", track.display());
    }

    let (planner, label): (Arc<dyn RoutePlanner>, &str) = match resolver::build_provider(&config.routing) {
        Ok(provider) => {
            let label = provider.id();
            let generator = RouteGenerator::from_config(provider, &config.routing);
            (Arc::new(generator), label)
        }
        Err(e) => {
            tracing::warn!("Routing provider unavailable ({}); planning along the recorded track", e);
            let fallback =
                RecordedTrackPlanner::new(source.points().to_vec(), config.routing.walking_speed_kmh);
            (Arc::new(fallback), "recorded track")
        }
    };

    let store = open_store(config).await?;
    let engine = spawn_engine(
        EngineDeps {
            planner,
            geolocation: source.clone(),
            store: Arc::new(store),
        },
        EngineSettings::from_config(config).with_user(user_id),
    );

    let start = engine.locate().await?;
    println!("Starting at {start}");

    engine
        .generate_route(RouteGenerationOptions::for_duration(args.duration_minutes))
        .await?;
    let snap = engine.wait_for(|s| s.phase != Phase::Generating).await?;
    let Some(route) = snap.generated_route.filter(|_| snap.phase == Phase::Preview) else {
        let err = snap
            .last_error
            .unwrap_or_else(|| WalkError::no_route("route generation did not finish"));
        return Err(err.into());
    };
    print_route(&route, label);
    println!();

    engine.start_walk(args.title).await?;
    follow_progress(&engine, args.interval * (source.len() as u32 + 1)).await?;

    if let Some(note) = args.moment {
        let snap = engine.snapshot().await?;
        if let Some(&here) = snap.route_path.last() {
            engine.add_moment(here, Some(note), None).await?;
        }
    }

    let report = match engine.end_walk().await {
        Ok(Some(report)) => report,
        Ok(None) => anyhow::bail!("walk ended before it could be saved"),
        Err(e) => {
            eprintln!("Save failed ({e}); retrying once");
            tokio::time::sleep(Duration::from_secs(1)).await;
            engine
                .retry_save()
                .await?
                .ok_or_else(|| anyhow::anyhow!("nothing to save"))?
        }
    };

    print_summary(&engine, &report).await
}

/// Print live stats until `total` has elapsed.
async fn follow_progress(engine: &EngineHandle, total: Duration) -> anyhow::Result<()> {
    let mut rx = engine.subscribe();
    let deadline = tokio::time::sleep(total);
    tokio::pin!(deadline);
    let mut shown = None;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let stats = rx.borrow_and_update().live_stats;
                if shown != Some(stats.duration) {
                    shown = Some(stats.duration);
                    print!(
                        "\r  {}  {:>9}  {:>10}  {}   ",
                        format_duration(stats.duration),
                        format_distance(stats.distance),
                        format_speed(stats.speed),
                        format_pace(stats.pace)
                    );
                    std::io::stdout().flush()?;
                }
            }
        }
    }
    println!();
    Ok(())
}

async fn print_summary(engine: &EngineHandle, report: &SaveReport) -> anyhow::Result<()> {
    let snap = engine.snapshot().await?;
    let stats = snap.live_stats;

    println!("Saved walk #{}", report.session_id);
    if let Some(session) = &snap.current_session {
        println!("  Title:      {}", session.title);
        println!("  Distance:   {}", format_distance(session.total_distance));
        println!("  Time:       {}", format_duration(session.total_duration));
    }
    println!("  Speed:      {}", format_speed(stats.speed));
    println!("  Pace:       {}", format_pace(stats.pace));
    println!("  Trail:      {} points", snap.route_path.len());
    println!("  Moments:    {} saved", report.moments_saved);
    if let Some(e) = &report.moment_error {
        println!("  Warning:    moments not saved: {e}");
    }
    Ok(())
}
