// src/cli/history.rs — `walkly history`, `walkly show`, `walkly delete`

use crate::geo::format::{format_distance, format_duration, format_pace, format_speed};
use crate::infra::config::Config;
use crate::infra::errors::WalkError;
use crate::infra::paths;
use crate::session::SessionId;
use crate::store::{self, spawn_store_server, SessionStore, StoreHandle, StoredWalk};

/// Open the configured database and start its server task.
pub async fn open_store(config: &Config) -> anyhow::Result<StoreHandle> {
    let db_path = config.storage.resolved_db_path();
    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await?,
        _ => paths::ensure_dirs().await?,
    }
    let store = store::open(&db_path)?;
    tracing::debug!(path = %db_path.display(), "Store opened");
    let (handle, _) = spawn_store_server(store);
    Ok(handle)
}

pub fn resolve_user(config: &Config, user: Option<String>) -> Result<String, WalkError> {
    user.or_else(|| config.user.id.clone())
        .ok_or(WalkError::Unauthenticated)
}

pub async fn run_history(limit: u32, user: Option<String>, config: &Config) -> anyhow::Result<()> {
    let user_id = resolve_user(config, user)?;
    let store = open_store(config).await?;
    let walks = store.list_sessions(&user_id, limit).await?;

    if walks.is_empty() {
        println!("No walks recorded yet.");
        return Ok(());
    }

    println!(
        "{:>5}  {:<16}  {:>9}  {:>8}  {:>7}  {:<9}  Title",
        "ID", "Started", "Distance", "Time", "Moments", "Status"
    );
    for w in walks {
        println!(
            "{:>5}  {:<16}  {:>9}  {:>8}  {:>7}  {:<9}  {}",
            w.id,
            w.start_time.format("%Y-%m-%d %H:%M"),
            format_distance(w.total_distance),
            format_duration(w.total_duration),
            w.moment_count,
            w.status,
            w.title
        );
    }
    Ok(())
}

pub async fn run_show(id: SessionId, json: bool, config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let Some(walk) = store.get_session(id).await? else {
        anyhow::bail!("walk {id} not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&walk)?);
    } else {
        print_walk(&walk);
    }
    Ok(())
}

pub async fn run_delete(id: SessionId, config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    if store.delete_session(id).await? {
        println!("Deleted walk {id}.");
        Ok(())
    } else {
        anyhow::bail!("walk {id} not found")
    }
}

fn print_walk(walk: &StoredWalk) {
    let hours = walk.total_duration as f64 / 3600.0;
    let speed = if hours > 0.0 {
        (walk.total_distance / 1000.0) / hours
    } else {
        0.0
    };
    let pace = if speed > 0.0 { 60.0 / speed } else { 0.0 };

    println!("{} (#{})", walk.title, walk.id);
    println!("  Status:     {}", walk.status);
    println!("  Started:    {}", walk.start_time.format("%Y-%m-%d %H:%M:%S"));
    if let Some(end) = walk.end_time {
        println!("  Ended:      {}", end.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("  Distance:   {}", format_distance(walk.total_distance));
    println!("  Time:       {}", format_duration(walk.total_duration));
    println!("  Speed:      {}", format_speed(speed));
    println!("  Pace:       {}", format_pace(pace));
    println!(
        "  Trail:      {} points (planned {})",
        walk.route_path.len(),
        walk.planned_route.len()
    );

    if !walk.moments.is_empty() {
        println!();
        println!("  Moments:");
        for m in &walk.moments {
            let note = m.description.as_deref().unwrap_or("-");
            print!("    {}  {:.5},{:.5}  {}", m.timestamp.format("%H:%M:%S"), m.lat, m.lng, note);
            if let Some(photo) = &m.photo_ref {
                print!("  [{photo}]");
            }
            println!();
        }
    }
}
