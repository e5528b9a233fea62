// src/store/mod.rs — Durable walk storage

pub mod schema;
pub mod server;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geo::Coordinate;
use crate::infra::errors::WalkError;
use crate::session::types::{SessionId, SessionStatus, WalkMoment};

pub use server::{spawn_store_server, StoreHandle};
pub use sqlite::Store;

/// Where walks end up. The engine writes through this; the CLI reads history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, record: &NewWalkRecord) -> Result<SessionId, WalkError>;

    async fn update_session_status(&self, id: SessionId, status: SessionStatus)
        -> Result<(), WalkError>;

    /// Freeze totals and the trail and mark the walk completed.
    async fn finalize_session(&self, id: SessionId, record: &FinalWalkRecord)
        -> Result<(), WalkError>;

    async fn insert_moments(
        &self,
        session_id: SessionId,
        moments: &[WalkMoment],
    ) -> Result<usize, WalkError>;

    /// Newest first.
    async fn list_sessions(&self, user_id: &str, limit: u32) -> Result<Vec<WalkSummary>, WalkError>;

    async fn get_session(&self, id: SessionId) -> Result<Option<StoredWalk>, WalkError>;

    /// Removes the walk and its moments. `false` if it did not exist.
    async fn delete_session(&self, id: SessionId) -> Result<bool, WalkError>;
}

/// Initial record written when a walk starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWalkRecord {
    pub user_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub route_path: Vec<Coordinate>,
    pub planned_route: Vec<Coordinate>,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalWalkRecord {
    pub end_time: DateTime<Utc>,
    pub total_distance: f64,
    pub total_duration: u64,
    pub route_path: Vec<Coordinate>,
}

/// History list row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkSummary {
    pub id: SessionId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_distance: f64,
    pub total_duration: u64,
    pub status: SessionStatus,
    pub moment_count: usize,
}

/// A walk as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWalk {
    pub id: SessionId,
    pub user_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_distance: f64,
    pub total_duration: u64,
    pub route_path: Vec<Coordinate>,
    pub planned_route: Vec<Coordinate>,
    pub status: SessionStatus,
    pub moments: Vec<WalkMoment>,
}

/// Open (or create) the database at the given path.
pub fn open(path: &Path) -> anyhow::Result<Store> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    schema::run_migrations(&conn)?;
    Ok(Store::new(conn))
}

/// Create an in-memory database (for testing).
pub fn in_memory() -> anyhow::Result<Store> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    schema::run_migrations(&conn)?;
    Ok(Store::new(conn))
}
