// src/store/sqlite.rs — SQLite operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{FinalWalkRecord, NewWalkRecord, StoredWalk, WalkSummary};
use crate::geo::Coordinate;
use crate::session::types::{SessionId, SessionStatus, WalkMoment};

/// Low-level SQLite operations for walks and moments.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    // -- Walks --

    pub fn insert_walk(&self, record: &NewWalkRecord) -> anyhow::Result<SessionId> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO walks (user_id, title, start_time, route_path, planned_route, status,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                record.user_id,
                record.title,
                record.start_time.to_rfc3339(),
                serde_json::to_string(&record.route_path)?,
                serde_json::to_string(&record.planned_route)?,
                record.status.as_str(),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_walk_status(&self, id: SessionId, status: SessionStatus) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE walks SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?;
        if changed == 0 {
            anyhow::bail!("walk {id} not found");
        }
        Ok(())
    }

    pub fn finalize_walk(&self, id: SessionId, record: &FinalWalkRecord) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE walks SET end_time = ?1, total_distance = ?2, total_duration = ?3,
                              route_path = ?4, status = 'completed', updated_at = ?5
             WHERE id = ?6",
            params![
                record.end_time.to_rfc3339(),
                record.total_distance,
                record.total_duration as i64,
                serde_json::to_string(&record.route_path)?,
                now,
                id
            ],
        )?;
        if changed == 0 {
            anyhow::bail!("walk {id} not found");
        }
        Ok(())
    }

    pub fn list_walks(&self, user_id: &str, limit: u32) -> anyhow::Result<Vec<WalkSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT w.id, w.title, w.start_time, w.end_time, w.total_distance, w.total_duration,
                    w.status, (SELECT COUNT(*) FROM walk_moments m WHERE m.walk_id = w.id)
             FROM walks w
             WHERE w.user_id = ?1
             ORDER BY w.start_time DESC, w.id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit], |row| {
            Ok(WalkSummaryRow {
                id: row.get(0)?,
                title: row.get(1)?,
                start_time: row.get(2)?,
                end_time: row.get(3)?,
                total_distance: row.get(4)?,
                total_duration: row.get(5)?,
                status: row.get(6)?,
                moment_count: row.get(7)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_summary()?);
        }
        Ok(result)
    }

    pub fn get_walk(&self, id: SessionId) -> anyhow::Result<Option<StoredWalk>> {
        let walk = self
            .conn
            .query_row(
                "SELECT id, user_id, title, start_time, end_time, total_distance, total_duration,
                        route_path, planned_route, status
                 FROM walks WHERE id = ?1",
                params![id],
                WalkRow::from_row,
            )
            .optional()?;

        match walk {
            Some(row) => {
                let moments = self.query_moments(id)?;
                Ok(Some(row.into_walk(moments)?))
            }
            None => Ok(None),
        }
    }

    pub fn delete_walk(&self, id: SessionId) -> anyhow::Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM walks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // -- Moments --

    /// Insert all moments in one transaction. Returns the number written.
    pub fn insert_moments(&self, walk_id: SessionId, moments: &[WalkMoment]) -> anyhow::Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO walk_moments (id, walk_id, latitude, longitude, photo_ref,
                                           description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for m in moments {
                stmt.execute(params![
                    m.id,
                    walk_id,
                    m.lat,
                    m.lng,
                    m.photo_ref,
                    m.description,
                    m.timestamp.to_rfc3339()
                ])?;
            }
        }
        tx.commit()?;
        Ok(moments.len())
    }

    pub fn query_moments(&self, walk_id: SessionId) -> anyhow::Result<Vec<WalkMoment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, latitude, longitude, photo_ref, description, created_at
             FROM walk_moments WHERE walk_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![walk_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (id, lat, lng, photo_ref, description, created_at) = row?;
            result.push(WalkMoment {
                id,
                lat,
                lng,
                timestamp: parse_time(&created_at)?,
                photo_ref,
                description,
            });
        }
        Ok(result)
    }
}

// -- Row types --

struct WalkSummaryRow {
    id: SessionId,
    title: String,
    start_time: String,
    end_time: Option<String>,
    total_distance: f64,
    total_duration: i64,
    status: String,
    moment_count: i64,
}

impl WalkSummaryRow {
    fn into_summary(self) -> anyhow::Result<WalkSummary> {
        Ok(WalkSummary {
            id: self.id,
            title: self.title,
            start_time: parse_time(&self.start_time)?,
            end_time: self.end_time.as_deref().map(parse_time).transpose()?,
            total_distance: self.total_distance,
            total_duration: self.total_duration.max(0) as u64,
            status: parse_status(&self.status)?,
            moment_count: self.moment_count.max(0) as usize,
        })
    }
}

struct WalkRow {
    id: SessionId,
    user_id: String,
    title: String,
    start_time: String,
    end_time: Option<String>,
    total_distance: f64,
    total_duration: i64,
    route_path: String,
    planned_route: String,
    status: String,
}

impl WalkRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            total_distance: row.get(5)?,
            total_duration: row.get(6)?,
            route_path: row.get(7)?,
            planned_route: row.get(8)?,
            status: row.get(9)?,
        })
    }

    fn into_walk(self, moments: Vec<WalkMoment>) -> anyhow::Result<StoredWalk> {
        Ok(StoredWalk {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            start_time: parse_time(&self.start_time)?,
            end_time: self.end_time.as_deref().map(parse_time).transpose()?,
            total_distance: self.total_distance,
            total_duration: self.total_duration.max(0) as u64,
            route_path: serde_json::from_str::<Vec<Coordinate>>(&self.route_path)?,
            planned_route: serde_json::from_str::<Vec<Coordinate>>(&self.planned_route)?,
            status: parse_status(&self.status)?,
            moments,
        })
    }
}

fn parse_time(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn parse_status(s: &str) -> anyhow::Result<SessionStatus> {
    s.parse::<SessionStatus>().map_err(anyhow::Error::msg)
}
