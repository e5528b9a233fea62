// src/cli/migrate.rs — `walkly migrate`
//
// Migrations normally run when the store opens; this command reports the
// schema version or reverts the newest migration.

use rusqlite::Connection;

use crate::infra::config::Config;
use crate::store::schema;

pub async fn run_migrate(status_only: bool, rollback: bool, config: &Config) -> anyhow::Result<()> {
    let db_path = config.storage.resolved_db_path();

    if !db_path.exists() && (status_only || rollback) {
        println!("No database found at: {}", db_path.display());
        println!("Run `walkly migrate` to create it.");
        return Ok(());
    }

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(&db_path)?;
    println!("Database: {}", db_path.display());

    if status_only {
        return show_migration_status(&conn);
    }
    if rollback {
        return run_rollback(&conn);
    }

    println!("Running database migrations...");
    schema::run_migrations(&conn)?;
    println!("Migrations complete.");
    show_migration_status(&conn)
}

fn show_migration_status(conn: &Connection) -> anyhow::Result<()> {
    let current = schema::current_version(conn)?;
    let latest = schema::latest_version();
    println!("Schema version: {current} (latest {latest})");

    let mut stmt = conn.prepare("SELECT version, name, applied_at FROM _migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut any = false;
    for row in rows {
        let (version, name, applied_at) = row?;
        if !any {
            println!();
            println!("Applied migrations:");
            any = true;
        }
        println!("  v{version}: {name} (applied {applied_at})");
    }
    if !any {
        println!("No migrations have been run yet.");
    } else if current < latest {
        println!();
        println!("{} pending; run `walkly migrate` to apply.", latest - current);
    }
    Ok(())
}

fn run_rollback(conn: &Connection) -> anyhow::Result<()> {
    let current = schema::current_version(conn)?;
    if current == 0 {
        println!("No migrations to roll back.");
        return Ok(());
    }

    println!("Rolling back migration v{current}. Saved walks in dropped tables are lost.");
    schema::rollback_to(conn, current - 1)?;
    println!("Now at schema version {}.", schema::current_version(conn)?);
    Ok(())
}
