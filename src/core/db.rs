use anyhow::Result;
use rusqlite::Connection as SqliteConnection;
use tokio_rusqlite::Connection;

/// Open the service database stored under `db_path`, creating the
/// directory if needed.
pub async fn async_db(db_path: &str) -> Result<Connection> {
    tokio::fs::create_dir_all(db_path).await?;
    let db = Connection::open(format!("{}/calsync.sqlite", db_path)).await?;
    Ok(db)
}

/// Open the database and make sure every table exists.
pub async fn open_initialized_db(db_path: &str) -> Result<Connection> {
    let db = async_db(db_path).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    Ok(db)
}

/// Create all tables. Safe to run on every startup.
pub fn initialize_db(conn: &SqliteConnection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r"
        BEGIN;

        CREATE TABLE IF NOT EXISTS sync_config (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            calendar_id TEXT NOT NULL,
            email TEXT NOT NULL,
            provider TEXT NOT NULL,
            token TEXT NOT NULL,
            is_sync_enabled INTEGER NOT NULL DEFAULT 1,
            last_sync_time TEXT,
            channel_id TEXT,
            channel_token TEXT,
            resource_id TEXT,
            channel_expiration TEXT,
            UNIQUE(email, calendar_id, provider)
        );

        COMMIT;
        ",
    )
}
