//! SQLite-backed connection storage

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{Connection as Db, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::traits::{ConnectionStore, EarlyAccessOutcome, normalize_early_access_email};
use crate::error::{Error, ErrorKind, Result};
use crate::models::Connection;

/// Database migrations
///
/// Applied in order; the user_version pragma records which ran.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: connections and waitlist
        M::up(
            r#"
            CREATE TABLE connection (
                id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                provider_id TEXT NOT NULL,
                email TEXT NOT NULL,
                access_token TEXT,
                refresh_token TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, id)
            );

            CREATE INDEX idx_connection_user_created
                ON connection(user_id, created_at DESC);

            CREATE TABLE early_access (
                email TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );
            "#,
        ),
    ])
}

const SELECT_COLUMNS: &str =
    "id, user_id, provider_id, email, access_token, refresh_token, created_at";

/// SQLite implementation of [`ConnectionStore`]
pub struct SqliteConnectionStore {
    conn: Mutex<Db>,
}

impl SqliteConnectionStore {
    /// Open (or create) the database at `db_path` and migrate it
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::with_source(ErrorKind::Storage, e.into()))?;
        }

        let conn = Db::open(path)?;
        debug!("Opened connection database at {:?}", path);
        Self::from_connection(conn)
    }

    /// In-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Db::open_in_memory()?)
    }

    fn from_connection(mut conn: Db) -> Result<Self> {
        // WAL lets readers proceed during writes
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .map_err(|e| Error::with_source(ErrorKind::Storage, e.into()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Db>> {
        self.conn
            .lock()
            .map_err(|_| Error::new(ErrorKind::Storage, "connection database lock poisoned"))
    }
}

type ConnectionRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
);

fn read_row(row: &Row<'_>) -> rusqlite::Result<ConnectionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_connection(row: ConnectionRow) -> Result<Connection> {
    let (id, user_id, provider_id, email, access_token, refresh_token, created_at) = row;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::with_source(ErrorKind::Storage, e.into()))?
        .with_timezone(&Utc);

    Ok(Connection {
        id,
        user_id,
        provider_id,
        email,
        access_token,
        refresh_token,
        created_at,
    })
}

impl ConnectionStore for SqliteConnectionStore {
    fn upsert_connection(&self, connection: Connection) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO connection
                (id, user_id, provider_id, email, access_token, refresh_token, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, id) DO UPDATE SET
                provider_id = excluded.provider_id,
                email = excluded.email,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token",
            params![
                connection.id,
                connection.user_id,
                connection.provider_id,
                connection.email,
                connection.access_token,
                connection.refresh_token,
                connection.created_at.to_rfc3339(),
            ],
        )?;
        info!("Stored connection {} for {}", connection.id, connection.email);
        Ok(())
    }

    fn get_connection(&self, user_id: &str, connection_id: &str) -> Result<Option<Connection>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM connection WHERE user_id = ? AND id = ?"),
                params![user_id, connection_id],
                read_row,
            )
            .optional()?;
        row.map(into_connection).transpose()
    }

    fn latest_connection(
        &self,
        user_id: &str,
        connection_id: &str,
    ) -> Result<Option<Connection>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM connection
                     WHERE user_id = ? AND id = ?
                     ORDER BY created_at DESC LIMIT 1"
                ),
                params![user_id, connection_id],
                read_row,
            )
            .optional()?;
        row.map(into_connection).transpose()
    }

    fn delete_connection(&self, user_id: &str, connection_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM connection WHERE user_id = ? AND id = ?",
            params![user_id, connection_id],
        )?;
        Ok(removed > 0)
    }

    fn list_connections(&self, user_id: &str) -> Result<Vec<Connection>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM connection WHERE user_id = ? ORDER BY created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_connection).collect()
    }

    fn register_early_access(&self, email: &str) -> Result<EarlyAccessOutcome> {
        let email = normalize_early_access_email(email)?;
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO early_access (email, created_at) VALUES (?, ?)",
            params![email, Utc::now().to_rfc3339()],
        )?;

        if inserted == 0 {
            debug!("{} already on the waitlist", email);
            return Ok(EarlyAccessOutcome::AlreadyRegistered);
        }
        info!("Added {} to the waitlist", email);
        Ok(EarlyAccessOutcome::Registered)
    }
}
