//! Append-only event archive backed by SQLite.
//!
//! Every insert runs in its own transaction and is committed before returning. Nothing ever
//! updates or deletes a row, and duplicate deliveries simply produce duplicate rows.

use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::clients::{ClientError, EventStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_name TEXT NOT NULL,
    event_content TEXT NOT NULL
);
"#;

pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    /// Opens (or creates) the database at `path` and makes sure the `events` table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(SCHEMA)?;
        info!("opened event store at {}", path.as_ref().display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, ClientError> {
        Self::open(":memory:")
    }

    #[cfg(test)]
    fn rows(&self) -> Vec<(i64, String, String)> {
        let conn = self.conn.lock().unwrap();
        let mut statement = conn
            .prepare("SELECT id, event_name, event_content FROM events ORDER BY id")
            .unwrap();
        let rows = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap();

        let rows = rows.collect::<Result<Vec<_>, _>>().unwrap();
        rows
    }
}

#[rocket::async_trait]
impl EventStore for SqliteEventStore {
    async fn insert(&self, event_name: &str, event_content: &str) -> Result<i64, ClientError> {
        let conn = self.conn.clone();
        let event_name = event_name.to_owned();
        let event_content = event_content.to_owned();

        tokio::task::spawn_blocking(move || -> Result<i64, ClientError> {
            // an unfinished transaction is rolled back on drop, so a poisoned lock is still usable
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO events (event_name, event_content) VALUES (?1, ?2)",
                params![event_name, event_content],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            debug!("stored {} event as row {}", event_name, id);
            Ok(id)
        })
        .await?
    }
}
