use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, Row, params};
use time::{OffsetDateTime, UtcOffset};
use tracing::warn;

use super::{AlarmRequest, CalendarTrigger, NotificationCenter};
use crate::repo::sqlite::open_connection;

/// Pending alarms kept in a SQLite table, so one process can register
/// alarms and a later one can list or deliver them.
pub struct SqliteNotificationCenter {
    conn: Mutex<Connection>,
}

impl SqliteNotificationCenter {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = open_connection(path.as_ref())?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn list_due(&self, now: OffsetDateTime) -> Result<Vec<AlarmRequest>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT identifier, year, month, day, hour, minute, offset_seconds, title, body, sound
                 FROM alarms WHERE fire_at <= ?1 ORDER BY fire_at ASC, identifier ASC",
            )
            .context("failed to prepare due alarms query")?;
        let rows = stmt
            .query_map(params![now.unix_timestamp()], row_to_request)
            .context("failed to query due alarms")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to decode alarm")
    }

    fn insert(&self, request: &AlarmRequest) -> Result<()> {
        let fire_at = request
            .trigger
            .fire_time()
            .with_context(|| format!("alarm {} has an invalid trigger", request.identifier))?;
        let t = &request.trigger;
        self.lock()
            .execute(
                "INSERT OR REPLACE INTO alarms
                 (identifier, year, month, day, hour, minute, offset_seconds, fire_at, title, body, sound)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    request.identifier,
                    t.year,
                    t.month,
                    t.day,
                    t.hour,
                    t.minute,
                    t.offset.whole_seconds(),
                    fire_at.unix_timestamp(),
                    request.title,
                    request.body,
                    request.sound,
                ],
            )
            .with_context(|| format!("failed to store alarm {}", request.identifier))?;
        Ok(())
    }

    fn list_pending(&self) -> Result<Vec<AlarmRequest>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT identifier, year, month, day, hour, minute, offset_seconds, title, body, sound
                 FROM alarms ORDER BY fire_at ASC, identifier ASC",
            )
            .context("failed to prepare alarms query")?;
        let rows = stmt
            .query_map([], row_to_request)
            .context("failed to query alarms")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to decode alarm")
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NotificationCenter for SqliteNotificationCenter {
    async fn add(&self, request: AlarmRequest) -> Result<()> {
        self.insert(&request)
    }

    fn remove_pending(&self, identifiers: &[String]) {
        let conn = self.lock();
        for identifier in identifiers {
            if let Err(e) = conn.execute(
                "DELETE FROM alarms WHERE identifier = ?1",
                params![identifier],
            ) {
                warn!(%identifier, error = %e, "failed to remove alarm");
            }
        }
    }

    fn pending(&self) -> Vec<AlarmRequest> {
        self.list_pending().unwrap_or_else(|e| {
            warn!(error = %e, "failed to list pending alarms");
            Vec::new()
        })
    }

    /// Earliest first.
    fn due(&self, now: OffsetDateTime) -> Vec<AlarmRequest> {
        self.list_due(now).unwrap_or_else(|e| {
            warn!(error = %e, "failed to list due alarms");
            Vec::new()
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode=WAL;
CREATE TABLE IF NOT EXISTS alarms (
  identifier TEXT PRIMARY KEY,
  year INTEGER NOT NULL,
  month INTEGER NOT NULL,
  day INTEGER NOT NULL,
  hour INTEGER NOT NULL,
  minute INTEGER NOT NULL,
  offset_seconds INTEGER NOT NULL,
  fire_at INTEGER NOT NULL,
  title TEXT NOT NULL,
  body TEXT NOT NULL,
  sound TEXT
);
"#,
    )
    .context("failed to initialize alarm schema")?;
    Ok(())
}

fn row_to_request(row: &Row) -> rusqlite::Result<AlarmRequest> {
    let offset_seconds: i32 = row.get("offset_seconds")?;
    Ok(AlarmRequest {
        identifier: row.get("identifier")?,
        trigger: CalendarTrigger {
            year: row.get("year")?,
            month: row.get("month")?,
            day: row.get("day")?,
            hour: row.get("hour")?,
            minute: row.get("minute")?,
            offset: UtcOffset::from_whole_seconds(offset_seconds).unwrap_or(UtcOffset::UTC),
            repeats: false,
        },
        title: row.get("title")?,
        body: row.get("body")?,
        sound: row.get("sound")?,
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn request(identifier: &str, at: OffsetDateTime) -> AlarmRequest {
        AlarmRequest {
            identifier: identifier.to_string(),
            trigger: CalendarTrigger::once_at(at),
            title: "Task Time! 😎".to_string(),
            body: "Meeting".to_string(),
            sound: Some("start_notif.mp3".to_string()),
        }
    }

    #[tokio::test]
    async fn alarms_survive_reopen() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        {
            let center = SqliteNotificationCenter::open(tmp.path()).unwrap();
            center
                .add(request("a-start", datetime!(2024-12-22 10:00 +09:00)))
                .await
                .unwrap();
        }
        let center = SqliteNotificationCenter::open(tmp.path()).unwrap();
        let pending = center.pending();
        assert_eq!(pending, vec![request("a-start", datetime!(2024-12-22 10:00 +09:00))]);
    }

    #[tokio::test]
    async fn due_returns_only_past_alarms() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let center = SqliteNotificationCenter::open(tmp.path()).unwrap();
        center
            .add(request("a-start", datetime!(2024-12-22 10:00 UTC)))
            .await
            .unwrap();
        center
            .add(request("a-deadline", datetime!(2024-12-22 11:00 UTC)))
            .await
            .unwrap();

        let due = center.due(datetime!(2024-12-22 10:30 UTC));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].identifier, "a-start");
    }

    #[tokio::test]
    async fn remove_pending_ignores_unknown_ids() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let center = SqliteNotificationCenter::open(tmp.path()).unwrap();
        center
            .add(request("a-start", datetime!(2024-12-22 10:00 UTC)))
            .await
            .unwrap();

        center.remove_pending(&["a-start".to_string(), "a-deadline".to_string()]);
        assert!(center.pending().is_empty());
    }
}
