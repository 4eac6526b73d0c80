//! Hazard-entry event log.
//!
//! Each entry into a hazardous state produces one `ZoneEvent`; the log is an
//! audit trail, never part of the control path. Writes are fire-and-forget
//! from the controller's point of view: a failure is retried once by the
//! caller and then dropped with a warning.

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};

use crate::{ZoneEvent, ZoneKind};

pub trait EventLog: Send {
    fn record_event(&mut self, event: &ZoneEvent) -> Result<()>;
}

// -------------------- SQLite --------------------

pub struct SqliteEventLog {
    conn: Connection,
}

impl SqliteEventLog {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let log = Self { conn };
        log.ensure_schema()?;
        Ok(log)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS zone_logs (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              zone_type TEXT NOT NULL,
              log_datetime TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_zone_logs_datetime ON zone_logs(log_datetime);
            "#,
        )?;
        Ok(())
    }

    /// Most recent events, newest first.
    pub fn read_events(&self, limit: usize) -> Result<Vec<ZoneEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT zone_type, strftime('%s', log_datetime) FROM zone_logs
             ORDER BY id DESC LIMIT ?1",
        )?;
        let mut rows = stmt.query(params![limit as i64])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            let zone_type: String = row.get(0)?;
            let epoch: String = row.get(1)?;
            let zone = ZoneKind::parse(&zone_type)
                .ok_or_else(|| anyhow!("unknown zone_type in zone_logs: {}", zone_type))?;
            let epoch_s = epoch
                .parse::<u64>()
                .map_err(|_| anyhow!("corrupt log_datetime in zone_logs: {}", epoch))?;
            events.push(ZoneEvent { zone, epoch_s });
        }
        Ok(events)
    }
}

impl EventLog for SqliteEventLog {
    fn record_event(&mut self, event: &ZoneEvent) -> Result<()> {
        self.conn.execute(
            "INSERT INTO zone_logs(zone_type, log_datetime)
             VALUES (?1, datetime(?2, 'unixepoch'))",
            params![event.zone.as_str(), event.epoch_s as i64],
        )?;
        Ok(())
    }
}

// -------------------- In-Memory --------------------

/// In-memory log for tests and builds without persistence.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Vec<ZoneEvent>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ZoneEvent] {
        &self.events
    }
}

impl EventLog for InMemoryEventLog {
    fn record_event(&mut self, event: &ZoneEvent) -> Result<()> {
        self.events.push(*event);
        Ok(())
    }
}
