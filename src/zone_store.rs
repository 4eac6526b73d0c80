//! Zone persistence.
//!
//! Zones are authored by the calibration UI and read back as an immutable
//! snapshot at session start. The table keeps one row per robot with all
//! sixteen corner coordinates; calibration writes update the row in place.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::zone::{Zone, ZoneSet};
use crate::{Point, ZoneKind};

pub trait ZoneStore: Send {
    /// Load the zone snapshot for a robot. Missing zones are an error: a
    /// detection session must not start without them.
    fn load_zones(&mut self, robot_id: i64) -> Result<ZoneSet>;

    /// Persist a calibration. Replaces any previous snapshot for the robot.
    fn save_zones(&mut self, robot_id: i64, zones: &ZoneSet) -> Result<()>;
}

fn zone_pair(zones: &ZoneSet) -> Result<(&Zone, &Zone)> {
    let stop = zones
        .get(ZoneKind::Stop)
        .ok_or_else(|| anyhow!("zone set is missing the stop zone"))?;
    let slow = zones
        .get(ZoneKind::Slow)
        .ok_or_else(|| anyhow!("zone set is missing the slow zone"))?;
    Ok((stop, slow))
}

// -------------------- SQLite --------------------

pub struct SqliteZoneStore {
    conn: Connection,
}

impl SqliteZoneStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS robot_zones (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              robot_id INTEGER NOT NULL,
              stop_zone_tl_x REAL NOT NULL,
              stop_zone_tl_y REAL NOT NULL,
              stop_zone_tr_x REAL NOT NULL,
              stop_zone_tr_y REAL NOT NULL,
              stop_zone_bl_x REAL NOT NULL,
              stop_zone_bl_y REAL NOT NULL,
              stop_zone_br_x REAL NOT NULL,
              stop_zone_br_y REAL NOT NULL,
              slow_zone_tl_x REAL NOT NULL,
              slow_zone_tl_y REAL NOT NULL,
              slow_zone_tr_x REAL NOT NULL,
              slow_zone_tr_y REAL NOT NULL,
              slow_zone_bl_x REAL NOT NULL,
              slow_zone_bl_y REAL NOT NULL,
              slow_zone_br_x REAL NOT NULL,
              slow_zone_br_y REAL NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl ZoneStore for SqliteZoneStore {
    fn load_zones(&mut self, robot_id: i64) -> Result<ZoneSet> {
        let row: Option<[f64; 16]> = self
            .conn
            .query_row(
                "SELECT stop_zone_tl_x, stop_zone_tl_y, stop_zone_tr_x, stop_zone_tr_y,
                        stop_zone_bl_x, stop_zone_bl_y, stop_zone_br_x, stop_zone_br_y,
                        slow_zone_tl_x, slow_zone_tl_y, slow_zone_tr_x, slow_zone_tr_y,
                        slow_zone_bl_x, slow_zone_bl_y, slow_zone_br_x, slow_zone_br_y
                 FROM robot_zones WHERE robot_id = ?1 ORDER BY id LIMIT 1",
                params![robot_id],
                |row| {
                    let mut coords = [0f64; 16];
                    for (i, coord) in coords.iter_mut().enumerate() {
                        *coord = row.get(i)?;
                    }
                    Ok(coords)
                },
            )
            .optional()?;

        let Some(c) = row else {
            return Err(anyhow!("no zone definitions stored for robot {}", robot_id));
        };

        let mut zones = ZoneSet::new();
        zones.insert(Zone::new(
            ZoneKind::Stop,
            Point::new(c[0], c[1]),
            Point::new(c[2], c[3]),
            Point::new(c[4], c[5]),
            Point::new(c[6], c[7]),
        ));
        zones.insert(Zone::new(
            ZoneKind::Slow,
            Point::new(c[8], c[9]),
            Point::new(c[10], c[11]),
            Point::new(c[12], c[13]),
            Point::new(c[14], c[15]),
        ));
        Ok(zones)
    }

    fn save_zones(&mut self, robot_id: i64, zones: &ZoneSet) -> Result<()> {
        let (stop, slow) = zone_pair(zones)?;
        let coords = params![
            stop.top_left.x,
            stop.top_left.y,
            stop.top_right.x,
            stop.top_right.y,
            stop.bottom_left.x,
            stop.bottom_left.y,
            stop.bottom_right.x,
            stop.bottom_right.y,
            slow.top_left.x,
            slow.top_left.y,
            slow.top_right.x,
            slow.top_right.y,
            slow.bottom_left.x,
            slow.bottom_left.y,
            slow.bottom_right.x,
            slow.bottom_right.y,
            robot_id,
        ];

        let updated = self.conn.execute(
            "UPDATE robot_zones SET
               stop_zone_tl_x = ?1, stop_zone_tl_y = ?2,
               stop_zone_tr_x = ?3, stop_zone_tr_y = ?4,
               stop_zone_bl_x = ?5, stop_zone_bl_y = ?6,
               stop_zone_br_x = ?7, stop_zone_br_y = ?8,
               slow_zone_tl_x = ?9, slow_zone_tl_y = ?10,
               slow_zone_tr_x = ?11, slow_zone_tr_y = ?12,
               slow_zone_bl_x = ?13, slow_zone_bl_y = ?14,
               slow_zone_br_x = ?15, slow_zone_br_y = ?16
             WHERE robot_id = ?17",
            coords,
        )?;
        if updated == 0 {
            self.conn.execute(
                "INSERT INTO robot_zones (
                   stop_zone_tl_x, stop_zone_tl_y, stop_zone_tr_x, stop_zone_tr_y,
                   stop_zone_bl_x, stop_zone_bl_y, stop_zone_br_x, stop_zone_br_y,
                   slow_zone_tl_x, slow_zone_tl_y, slow_zone_tr_x, slow_zone_tr_y,
                   slow_zone_bl_x, slow_zone_bl_y, slow_zone_br_x, slow_zone_br_y,
                   robot_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                coords,
            )?;
        }
        Ok(())
    }
}

// -------------------- In-Memory --------------------

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct InMemoryZoneStore {
    zones: HashMap<i64, ZoneSet>,
}

impl InMemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ZoneStore for InMemoryZoneStore {
    fn load_zones(&mut self, robot_id: i64) -> Result<ZoneSet> {
        self.zones
            .get(&robot_id)
            .cloned()
            .ok_or_else(|| anyhow!("no zone definitions stored for robot {}", robot_id))
    }

    fn save_zones(&mut self, robot_id: i64, zones: &ZoneSet) -> Result<()> {
        zone_pair(zones)?;
        self.zones.insert(robot_id, zones.clone());
        Ok(())
    }
}
