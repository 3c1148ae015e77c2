use std::path::Path;

use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use rusqlite::Connection;

use crate::{config::Database, storage::{error::StoreError, schema}};

pub type MillisSinceUnix = i64;

fn open_in_memory() -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open_in_memory()
}

fn open_from_file(path: &Path) -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open(path)
}

pub fn open(config: &Database) -> Result<rusqlite::Connection, StoreError> {
    let db = match config {
        Database::InMemory => open_in_memory()?,
        Database::OnDisk { location } => open_from_file(location)?,
    };
    schema::init(&db)?;
    Ok(db)
}

/// current time in milliseconds since the unix epoch, the resolution the
/// documents store their creation time in
pub fn now_millis() -> MillisSinceUnix {
    Utc::now().timestamp_millis()
}

/// converts milliseconds since the unix epoch to local date time
pub fn millis_to_local_time(since_unix: MillisSinceUnix) -> anyhow::Result<DateTime<Local>> {
    let datetime = DateTime::from_timestamp_millis(since_unix).ok_or(anyhow!(
        "failed to convert {since_unix} ms timestamp to datetime"
    ))?;

    Ok(DateTime::from(datetime))
}

#[cfg(test)]
mod tests {
    use crate::{
        config::Database,
        storage::{db::open, schema},
    };

    #[test]
    fn open_in_memory_db_initializes_schema() {
        let db = open(&Database::InMemory).unwrap();

        let mut stmt = db
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();

        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert!(tables.contains(&schema::tables::MIXTAPES.to_string()));
    }

    #[test]
    fn millis_round_trip_to_local_time() {
        let local = super::millis_to_local_time(1700000000000).unwrap();
        assert_eq!(local.timestamp_millis(), 1700000000000);
    }
}
