use rusqlite::Connection;

pub mod tables {
    pub const MIXTAPES: &str = "mixtapes";
}

pub mod columns {
    pub const MIXTAPE_ID: &str = "mixtape_id";
    pub const DOC: &str = "doc";
    pub const CREATED_AT: &str = "created_at";
}

pub use columns::*;
pub use tables::*;

// the mixtape itself is an opaque JSON document in `doc`; only the id and
// the creation time are lifted into columns so listing stays cheap
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS mixtapes (
    mixtape_id TEXT NOT NULL PRIMARY KEY,
    doc TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
