use rusqlite::Connection;

pub mod tables {
    pub const DOCUMENTS: &str = "documents";

    pub const ALL_TABLES: &[&str] = &[DOCUMENTS];
}

pub mod columns {
    pub const KEY: &str = "key";
    pub const BODY: &str = "body";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Keys of the documents persisted in [`tables::DOCUMENTS`].
pub mod keys {
    pub const VIDEOS: &str = "videos";
    pub const TRACKS: &str = "tracks";
}

pub use columns::*;
pub use tables::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    key TEXT PRIMARY KEY NOT NULL,
    body TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
