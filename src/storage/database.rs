use rusqlite::{Connection, Result as SqlResult};
use std::fs;
use std::path::Path;

use crate::error::ChatResult;

/// Thin owner of a SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database file and its parent directory.
    pub fn open<P: AsRef<Path>>(path: P) -> ChatResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
