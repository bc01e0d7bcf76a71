use rusqlite::{OptionalExtension, Result as SqlResult, params};
use std::path::Path;

use crate::common::{SessionContext, UserProfile};
use crate::error::ChatResult;

use super::database::Database;

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

/// Local key-value store holding the storefront login: a bearer token and the
/// user profile as JSON.
pub struct CredentialStore {
    db: Database,
}

impl CredentialStore {
    pub fn open<P: AsRef<Path>>(path: P) -> ChatResult<Self> {
        let db = Database::open(path)?;
        Self::with_database(db)
    }

    pub fn in_memory() -> ChatResult<Self> {
        Self::with_database(Database::in_memory()?)
    }

    fn with_database(db: Database) -> ChatResult<Self> {
        let store = Self { db };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> SqlResult<()> {
        self.db.connection().execute(
            "CREATE TABLE IF NOT EXISTS credentials (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> SqlResult<Option<String>> {
        self.db
            .connection()
            .query_row(
                "SELECT value FROM credentials WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
    }

    /// Snapshot used to mount a chat session. `None` when the token or the
    /// profile is missing, or the profile can't be read.
    pub fn load_session_context(&self) -> ChatResult<Option<SessionContext>> {
        let (Some(token), Some(user_json)) = (self.get(TOKEN_KEY)?, self.get(USER_KEY)?) else {
            return Ok(None);
        };
        if token.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<UserProfile>(&user_json) {
            Ok(user) => Ok(Some(SessionContext { token, user })),
            Err(err) => {
                log::warn!("Stored user profile is unreadable ({err}); treating as signed out");
                Ok(None)
            }
        }
    }

    pub fn save_session_context(&mut self, context: &SessionContext) -> ChatResult<()> {
        let user_json = serde_json::to_string(&context.user)?;
        let tx = self.db.connection_mut().transaction()?;
        for (key, value) in [(TOKEN_KEY, context.token.as_str()), (USER_KEY, user_json.as_str())] {
            tx.execute(
                "INSERT OR REPLACE INTO credentials (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn clear(&self) -> SqlResult<usize> {
        self.db
            .connection()
            .execute("DELETE FROM credentials", [])
    }
}
