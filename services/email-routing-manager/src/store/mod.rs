//! SQLite storage for configurations and routing rule mirrors.
//!
//! The two tables are independent: there is no foreign key between them and
//! the deactivation guard is a count query in [`Store::count_active_rules`].

mod configs;
mod routing;

pub use routing::RuleWithToken;

use crate::error::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe handle to the backing database.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> AppResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cloudflare_configs (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                api_token TEXT NOT NULL,
                account_id TEXT NOT NULL,
                d1_database TEXT NOT NULL,
                worker_api TEXT NOT NULL,
                kv_storage TEXT NOT NULL,
                destination_emails TEXT NOT NULL DEFAULT '[]',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS email_routing (
                id TEXT PRIMARY KEY,
                cloudflare_config_id TEXT NOT NULL,
                zone_id TEXT NOT NULL,
                zone_name TEXT NOT NULL,
                alias_part TEXT NOT NULL,
                full_email TEXT NOT NULL,
                rule_id TEXT NOT NULL,
                destination TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_configs_active_name
                ON cloudflare_configs(is_active, name);
            CREATE INDEX IF NOT EXISTS idx_email_routing_config
                ON email_routing(cloudflare_config_id, is_active);
            CREATE INDEX IF NOT EXISTS idx_email_routing_created
                ON email_routing(created_at);",
        )?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|e| AppError::Internal(format!("Lock error: {}", e)))
    }
}

/// Current time as stored in `created_at`/`updated_at`.
///
/// Fixed-width UTC so that text ordering matches chronological ordering.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
