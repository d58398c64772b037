//! `cloudflare_configs` queries.

use rusqlite::types::{Type, Value};
use rusqlite::{params, OptionalExtension, Row};

use super::Store;
use crate::error::AppResult;
use crate::models::Configuration;
use crate::validation::ConfigUpdate;

const CONFIG_COLUMNS: &str = "id, name, api_token, account_id, d1_database, worker_api, \
     kv_storage, destination_emails, is_active, created_at, updated_at";

fn config_from_row(row: &Row<'_>) -> rusqlite::Result<Configuration> {
    let emails: String = row.get(7)?;
    let destination_emails = serde_json::from_str(&emails)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Configuration {
        id: row.get(0)?,
        name: row.get(1)?,
        api_token: row.get(2)?,
        account_id: row.get(3)?,
        d1_database: row.get(4)?,
        worker_api: row.get(5)?,
        kv_storage: row.get(6)?,
        destination_emails,
        is_active: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Store {
    /// Active configurations, oldest first.
    pub fn list_active_configs(&self) -> AppResult<Vec<Configuration>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cloudflare_configs
             WHERE is_active = 1
             ORDER BY created_at ASC, rowid ASC",
            CONFIG_COLUMNS
        ))?;

        let configs = stmt
            .query_map([], config_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(configs)
    }

    pub fn count_active_configs(&self) -> AppResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cloudflare_configs WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Whether an active configuration other than `exclude_id` uses `name`.
    pub fn active_name_taken(&self, name: &str, exclude_id: Option<&str>) -> AppResult<bool> {
        let conn = self.conn()?;
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM cloudflare_configs
                 WHERE name = ?1 AND is_active = 1 AND id != ?2
                 LIMIT 1",
                params![name, exclude_id.unwrap_or("")],
                |row| row.get(0),
            )
            .optional()?;
        Ok(existing.is_some())
    }

    pub fn insert_config(&self, config: &Configuration) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO cloudflare_configs (
                id, name, api_token, account_id, d1_database, worker_api, kv_storage,
                destination_emails, is_active, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                config.id,
                config.name,
                config.api_token,
                config.account_id,
                config.d1_database,
                config.worker_api,
                config.kv_storage,
                serde_json::to_string(&config.destination_emails)?,
                config.is_active,
                config.created_at,
                config.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Configuration by id, active or not.
    pub fn get_config(&self, id: &str) -> AppResult<Option<Configuration>> {
        let conn = self.conn()?;
        let config = conn
            .query_row(
                &format!("SELECT {} FROM cloudflare_configs WHERE id = ?1", CONFIG_COLUMNS),
                [id],
                config_from_row,
            )
            .optional()?;
        Ok(config)
    }

    pub fn get_active_config(&self, id: &str) -> AppResult<Option<Configuration>> {
        let conn = self.conn()?;
        let config = conn
            .query_row(
                &format!(
                    "SELECT {} FROM cloudflare_configs WHERE id = ?1 AND is_active = 1",
                    CONFIG_COLUMNS
                ),
                [id],
                config_from_row,
            )
            .optional()?;
        Ok(config)
    }

    /// Writes the supplied fields of `update` plus `updated_at`.
    ///
    /// Returns the number of rows changed; zero when nothing was supplied.
    pub fn update_config(
        &self,
        id: &str,
        update: &ConfigUpdate,
        updated_at: &str,
    ) -> AppResult<usize> {
        let mut columns: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        let text_fields = [
            ("name", &update.name),
            ("api_token", &update.api_token),
            ("account_id", &update.account_id),
            ("d1_database", &update.d1_database),
            ("worker_api", &update.worker_api),
            ("kv_storage", &update.kv_storage),
        ];
        for (column, value) in text_fields {
            if let Some(value) = value {
                columns.push(column);
                values.push(Value::Text(value.clone()));
            }
        }
        if let Some(emails) = &update.destination_emails {
            columns.push("destination_emails");
            values.push(Value::Text(serde_json::to_string(emails)?));
        }

        if columns.is_empty() {
            return Ok(0);
        }

        columns.push("updated_at");
        values.push(Value::Text(updated_at.to_string()));
        values.push(Value::Text(id.to_string()));

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE cloudflare_configs SET {} WHERE id = ?{}",
            assignments.join(", "),
            values.len()
        );

        let conn = self.conn()?;
        let changed = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(changed)
    }

    /// Active routing rules that still point at a configuration.
    pub fn count_active_rules(&self, config_id: &str) -> AppResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM email_routing
             WHERE cloudflare_config_id = ?1 AND is_active = 1",
            [config_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Soft delete. Returns the number of rows changed.
    pub fn deactivate_config(&self, id: &str, updated_at: &str) -> AppResult<usize> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE cloudflare_configs SET is_active = 0, updated_at = ?1 WHERE id = ?2",
            params![updated_at, id],
        )?;
        Ok(changed)
    }
}
