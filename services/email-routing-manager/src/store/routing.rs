//! `email_routing` mirror queries.

use rusqlite::{params, OptionalExtension, Row};

use super::Store;
use crate::error::AppResult;
use crate::models::{RoutingRule, RoutingRuleView};

const JOINED_SELECT: &str = "SELECT
        er.id, er.cloudflare_config_id, er.zone_id, er.zone_name, er.alias_part,
        er.full_email, er.rule_id, er.destination, er.is_active, er.created_at,
        er.updated_at, cc.name, cc.api_token
     FROM email_routing er
     LEFT JOIN cloudflare_configs cc ON er.cloudflare_config_id = cc.id";

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<RoutingRule> {
    Ok(RoutingRule {
        id: row.get(0)?,
        cloudflare_config_id: row.get(1)?,
        zone_id: row.get(2)?,
        zone_name: row.get(3)?,
        alias_part: row.get(4)?,
        full_email: row.get(5)?,
        rule_id: row.get(6)?,
        destination: row.get(7)?,
        is_active: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn view_from_row(row: &Row<'_>) -> rusqlite::Result<RoutingRuleView> {
    Ok(RoutingRuleView::new(rule_from_row(row)?, row.get(11)?))
}

/// A mirror row with the token of the configuration that owns it.
#[derive(Debug, Clone)]
pub struct RuleWithToken {
    pub rule: RoutingRule,
    /// `None` when the owning configuration row no longer exists.
    pub api_token: Option<String>,
}

impl Store {
    /// Mirror rows newest first, optionally limited to one configuration.
    pub fn list_rules(&self, config_id: Option<&str>) -> AppResult<Vec<RoutingRuleView>> {
        let conn = self.conn()?;

        let rules = match config_id {
            Some(config_id) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE er.cloudflare_config_id = ?1
                     ORDER BY er.created_at DESC, er.rowid DESC",
                    JOINED_SELECT
                ))?;
                let rows = stmt.query_map([config_id], view_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY er.created_at DESC, er.rowid DESC",
                    JOINED_SELECT
                ))?;
                let rows = stmt.query_map([], view_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(rules)
    }

    pub fn insert_rule(&self, rule: &RoutingRule) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO email_routing (
                id, cloudflare_config_id, zone_id, zone_name, alias_part, full_email,
                rule_id, destination, is_active, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                rule.id,
                rule.cloudflare_config_id,
                rule.zone_id,
                rule.zone_name,
                rule.alias_part,
                rule.full_email,
                rule.rule_id,
                rule.destination,
                rule.is_active,
                rule.created_at,
                rule.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_rule_view(&self, id: &str) -> AppResult<Option<RoutingRuleView>> {
        let conn = self.conn()?;
        let view = conn
            .query_row(
                &format!("{} WHERE er.id = ?1", JOINED_SELECT),
                [id],
                view_from_row,
            )
            .optional()?;
        Ok(view)
    }

    pub fn get_rule_with_token(&self, id: &str) -> AppResult<Option<RuleWithToken>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                &format!("{} WHERE er.id = ?1", JOINED_SELECT),
                [id],
                |row| {
                    Ok(RuleWithToken {
                        rule: rule_from_row(row)?,
                        api_token: row.get(12)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    /// Hard delete of a mirror row. Returns the number of rows removed.
    pub fn delete_rule(&self, id: &str) -> AppResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM email_routing WHERE id = ?1", [id])?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Configuration;

    fn seed_config(store: &Store, id: &str, name: &str) {
        store
            .insert_config(&Configuration {
                id: id.to_string(),
                name: name.to_string(),
                api_token: format!("token-{}", id),
                account_id: "account".to_string(),
                d1_database: "d1".to_string(),
                worker_api: "worker".to_string(),
                kv_storage: "kv".to_string(),
                destination_emails: vec![],
                is_active: true,
                created_at: "2026-01-01T00:00:00.000000Z".to_string(),
                updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
            })
            .unwrap();
    }

    fn rule(id: &str, config_id: &str, created_at: &str) -> RoutingRule {
        RoutingRule {
            id: id.to_string(),
            cloudflare_config_id: config_id.to_string(),
            zone_id: "z1".to_string(),
            zone_name: "example.com".to_string(),
            alias_part: id.to_string(),
            full_email: format!("{}@example.com", id),
            rule_id: format!("remote-{}", id),
            destination: "x@y.com".to_string(),
            is_active: true,
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_list_filters_and_orders_newest_first() {
        let store = Store::in_memory().unwrap();
        seed_config(&store, "a", "alpha");
        seed_config(&store, "b", "beta");

        store.insert_rule(&rule("r1", "a", "2026-01-01T00:00:00.000000Z")).unwrap();
        store.insert_rule(&rule("r2", "b", "2026-01-02T00:00:00.000000Z")).unwrap();
        store.insert_rule(&rule("r3", "a", "2026-01-03T00:00:00.000000Z")).unwrap();

        let for_a: Vec<String> = store
            .list_rules(Some("a"))
            .unwrap()
            .into_iter()
            .map(|v| v.rule.id)
            .collect();
        assert_eq!(for_a, vec!["r3", "r1"]);

        let all = store.list_rules(None).unwrap();
        let ids: Vec<&str> = all.iter().map(|v| v.rule.id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r2", "r1"]);
        assert_eq!(all[1].cloudflare_config.as_ref().unwrap().name, "beta");
    }

    #[test]
    fn test_orphan_rule_has_no_config_ref() {
        let store = Store::in_memory().unwrap();
        store.insert_rule(&rule("r1", "gone", "2026-01-01T00:00:00.000000Z")).unwrap();

        let view = store.get_rule_view("r1").unwrap().unwrap();
        assert!(view.cloudflare_config.is_none());

        let with_token = store.get_rule_with_token("r1").unwrap().unwrap();
        assert_eq!(with_token.api_token, None);
    }

    #[test]
    fn test_rule_with_token_and_delete() {
        let store = Store::in_memory().unwrap();
        seed_config(&store, "a", "alpha");
        store.insert_rule(&rule("r1", "a", "2026-01-01T00:00:00.000000Z")).unwrap();

        let found = store.get_rule_with_token("r1").unwrap().unwrap();
        assert_eq!(found.api_token.as_deref(), Some("token-a"));
        assert_eq!(found.rule.zone_id, "z1");
        assert_eq!(store.count_active_rules("a").unwrap(), 1);

        assert_eq!(store.delete_rule("r1").unwrap(), 1);
        assert!(store.get_rule_with_token("r1").unwrap().is_none());
        assert_eq!(store.count_active_rules("a").unwrap(), 0);
    }
}
