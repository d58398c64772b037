//! Request payload schemas.
//!
//! Fields default to empty so that a missing field is reported with the
//! same message as an empty one. Checks run in declaration order and stop
//! at the first violation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::Configuration;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .unwrap()
});

pub fn is_valid_email(value: &str) -> bool {
    !value.contains("..") && EMAIL_RE.is_match(value)
}

fn require(value: &str, message: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(())
}

/// Body of `POST /api/configs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigInput {
    pub name: String,
    pub api_token: String,
    pub account_id: String,
    pub d1_database: String,
    pub worker_api: String,
    pub kv_storage: String,
    pub destination_emails: Vec<String>,
}

impl ConfigInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&self.name, "Name is required")?;
        require(&self.api_token, "API token is required")?;
        require(&self.account_id, "Account ID is required")?;
        require(&self.d1_database, "D1 database is required")?;
        require(&self.worker_api, "Worker API is required")?;
        require(&self.kv_storage, "KV storage is required")?;

        if let Some(bad) = self.destination_emails.iter().find(|e| !is_valid_email(e)) {
            return Err(AppError::Validation(format!(
                "Invalid destination email: {}",
                bad
            )));
        }
        Ok(())
    }
}

/// Body of `PUT /api/configs`. Only supplied fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub id: Option<String>,
    pub name: Option<String>,
    pub api_token: Option<String>,
    pub account_id: Option<String>,
    pub d1_database: Option<String>,
    pub worker_api: Option<String>,
    pub kv_storage: Option<String>,
    pub destination_emails: Option<Vec<String>>,
}

impl ConfigUpdate {
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.api_token.is_some()
            || self.account_id.is_some()
            || self.d1_database.is_some()
            || self.worker_api.is_some()
            || self.kv_storage.is_some()
            || self.destination_emails.is_some()
    }

    /// The stored record with every supplied field replaced.
    pub fn merge_over(&self, existing: &Configuration) -> ConfigInput {
        fn pick(update: &Option<String>, current: &str) -> String {
            update.clone().unwrap_or_else(|| current.to_string())
        }

        ConfigInput {
            name: pick(&self.name, &existing.name),
            api_token: pick(&self.api_token, &existing.api_token),
            account_id: pick(&self.account_id, &existing.account_id),
            d1_database: pick(&self.d1_database, &existing.d1_database),
            worker_api: pick(&self.worker_api, &existing.worker_api),
            kv_storage: pick(&self.kv_storage, &existing.kv_storage),
            destination_emails: self
                .destination_emails
                .clone()
                .unwrap_or_else(|| existing.destination_emails.clone()),
        }
    }
}

/// Body of `POST /api/email-routing`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingRuleInput {
    pub cloudflare_config_id: String,
    pub zone_id: String,
    pub alias_part: String,
    pub destination_email: String,
}

impl RoutingRuleInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&self.cloudflare_config_id, "Cloudflare config ID is required")?;
        require(&self.zone_id, "Zone ID is required")?;
        require(&self.alias_part, "Alias part is required")?;
        if !is_valid_email(&self.destination_email) {
            return Err(AppError::Validation(
                "Valid destination email is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ConfigInput {
        ConfigInput {
            name: "personal".into(),
            api_token: "token".into(),
            account_id: "account".into(),
            d1_database: "d1".into(),
            worker_api: "worker".into(),
            kv_storage: "kv".into(),
            destination_emails: vec![],
        }
    }

    fn message(err: AppError) -> String {
        err.to_string()
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("x@y.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.id"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a..b@example.com"));
    }

    #[test]
    fn test_config_input_valid() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_fields_report_first_violation() {
        let input: ConfigInput = serde_json::from_str(r#"{"apiToken": "t"}"#).unwrap();
        assert_eq!(
            message(input.validate().unwrap_err()),
            "Validation error: Name is required"
        );

        let mut input = valid_config();
        input.d1_database.clear();
        input.kv_storage.clear();
        assert_eq!(
            message(input.validate().unwrap_err()),
            "Validation error: D1 database is required"
        );
    }

    #[test]
    fn test_destination_emails_checked() {
        let mut input = valid_config();
        input.destination_emails = vec!["ok@example.com".into(), "broken".into()];
        assert_eq!(
            message(input.validate().unwrap_err()),
            "Validation error: Invalid destination email: broken"
        );
    }

    #[test]
    fn test_destination_emails_default_empty() {
        let input: ConfigInput = serde_json::from_value(serde_json::json!({
            "name": "n", "apiToken": "t", "accountId": "a",
            "d1Database": "d", "workerApi": "w", "kvStorage": "k"
        }))
        .unwrap();
        assert!(input.destination_emails.is_empty());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_update_merge_keeps_unsupplied_fields() {
        let existing = Configuration {
            id: "cfg".into(),
            name: "old".into(),
            api_token: "tok".into(),
            account_id: "acct".into(),
            d1_database: "d1".into(),
            worker_api: "w".into(),
            kv_storage: "kv".into(),
            destination_emails: vec!["a@b.com".into()],
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let update: ConfigUpdate =
            serde_json::from_str(r#"{"id": "cfg", "name": "new"}"#).unwrap();

        assert!(update.has_changes());
        let merged = update.merge_over(&existing);
        assert_eq!(merged.name, "new");
        assert_eq!(merged.api_token, "tok");
        assert_eq!(merged.destination_emails, vec!["a@b.com".to_string()]);

        let empty: ConfigUpdate = serde_json::from_str(r#"{"id": "cfg"}"#).unwrap();
        assert!(!empty.has_changes());
    }

    #[test]
    fn test_routing_rule_input() {
        let mut input = RoutingRuleInput {
            cloudflare_config_id: "cfg".into(),
            zone_id: "z".into(),
            alias_part: "budi".into(),
            destination_email: "x@y.com".into(),
        };
        assert!(input.validate().is_ok());

        input.destination_email = "nope".into();
        assert_eq!(
            message(input.validate().unwrap_err()),
            "Validation error: Valid destination email is required"
        );

        input.alias_part.clear();
        assert_eq!(
            message(input.validate().unwrap_err()),
            "Validation error: Alias part is required"
        );
    }
}
