//! Stored entities and their JSON projections.

use serde::{Deserialize, Serialize};

/// Prefix shown in place of the hidden part of a credential.
pub const MASK_PREFIX: &str = "***";

/// Number of trailing characters left visible by [`mask_secret`].
const VISIBLE_SUFFIX: usize = 4;

/// A Cloudflare account configuration as stored, credentials in clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub id: String,
    pub name: String,
    pub api_token: String,
    pub account_id: String,
    pub d1_database: String,
    pub worker_api: String,
    pub kv_storage: String,
    pub destination_emails: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Public projection: credentials reduced to their last four characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub id: String,
    pub name: String,
    pub api_token: String,
    pub account_id: String,
    pub d1_database: String,
    pub worker_api: String,
    pub kv_storage: String,
    pub destination_emails: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Edit projection: credentials unmasked, used to pre-fill an edit form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDetail {
    pub id: String,
    pub name: String,
    pub api_token: String,
    pub account_id: String,
    pub d1_database: String,
    pub worker_api: String,
    pub kv_storage: String,
    pub destination_emails: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// `"***" + last four characters`, or an empty string for an empty secret.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let count = secret.chars().count();
    let suffix: String = secret
        .chars()
        .skip(count.saturating_sub(VISIBLE_SUFFIX))
        .collect();
    format!("{}{}", MASK_PREFIX, suffix)
}

impl From<&Configuration> for ConfigSummary {
    fn from(config: &Configuration) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            api_token: mask_secret(&config.api_token),
            account_id: mask_secret(&config.account_id),
            d1_database: mask_secret(&config.d1_database),
            worker_api: mask_secret(&config.worker_api),
            kv_storage: mask_secret(&config.kv_storage),
            destination_emails: config.destination_emails.clone(),
            is_active: config.is_active,
            created_at: config.created_at.clone(),
            updated_at: config.updated_at.clone(),
        }
    }
}

impl From<Configuration> for ConfigDetail {
    fn from(config: Configuration) -> Self {
        Self {
            id: config.id,
            name: config.name,
            api_token: config.api_token,
            account_id: config.account_id,
            d1_database: config.d1_database,
            worker_api: config.worker_api,
            kv_storage: config.kv_storage,
            destination_emails: config.destination_emails,
            is_active: config.is_active,
            created_at: config.created_at,
            updated_at: config.updated_at,
        }
    }
}

/// Local mirror of a rule confirmed created on Cloudflare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    pub id: String,
    pub cloudflare_config_id: String,
    pub zone_id: String,
    pub zone_name: String,
    pub alias_part: String,
    pub full_email: String,
    pub rule_id: String,
    pub destination: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRef {
    pub id: String,
    pub name: String,
}

/// Mirror row joined with the display name of its configuration, if the
/// configuration row still exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRuleView {
    #[serde(flatten)]
    pub rule: RoutingRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudflare_config: Option<ConfigRef>,
}

impl RoutingRuleView {
    pub fn new(rule: RoutingRule, config_name: Option<String>) -> Self {
        let cloudflare_config = config_name.map(|name| ConfigRef {
            id: rule.cloudflare_config_id.clone(),
            name,
        });
        Self {
            rule,
            cloudflare_config,
        }
    }
}
