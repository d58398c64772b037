//! Cloudflare API Client
//!
//! Typed wrapper over the v4 REST endpoints this service needs: zone listing,
//! zone lookup and Email Routing rule create/delete. Every call authenticates
//! with the bearer token of the configuration it is made for.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Page size requested when listing zones. Cloudflare caps the answer at this.
const ZONES_PER_PAGE: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum CloudflareError {
    #[error("Failed to call Cloudflare API: {0}")]
    Transport(#[from] reqwest::Error),

    /// Cloudflare answered with a non-success status or `success: false`.
    #[error("{context}: {detail}")]
    Api {
        context: &'static str,
        status: u16,
        detail: String,
    },
}

// ============================================================
// API Types
// ============================================================

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

impl<T> CloudflareResponse<T> {
    fn error_detail(&self) -> Option<String> {
        let messages: Vec<&str> = self
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
            .collect();
        if messages.is_empty() {
            None
        } else {
            Some(messages.join(", "))
        }
    }
}

/// A zone as returned by `GET /zones/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatcher {
    #[serde(rename = "type")]
    pub matcher_type: String,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub value: Vec<String>,
}

/// Body of `POST /zones/{id}/email/routing/rules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    pub enabled: bool,
    pub matchers: Vec<RuleMatcher>,
    pub actions: Vec<RuleAction>,
    pub name: String,
}

impl CreateRuleRequest {
    /// Forward mail sent to `address` on to `destination`.
    pub fn forward(address: &str, destination: &str, config_name: &str) -> Self {
        Self {
            enabled: true,
            matchers: vec![RuleMatcher {
                matcher_type: "literal".to_string(),
                field: "to".to_string(),
                value: address.to_string(),
            }],
            actions: vec![RuleAction {
                action_type: "forward".to_string(),
                value: vec![destination.to_string()],
            }],
            name: format!("Auto-generated via Email Manager - {}", config_name),
        }
    }
}

/// Rule as echoed back by Cloudflare.
#[derive(Debug, Clone)]
pub struct EmailRule {
    pub id: String,
}

/// Wire shape of a created rule. Current responses carry both `id` and
/// `tag`; older ones only `tag`.
#[derive(Debug, Deserialize)]
struct RuleResult {
    id: Option<String>,
    tag: Option<String>,
}

impl RuleResult {
    fn into_rule(self) -> Option<EmailRule> {
        self.id
            .or(self.tag)
            .filter(|id| !id.is_empty())
            .map(|id| EmailRule { id })
    }
}

// ============================================================
// Provider seam
// ============================================================

/// The remote calls the routing handlers depend on.
#[async_trait]
pub trait EmailRoutingApi: Send + Sync {
    /// Active zones visible to the token, verbatim.
    async fn list_zones(&self, api_token: &str) -> Result<Vec<serde_json::Value>, CloudflareError>;

    async fn get_zone(&self, api_token: &str, zone_id: &str) -> Result<Zone, CloudflareError>;

    async fn create_rule(
        &self,
        api_token: &str,
        zone_id: &str,
        rule: &CreateRuleRequest,
    ) -> Result<EmailRule, CloudflareError>;

    async fn delete_rule(
        &self,
        api_token: &str,
        zone_id: &str,
        rule_id: &str,
    ) -> Result<(), CloudflareError>;
}

// ============================================================
// Client Implementation
// ============================================================

/// How a failed call describes itself.
#[derive(Clone, Copy)]
enum Detail {
    /// `"{status} {reason}"`
    Status,
    /// Error messages from the body, falling back to the reason phrase.
    Body,
}

pub struct CloudflareClient {
    http_client: Client,
    base_url: String,
}

impl CloudflareClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CloudflareError> {
        let http_client = Client::builder()
            .user_agent(concat!("email-routing-manager/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn read_result<T: DeserializeOwned>(
        response: Response,
        context: &'static str,
        detail: Detail,
    ) -> Result<Option<T>, CloudflareError> {
        let status = response.status();

        if !status.is_success() {
            let detail = match detail {
                Detail::Status => status_line(status),
                Detail::Body => response
                    .json::<CloudflareResponse<serde_json::Value>>()
                    .await
                    .ok()
                    .and_then(|body| body.error_detail())
                    .unwrap_or_else(|| reason(status).to_string()),
            };
            return Err(CloudflareError::Api {
                context,
                status: status.as_u16(),
                detail,
            });
        }

        let body: CloudflareResponse<T> = response.json().await?;
        if !body.success {
            return Err(CloudflareError::Api {
                context,
                status: status.as_u16(),
                detail: body.error_detail().unwrap_or_else(|| status_line(status)),
            });
        }

        Ok(body.result)
    }

    fn missing_result(context: &'static str) -> CloudflareError {
        CloudflareError::Api {
            context,
            status: StatusCode::OK.as_u16(),
            detail: "No result in response".to_string(),
        }
    }
}

#[async_trait]
impl EmailRoutingApi for CloudflareClient {
    async fn list_zones(&self, api_token: &str) -> Result<Vec<serde_json::Value>, CloudflareError> {
        let url = format!(
            "{}/zones?status=active&per_page={}",
            self.base_url, ZONES_PER_PAGE
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(api_token)
            .send()
            .await?;

        let zones: Option<Vec<serde_json::Value>> =
            Self::read_result(response, "Cloudflare API error", Detail::Status).await?;
        let zones = zones.unwrap_or_default();

        debug!("Listed {} zones", zones.len());
        Ok(zones)
    }

    async fn get_zone(&self, api_token: &str, zone_id: &str) -> Result<Zone, CloudflareError> {
        const CONTEXT: &str = "Failed to get zone details";

        let url = format!("{}/zones/{}", self.base_url, zone_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(api_token)
            .send()
            .await?;

        let zone: Option<Zone> = Self::read_result(response, CONTEXT, Detail::Status).await?;
        zone.ok_or_else(|| Self::missing_result(CONTEXT))
    }

    async fn create_rule(
        &self,
        api_token: &str,
        zone_id: &str,
        rule: &CreateRuleRequest,
    ) -> Result<EmailRule, CloudflareError> {
        const CONTEXT: &str = "Failed to create routing rule";

        let url = format!("{}/zones/{}/email/routing/rules", self.base_url, zone_id);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_token)
            .json(rule)
            .send()
            .await?;

        let created: Option<RuleResult> = Self::read_result(response, CONTEXT, Detail::Body).await?;
        let created = created
            .and_then(RuleResult::into_rule)
            .ok_or_else(|| Self::missing_result(CONTEXT))?;

        info!("Email routing rule created: {} (zone: {})", created.id, zone_id);
        Ok(created)
    }

    async fn delete_rule(
        &self,
        api_token: &str,
        zone_id: &str,
        rule_id: &str,
    ) -> Result<(), CloudflareError> {
        let url = format!(
            "{}/zones/{}/email/routing/rules/{}",
            self.base_url, zone_id, rule_id
        );

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(api_token)
            .send()
            .await?;

        let _: Option<serde_json::Value> =
            Self::read_result(response, "Failed to delete routing rule", Detail::Body).await?;

        info!("Email routing rule deleted: {} (zone: {})", rule_id, zone_id);
        Ok(())
    }
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown status")
}

fn status_line(status: StatusCode) -> String {
    format!("{} {}", status.as_u16(), reason(status))
}
