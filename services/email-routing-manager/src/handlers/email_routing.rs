//! Email Routing rule handlers.
//!
//! Cloudflare is the source of truth. A mirror row is written only after the
//! remote rule exists and removed only after the remote delete succeeded.
//! The zone lookup and rule creation are two independent remote calls; if the
//! process dies between rule creation and the local insert the remote rule is
//! left without a mirror and nothing reconciles it.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cloudflare::CreateRuleRequest;
use crate::error::{AppError, AppResult};
use crate::models::RoutingRule;
use crate::server::AppState;
use crate::store::now_timestamp;
use crate::validation::RoutingRuleInput;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRulesQuery {
    pub config_id: Option<String>,
}

pub async fn list_rules(
    State(state): State<AppState>,
    Query(query): Query<ListRulesQuery>,
) -> AppResult<Json<Value>> {
    let config_id = query.config_id.filter(|id| !id.is_empty());
    let emails = state.store.list_rules(config_id.as_deref())?;

    Ok(Json(json!({
        "success": true,
        "emails": emails,
    })))
}

pub async fn create_rule(
    State(state): State<AppState>,
    payload: Result<Json<RoutingRuleInput>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(input) = payload?;
    input.validate()?;

    let config = state
        .store
        .get_active_config(&input.cloudflare_config_id)?
        .ok_or_else(|| AppError::NotFound("Configuration not found or inactive".to_string()))?;

    let zone = state
        .cloudflare
        .get_zone(&config.api_token, &input.zone_id)
        .await?;

    let full_email = format!("{}@{}", input.alias_part, zone.name);
    let request = CreateRuleRequest::forward(&full_email, &input.destination_email, &config.name);

    let created = state
        .cloudflare
        .create_rule(&config.api_token, &input.zone_id, &request)
        .await?;

    let now = now_timestamp();
    let rule = RoutingRule {
        id: Uuid::new_v4().to_string(),
        cloudflare_config_id: config.id.clone(),
        zone_id: input.zone_id,
        zone_name: zone.name,
        alias_part: input.alias_part,
        full_email,
        rule_id: created.id,
        destination: input.destination_email,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };

    if let Err(e) = state.store.insert_rule(&rule) {
        warn!(
            rule_id = %rule.rule_id,
            zone_id = %rule.zone_id,
            "remote rule created but local mirror insert failed"
        );
        return Err(e);
    }

    info!(
        id = %rule.id,
        rule_id = %rule.rule_id,
        email = %rule.full_email,
        "email routing created"
    );

    let email = state
        .store
        .get_rule_view(&rule.id)?
        .ok_or_else(|| AppError::Internal("mirror row missing after insert".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "email": email,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRuleRequest {
    pub rule_id: Option<String>,
}

/// Remote delete first; the mirror row is dropped only once Cloudflare
/// confirmed it.
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let rule_id = serde_json::from_slice::<DeleteRuleRequest>(&body)
        .ok()
        .and_then(|req| req.rule_id)
        .filter(|rule_id| !rule_id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Rule ID is required".to_string()))?;

    let found = state
        .store
        .get_rule_with_token(&id)?
        .ok_or_else(|| AppError::NotFound("Email routing not found".to_string()))?;

    // A mirror whose configuration row is gone has no token; the remote
    // call still goes out and Cloudflare decides.
    let api_token = match found.api_token.as_deref() {
        Some(token) => token,
        None => {
            warn!(
                id = %id,
                config_id = %found.rule.cloudflare_config_id,
                "configuration missing for email routing, deleting without a token"
            );
            ""
        }
    };

    state
        .cloudflare
        .delete_rule(api_token, &found.rule.zone_id, &rule_id)
        .await?;

    state.store.delete_rule(&id)?;

    info!(id = %id, rule_id = %rule_id, "email routing deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Email routing deleted successfully",
    })))
}
