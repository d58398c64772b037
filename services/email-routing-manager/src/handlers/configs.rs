//! Cloudflare configuration handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ConfigDetail, ConfigSummary, Configuration};
use crate::server::AppState;
use crate::store::now_timestamp;
use crate::validation::{ConfigInput, ConfigUpdate};

pub async fn list_configs(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let configs: Vec<ConfigSummary> = state
        .store
        .list_active_configs()?
        .iter()
        .map(ConfigSummary::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": configs.len(),
        "configs": configs,
    })))
}

/// Unmasked view of one active configuration, for edit pre-fill.
pub async fn get_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let config = state
        .store
        .get_active_config(&id)?
        .ok_or_else(|| AppError::NotFound("Configuration not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "config": ConfigDetail::from(config),
    })))
}

pub async fn create_config(
    State(state): State<AppState>,
    payload: Result<Json<ConfigInput>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(input) = payload?;
    input.validate()?;

    if state.store.count_active_configs()? >= state.max_configs {
        return Err(AppError::Conflict(format!(
            "Maximum {} Cloudflare configurations allowed",
            state.max_configs
        )));
    }

    if state.store.active_name_taken(&input.name, None)? {
        return Err(AppError::Conflict(
            "Configuration name already exists".to_string(),
        ));
    }

    let now = now_timestamp();
    let config = Configuration {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        api_token: input.api_token,
        account_id: input.account_id,
        d1_database: input.d1_database,
        worker_api: input.worker_api,
        kv_storage: input.kv_storage,
        destination_emails: input.destination_emails,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };
    state.store.insert_config(&config)?;

    info!(config_id = %config.id, name = %config.name, "configuration created");

    Ok(Json(json!({
        "success": true,
        "message": "Configuration added successfully",
        "config": ConfigSummary::from(&config),
    })))
}

pub async fn update_config(
    State(state): State<AppState>,
    payload: Result<Json<ConfigUpdate>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(update) = payload?;

    let id = update
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Configuration ID is required".to_string()))?;

    let existing = state
        .store
        .get_config(&id)?
        .ok_or_else(|| AppError::NotFound("Configuration not found".to_string()))?;

    if update.has_changes() {
        let merged = update.merge_over(&existing);
        merged.validate()?;

        if merged.name != existing.name && state.store.active_name_taken(&merged.name, Some(&id))? {
            return Err(AppError::Conflict(
                "Configuration name already exists".to_string(),
            ));
        }

        state.store.update_config(&id, &update, &now_timestamp())?;
        info!(config_id = %id, "configuration updated");
    }

    let config = state
        .store
        .get_config(&id)?
        .ok_or_else(|| AppError::NotFound("Configuration not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Configuration updated successfully",
        "config": ConfigSummary::from(&config),
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteConfigParams {
    pub id: Option<String>,
}

/// Soft delete, refused while active routing rules reference the configuration.
pub async fn delete_config(
    State(state): State<AppState>,
    Query(params): Query<DeleteConfigParams>,
) -> AppResult<Json<Value>> {
    let id = params
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Configuration ID is required".to_string()))?;

    if state.store.count_active_rules(&id)? > 0 {
        return Err(AppError::Conflict(
            "Cannot delete configuration with active email routing".to_string(),
        ));
    }

    if state.store.deactivate_config(&id, &now_timestamp())? == 0 {
        return Err(AppError::NotFound("Configuration not found".to_string()));
    }

    info!(config_id = %id, "configuration deactivated");

    Ok(Json(json!({
        "success": true,
        "message": "Configuration deactivated successfully",
    })))
}
