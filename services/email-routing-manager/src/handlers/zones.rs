//! Zone listing, a live pass-through to Cloudflare.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonesQuery {
    pub config_id: Option<String>,
}

pub async fn list_zones(
    State(state): State<AppState>,
    Query(query): Query<ZonesQuery>,
) -> AppResult<Json<Value>> {
    let config_id = query
        .config_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Config ID is required".to_string()))?;

    let config = state
        .store
        .get_active_config(&config_id)?
        .ok_or_else(|| AppError::NotFound("Configuration not found or inactive".to_string()))?;

    let zones = state.cloudflare.list_zones(&config.api_token).await?;
    debug!(config_id = %config.id, zones = zones.len(), "zones fetched");

    Ok(Json(json!({
        "success": true,
        "configId": config.id,
        "configName": config.name,
        "zones": zones,
    })))
}
