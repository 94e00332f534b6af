//! Read-only accessors.

use std::sync::Arc;

use rategate_types::EventCategory;
use serde_json::Value;

use super::Result;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Default and maximum page size for `get_recent_events`.
const DEFAULT_EVENT_LIMIT: usize = 100;
const MAX_EVENT_LIMIT: usize = 1000;

pub async fn get_reserve_feed(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    Ok(Value::String(engine.validator().reserve_feed().to_string()))
}

pub async fn get_updater(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    Ok(Value::String(engine.validator().updater().to_string()))
}

pub async fn get_owner(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    Ok(Value::String(engine.validator().owner().to_string()))
}

pub async fn get_max_difference(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    Ok(Value::String(engine.validator().max_difference().to_string()))
}

pub async fn get_last_total_supply(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    Ok(Value::String(engine.validator().last_total_supply().to_string()))
}

pub async fn get_last_tvl(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    Ok(Value::String(engine.validator().last_tvl().to_string()))
}

pub async fn get_last_update_timestamp(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    Ok(serde_json::json!(engine.validator().last_update_timestamp()))
}

/// The published rate, scale 1e18. `"0"` before the first commit.
pub async fn get_rate(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    Ok(Value::String(engine.validator().last_rate().to_string()))
}

/// The whole snapshot.
pub async fn get_snapshot(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    serde_json::to_value(engine.validator().snapshot())
        .map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Recent audit log entries, oldest first.
///
/// Params: optional `limit` (default 100, max 1000) and optional
/// `categories` (array of "config" | "alert" | "rate").
pub async fn get_recent_events(state: &Arc<DaemonState>, params: &Value) -> Result {
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|v| (v as usize).min(MAX_EVENT_LIMIT))
        .unwrap_or(DEFAULT_EVENT_LIMIT);
    let categories = categories_param(params)?;

    let engine = state.engine.lock().await;
    let events = rategate_db::queries::events::recent(engine.conn(), limit, &categories)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;

    let result: Vec<Value> = events
        .iter()
        .map(|stored| {
            serde_json::json!({
                "seq": stored.seq,
                "event": stored.event,
            })
        })
        .collect();
    Ok(Value::Array(result))
}

/// Optional `categories` array.
pub(crate) fn categories_param(
    params: &Value,
) -> std::result::Result<Vec<EventCategory>, RpcError> {
    let Some(raw) = params.get("categories") else {
        return Ok(Vec::new());
    };
    let items = raw
        .as_array()
        .ok_or_else(|| RpcError::invalid_params("categories must be an array"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(EventCategory::parse)
                .ok_or_else(|| RpcError::invalid_params(&format!("unknown category {item}")))
        })
        .collect()
}
