//! Owner-only configuration command handlers.

use std::sync::Arc;

use rategate_types::RateEvent;
use serde_json::Value;

use super::{address_param, u256_param, Result};
use crate::clock::now_secs;
use crate::engine::EngineError;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Set the trusted reserve feed.
pub async fn set_reserve_feed(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let feed = address_param(params, "feed")?;
    let mut engine = state.engine.lock().await;
    let result = engine.set_reserve_feed(&caller, feed, now_secs());
    publish(state, result)
}

/// Set the updater principal.
pub async fn set_updater(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let updater = address_param(params, "updater")?;
    let mut engine = state.engine.lock().await;
    let result = engine.set_updater(&caller, updater, now_secs());
    publish(state, result)
}

/// Set the divergence threshold, scale 1e18.
pub async fn set_max_difference_percent(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let max_difference = u256_param(params, "max_difference")?;
    let mut engine = state.engine.lock().await;
    let result = engine.set_max_difference_percent(&caller, max_difference, now_secs());
    publish(state, result)
}

/// Hand the owner role to another principal.
pub async fn transfer_ownership(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let new_owner = address_param(params, "new_owner")?;
    let mut engine = state.engine.lock().await;
    let result = engine.transfer_ownership(&caller, new_owner, now_secs());
    publish(state, result)
}

/// Emit the event while the caller still holds the engine lock, so
/// subscribers see events in log order.
fn publish(
    state: &Arc<DaemonState>,
    result: std::result::Result<RateEvent, EngineError>,
) -> Result {
    let event = result?;
    state.event_bus.emit(event.clone());
    let event =
        serde_json::to_value(&event).map_err(|e| RpcError::internal_error(&e.to_string()))?;
    Ok(serde_json::json!({ "event": event }))
}
