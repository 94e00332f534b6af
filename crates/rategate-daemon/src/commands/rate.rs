//! Rate update command handler.

use std::sync::Arc;

use serde_json::Value;

use super::{address_param, u256_param, Result};
use crate::clock::now_secs;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Submit a supply / TVL observation. Updater only.
///
/// Returns the published rate after the call, whether it committed, and the
/// event it emitted.
pub async fn update_rate(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = address_param(params, "caller")?;
    let total_supply = u256_param(params, "total_supply")?;
    let total_tvl = u256_param(params, "total_tvl")?;

    // Emit under the engine lock so subscribers see events in log order.
    let outcome = {
        let mut engine = state.engine.lock().await;
        let outcome = engine.update_rate(&caller, total_supply, total_tvl, now_secs())?;
        state.event_bus.emit(outcome.event.clone());
        outcome
    };

    let event = serde_json::to_value(&outcome.event)
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    Ok(serde_json::json!({
        "rate": outcome.rate.to_string(),
        "committed": outcome.committed(),
        "event": event,
        "round_id": outcome.round.round_id.to_string(),
    }))
}
