//! Development-only command handlers.
//!
//! Available only when `advanced.dev_mode` is set.

use std::sync::Arc;

use rategate_oracle::ReserveFeed;
use serde_json::Value;

use super::{address_param, i256_param, Result};
use crate::clock::now_secs;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Change the answer reported by a stub reserve feed.
pub async fn dev_set_reserve(state: &Arc<DaemonState>, params: &Value) -> Result {
    if !state.config.advanced.dev_mode {
        return Err(RpcError::dev_mode_disabled());
    }
    let feed = address_param(params, "feed")?;
    let answer = i256_param(params, "answer")?;

    state
        .engine
        .lock()
        .await
        .dev_set_reserve(&feed, answer, now_secs())?;
    Ok(serde_json::json!({"reserve_set": true}))
}

/// List registered stub feeds and their latest rounds.
pub async fn dev_list_feeds(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    let mut feeds = Vec::new();
    for (address, feed) in engine.feeds() {
        let round = feed
            .latest_round_data()
            .map_err(|e| RpcError::internal_error(&e.to_string()))?;
        feeds.push(serde_json::json!({
            "address": address.to_string(),
            "answer": round.answer.to_string(),
            "round_id": round.round_id.to_string(),
            "updated_at": round.updated_at,
            "decimals": feed.decimals(),
        }));
    }
    Ok(Value::Array(feeds))
}
