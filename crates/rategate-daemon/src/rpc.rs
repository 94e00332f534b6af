//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC 2.0 calls to the command handlers. A
//! connection that calls `subscribe_events` additionally receives matching
//! events as `event` notifications until it calls `unsubscribe_events` or
//! disconnects.

use std::path::PathBuf;
use std::sync::Arc;

use rategate_oracle::RateError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::engine::EngineError;
use crate::events::EventFilter;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            -32601,
            "METHOD_NOT_FOUND",
            Some(serde_json::json!({"method": method})),
        )
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(
            -32602,
            "INVALID_PARAMS",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(
            -32603,
            "INTERNAL_ERROR",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Development commands disabled (-32020).
    pub fn dev_mode_disabled() -> Self {
        Self::new(-32020, "DEV_MODE_DISABLED", None)
    }
}

impl From<RateError> for RpcError {
    fn from(err: RateError) -> Self {
        let detail = Some(serde_json::json!({"detail": err.to_string()}));
        match err {
            RateError::Unauthorized { .. } => Self::new(-32001, "UNAUTHORIZED", detail),
            RateError::ZeroTotalSupply => Self::new(-32002, "ZERO_TOTAL_SUPPLY", detail),
            RateError::ZeroAddress { .. } => Self::new(-32003, "ZERO_ADDRESS", detail),
            RateError::InvalidMaxDifference(_) => {
                Self::new(-32004, "INVALID_MAX_DIFFERENCE", detail)
            }
            RateError::AlreadyInitialized => Self::new(-32005, "ALREADY_INITIALIZED", detail),
            RateError::FeedUnavailable { .. } => Self::new(-32006, "FEED_UNAVAILABLE", detail),
            RateError::Overflow(_) => Self::new(-32007, "OVERFLOW", detail),
        }
    }
}

impl From<EngineError> for RpcError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Rate(e) => e.into(),
            EngineError::UnknownFeed(feed) => Self::new(
                -32008,
                "UNKNOWN_FEED",
                Some(serde_json::json!({"feed": feed.to_string()})),
            ),
            other => {
                error!("engine failure: {other}");
                Self::internal_error(&other.to_string())
            }
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// An active event subscription on one connection.
struct Subscription {
    receiver: broadcast::Receiver<rategate_types::RateEvent>,
    filter: EventFilter,
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf: Vec<u8> = Vec::new();
    let mut subscription: Option<Subscription> = None;

    loop {
        // `read_until` is cancel-safe: if the event branch wins, bytes already
        // read stay in `buf` and the next call continues the same line.
        let mut outgoing = tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    break; // EOF
                }
                if buf.last() != Some(&b'\n') {
                    break; // EOF inside a request
                }
                let response = match std::str::from_utf8(&buf)
                    .ok()
                    .and_then(|text| serde_json::from_str::<RpcRequest>(text).ok())
                {
                    Some(request) => handle_request(&state, request, &mut subscription).await,
                    None => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
                };
                buf.clear();
                serde_json::to_string(&response)?
            }
            event = next_event(&mut subscription) => {
                match event {
                    Some(event) => serde_json::to_string(&serde_json::json!({
                        "jsonrpc": "2.0",
                        "method": "event",
                        "params": event,
                    }))?,
                    None => continue,
                }
            }
        };

        outgoing.push('\n');
        writer.write_all(outgoing.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Wait for the next event matching the connection's subscription.
///
/// Pends forever when there is no subscription. Returns `None` after a lag
/// so the caller can loop; a closed bus ends the subscription.
async fn next_event(
    subscription: &mut Option<Subscription>,
) -> Option<rategate_types::RateEvent> {
    let Some(sub) = subscription.as_mut() else {
        return std::future::pending().await;
    };
    match sub.receiver.recv().await {
        Ok(event) if sub.filter.matches(&event) => Some(event),
        Ok(_) => None,
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            warn!(skipped, "event subscriber lagged");
            None
        }
        Err(broadcast::error::RecvError::Closed) => {
            *subscription = None;
            None
        }
    }
}

/// Handle one request, including the connection-scoped subscription methods.
async fn handle_request(
    state: &Arc<DaemonState>,
    request: RpcRequest,
    subscription: &mut Option<Subscription>,
) -> RpcResponse {
    match request.method.as_str() {
        "subscribe_events" => {
            let categories = match commands::query::categories_param(&request.params) {
                Ok(c) => c,
                Err(e) => return RpcResponse::error(request.id, e),
            };
            let filter = EventFilter {
                categories: (!categories.is_empty()).then_some(categories),
            };
            let sub_id: [u8; 16] = rand::random();
            *subscription = Some(Subscription {
                receiver: state.event_bus.subscribe(),
                filter,
            });
            RpcResponse::success(
                request.id,
                serde_json::json!({"subscription_id": hex::encode(sub_id)}),
            )
        }
        "unsubscribe_events" => {
            let was_subscribed = subscription.take().is_some();
            RpcResponse::success(
                request.id,
                serde_json::json!({"unsubscribed": was_subscribed}),
            )
        }
        _ => dispatch_request(state.clone(), request).await,
    }
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }
    let method = request.method.as_str();

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Updater
        "update_rate" => commands::rate::update_rate(&state, &request.params).await,

        // Owner
        "set_reserve_feed" => commands::admin::set_reserve_feed(&state, &request.params).await,
        "set_updater" => commands::admin::set_updater(&state, &request.params).await,
        "set_max_difference_percent" => {
            commands::admin::set_max_difference_percent(&state, &request.params).await
        }
        "transfer_ownership" => {
            commands::admin::transfer_ownership(&state, &request.params).await
        }

        // Accessors
        "get_reserve_feed" => commands::query::get_reserve_feed(&state).await,
        "get_updater" => commands::query::get_updater(&state).await,
        "get_owner" => commands::query::get_owner(&state).await,
        "get_max_difference" => commands::query::get_max_difference(&state).await,
        "get_last_total_supply" => commands::query::get_last_total_supply(&state).await,
        "get_last_tvl" => commands::query::get_last_tvl(&state).await,
        "get_last_update_timestamp" => commands::query::get_last_update_timestamp(&state).await,
        "get_rate" => commands::query::get_rate(&state).await,
        "get_snapshot" => commands::query::get_snapshot(&state).await,
        "get_recent_events" => commands::query::get_recent_events(&state, &request.params).await,

        // Dev-only commands
        "dev_set_reserve" => commands::dev::dev_set_reserve(&state, &request.params).await,
        "dev_list_feeds" => commands::dev::dev_list_feeds(&state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{test_config, test_engine, FEED, OWNER, RESERVE, UPDATER};
    use crate::events::EventBus;
    use rategate_types::{Address, RateEvent};
    use serde_json::json;

    fn test_state(dev_mode: bool) -> Arc<DaemonState> {
        let mut config = test_config();
        config.advanced.dev_mode = dev_mode;
        Arc::new(DaemonState {
            engine: tokio::sync::Mutex::new(test_engine()),
            config,
            event_bus: EventBus::new(16),
        })
    }

    async fn call(state: &Arc<DaemonState>, method: &str, params: serde_json::Value) -> RpcResponse {
        dispatch_request(
            state.clone(),
            RpcRequest {
                jsonrpc: "2.0".to_string(),
                id: json!(1),
                method: method.to_string(),
                params,
            },
        )
        .await
    }

    fn error_code(resp: &RpcResponse) -> i32 {
        resp.error.as_ref().map(|e| e.code).unwrap_or_default()
    }

    #[test]
    fn test_rpc_error_codes() {
        let err = RpcError::from(RateError::ZeroTotalSupply);
        assert_eq!(err.code, -32002);
        assert_eq!(err.message, "ZERO_TOTAL_SUPPLY");

        let err = RpcError::from(EngineError::UnknownFeed(Address::from_low_u8(1)));
        assert_eq!(err.code, -32008);

        let err = RpcError::method_not_found("unknown");
        assert_eq!(err.code, -32601);
    }

    #[tokio::test]
    async fn test_update_rate_commits_and_broadcasts() {
        let state = test_state(false);
        let mut rx = state.event_bus.subscribe();

        let resp = call(
            &state,
            "update_rate",
            json!({
                "caller": UPDATER.to_string(),
                "total_supply": RESERVE,
                "total_tvl": RESERVE,
            }),
        )
        .await;
        let result = resp.result.expect("result");
        assert_eq!(result["rate"], "1000000000000000000");
        assert_eq!(result["committed"], true);
        assert_eq!(result["event"]["event"], "LatestRateUpdated");

        let event = rx.try_recv().expect("broadcast");
        assert!(matches!(event, RateEvent::LatestRateUpdated { .. }));

        let rate = call(&state, "get_rate", json!(null)).await;
        assert_eq!(rate.result.expect("rate"), json!("1000000000000000000"));
    }

    #[tokio::test]
    async fn test_update_rate_requires_updater() {
        let state = test_state(false);
        let resp = call(
            &state,
            "update_rate",
            json!({
                "caller": OWNER.to_string(),
                "total_supply": RESERVE,
                "total_tvl": RESERVE,
            }),
        )
        .await;
        assert_eq!(error_code(&resp), -32001);
    }

    #[tokio::test]
    async fn test_zero_supply_is_error() {
        let state = test_state(false);
        let resp = call(
            &state,
            "update_rate",
            json!({
                "caller": UPDATER.to_string(),
                "total_supply": "0",
                "total_tvl": RESERVE,
            }),
        )
        .await;
        assert_eq!(error_code(&resp), -32002);
        assert_eq!(state.event_bus.sequence(), 0);
    }

    #[tokio::test]
    async fn test_setters_and_accessors() {
        let state = test_state(false);
        let new_feed = Address::from_low_u8(44);

        let resp = call(
            &state,
            "set_reserve_feed",
            json!({"caller": OWNER.to_string(), "feed": new_feed.to_string()}),
        )
        .await;
        assert_eq!(resp.result.expect("result")["event"]["event"], "ReserveFeedSet");

        let feed = call(&state, "get_reserve_feed", json!(null)).await;
        assert_eq!(feed.result.expect("feed"), json!(new_feed.to_string()));

        let resp = call(
            &state,
            "set_max_difference_percent",
            json!({"caller": OWNER.to_string(), "max_difference": "0"}),
        )
        .await;
        assert_eq!(error_code(&resp), -32004);

        let resp = call(
            &state,
            "set_updater",
            json!({"caller": UPDATER.to_string(), "updater": OWNER.to_string()}),
        )
        .await;
        assert_eq!(error_code(&resp), -32001);

        let snapshot = call(&state, "get_snapshot", json!(null)).await;
        let snapshot = snapshot.result.expect("snapshot");
        assert_eq!(snapshot["updater"], json!(UPDATER.to_string()));
        assert_eq!(snapshot["max_difference"], "30000000000000000");
    }

    #[tokio::test]
    async fn test_recent_events_filtered() {
        let state = test_state(false);
        call(
            &state,
            "update_rate",
            json!({
                "caller": UPDATER.to_string(),
                "total_supply": RESERVE,
                "total_tvl": "1",
            }),
        )
        .await;

        let resp = call(&state, "get_recent_events", json!({"categories": ["alert"]})).await;
        let events = resp.result.expect("events");
        let events = events.as_array().expect("array");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"]["event"], "AlertInvalidReserveDifference");

        let all = call(&state, "get_recent_events", json!({})).await;
        assert_eq!(all.result.expect("events").as_array().expect("array").len(), 5);

        let bad = call(&state, "get_recent_events", json!({"categories": ["nope"]})).await;
        assert_eq!(error_code(&bad), -32602);
    }

    #[tokio::test]
    async fn test_dev_set_reserve_gated() {
        let state = test_state(false);
        let resp = call(
            &state,
            "dev_set_reserve",
            json!({"feed": FEED.to_string(), "answer": "-1"}),
        )
        .await;
        assert_eq!(error_code(&resp), -32020);

        let state = test_state(true);
        let resp = call(
            &state,
            "dev_set_reserve",
            json!({"feed": FEED.to_string(), "answer": "-1"}),
        )
        .await;
        assert!(resp.result.is_some());

        let resp = call(
            &state,
            "update_rate",
            json!({
                "caller": UPDATER.to_string(),
                "total_supply": RESERVE,
                "total_tvl": RESERVE,
            }),
        )
        .await;
        let result = resp.result.expect("result");
        assert_eq!(result["committed"], false);
        assert_eq!(result["event"]["event"], "AlertInvalidReserve");
        assert_eq!(result["rate"], "0");

        let feeds = call(&state, "dev_list_feeds", json!(null)).await;
        let feeds = feeds.result.expect("feeds");
        assert_eq!(feeds[0]["answer"], "-1");
    }

    #[tokio::test]
    async fn test_unknown_method_and_version() {
        let state = test_state(false);
        let resp = call(&state, "no_such_method", json!(null)).await;
        assert_eq!(error_code(&resp), -32601);

        let resp = dispatch_request(
            state.clone(),
            RpcRequest {
                jsonrpc: "1.0".to_string(),
                id: json!(2),
                method: "get_rate".to_string(),
                params: json!(null),
            },
        )
        .await;
        assert_eq!(error_code(&resp), -32600);
    }

    #[test]
    fn test_rpc_response_success() {
        let resp = RpcResponse::success(json!(1), json!({"rate": "0"}));
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    /// A client connected to `handle_connection` over a socket pair.
    struct TestClient {
        reader: BufReader<tokio::net::unix::OwnedReadHalf>,
        writer: tokio::net::unix::OwnedWriteHalf,
    }

    impl TestClient {
        fn connect(state: &Arc<DaemonState>) -> Self {
            let (client, server) = tokio::net::UnixStream::pair().expect("socket pair");
            tokio::spawn(handle_connection(state.clone(), server));
            let (reader, writer) = client.into_split();
            Self {
                reader: BufReader::new(reader),
                writer,
            }
        }

        async fn send_raw(&mut self, raw: &str) {
            self.writer.write_all(raw.as_bytes()).await.expect("write");
            self.writer.flush().await.expect("flush");
        }

        async fn send(&mut self, id: u64, method: &str, params: serde_json::Value) {
            let line = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
            self.send_raw(&format!("{line}\n")).await;
        }

        async fn recv(&mut self) -> serde_json::Value {
            let mut line = String::new();
            tokio::time::timeout(
                std::time::Duration::from_secs(5),
                self.reader.read_line(&mut line),
            )
            .await
            .expect("response in time")
            .expect("read");
            serde_json::from_str(&line).expect("json line")
        }
    }

    fn rate_event(rate: u128) -> RateEvent {
        RateEvent::LatestRateUpdated {
            rate: rategate_types::U256::new(rate),
            timestamp: 1,
        }
    }

    #[tokio::test]
    async fn test_subscription_filters_and_unsubscribes() {
        let state = test_state(false);
        let mut client = TestClient::connect(&state);

        client
            .send(1, "subscribe_events", json!({"categories": ["rate"]}))
            .await;
        let resp = client.recv().await;
        assert_eq!(resp["id"], 1);
        let sub_id = resp["result"]["subscription_id"].as_str().expect("id");
        assert_eq!(sub_id.len(), 32);

        state.event_bus.emit(RateEvent::AlertInvalidRate {
            rate: rategate_types::U256::ZERO,
            timestamp: 1,
        });
        state.event_bus.emit(rate_event(7));

        let note = client.recv().await;
        assert_eq!(note["method"], "event");
        assert_eq!(note["params"]["event"], "LatestRateUpdated");
        assert_eq!(note["params"]["rate"], "7");

        client.send(2, "unsubscribe_events", json!(null)).await;
        let resp = client.recv().await;
        assert_eq!(resp["id"], 2);
        assert_eq!(resp["result"]["unsubscribed"], true);

        state.event_bus.emit(rate_event(8));
        client.send(3, "get_rate", json!(null)).await;
        let resp = client.recv().await;
        assert_eq!(resp["id"], 3);
        assert_eq!(resp["result"], "0");
    }

    #[tokio::test]
    async fn test_request_split_across_event_is_kept() {
        let state = test_state(false);
        let mut client = TestClient::connect(&state);

        client.send(1, "subscribe_events", json!({})).await;
        assert_eq!(client.recv().await["id"], 1);

        client.send_raw(r#"{"jsonrpc":"2.0","id":42,"#).await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        state.event_bus.emit(rate_event(9));

        let note = client.recv().await;
        assert_eq!(note["method"], "event");

        client.send_raw("\"method\":\"get_rate\"}\n").await;
        let resp = client.recv().await;
        assert_eq!(resp["id"], 42);
        assert_eq!(resp["result"], "0");
    }

    #[tokio::test]
    async fn test_malformed_line_gets_parse_error() {
        let state = test_state(false);
        let mut client = TestClient::connect(&state);

        client.send_raw("not json\n").await;
        let resp = client.recv().await;
        assert_eq!(resp["error"]["code"], -32700);
        assert!(resp["id"].is_null());

        client.send(5, "get_owner", json!(null)).await;
        let resp = client.recv().await;
        assert_eq!(resp["result"], json!(OWNER.to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_events_reach_subscribers_in_log_order() {
        let state = test_state(false);
        let mut rx = state.event_bus.subscribe();

        let mut handles = Vec::new();
        for i in 0..12u8 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                call(
                    &state,
                    "set_updater",
                    json!({
                        "caller": OWNER.to_string(),
                        "updater": Address::from_low_u8(100 + i).to_string(),
                    }),
                )
                .await
            }));
        }
        for handle in handles {
            assert!(handle.await.expect("join").result.is_some());
        }

        let mut broadcast = Vec::new();
        while let Ok(event) = rx.try_recv() {
            broadcast.push(event);
        }
        let engine = state.engine.lock().await;
        let logged: Vec<RateEvent> =
            rategate_db::queries::events::recent(engine.conn(), 12, &[])
                .expect("recent")
                .into_iter()
                .map(|stored| stored.event)
                .collect();
        assert_eq!(broadcast.len(), 12);
        assert_eq!(broadcast, logged);
    }
}
