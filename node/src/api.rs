//! # REST + JSON-RPC + WebSocket API
//!
//! The node's HTTP interface. Reads go straight to the ledger's in-memory
//! state; writes arrive as signed envelopes on `/calls`.
//!
//! ## Endpoints
//!
//! | Method | Path                    | Description                              |
//! |--------|-------------------------|------------------------------------------|
//! | GET    | `/health`               | Liveness probe                           |
//! | GET    | `/status`               | Service summary and contract addresses   |
//! | GET    | `/names/:name`          | Registry, registrar and wrapper view     |
//! | GET    | `/addresses/:address`   | Balance, nonce and primary name          |
//! | GET    | `/events?from&limit`    | Persisted event log                      |
//! | POST   | `/calls`                | Submit a signed call                     |
//! | POST   | `/rpc`                  | JSON-RPC 2.0 read gateway                |
//! | GET    | `/ws`                   | Live event stream                        |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use fns_contracts::{Event, NameService, RegistrationRequest};
use fns_protocol::encoding::to_prefixed_hex;
use fns_protocol::envelope::SignedEnvelope;
use fns_protocol::name::namehash;
use fns_protocol::{Address, Hash32, Node};

use crate::ledger::{CallReceipt, Ledger, LedgerError};
use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub ledger: Arc<Ledger>,
    /// Fan-out for WebSocket subscribers.
    pub event_tx: broadcast::Sender<NodeEvent>,
    pub metrics: SharedMetrics,
}

/// Messages pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    /// A signed call was applied and persisted.
    #[serde(rename = "call_applied")]
    CallApplied {
        id: Uuid,
        method: String,
        caller: Address,
        nonce: u64,
        timestamp: u64,
    },
    /// One event the call emitted, with its log sequence number.
    #[serde(rename = "event")]
    Logged { seq: u64, event: Event },
}

impl NodeEvent {
    fn from_receipt(receipt: &CallReceipt) -> Vec<NodeEvent> {
        let mut out = Vec::with_capacity(receipt.events.len() + 1);
        out.push(NodeEvent::CallApplied {
            id: receipt.id,
            method: receipt.method.to_string(),
            caller: receipt.caller,
            nonce: receipt.nonce,
            timestamp: receipt.timestamp,
        });
        out.extend(
            receipt
                .events
                .iter()
                .enumerate()
                .map(|(i, event)| NodeEvent::Logged {
                    seq: receipt.first_event_seq + i as u64,
                    event: event.clone(),
                }),
        );
        out
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/names/:name", get(name_handler))
        .route("/addresses/:address", get(address_handler))
        .route("/events", get(events_handler))
        .route("/calls", post(call_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// A read the name service itself refused, e.g. pricing an invalid label.
pub const EXECUTION_ERROR: i32 = -32000;
pub const NOT_FOUND: i32 = -32001;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,
    pub method: String,
    /// Positional parameters.
    pub params: Option<Value>,
    pub id: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_params(expected: &str) -> Self {
        Self::new(INVALID_PARAMS, format!("Invalid params: expected {expected}"))
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub base_tld: String,
    pub admin: Address,
    pub registrar: Address,
    pub wrapper: Address,
    pub controller: Address,
    pub public_resolver: Address,
    pub payment_token: String,
    pub min_commitment_age: u64,
    pub max_commitment_age: u64,
    pub event_count: usize,
    /// Ledger time in Unix seconds.
    pub now: u64,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NameResponse {
    pub name: String,
    pub node: Node,
    pub owner: Address,
    pub resolver: Address,
    pub ttl: u64,
    /// Present for second-level names under the base TLD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<RegistrationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped: Option<WrappedInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<Address>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationInfo {
    pub label: String,
    pub registrant: Address,
    pub expires: u64,
    pub available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WrappedInfo {
    pub owner: Address,
    pub fuses: u32,
    pub expiry: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressResponse {
    pub address: Address,
    /// Payment-token balance as a decimal string.
    pub balance: String,
    pub nonce: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub from: u64,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub seq: u64,
    pub event: Event,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

const MAX_EVENTS_PER_PAGE: usize = 1_000;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`. Liveness only; `/status` reports on the service.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = &state.ledger;
    let now = ledger.now();
    let resp = ledger.read(|s| StatusResponse {
        version: state.version.clone(),
        base_tld: s.config().base_tld.clone(),
        admin: s.admin(),
        registrar: s.registrar().address(),
        wrapper: s.wrapper().address(),
        controller: s.controller().address(),
        public_resolver: s.public_resolver(),
        payment_token: s.config().token_symbol.clone(),
        min_commitment_age: s.min_commitment_age(),
        max_commitment_age: s.max_commitment_age(),
        event_count: ledger.event_count(),
        now,
        timestamp: chrono::Utc::now().to_rfc3339(),
    });
    Json(resp)
}

/// `GET /names/:name`. 404 when nothing (registry, registrar or wrapper)
/// knows the name.
async fn name_handler(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let now = state.ledger.now();
    let resp = state.ledger.read(|s| describe_name(s, &name, now));
    let known = !resp.owner.is_zero()
        || resp.wrapped.is_some()
        || resp.registration.as_ref().is_some_and(|r| r.expires > 0);
    if known {
        Json(resp).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "not_found", format!("unknown name: {name}"))
    }
}

fn describe_name(service: &NameService, name: &str, now: u64) -> NameResponse {
    let node = namehash(name);
    let registry = service.registry();

    let suffix = format!(".{}", service.config().base_tld);
    let registration = name
        .strip_suffix(suffix.as_str())
        .filter(|label| !label.is_empty() && !label.contains('.'))
        .map(|label| RegistrationInfo {
            label: label.to_string(),
            registrant: service.owner_of(label, now),
            expires: service.name_expires(label),
            available: service.available(label, now),
        });

    let (wrapped_owner, fuses, expiry) = service.get_data(&node, now);
    let wrapped = (!wrapped_owner.is_zero()).then(|| WrappedInfo {
        owner: wrapped_owner,
        fuses: fuses.bits(),
        expiry,
    });

    NameResponse {
        name: name.to_string(),
        node,
        owner: registry.owner(&node),
        resolver: registry.resolver(&node),
        ttl: registry.ttl(&node),
        registration,
        wrapped,
        addr: service.addr(&node),
    }
}

async fn address_handler(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    let address: Address = match raw.parse() {
        Ok(a) => a,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, "params", format!("bad address: {e}"))
        }
    };
    let nonce = match state.ledger.nonce(&address) {
        Ok(n) => n,
        Err(e) => return ledger_error_response(&e),
    };
    let (balance, name) = state
        .ledger
        .read(|s| (s.balance_of(&address), s.reverse_lookup(&address)));
    Json(AddressResponse {
        address,
        balance: balance.to_string(),
        nonce,
        name,
    })
    .into_response()
}

async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(MAX_EVENTS_PER_PAGE)
        .min(MAX_EVENTS_PER_PAGE);
    match state.ledger.events_since(query.from, limit) {
        Ok(events) => Json(
            events
                .into_iter()
                .map(|(seq, event)| LoggedEvent { seq, event })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// `POST /calls`. Body is a [`SignedEnvelope`]; answers with the receipt.
async fn call_handler(
    State(state): State<AppState>,
    Json(envelope): Json<SignedEnvelope>,
) -> Response {
    state.metrics.calls_total.inc();
    let timer = state.metrics.call_latency_seconds.start_timer();

    let ledger = state.ledger.clone();
    let outcome = tokio::task::spawn_blocking(move || ledger.submit(&envelope)).await;
    timer.observe_duration();

    let receipt = match outcome {
        Ok(Ok(receipt)) => receipt,
        Ok(Err(e)) => {
            state
                .metrics
                .failed_calls_total
                .with_label_values(&[e.kind()])
                .inc();
            return ledger_error_response(&e);
        }
        Err(e) => {
            tracing::error!(error = %e, "call task failed");
            state
                .metrics
                .failed_calls_total
                .with_label_values(&["internal"])
                .inc();
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string());
        }
    };

    state.metrics.record_success(receipt.method);
    state
        .metrics
        .events_logged
        .set(state.ledger.event_count() as i64);
    for event in NodeEvent::from_receipt(&receipt) {
        // No subscribers is not an error.
        let _ = state.event_tx.send(event);
    }

    Json(receipt).into_response()
}

fn ledger_error_response(err: &LedgerError) -> Response {
    let status = match err {
        LedgerError::Envelope(_) => StatusCode::UNAUTHORIZED,
        LedgerError::InvalidCall(_) => StatusCode::BAD_REQUEST,
        LedgerError::StaleNonce { .. } => StatusCode::CONFLICT,
        LedgerError::Service(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.kind(), err.to_string())
}

fn error_response(status: StatusCode, kind: &str, error: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            error,
            kind: kind.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// JSON-RPC
// ---------------------------------------------------------------------------

/// `POST /rpc`. Read-only; state changes go through `/calls`.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError::new(
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
            id: req.id,
        });
    }

    let params = match &req.params {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    };

    let (result, error) = match state.dispatch(&req.method, &Params(&params)) {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e)),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

/// Positional JSON-RPC parameters.
struct Params<'a>(&'a [Value]);

impl Params<'_> {
    fn parse<T: DeserializeOwned>(&self, index: usize, expected: &str) -> Result<T, JsonRpcError> {
        self.0
            .get(index)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| JsonRpcError::invalid_params(expected))
    }

    fn string(&self, index: usize, expected: &str) -> Result<String, JsonRpcError> {
        self.parse(index, expected)
    }

    fn node(&self, index: usize, expected: &str) -> Result<Node, JsonRpcError> {
        self.string(index, expected).map(|name| namehash(&name))
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {e}")))
}

fn execution_error(err: impl std::fmt::Display, kind: &str) -> JsonRpcError {
    JsonRpcError {
        code: EXECUTION_ERROR,
        message: err.to_string(),
        data: Some(json!({ "kind": kind })),
    }
}

impl AppState {
    fn dispatch(&self, method: &str, params: &Params<'_>) -> Result<Value, JsonRpcError> {
        let ledger = &self.ledger;
        let now = ledger.now();

        match method {
            "fns_version" => to_result(&self.version),
            "fns_now" => to_result(now),

            // ----- Controller -----
            "fns_valid" => {
                let label = params.string(0, "[label]")?;
                to_result(ledger.read(|s| s.valid(&label)))
            }
            "fns_available" => {
                let label = params.string(0, "[label]")?;
                to_result(ledger.read(|s| s.available(&label, now)))
            }
            "fns_rentPrice" => {
                let label = params.string(0, "[label, duration]")?;
                let duration: u64 = params.parse(1, "[label, duration]")?;
                let price = ledger
                    .read(|s| s.rent_price(&label, duration, now))
                    .map_err(|e| execution_error(&e, e.kind()))?;
                to_result(price)
            }
            "fns_makeCommitment" => {
                let request: RegistrationRequest = params.parse(0, "[registration request]")?;
                let commitment = ledger
                    .read(|s| s.make_commitment(&request))
                    .map_err(|e| execution_error(&e, e.kind()))?;
                to_result(commitment)
            }
            "fns_commitments" => {
                let commitment: Hash32 = params.parse(0, "[commitment]")?;
                to_result(ledger.read(|s| s.commitments(&commitment)))
            }
            "fns_minCommitmentAge" => to_result(ledger.read(|s| s.min_commitment_age())),
            "fns_maxCommitmentAge" => to_result(ledger.read(|s| s.max_commitment_age())),

            // ----- Registry -----
            "fns_owner" => {
                let node = params.node(0, "[name]")?;
                to_result(ledger.read(|s| s.registry().owner(&node)))
            }
            "fns_resolver" => {
                let node = params.node(0, "[name]")?;
                to_result(ledger.read(|s| s.registry().resolver(&node)))
            }
            "fns_ttl" => {
                let node = params.node(0, "[name]")?;
                to_result(ledger.read(|s| s.registry().ttl(&node)))
            }
            "fns_namehash" => to_result(params.node(0, "[name]")?),

            // ----- Registrar -----
            "fns_nameExpires" => {
                let label = params.string(0, "[label]")?;
                to_result(ledger.read(|s| s.name_expires(&label)))
            }
            "fns_ownerOf" => {
                let label = params.string(0, "[label]")?;
                to_result(ledger.read(|s| s.owner_of(&label, now)))
            }

            // ----- Wrapper -----
            "fns_getData" => {
                let node = params.node(0, "[name]")?;
                let (owner, fuses, expiry) = ledger.read(|s| s.get_data(&node, now));
                to_result(json!({ "owner": owner, "fuses": fuses.bits(), "expiry": expiry }))
            }

            // ----- Payment token -----
            "fns_balanceOf" => {
                let who: Address = params.parse(0, "[address]")?;
                to_result(ledger.read(|s| s.balance_of(&who)).to_string())
            }
            "fns_allowance" => {
                let owner: Address = params.parse(0, "[owner, spender]")?;
                let spender: Address = params.parse(1, "[owner, spender]")?;
                to_result(ledger.read(|s| s.allowance(&owner, &spender)).to_string())
            }
            "fns_nonce" => {
                let who: Address = params.parse(0, "[address]")?;
                let nonce = ledger
                    .nonce(&who)
                    .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {e}")))?;
                to_result(nonce)
            }

            // ----- Resolution -----
            "fns_addr" => {
                let node = params.node(0, "[name]")?;
                to_result(ledger.read(|s| s.addr(&node)))
            }
            "fns_text" => {
                let node = params.node(0, "[name, key]")?;
                let key = params.string(1, "[name, key]")?;
                to_result(ledger.read(|s| s.text(&node, &key)))
            }
            "fns_contenthash" => {
                let node = params.node(0, "[name]")?;
                to_result(ledger.read(|s| s.contenthash(&node)).map(|h| to_prefixed_hex(&h)))
            }
            "fns_name" => {
                let who: Address = params.parse(0, "[address]")?;
                match ledger.read(|s| s.reverse_lookup(&who)) {
                    Some(name) => to_result(name),
                    None => Err(JsonRpcError::new(
                        NOT_FOUND,
                        format!("No primary name for {who}"),
                    )),
                }
            }

            _ => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// `GET /ws`. Push-only: client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to serialize ws event");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "ws subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
