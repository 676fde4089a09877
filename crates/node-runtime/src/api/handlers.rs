//! # Route Handlers
//!
//! Each handler reads the raw body, decodes its request type, runs the
//! query and wraps the outcome in an [`ApiResponse`].

use std::future::Future;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::{PointKind, TxInventory, TxPoint};
use tracing::{debug, info};
use uuid::Uuid;

use super::response::{ApiResponse, ResponseCode};
use super::ApiState;
use crate::services::{AddrAmount, AddrInventory, Page, QueryError, TransferRequest, UserRef};

// =============================================================================
// REQUESTS
// =============================================================================

/// `sendrawtransaction`
#[derive(Debug, Deserialize)]
pub struct SendRawTransactionReq {
    /// Hex transaction.
    pub rawtx: String,
}

/// `gettxinventory`
#[derive(Debug, Deserialize)]
pub struct GetTxInventoryReq {
    /// Transaction id.
    pub txid: String,
}

/// `getaddrutxos`, `getaddrinventorys`
#[derive(Debug, Deserialize)]
pub struct AddrPageReq {
    /// Address.
    pub addr: String,
    /// Restrict to one badge.
    pub badge_code: Option<String>,
    /// Items to skip.
    pub offset: i64,
    /// Items to return at most.
    pub limit: i64,
}

/// `getaddrbalance`
#[derive(Debug, Deserialize)]
pub struct AddrBalanceReq {
    /// Address.
    pub addr: String,
    /// Restrict to one badge.
    pub badge_code: Option<String>,
}

/// `setaddrinfo`
#[derive(Debug, Deserialize)]
pub struct SetAddrInfoReq {
    /// Owning user slot.
    #[serde(flatten)]
    pub user: UserRef,
    /// Registered address.
    pub addr: String,
}

/// `getuserutxos`, `getuserinventorys`
#[derive(Debug, Deserialize)]
pub struct UserPageReq {
    /// User slot.
    #[serde(flatten)]
    pub user: UserRef,
    /// Restrict to one badge.
    pub badge_code: Option<String>,
    /// Items to skip.
    pub offset: i64,
    /// Items to return at most.
    pub limit: i64,
}

/// `getuserbalance`
#[derive(Debug, Deserialize)]
pub struct UserBalanceReq {
    /// User slot.
    #[serde(flatten)]
    pub user: UserRef,
    /// Restrict to one badge.
    pub badge_code: Option<String>,
}

/// `sendbadgetoaddress`
#[derive(Debug, Deserialize)]
pub struct SendBadgeToAddressReq {
    /// Owner of the spent UTXOs.
    #[serde(flatten)]
    pub user: UserRef,
    /// Badge to move.
    pub badge_code: String,
    /// Receives the change.
    pub change_addr: String,
    /// Destinations.
    pub addr_amounts: Vec<AddrAmount>,
    /// Amount destroyed.
    pub amount_to_burn: i64,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Inventory split by direction.
#[derive(Debug, Serialize)]
pub struct InventoryRsp {
    /// Transaction id.
    pub txid: String,
    /// Consumed points.
    pub vins: Vec<TxPoint>,
    /// Created points.
    pub vouts: Vec<TxPoint>,
}

impl From<TxInventory> for InventoryRsp {
    fn from(inventory: TxInventory) -> Self {
        let (vins, vouts): (Vec<TxPoint>, Vec<TxPoint>) = inventory
            .points
            .into_iter()
            .partition(|p| p.kind == PointKind::Vin);
        Self {
            txid: inventory.txid,
            vins,
            vouts,
        }
    }
}

/// `getaddrutxos`, `getuserutxos`
#[derive(Debug, Serialize)]
pub struct UtxosRsp {
    /// Page of unspent outputs.
    pub utxos: Vec<TxPoint>,
}

/// `getaddrbalance`, `getuserbalance`
#[derive(Debug, Serialize)]
pub struct BalanceRsp {
    /// Sum of unspent outputs.
    pub balance: i64,
}

/// `getaddrinventorys`, `getuserinventorys`
#[derive(Debug, Serialize)]
pub struct InventoriesRsp {
    /// Page of per-transaction sums.
    pub addr_inventorys: Vec<AddrInventory>,
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn respond<Req, Res, F, Fut>(
    route: &'static str,
    body: Result<Bytes, BytesRejection>,
    handle: F,
) -> Json<ApiResponse>
where
    Req: DeserializeOwned,
    Res: Serialize,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = Result<Res, QueryError>>,
{
    let request_id = Uuid::new_v4();
    let body = match body {
        Ok(body) => body,
        Err(e) => return Json(ApiResponse::error(ResponseCode::ReadBody, e.body_text())),
    };
    info!(request_id = %request_id, "[api] {} ({} bytes)", route, body.len());

    let request: Req = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return Json(ApiResponse::error(ResponseCode::WrongFormat, e.to_string())),
    };

    let response = match handle(request).await {
        Ok(data) => match serde_json::to_value(data) {
            Ok(data) => ApiResponse::ok(data),
            Err(e) => ApiResponse::error(ResponseCode::Service, e.to_string()),
        },
        Err(e) => ApiResponse::from(e),
    };
    debug!(request_id = %request_id, "[api] {} -> {}", route, response.code);
    Json(response)
}

fn badge_filter(badge_code: &Option<String>) -> Option<&str> {
    badge_code.as_deref()
}

pub(super) async fn send_raw_transaction(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("sendrawtransaction", body, |req: SendRawTransactionReq| async move {
        let inventory = state.query.submit_raw_transaction(&req.rawtx).await?;
        Ok::<_, QueryError>(InventoryRsp::from(inventory))
    })
    .await
}

pub(super) async fn get_tx_inventory(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("gettxinventory", body, |req: GetTxInventoryReq| async move {
        Ok::<_, QueryError>(InventoryRsp::from(state.query.transaction_inventory(&req.txid)?))
    })
    .await
}

pub(super) async fn get_addr_utxos(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("getaddrutxos", body, |req: AddrPageReq| async move {
        let page = Page::new(req.offset, req.limit)?;
        let utxos = state
            .query
            .addr_utxos(&req.addr, badge_filter(&req.badge_code), page)?;
        Ok::<_, QueryError>(UtxosRsp { utxos })
    })
    .await
}

pub(super) async fn get_addr_balance(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("getaddrbalance", body, |req: AddrBalanceReq| async move {
        let balance = state
            .query
            .addr_balance(&req.addr, badge_filter(&req.badge_code))?;
        Ok::<_, QueryError>(BalanceRsp { balance })
    })
    .await
}

pub(super) async fn get_addr_inventories(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("getaddrinventorys", body, |req: AddrPageReq| async move {
        let page = Page::new(req.offset, req.limit)?;
        let addr_inventorys =
            state
                .query
                .addr_inventories(&req.addr, badge_filter(&req.badge_code), page)?;
        Ok::<_, QueryError>(InventoriesRsp { addr_inventorys })
    })
    .await
}

pub(super) async fn set_addr_info(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("setaddrinfo", body, |req: SetAddrInfoReq| async move {
        state.query.set_addr_info(&req.user, &req.addr)
    })
    .await
}

pub(super) async fn get_user_utxos(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("getuserutxos", body, |req: UserPageReq| async move {
        let page = Page::new(req.offset, req.limit)?;
        let utxos = state
            .query
            .user_utxos(&req.user, badge_filter(&req.badge_code), page)?;
        Ok::<_, QueryError>(UtxosRsp { utxos })
    })
    .await
}

pub(super) async fn get_user_balance(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("getuserbalance", body, |req: UserBalanceReq| async move {
        let balance = state
            .query
            .user_balance(&req.user, badge_filter(&req.badge_code))?;
        Ok::<_, QueryError>(BalanceRsp { balance })
    })
    .await
}

pub(super) async fn get_user_inventories(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("getuserinventorys", body, |req: UserPageReq| async move {
        let page = Page::new(req.offset, req.limit)?;
        let addr_inventorys =
            state
                .query
                .user_inventories(&req.user, badge_filter(&req.badge_code), page)?;
        Ok::<_, QueryError>(InventoriesRsp { addr_inventorys })
    })
    .await
}

pub(super) async fn send_badge_to_address(
    State(state): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ApiResponse> {
    respond("sendbadgetoaddress", body, |req: SendBadgeToAddressReq| async move {
        state.query.build_unsigned_transfer(&TransferRequest {
            user: req.user,
            badge_code: req.badge_code,
            change_addr: req.change_addr,
            outputs: req.addr_amounts,
            burn: req.amount_to_burn,
        })
    })
    .await
}

pub(super) async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "badge-node",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
