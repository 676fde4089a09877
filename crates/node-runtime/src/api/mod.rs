//! # HTTP API
//!
//! JSON POST routes under `/v1/badge/`, answered with the `{code, msg,
//! data}` envelope of [`ApiResponse`].
//!
//! | Route | Operation |
//! |-------|-----------|
//! | `sendrawtransaction` | broadcast and ingest a raw tx |
//! | `gettxinventory` | classified points of a tx |
//! | `getaddrutxos` / `getaddrbalance` / `getaddrinventorys` | per-address queries |
//! | `setaddrinfo` | register an address to a user slot |
//! | `getuserutxos` / `getuserbalance` / `getuserinventorys` | per-user queries |
//! | `sendbadgetoaddress` | build an unsigned transfer |

pub mod handlers;
pub mod response;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::services::QueryService;

pub use response::{ApiResponse, ResponseCode};

/// Route prefix.
pub const API_PREFIX: &str = "/v1/badge";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    query: Arc<QueryService>,
}

/// Build the router over `query`.
pub fn router(query: Arc<QueryService>) -> Router {
    let routes = Router::new()
        .route("/sendrawtransaction", post(handlers::send_raw_transaction))
        .route("/gettxinventory", post(handlers::get_tx_inventory))
        .route("/getaddrutxos", post(handlers::get_addr_utxos))
        .route("/getaddrbalance", post(handlers::get_addr_balance))
        .route("/getaddrinventorys", post(handlers::get_addr_inventories))
        .route("/setaddrinfo", post(handlers::set_addr_info))
        .route("/getuserutxos", post(handlers::get_user_utxos))
        .route("/getuserbalance", post(handlers::get_user_balance))
        .route("/getuserinventorys", post(handlers::get_user_inventories))
        .route("/sendbadgetoaddress", post(handlers::send_badge_to_address));

    Router::new()
        .nest(API_PREFIX, routes)
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState { query })
}

/// Serve `router` on `listener` until the shutdown flag is raised.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("[api] listening on {}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    use bn_03_ledger_state::fixtures::{mint, owner_address, raw};
    use bn_04_partition_sync::{MockOracle, TxStatus};
    use serde_json::{json, Value};
    use shared_types::Network;

    use crate::container::{NodeConfig, NodeContainer};

    struct Api {
        base: String,
        client: reqwest::Client,
        _shutdown: watch::Sender<bool>,
    }

    impl Api {
        async fn call(&self, route: &str, body: Value) -> ApiResponse {
            self.call_raw(route, body.to_string()).await
        }

        async fn call_raw(&self, route: &str, body: String) -> ApiResponse {
            self.client
                .post(format!("{}{}/{}", self.base, API_PREFIX, route))
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap()
        }
    }

    async fn start() -> Api {
        let oracle = Arc::new(MockOracle::new(20));
        oracle.set_default_status(TxStatus::confirmed(5, "00".repeat(32)));
        let container = NodeContainer::with_oracle(NodeConfig::for_testing(), oracle).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(serve(listener, router(container.query.clone()), shutdown_rx));
        Api {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            _shutdown: shutdown_tx,
        }
    }

    fn addr(byte: u8) -> String {
        owner_address(byte, Network::Regtest)
    }

    #[tokio::test]
    async fn test_submit_and_query() {
        let api = start().await;
        let minted = mint(1, &[100, 50], 0);
        let txid = minted.compute_txid().to_string();

        let rsp = api
            .call("sendrawtransaction", json!({"rawtx": hex::encode(raw(&minted))}))
            .await;
        assert_eq!(rsp.code, 0, "{}", rsp.msg);
        assert_eq!(rsp.data["txid"], txid);
        assert_eq!(rsp.data["vins"].as_array().unwrap().len(), 0);
        assert_eq!(rsp.data["vouts"].as_array().unwrap().len(), 2);

        let rsp = api.call("gettxinventory", json!({"txid": txid})).await;
        assert_eq!(rsp.code, 0);
        assert_eq!(rsp.data["vouts"][0]["badge_code"], txid);

        let rsp = api
            .call("getaddrbalance", json!({"addr": addr(1)}))
            .await;
        assert_eq!(rsp.data["balance"], 150);

        let rsp = api
            .call("getaddrutxos", json!({"addr": addr(1), "offset": 1, "limit": 10}))
            .await;
        assert_eq!(rsp.data["utxos"].as_array().unwrap().len(), 1);

        let rsp = api
            .call("getaddrinventorys", json!({"addr": addr(1), "badge_code": txid, "offset": 0, "limit": 10}))
            .await;
        assert_eq!(rsp.data["addr_inventorys"][0]["value"], 150);
    }

    #[tokio::test]
    async fn test_user_flow_and_transfer() {
        let api = start().await;
        let minted = mint(1, &[30], 0);
        let code = minted.compute_txid().to_string();
        api.call("sendrawtransaction", json!({"rawtx": hex::encode(raw(&minted))}))
            .await;

        let user = json!({"appid": "app", "userid": 1, "user_index": 0});
        let mut register = user.clone();
        register["addr"] = json!(addr(1));
        let rsp = api.call("setaddrinfo", register).await;
        assert_eq!(rsp.code, 0, "{}", rsp.msg);
        assert_eq!(rsp.data["addr"], addr(1));

        let mut balance = user.clone();
        balance["badge_code"] = json!(code);
        assert_eq!(api.call("getuserbalance", balance).await.data["balance"], 30);

        let mut page = user.clone();
        page["offset"] = json!(0);
        page["limit"] = json!(5);
        let rsp = api.call("getuserutxos", page.clone()).await;
        assert_eq!(rsp.data["utxos"].as_array().unwrap().len(), 1);
        let rsp = api.call("getuserinventorys", page).await;
        assert_eq!(rsp.data["addr_inventorys"].as_array().unwrap().len(), 1);

        let mut transfer = user.clone();
        transfer["badge_code"] = json!(code);
        transfer["change_addr"] = json!(addr(1));
        transfer["addr_amounts"] = json!([{"addr": addr(2), "amount": 20}]);
        transfer["amount_to_burn"] = json!(0);
        let rsp = api.call("sendbadgetoaddress", transfer.clone()).await;
        assert_eq!(rsp.code, 0, "{}", rsp.msg);
        assert!(!rsp.data["unfinished_tx"].as_str().unwrap().is_empty());
        assert_eq!(rsp.data["vins"].as_array().unwrap().len(), 1);

        transfer["amount_to_burn"] = json!(11);
        let rsp = api.call("sendbadgetoaddress", transfer).await;
        assert_eq!(rsp.code, ResponseCode::NotEnoughBadge.value());
        assert_eq!(rsp.data, Value::Null);
    }

    #[tokio::test]
    async fn test_error_codes() {
        let api = start().await;

        let rsp = api.call_raw("gettxinventory", "{".into()).await;
        assert_eq!(rsp.code, ResponseCode::WrongFormat.value());

        let rsp = api.call("getaddrutxos", json!({"addr": addr(1)})).await;
        assert_eq!(rsp.code, ResponseCode::WrongFormat.value());

        let rsp = api
            .call("getaddrutxos", json!({"addr": addr(1), "offset": 0, "limit": 0}))
            .await;
        assert_eq!(rsp.code, ResponseCode::Parameters.value());

        let rsp = api.call("gettxinventory", json!({"txid": "ab".repeat(32)})).await;
        assert_eq!(rsp.code, ResponseCode::UnknownTx.value());

        let rsp = api.call("sendrawtransaction", json!({"rawtx": "nothex"})).await;
        assert_eq!(rsp.code, ResponseCode::Parameters.value());

        let rsp = api
            .call("getuserbalance", json!({"appid": "app", "userid": 9, "user_index": 0}))
            .await;
        assert_eq!(rsp.code, ResponseCode::UnknownTx.value());

        let rsp = api.call("getaddrbalance", json!({"addr": addr(4)})).await;
        assert_eq!(rsp.code, ResponseCode::UnknownTx.value());
    }

    #[tokio::test]
    async fn test_health() {
        let api = start().await;
        let body: Value = api
            .client
            .get(format!("{}/health", api.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");
    }
}
