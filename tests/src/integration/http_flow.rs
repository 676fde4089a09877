//! # HTTP Flow
//!
//! Two full runtimes that trust each other: a transaction submitted over
//! one node's HTTP API becomes queryable on the other.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bn_03_ledger_state::fixtures::{mint, owner_address, raw};
    use node_runtime::api::API_PREFIX;
    use node_runtime::NodeRuntime;
    use serde_json::{json, Value};
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::Network;

    use crate::support::{confirmed_oracle, eventually, node_config, peer_entry, reserve_addr};

    async fn post(client: &reqwest::Client, http: std::net::SocketAddr, route: &str, body: Value) -> Value {
        client
            .post(format!("http://{http}{API_PREFIX}/{route}"))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_submission_propagates_between_runtimes() {
        let oracle = confirmed_oracle();
        let a_key = Secp256k1KeyPair::generate();
        let b_key = Secp256k1KeyPair::generate();
        let a_p2p = reserve_addr().await;
        let b_p2p = reserve_addr().await;

        let mut a_config = node_config(&a_key, vec![peer_entry(&b_key, b_p2p)]);
        a_config.p2p_listen = a_p2p.to_string();
        let mut b_config = node_config(&b_key, vec![peer_entry(&a_key, a_p2p)]);
        b_config.p2p_listen = b_p2p.to_string();

        let mut a = NodeRuntime::with_oracle(a_config, oracle.clone()).unwrap();
        let mut b = NodeRuntime::with_oracle(b_config, oracle).unwrap();
        let a_addrs = a.start().await.unwrap();
        let b_addrs = b.start().await.unwrap();

        let (a_node, b_node) = (a.container(), b.container());
        let connected = eventually(Duration::from_secs(10), || {
            let (a_node, b_node) = (Arc::clone(&a_node), Arc::clone(&b_node));
            async move { a_node.registry.connected().len() == 1 && b_node.registry.connected().len() == 1 }
        })
        .await;
        assert!(connected, "runtimes never connected to each other");

        let client = reqwest::Client::new();
        let minted = mint(5, &[12, 30], 4);
        let txid = minted.compute_txid().to_string();
        let rsp = post(
            &client,
            a_addrs.http,
            "sendrawtransaction",
            json!({"rawtx": hex::encode(raw(&minted))}),
        )
        .await;
        assert_eq!(rsp["code"], 0, "{rsp}");

        let (client_ref, txid_ref) = (&client, &txid);
        let seen = eventually(Duration::from_secs(10), || async move {
            let rsp = post(client_ref, b_addrs.http, "gettxinventory", json!({"txid": txid_ref})).await;
            rsp["code"] == 0
        })
        .await;
        assert!(seen, "transaction never reached the second runtime");

        let rsp = post(
            &client,
            b_addrs.http,
            "getaddrbalance",
            json!({"addr": owner_address(5, Network::Regtest), "badge_code": txid}),
        )
        .await;
        assert_eq!(rsp["data"]["balance"], 42);

        a.shutdown().await;
        b.shutdown().await;
    }
}
