//! # Partition Reconciliation
//!
//! A node that missed transactions catches up by comparing partition
//! digests with a trusted peer and pulling the differing partitions.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bn_03_ledger_state::fixtures::{badge_input, badge_output, mint, owner_address, raw, transaction};
    use bn_05_peer_registry::PeerConfig;
    use node_runtime::services::QueryError;
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::Network;

    use crate::support::{confirmed_oracle, eventually, node_config, peer_entry, PeerNode};

    fn trust(keypair: &Secp256k1KeyPair) -> Vec<PeerConfig> {
        // Only the key matters for the allow-list; these nodes never dial.
        vec![PeerConfig {
            host: "127.0.0.1:1".into(),
            pubkey: keypair.public_key().to_hex(),
        }]
    }

    fn addr(byte: u8) -> String {
        owner_address(byte, Network::Regtest)
    }

    #[tokio::test]
    async fn test_late_peer_catches_up_by_digest() {
        let oracle = confirmed_oracle();
        let a_key = Secp256k1KeyPair::generate();
        let b_key = Secp256k1KeyPair::generate();
        let a = PeerNode::start(node_config(&a_key, trust(&b_key)), oracle.clone()).await;
        let b = PeerNode::start(node_config(&b_key, trust(&a_key)), oracle).await;

        let minted = mint(1, &[100], 1);
        let transfer = transaction(
            vec![badge_input(minted.compute_txid(), 0)],
            vec![badge_output(2, 60), badge_output(1, 40)],
        );
        for tx in [&minted, &transfer] {
            a.container
                .query
                .submit_raw_transaction(&hex::encode(raw(tx)))
                .await
                .unwrap();
        }
        assert_eq!(a.container.query.addr_balance(&addr(2), None).unwrap(), 60);
        assert_ne!(a.digests(), b.digests());

        b.container
            .registry
            .connect(&[peer_entry(&a_key, a.addr)])
            .await
            .unwrap();
        b.container.sync.sync_state(true).await.unwrap();

        assert_eq!(a.digests(), b.digests());
        let query = &b.container.query;
        assert_eq!(query.addr_balance(&addr(1), None).unwrap(), 40);
        assert_eq!(query.addr_balance(&addr(2), None).unwrap(), 60);
        let inventory = query
            .transaction_inventory(&transfer.compute_txid().to_string())
            .unwrap();
        assert_eq!(inventory.points.len(), 3);
    }

    #[tokio::test]
    async fn test_connected_peer_receives_push() {
        let oracle = confirmed_oracle();
        let a_key = Secp256k1KeyPair::generate();
        let b_key = Secp256k1KeyPair::generate();
        let a = PeerNode::start(node_config(&a_key, trust(&b_key)), oracle.clone()).await;
        let b = PeerNode::start(node_config(&b_key, trust(&a_key)), oracle).await;
        a.container
            .registry
            .connect(&[peer_entry(&b_key, b.addr)])
            .await
            .unwrap();
        b.container
            .registry
            .connect(&[peer_entry(&a_key, a.addr)])
            .await
            .unwrap();

        let minted = mint(3, &[7, 8], 2);
        let txid = minted.compute_txid().to_string();
        a.container
            .query
            .submit_raw_transaction(&hex::encode(raw(&minted)))
            .await
            .unwrap();

        let (query, txid) = (&b.container.query, &txid);
        let pulled = eventually(Duration::from_secs(5), || async move {
            query.transaction_inventory(txid).is_ok()
        })
        .await;
        assert!(pulled, "pushed transaction never reached the peer");
        assert_eq!(b.container.query.addr_balance(&addr(3), None).unwrap(), 15);
        assert_eq!(a.digests(), b.digests());
    }

    #[tokio::test]
    async fn test_untrusted_peer_learns_nothing() {
        let oracle = confirmed_oracle();
        let a_key = Secp256k1KeyPair::generate();
        let b_key = Secp256k1KeyPair::generate();
        let stranger = Secp256k1KeyPair::generate();
        let a = PeerNode::start(node_config(&a_key, trust(&stranger)), oracle.clone()).await;
        let b = PeerNode::start(node_config(&b_key, trust(&a_key)), oracle).await;

        let minted = mint(4, &[9], 3);
        a.container
            .query
            .submit_raw_transaction(&hex::encode(raw(&minted)))
            .await
            .unwrap();

        // A does not list B, so every call from B is refused.
        let _ = b
            .container
            .registry
            .connect(&[peer_entry(&a_key, a.addr)])
            .await;
        b.container.sync.sync_state(true).await.unwrap();

        assert!(matches!(
            b.container.query.addr_balance(&addr(4), None),
            Err(QueryError::NotFound(_))
        ));
        assert_ne!(a.digests(), b.digests());
    }
}
