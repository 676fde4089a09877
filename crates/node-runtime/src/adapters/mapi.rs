//! # Merchant API Oracle
//!
//! HTTP client for the chain oracle, implementing the partition sync
//! [`Oracle`] port.
//!
//! ```text
//! request:  {"payload": "<json param>", "signature": "<hex DER>", "pubKey": "<hex>"}
//! response: {"payload": "<json result>", "signature": .., "publicKey": .., "encoding": .., "mimetype": ..}
//! ```
//!
//! Every request, including the GETs, carries a body signed over
//! SHA-256 of the payload string. GET requests have a `null` payload.

use std::sync::Arc;

use async_trait::async_trait;
use bn_04_partition_sync::{FeeQuote, Oracle, OracleError, SubmitResult, TxStatus};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_crypto::Secp256k1KeyPair;
use tracing::debug;

use crate::container::OracleConfig;

/// Signed request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedRequest {
    /// JSON-encoded parameter.
    pub payload: String,
    /// Hex DER signature over SHA-256(`payload`).
    pub signature: String,
    /// Hex compressed public key of the signer.
    pub pub_key: String,
}

/// Response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Envelope {
    /// JSON-encoded result.
    pub payload: String,
    /// Oracle signature, if any.
    pub signature: Option<String>,
    /// Oracle key, if any.
    pub public_key: Option<String>,
    /// Payload encoding.
    pub encoding: String,
    /// Payload media type.
    pub mimetype: String,
}

#[derive(Serialize)]
struct SubmitParam<'a> {
    rawtx: &'a str,
}

/// Sign `param` the way the oracle expects.
pub fn sign_request<T: Serialize>(
    keypair: &Secp256k1KeyPair,
    param: &T,
) -> Result<SignedRequest, OracleError> {
    let payload = serde_json::to_string(param).map_err(|e| OracleError::Decode(e.to_string()))?;
    let signature = keypair.sign(payload.as_bytes()).to_hex();
    Ok(SignedRequest {
        payload,
        signature,
        pub_key: keypair.public_key().to_hex(),
    })
}

/// Unwrap an envelope and decode its payload.
pub fn open_envelope<T: DeserializeOwned>(body: &str) -> Result<T, OracleError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| OracleError::Decode(format!("envelope: {e}")))?;
    serde_json::from_str(&envelope.payload)
        .map_err(|e| OracleError::Decode(format!("payload: {e}")))
}

/// Oracle client over HTTP.
pub struct MapiOracle {
    client: Client,
    host: String,
    keypair: Arc<Secp256k1KeyPair>,
}

impl MapiOracle {
    /// Client for `config.host`, signing with `keypair`.
    pub fn new(config: &OracleConfig, keypair: Arc<Secp256k1KeyPair>) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            keypair,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/mapi/{}", self.host, path)
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        param: &P,
    ) -> Result<T, OracleError> {
        let url = self.url(path);
        let body = sign_request(&self.keypair, param)?;
        let response = self
            .client
            .request(method, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OracleError::Transport(format!("{url}: {e}")))?;
        if !status.is_success() {
            return Err(OracleError::Rejected(format!("{url}: {status} {text}")));
        }
        debug!("[mapi] {} answered {} bytes", url, text.len());
        open_envelope(&text)
    }
}

#[async_trait]
impl Oracle for MapiOracle {
    async fn fee_quote(&self) -> Result<FeeQuote, OracleError> {
        self.call(Method::GET, "feeQuote", &()).await
    }

    async fn tx_status(&self, txid: &str) -> Result<TxStatus, OracleError> {
        self.call(Method::GET, &format!("tx/{txid}"), &()).await
    }

    async fn send_tx(&self, raw_hex: &str) -> Result<SubmitResult, OracleError> {
        self.call(Method::POST, "tx", &SubmitParam { rawtx: raw_hex })
            .await
    }
}
