//! # Peer Wire Messages
//!
//! Protobuf messages exchanged between badge nodes. Txids travel as raw
//! display-order bytes (see [`crate::ids`]).
//!
//! ```text
//! handshake:  u32 LE length | AuthRequest
//! rpc:        u32 LE length | RpcRequest   ->   u32 LE length | RpcResponse
//! ```

/// Connection handshake body.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRequest {
    /// DER signature over the 8-byte little-endian timestamp.
    #[prost(bytes = "vec", tag = "1")]
    pub signature: Vec<u8>,
    /// Compressed secp256k1 public key.
    #[prost(bytes = "vec", tag = "2")]
    pub pubkey: Vec<u8>,
    /// Unix seconds.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
}

/// Per-call credential carried by every RPC request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CallMetadata {
    /// Hex compressed public key.
    #[prost(string, tag = "1")]
    pub pubkey: String,
    /// Decimal unix seconds.
    #[prost(string, tag = "2")]
    pub timestamp: String,
    /// Hex DER signature over the timestamp.
    #[prost(string, tag = "3")]
    pub signature: String,
}

/// Push notification of newly closed transactions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotifyTxsRequest {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub txids: Vec<Vec<u8>>,
}

/// Request raw transactions by id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTxsRequest {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub txids: Vec<Vec<u8>>,
}

/// Raw transactions; unknown ids are omitted.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTxsResponse {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub txs: Vec<Vec<u8>>,
}

/// Request digests of `count` partitions starting at `offset`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPartitionsHashRequest {
    #[prost(int64, tag = "1")]
    pub offset: i64,
    #[prost(int64, tag = "2")]
    pub count: i64,
}

/// Digests ordered by partition id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPartitionsHashResponse {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub hashes: Vec<Vec<u8>>,
}

/// Request the ids of unconfirmed transactions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetUnconfirmTxidsRequest {}

/// Request CLOSED txids of a set of partitions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTxidsByPartitionsRequest {
    #[prost(int64, repeated, tag = "1")]
    pub ids: Vec<i64>,
}

/// Deduplicated txid list.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTxidsResponse {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub txids: Vec<Vec<u8>>,
}

/// Empty acknowledgement.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ack {}

/// One RPC call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcRequest {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<CallMetadata>,
    #[prost(oneof = "rpc_request::Body", tags = "2, 3, 4, 5, 6")]
    pub body: Option<rpc_request::Body>,
}

/// Request bodies.
pub mod rpc_request {
    /// The five peer RPCs.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "2")]
        NotifyTxs(super::NotifyTxsRequest),
        #[prost(message, tag = "3")]
        GetTxs(super::GetTxsRequest),
        #[prost(message, tag = "4")]
        GetPartitionsHash(super::GetPartitionsHashRequest),
        #[prost(message, tag = "5")]
        GetUnconfirmTxids(super::GetUnconfirmTxidsRequest),
        #[prost(message, tag = "6")]
        GetTxidsByPartitions(super::GetTxidsByPartitionsRequest),
    }
}

/// Reply to one RPC call. A non-empty `error` means the call failed.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcResponse {
    #[prost(string, tag = "1")]
    pub error: String,
    #[prost(oneof = "rpc_response::Body", tags = "2, 3, 4, 5")]
    pub body: Option<rpc_response::Body>,
}

/// Response bodies.
pub mod rpc_response {
    /// Replies matching [`super::rpc_request::Body`].
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "2")]
        Ack(super::Ack),
        #[prost(message, tag = "3")]
        Txs(super::GetTxsResponse),
        #[prost(message, tag = "4")]
        PartitionsHash(super::GetPartitionsHashResponse),
        #[prost(message, tag = "5")]
        Txids(super::GetTxidsResponse),
    }
}

impl RpcResponse {
    /// Successful response.
    pub fn ok(body: rpc_response::Body) -> Self {
        Self {
            error: String::new(),
            body: Some(body),
        }
    }

    /// Failed response.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_rpc_request_decodes_oneof() {
        let request = RpcRequest {
            metadata: Some(CallMetadata {
                pubkey: "02ab".into(),
                timestamp: "1700000000".into(),
                signature: "30".into(),
            }),
            body: Some(rpc_request::Body::GetPartitionsHash(GetPartitionsHashRequest {
                offset: 3,
                count: 10,
            })),
        };
        let decoded = RpcRequest::decode(request.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_failed_response_has_no_body() {
        let response = RpcResponse::failed("boom");
        assert_eq!(response.error, "boom");
        assert!(response.body.is_none());
    }
}
