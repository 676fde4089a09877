//! # Peer Connection
//!
//! RPC client of one peer. The stream is dialed on demand, authenticated
//! with the connection handshake, and each request carries fresh call
//! metadata. Any transport failure drops the stream so the next call
//! redials.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bn_02_peer_auth::{client_handshake, sign_call, write_frame, FrameReader};
use bn_04_partition_sync::{PeerClient, SyncError};
use prost::Message;
use shared_crypto::{Secp256k1KeyPair, Secp256k1PublicKey};
use shared_types::wire::{
    rpc_request, rpc_response, GetPartitionsHashRequest, GetTxidsByPartitionsRequest,
    GetTxsRequest, GetUnconfirmTxidsRequest, NotifyTxsRequest, RpcRequest, RpcResponse,
};
use shared_types::TimeSource;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::codec::{decode_txids, encode_txids};
use crate::config::{PeerConfig, RegistryConfig};
use crate::errors::PeerError;

struct Stream {
    reader: FrameReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Authenticated RPC client of one peer.
pub struct PeerConnection {
    host: String,
    pubkey: String,
    keypair: Arc<Secp256k1KeyPair>,
    clock: Arc<dyn TimeSource>,
    settings: RegistryConfig,
    stream: Mutex<Option<Stream>>,
}

impl PeerConnection {
    /// Client for `peer`; nothing is dialed yet.
    pub fn new(
        peer: &PeerConfig,
        keypair: Arc<Secp256k1KeyPair>,
        clock: Arc<dyn TimeSource>,
        settings: RegistryConfig,
    ) -> Result<Self, PeerError> {
        let pubkey = Secp256k1PublicKey::from_hex(&peer.pubkey)?;
        Ok(Self {
            host: peer.host.clone(),
            pubkey: pubkey.to_hex(),
            keypair,
            clock,
            settings,
            stream: Mutex::new(None),
        })
    }

    /// Client for `peer`, dialed and authenticated.
    pub async fn connect(
        peer: &PeerConfig,
        keypair: Arc<Secp256k1KeyPair>,
        clock: Arc<dyn TimeSource>,
        settings: RegistryConfig,
    ) -> Result<Self, PeerError> {
        let connection = Self::new(peer, keypair, clock, settings)?;
        let stream = connection.dial().await?;
        *connection.stream.lock().await = Some(stream);
        Ok(connection)
    }

    /// Peer address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// True while a stream is open.
    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    async fn dial(&self) -> Result<Stream, PeerError> {
        let socket = bounded(self.settings.dial_timeout(), async {
            Ok(TcpStream::connect(&self.host).await?)
        })
        .await?;
        socket.set_nodelay(true)?;
        let (read, mut writer) = socket.into_split();
        client_handshake(&mut writer, &self.keypair, self.clock.now()).await?;
        info!("[bn-05] connected to {} at {}", self.pubkey, self.host);
        Ok(Stream {
            reader: FrameReader::new(read),
            writer,
        })
    }

    /// One request/response exchange.
    pub async fn call(&self, body: rpc_request::Body) -> Result<rpc_response::Body, PeerError> {
        let metadata = sign_call(&self.keypair, self.clock.now())?;
        let mut guard = self.stream.lock().await;
        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => self.dial().await?,
        };
        let request = RpcRequest {
            metadata: Some(metadata),
            body: Some(body),
        };
        let result = bounded(
            self.settings.call_timeout(),
            exchange(&mut stream, &request, self.settings.max_rpc_frame),
        )
        .await;
        match result {
            Ok(response) => {
                *guard = Some(stream);
                if !response.error.is_empty() {
                    return Err(PeerError::Remote(response.error));
                }
                response
                    .body
                    .ok_or(PeerError::UnexpectedResponse("a response body"))
            }
            Err(e) => {
                if e.breaks_stream() {
                    debug!("[bn-05] dropping stream to {}: {}", self.pubkey, e);
                } else {
                    *guard = Some(stream);
                }
                Err(e)
            }
        }
    }

    fn peer_error(&self, e: PeerError) -> SyncError {
        SyncError::Peer {
            peer: self.pubkey.clone(),
            message: e.to_string(),
        }
    }
}

async fn exchange(
    stream: &mut Stream,
    request: &RpcRequest,
    max: usize,
) -> Result<RpcResponse, PeerError> {
    write_frame(&mut stream.writer, &request.encode_to_vec()).await?;
    let frame = stream.reader.read_frame(max).await?;
    Ok(RpcResponse::decode(frame.as_slice())?)
}

async fn bounded<T>(
    deadline: std::time::Duration,
    fut: impl Future<Output = Result<T, PeerError>>,
) -> Result<T, PeerError> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| PeerError::Timeout)?
}

#[async_trait]
impl PeerClient for PeerConnection {
    fn pubkey(&self) -> &str {
        &self.pubkey
    }

    async fn notify_txs(&self, txids: Vec<String>) -> Result<(), SyncError> {
        let body = rpc_request::Body::NotifyTxs(NotifyTxsRequest {
            txids: encode_txids(&txids)?,
        });
        match self.call(body).await.map_err(|e| self.peer_error(e))? {
            rpc_response::Body::Ack(_) => Ok(()),
            _ => Err(self.peer_error(PeerError::UnexpectedResponse("ack"))),
        }
    }

    async fn get_txs(&self, txids: Vec<String>) -> Result<Vec<Vec<u8>>, SyncError> {
        let body = rpc_request::Body::GetTxs(GetTxsRequest {
            txids: encode_txids(&txids)?,
        });
        match self.call(body).await.map_err(|e| self.peer_error(e))? {
            rpc_response::Body::Txs(response) => Ok(response.txs),
            _ => Err(self.peer_error(PeerError::UnexpectedResponse("txs"))),
        }
    }

    async fn partitions_hash(&self, offset: i64, count: i64) -> Result<Vec<Vec<u8>>, SyncError> {
        let body = rpc_request::Body::GetPartitionsHash(GetPartitionsHashRequest { offset, count });
        match self.call(body).await.map_err(|e| self.peer_error(e))? {
            rpc_response::Body::PartitionsHash(response) => Ok(response.hashes),
            _ => Err(self.peer_error(PeerError::UnexpectedResponse("partition hashes"))),
        }
    }

    async fn unconfirmed_txids(&self) -> Result<Vec<String>, SyncError> {
        let body = rpc_request::Body::GetUnconfirmTxids(GetUnconfirmTxidsRequest {});
        match self.call(body).await.map_err(|e| self.peer_error(e))? {
            rpc_response::Body::Txids(response) => Ok(decode_txids(&response.txids)?),
            _ => Err(self.peer_error(PeerError::UnexpectedResponse("txids"))),
        }
    }

    async fn txids_by_partitions(&self, ids: Vec<i64>) -> Result<Vec<String>, SyncError> {
        let body = rpc_request::Body::GetTxidsByPartitions(GetTxidsByPartitionsRequest { ids });
        match self.call(body).await.map_err(|e| self.peer_error(e))? {
            rpc_response::Body::Txids(response) => Ok(decode_txids(&response.txids)?),
            _ => Err(self.peer_error(PeerError::UnexpectedResponse("txids"))),
        }
    }
}
