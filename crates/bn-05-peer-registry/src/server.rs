//! # Peer Server
//!
//! Accepts peer connections, authenticates them and serves the five peer
//! RPCs from the local [`SyncService`].
//!
//! `NotifyTxs` is acknowledged before the notified transactions are
//! fetched; the sync runs in its own task and calls back into the
//! sender's connection.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bn_02_peer_auth::{server_handshake, write_frame, AllowList, CallAuthenticator, FrameError, FrameReader};
use bn_04_partition_sync::SyncService;
use prost::Message;
use shared_types::wire::{
    rpc_request, rpc_response, Ack, GetPartitionsHashResponse, GetTxidsResponse, GetTxsResponse,
    RpcRequest, RpcResponse,
};
use shared_types::TimeSource;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::codec::{decode_txids, encode_txids};
use crate::config::RegistryConfig;
use crate::errors::PeerError;

/// RPC server for authenticated peers.
pub struct PeerServer {
    sync: Arc<SyncService>,
    allow_list: AllowList,
    authenticator: CallAuthenticator,
    clock: Arc<dyn TimeSource>,
    settings: RegistryConfig,
}

impl PeerServer {
    /// Server accepting the keys in `allow_list`.
    pub fn new(
        sync: Arc<SyncService>,
        allow_list: AllowList,
        clock: Arc<dyn TimeSource>,
        settings: RegistryConfig,
    ) -> Self {
        let authenticator = CallAuthenticator::new(allow_list.clone(), Arc::clone(&clock));
        Self {
            sync,
            allow_list,
            authenticator,
            clock,
            settings,
        }
    }

    /// Accept connections on `listener` until shutdown.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = listener.local_addr() {
            info!("[bn-05] peer server listening on {}", addr);
        }
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((socket, addr)) => {
                        let server = Arc::clone(&self);
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(socket, addr).await {
                                debug!("[bn-05] connection from {} closed: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => warn!("[bn-05] accept failed: {}", e),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("[bn-05] peer server stopping");
                        break;
                    }
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, addr: SocketAddr) -> Result<(), PeerError> {
        socket.set_nodelay(true)?;
        let (read, mut writer) = socket.into_split();
        let mut reader = FrameReader::new(read);
        let auth = server_handshake(&mut reader, &self.allow_list, self.clock.as_ref()).await?;
        debug!("[bn-05] {} authenticated as {}", addr, auth.peer);

        loop {
            let frame = match reader.read_frame(self.settings.max_rpc_frame).await {
                Ok(frame) => frame,
                Err(FrameError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            let response = match RpcRequest::decode(frame.as_slice()) {
                Ok(request) => self.dispatch(request).await,
                Err(e) => RpcResponse::failed(format!("malformed request: {e}")),
            };
            write_frame(&mut writer, &response.encode_to_vec()).await?;
        }
    }

    /// Authorize and answer one request.
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let caller = match self.authenticator.authorize(request.metadata.as_ref()) {
            Ok(caller) => caller.to_hex(),
            Err(e) => return RpcResponse::failed(format!("unauthenticated: {e}")),
        };
        let Some(body) = request.body else {
            return RpcResponse::failed("empty request");
        };
        match self.handle(&caller, body).await {
            Ok(body) => RpcResponse::ok(body),
            Err(e) => {
                debug!("[bn-05] call from {} failed: {}", caller, e);
                RpcResponse::failed(e.to_string())
            }
        }
    }

    async fn handle(&self, caller: &str, body: rpc_request::Body) -> Result<rpc_response::Body, PeerError> {
        let response = match body {
            rpc_request::Body::NotifyTxs(request) => {
                let txids = decode_txids(&request.txids)?;
                let sync = Arc::clone(&self.sync);
                let caller = caller.to_string();
                tokio::spawn(async move {
                    if let Err(e) = sync.on_notify(&caller, txids).await {
                        warn!("[bn-05] notify from {} failed: {}", caller, e);
                    }
                });
                rpc_response::Body::Ack(Ack {})
            }
            rpc_request::Body::GetTxs(request) => {
                let txids = decode_txids(&request.txids)?;
                rpc_response::Body::Txs(GetTxsResponse {
                    txs: self.sync.get_txs(&txids)?,
                })
            }
            rpc_request::Body::GetPartitionsHash(request) => {
                rpc_response::Body::PartitionsHash(GetPartitionsHashResponse {
                    hashes: self.sync.partition_hashes(request.offset, request.count)?,
                })
            }
            rpc_request::Body::GetUnconfirmTxids(_) => rpc_response::Body::Txids(GetTxidsResponse {
                txids: encode_txids(&self.sync.unconfirmed_txids()?)?,
            }),
            rpc_request::Body::GetTxidsByPartitions(request) => {
                rpc_response::Body::Txids(GetTxidsResponse {
                    txids: encode_txids(&self.sync.txids_by_partitions(&request.ids)?)?,
                })
            }
        };
        Ok(response)
    }
}
