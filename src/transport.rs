//! Transport: dial-with-retry TCP client calls and the inbound accept loop,
//! both framing `Request`/`Reply` as a length-prefixed `bincode` blob. Any
//! framing preserving the same schema and per-peer timeout would do; this
//! is simply the one this crate ships.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time;

use crate::acceptor::Acceptor;
use crate::node::ReplicaId;
use crate::rpc::{LeaseOp, Reply, Request, SERVICE_NAME, Status};
use crate::utils::error::LeaseError;

/// Frames larger than this are rejected outright rather than trusted to
/// allocate; the protocol's actual frames are a few bytes, so this is
/// generous headroom against a corrupt length prefix.
const MAX_FRAME_LEN: usize = 1 << 16;

pub(crate) async fn safe_tcp_write<T: serde::Serialize>(
    stream: &mut TcpStream,
    msg: &T,
) -> Result<(), LeaseError> {
    let bytes = bincode::serialize(msg)?;
    let len = bytes.len() as u32;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

pub(crate) async fn safe_tcp_read<T: serde::de::DeserializeOwned>(
    stream: &mut TcpStream,
) -> Result<T, LeaseError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(LeaseError::msg(format!(
            "frame length {} exceeds max {}",
            len, MAX_FRAME_LEN
        )));
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(bincode::deserialize(&buf)?)
}

/// Binds a listening socket, retrying a handful of times on transient
/// failure (e.g. the previous process hasn't released the port yet).
pub(crate) async fn tcp_bind_with_retry(
    addr: SocketAddr,
    retries: u8,
) -> Result<TcpListener, LeaseError> {
    let mut last_err = None;
    for attempt in 0..=retries {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                pf_warn!("bind {} failed (attempt {}): {}", addr, attempt, e);
                last_err = Some(e);
                time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
    Err(LeaseError::msg(format!(
        "failed to bind {} after {} retries: {}",
        addr,
        retries,
        last_err.unwrap()
    )))
}

/// Dials a peer, retrying a handful of times on transient connect failure.
async fn tcp_connect_with_retry(
    addr: SocketAddr,
    retries: u8,
) -> Result<TcpStream, LeaseError> {
    let mut last_err = None;
    for _ in 0..=retries {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                last_err = Some(e);
            }
        }
    }
    Err(LeaseError::msg(format!(
        "failed to connect to {}: {}",
        addr,
        last_err.unwrap()
    )))
}

/// Client-side handle for issuing the four acceptor RPCs to peers, with a
/// bounded per-call timeout that fails closed to `Reject`.
pub(crate) struct Transport {
    peers: Vec<SocketAddr>,
    timeout: Duration,
    connect_retries: u8,
}

impl Transport {
    pub(crate) fn new(peers: Vec<SocketAddr>, timeout: Duration, connect_retries: u8) -> Self {
        Transport {
            peers,
            timeout,
            connect_retries,
        }
    }

    /// Calls `op` on `peer` with the given ballot. Never returns an error:
    /// any transport failure or timeout collapses to `Status::Reject`, so a
    /// caller counting acks never has to special-case "peer unreachable".
    pub(crate) async fn call(&self, peer: ReplicaId, op: LeaseOp, ballot: i64) -> Status {
        match time::timeout(self.timeout, self.try_call(peer, op, ballot)).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                pf_debug!("RPC {:?}({}) -> peer {} failed: {}", op, ballot, peer, e);
                Status::Reject
            }
            Err(_) => {
                pf_debug!("RPC {:?}({}) -> peer {} timed out", op, ballot, peer);
                Status::Reject
            }
        }
    }

    async fn try_call(
        &self,
        peer: ReplicaId,
        op: LeaseOp,
        ballot: i64,
    ) -> Result<Status, LeaseError> {
        let addr = *self
            .peers
            .get(peer as usize)
            .ok_or_else(|| LeaseError::msg(format!("unknown peer id {}", peer)))?;
        let mut stream = tcp_connect_with_retry(addr, self.connect_retries).await?;
        safe_tcp_write(&mut stream, &Request { op, ballot }).await?;
        let reply: Reply = safe_tcp_read(&mut stream).await?;
        Ok(reply.status)
    }
}

/// Runs the inbound accept loop: one request per connection, dispatched
/// straight to the acceptor, then the connection is closed.
pub(crate) async fn serve(listener: TcpListener, acceptor: Arc<Acceptor>) {
    pf_info!(
        "{} accept loop running on {}",
        SERVICE_NAME,
        listener.local_addr().map_or_else(|_| "?".to_string(), |a| a.to_string())
    );
    loop {
        let (mut stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                pf_warn!("accept() failed: {}", e);
                continue;
            }
        };
        let acceptor = Arc::clone(&acceptor);
        tokio::spawn(async move {
            if let Err(e) = handle_conn(&mut stream, &acceptor).await {
                pf_debug!("connection from {} ended: {}", peer_addr, e);
            }
        });
    }
}

async fn handle_conn(
    stream: &mut TcpStream,
    acceptor: &Acceptor,
) -> Result<(), LeaseError> {
    let req: Request = safe_tcp_read(stream).await?;
    let status = acceptor.dispatch(req.op, req.ballot);
    safe_tcp_write(stream, &Reply { status }).await?;
    Ok(())
}
