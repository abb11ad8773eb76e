//! Node bootstrap: wires the acceptor, proposer, transport, and ticker
//! together over the compiled-in static peer table, and owns their
//! lifetimes. Process bootstrap proper (binding argv, installing a signal
//! handler) lives in the `paxoslease_node` binary crate; this is the
//! construction work needed regardless of how a caller chooses to run it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lazy_static::lazy_static;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::acceptor::Acceptor;
use crate::proposer::Proposer;
use crate::query::LeaseHandle;
use crate::state::LeaseState;
use crate::ticker;
use crate::transport::{self, Transport};
use crate::utils::config::NodeConfig;
use crate::utils::error::LeaseError;
use crate::utils::print::logger_init;

/// Small integer node identifier, unique within a cluster.
pub type ReplicaId = u8;

lazy_static! {
    /// Compiled-in table of up to 7 endpoints, indexed by `ReplicaId`.
    /// Production deployments would replace this with runtime
    /// configuration; the protocol only requires that every node agree on
    /// the peer set and their IDs.
    pub static ref PEER_TABLE: Vec<SocketAddr> = vec![
        "127.0.0.1:54322".parse().unwrap(),
        "127.0.0.1:54323".parse().unwrap(),
        "127.0.0.1:54324".parse().unwrap(),
        "127.0.0.1:54325".parse().unwrap(),
        "127.0.0.1:54326".parse().unwrap(),
        "127.0.0.1:54327".parse().unwrap(),
        "127.0.0.1:54328".parse().unwrap(),
    ];
}

/// A running lease node: owns the listening socket, the lease ticker task,
/// and the shared state the acceptor/proposer/ticker all mutate.
pub struct LeaseNode {
    id: ReplicaId,
    state: Arc<Mutex<LeaseState>>,
    ticker_handle: Option<JoinHandle<()>>,
    ticker_stop: watch::Sender<bool>,
    listener_handle: JoinHandle<()>,
}

impl LeaseNode {
    /// Constructs and starts a node: binds its listening socket at
    /// `PEER_TABLE[id]`, spawns the inbound request-handling loop and the
    /// lease ticker. Fails only if the socket cannot be bound or
    /// `config_str` fails to parse -- both fatal to the caller.
    pub async fn new_and_setup(
        id: ReplicaId,
        num_nodes: u8,
        config_str: Option<&str>,
    ) -> Result<Self, LeaseError> {
        if num_nodes == 0 || (num_nodes as usize) > PEER_TABLE.len() {
            return logged_err!(
                "node"; "num_nodes {} out of supported range [1, {}]",
                num_nodes,
                PEER_TABLE.len()
            );
        }
        if id >= num_nodes {
            return logged_err!(
                "node"; "node id {} out of range [0, {})", id, num_nodes
            );
        }

        logger_init(id);

        let config = parsed_config!(config_str => NodeConfig;
                                     period_len_ms, lease_len, refresh_len,
                                     peer_timeout_ms, retry_cnt)?;
        config.validate()?;

        let peers: Vec<SocketAddr> =
            PEER_TABLE.iter().take(num_nodes as usize).copied().collect();
        let my_addr = peers[id as usize];

        let state = Arc::new(Mutex::new(LeaseState::new(id, num_nodes)));
        let acceptor = Arc::new(Acceptor::new(Arc::clone(&state), config.clone()));
        let transport = Arc::new(Transport::new(
            peers,
            Duration::from_millis(config.peer_timeout_ms),
            config.retry_cnt,
        ));
        let proposer = Arc::new(Proposer::new(
            id,
            num_nodes,
            Arc::clone(&state),
            Arc::clone(&acceptor),
            transport,
            config.clone(),
        ));

        let listener = transport::tcp_bind_with_retry(my_addr, config.retry_cnt).await?;
        pf_info!("listening on {}", my_addr);
        let listener_handle = tokio::spawn(transport::serve(listener, acceptor));

        let (ticker_handle, ticker_stop) =
            ticker::spawn(Arc::clone(&state), proposer, config);

        Ok(LeaseNode {
            id,
            state,
            ticker_handle: Some(ticker_handle),
            ticker_stop,
            listener_handle,
        })
    }

    /// This node's ID.
    pub fn id(&self) -> ReplicaId {
        self.id
    }

    /// Returns a cheap, cloneable handle to the local query surface.
    pub fn handle(&self) -> LeaseHandle {
        LeaseHandle::new(Arc::clone(&self.state))
    }

    /// Stops the lease ticker and the inbound accept loop. Used by test
    /// teardown and by the node binary's `ctrlc` handler; the shipped
    /// process otherwise runs the ticker forever.
    pub async fn shutdown(&mut self) {
        let _ = self.ticker_stop.send(true);
        if let Some(handle) = self.ticker_handle.take() {
            let _ = handle.await;
        }
        self.listener_handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_table_has_seven_entries() {
        assert_eq!(PEER_TABLE.len(), 7);
        for (i, addr) in PEER_TABLE.iter().enumerate() {
            assert_eq!(addr.port() as usize, 54322 + i);
        }
    }

    #[tokio::test]
    async fn rejects_out_of_range_population() {
        let err = LeaseNode::new_and_setup(0, 0, None).await;
        assert!(err.is_err());
        let err = LeaseNode::new_and_setup(0, 8, None).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn rejects_id_above_population() {
        let err = LeaseNode::new_and_setup(5, 5, None).await;
        assert!(err.is_err());
    }
}
