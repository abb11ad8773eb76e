//! Proposer: drives outbound Prepare->Accept rounds (fresh acquisition) and
//! RenewPrepare->RenewAccept rounds (renewal). Only the ticker calls these;
//! the acceptor never does.

use std::sync::{Arc, Mutex};

use crate::acceptor::Acceptor;
use crate::node::ReplicaId;
use crate::rpc::{Ballot, LeaseOp, Status};
use crate::state::LeaseState;
use crate::transport::Transport;
use crate::utils::config::NodeConfig;
use crate::utils::error::LeaseError;
use crate::utils::Bitmap;

pub(crate) struct Proposer {
    id: ReplicaId,
    num_nodes: u8,
    state: Arc<Mutex<LeaseState>>,
    acceptor: Arc<Acceptor>,
    transport: Arc<Transport>,
    config: NodeConfig,
}

impl Proposer {
    pub(crate) fn new(
        id: ReplicaId,
        num_nodes: u8,
        state: Arc<Mutex<LeaseState>>,
        acceptor: Arc<Acceptor>,
        transport: Arc<Transport>,
        config: NodeConfig,
    ) -> Self {
        Proposer {
            id,
            num_nodes,
            state,
            acceptor,
            transport,
            config,
        }
    }

    /// Ships `ballot` to every peer (including self, called directly rather
    /// than through the transport) and returns true iff a strict majority
    /// replied OK. Counts all `num_nodes` replies; does not short-circuit.
    async fn broadcast(&self, op: LeaseOp, ballot: Ballot) -> bool {
        let mut acks = Bitmap::new(self.num_nodes, false);
        let mut ok_count = 0u8;

        // self-call optimization: invoke the local acceptor directly
        if self.acceptor.dispatch(op, ballot) == Status::Ok {
            ok_count += 1;
            acks.set(self.id, true).ok();
        }

        let mut remote = Vec::with_capacity(self.num_nodes as usize - 1);
        for peer in 0..self.num_nodes {
            if peer == self.id {
                continue;
            }
            let transport = Arc::clone(&self.transport);
            remote.push((peer, tokio::spawn(async move {
                transport.call(peer, op, ballot).await
            })));
        }
        for (peer, task) in remote {
            if matches!(task.await, Ok(Status::Ok)) {
                ok_count += 1;
                acks.set(peer, true).ok();
            }
        }

        let quorum = ok_count > self.num_nodes / 2;
        pf_debug!(
            "broadcast {:?}({}) acks={:?} ok={}/{} quorum={}",
            op,
            ballot,
            acks,
            ok_count,
            self.num_nodes,
            quorum
        );
        quorum
    }

    /// Initial/competing acquisition: Prepare, then speculatively install a
    /// safety-margined lease, then Accept.
    pub(crate) async fn get_lease(&self) -> Result<(), LeaseError> {
        let ballot = {
            let mut st = self.state.lock().unwrap();
            while st.next_ballot <= st.nh {
                st.next_ballot += st.num_nodes as Ballot;
            }
            st.next_ballot
        };

        pf_debug!("getLease: Prepare({})", ballot);
        if !self.broadcast(LeaseOp::Prepare, ballot).await {
            pf_debug!("getLease: Prepare({}) did not reach quorum", ballot);
            return Ok(());
        }

        {
            let mut st = self.state.lock().unwrap();
            // speculative lease, installed before Accept completes; left
            // to decay on its own if Accept fails rather than cleared
            // eagerly, since a late-arriving grant could still land
            st.master_lease_len = self.config.lease_len - 2;
        }

        pf_debug!("getLease: Accept({})", ballot);
        if !self.broadcast(LeaseOp::Accept, ballot).await {
            pf_debug!("getLease: Accept({}) did not reach quorum", ballot);
            return Ok(());
        }

        {
            let mut st = self.state.lock().unwrap();
            if st.master_lease_len > 0 {
                st.is_master = true;
                pf_info!("IS THE MASTER NOW");
            }
            st.na = ballot;
        }

        Ok(())
    }

    /// Maintenance by the current master: RenewPrepare, then a tentative
    /// renewed lease, then RenewAccept. Reuses the existing `na` rather
    /// than proposing a higher ballot.
    pub(crate) async fn renew_lease(&self) -> Result<(), LeaseError> {
        let ballot = {
            let st = self.state.lock().unwrap();
            st.na
        };
        debug_assert!(ballot > 0, "renewLease entered with na == 0");

        pf_debug!("renewLease: RenewPrepare({})", ballot);
        if !self.broadcast(LeaseOp::RenewPrepare, ballot).await {
            pf_debug!("renewLease: RenewPrepare({}) did not reach quorum", ballot);
            return Ok(());
        }

        {
            let mut st = self.state.lock().unwrap();
            st.renew_lease_len = self.config.lease_len - 2;
        }

        pf_debug!("renewLease: RenewAccept({})", ballot);
        if !self.broadcast(LeaseOp::RenewAccept, ballot).await {
            pf_debug!("renewLease: RenewAccept({}) did not reach quorum", ballot);
            return Ok(());
        }

        {
            let mut st = self.state.lock().unwrap();
            if st.renew_lease_len > 0 {
                let was_master = st.is_master;
                st.is_master = true;
                st.master_lease_len = st.renew_lease_len;
                if !was_master {
                    pf_info!("IS AGAIN THE MASTER NOW");
                }
            }
            st.na = ballot;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PEER_TABLE;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn make_node(id: ReplicaId, num_nodes: u8) -> (Arc<Mutex<LeaseState>>, Arc<Proposer>) {
        let state = Arc::new(Mutex::new(LeaseState::new(id, num_nodes)));
        let config = NodeConfig::default();
        let acceptor = Arc::new(Acceptor::new(Arc::clone(&state), config.clone()));
        // single-node cluster: peer list of one unreachable-but-unused addr,
        // since the only peer is self and self always uses the direct path
        let peers: Vec<SocketAddr> = vec![PEER_TABLE[0]];
        let transport = Arc::new(Transport::new(peers, Duration::from_millis(200), 0));
        let proposer = Arc::new(Proposer::new(
            id, num_nodes, state.clone(), acceptor, transport, config,
        ));
        (state, proposer)
    }

    #[tokio::test]
    async fn single_node_cluster_always_gets_lease() {
        let (state, proposer) = make_node(0, 1);
        proposer.get_lease().await.unwrap();
        let st = state.lock().unwrap();
        assert!(st.check_master());
        assert_eq!(st.master_lease_len, 3); // LEASE_LEN - 2
    }

    #[tokio::test]
    async fn renew_lease_requires_prior_accept() {
        let (state, proposer) = make_node(0, 1);
        proposer.get_lease().await.unwrap();
        proposer.renew_lease().await.unwrap();
        let st = state.lock().unwrap();
        assert!(st.check_master());
        assert_eq!(st.master_lease_len, 3);
    }
}
