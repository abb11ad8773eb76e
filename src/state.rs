//! Per-node lease state: ballot and lease-length bookkeeping, all guarded
//! by one mutex (see the `LeaseNode` construction in `node.rs`).

use crate::node::ReplicaId;
use crate::rpc::Ballot;

/// All mutable state for one node's role in the protocol. Every field here
/// is touched only under the node's single mutex, and never across an
/// `.await` point, so no two operations can interleave their reads and
/// writes of the same field.
pub(crate) struct LeaseState {
    pub(crate) node_id: ReplicaId,
    pub(crate) num_nodes: u8,

    /// Highest ballot ever promised (Prepare-seen). Non-decreasing.
    pub(crate) nh: Ballot,
    /// Highest ballot ever accepted (Accept-seen). Always `na <= nh`.
    pub(crate) na: Ballot,
    /// Proposer-side counter for the next ballot this node will propose.
    pub(crate) next_ballot: Ballot,

    /// Remaining periods this node, as acceptor, has promised a lease.
    pub(crate) accept_lease_len: u8,
    /// Remaining periods this node believes itself to be master.
    pub(crate) master_lease_len: u8,
    /// Remaining periods of the tentative renewed lease while renewal is
    /// in flight.
    pub(crate) renew_lease_len: u8,

    pub(crate) is_master: bool,
}

impl LeaseState {
    pub(crate) fn new(node_id: ReplicaId, num_nodes: u8) -> Self {
        LeaseState {
            node_id,
            num_nodes,
            nh: 0,
            na: 0,
            // proposer-side ballot sequence for node i starts at i and
            // steps by num_nodes, preserving `ballot mod num_nodes == i`
            next_ballot: node_id as Ballot,
            accept_lease_len: 0,
            master_lease_len: 0,
            renew_lease_len: 0,
            is_master: false,
        }
    }

    /// Pure local read: is this node currently usable as master.
    pub(crate) fn check_master(&self) -> bool {
        self.is_master && self.master_lease_len > 0
    }
}
