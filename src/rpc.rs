//! Wire protocol: the four acceptor operations and their reply status,
//! carried as a length-prefixed `bincode` frame over a plain TCP stream.
//! Any framing that preserves this request/reply schema and per-peer
//! timeout bound would suffice; this is simply the one this crate ships.

use serde::{Deserialize, Serialize};

/// Paxos-style ballot number. Proposed ballots satisfy
/// `ballot mod num_nodes == proposer_id`.
pub type Ballot = i64;

/// The four reactive operations the acceptor exposes to peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaseOp {
    Prepare,
    Accept,
    RenewPrepare,
    RenewAccept,
}

/// Reply status for any of the four operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    Ok = 1,
    Reject = 2,
}

/// One request frame: which operation, at which ballot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct Request {
    pub(crate) op: LeaseOp,
    pub(crate) ballot: Ballot,
}

/// One reply frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct Reply {
    pub(crate) status: Status,
}

/// Name the service is addressed under on the wire / in logs.
pub(crate) const SERVICE_NAME: &str = "LeaseNode";
