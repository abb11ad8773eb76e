//! Paxos-based leader lease service.
//!
//! A small cluster of peer nodes cooperates so that at most one of them
//! holds the role of master at any real-time instant, where mastership is a
//! time-bounded lease rather than a permanent election. See [`LeaseNode`] for
//! the entry point and [`LeaseHandle::check_master`] for the local query
//! callers actually use.

#[macro_use]
mod utils;

mod acceptor;
mod node;
mod proposer;
mod query;
mod rpc;
mod state;
mod ticker;
mod transport;

pub use node::{LeaseNode, ReplicaId, PEER_TABLE};
pub use query::LeaseHandle;
pub use rpc::{Ballot, LeaseOp, Status};
pub use utils::config::NodeConfig;
pub use utils::error::LeaseError;
pub use utils::print::logger_init;
