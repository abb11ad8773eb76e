//! Query surface: the non-blocking, network-free predicate local callers
//! use to decide whether it's safe to act as the single leader.

use std::sync::{Arc, Mutex};

use crate::state::LeaseState;

/// A cheap, cloneable handle for co-located callers to ask "am I the
/// master". Never blocks on network activity -- it is a pure read of
/// already-replicated local state.
#[derive(Clone)]
pub struct LeaseHandle {
    state: Arc<Mutex<LeaseState>>,
}

impl LeaseHandle {
    pub(crate) fn new(state: Arc<Mutex<LeaseState>>) -> Self {
        LeaseHandle { state }
    }

    /// Returns true iff this node currently holds an unexpired,
    /// majority-granted master lease.
    pub fn check_master(&self) -> bool {
        self.state.lock().unwrap().check_master()
    }
}
