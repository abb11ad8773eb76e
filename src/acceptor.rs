//! Acceptor: the four reactive operations presented to the transport.
//! Purely reactive -- never initiates anything, never sees the network
//! directly (the transport layer deserializes a request and calls these).

use std::sync::{Arc, Mutex};

use crate::rpc::{Ballot, LeaseOp, Status};
use crate::state::LeaseState;
use crate::utils::config::NodeConfig;

pub(crate) struct Acceptor {
    state: Arc<Mutex<LeaseState>>,
    config: NodeConfig,
}

impl Acceptor {
    pub(crate) fn new(state: Arc<Mutex<LeaseState>>, config: NodeConfig) -> Self {
        Acceptor { state, config }
    }

    /// Dispatches a ballot to the named operation; used both by the inbound
    /// connection handler and by the proposer's self-call optimization.
    pub(crate) fn dispatch(&self, op: LeaseOp, ballot: Ballot) -> Status {
        match op {
            LeaseOp::Prepare => self.prepare(ballot),
            LeaseOp::Accept => self.accept(ballot),
            LeaseOp::RenewPrepare => self.renew_prepare(ballot),
            LeaseOp::RenewAccept => self.renew_accept(ballot),
        }
    }

    /// Fresh-acquisition phase 1.
    fn prepare(&self, ballot: Ballot) -> Status {
        let mut st = self.state.lock().unwrap();
        if ballot < st.nh {
            return Status::Reject;
        }
        // updated even on the lease-rejection branch below, so future
        // proposers learn the ballot floor and advance past it faster
        st.nh = ballot;
        if st.master_lease_len > 0 || st.accept_lease_len > 0 {
            pf_trace!(
                "Prepare({}) rejected: outstanding lease (master={} accept={})",
                ballot,
                st.master_lease_len,
                st.accept_lease_len
            );
            Status::Reject
        } else {
            pf_trace!("Prepare({}) OK", ballot);
            Status::Ok
        }
    }

    /// Fresh-acquisition phase 2.
    fn accept(&self, ballot: Ballot) -> Status {
        let mut st = self.state.lock().unwrap();
        if ballot < st.nh {
            pf_trace!("Accept({}) rejected: below nh={}", ballot, st.nh);
            return Status::Reject;
        }
        st.nh = ballot;
        st.na = ballot;
        st.accept_lease_len = self.config.lease_len;
        pf_trace!("Accept({}) OK", ballot);
        Status::Ok
    }

    /// Renewal phase 1: OK iff this acceptor previously accepted the same
    /// ballot, or it has nothing outstanding to protect.
    fn renew_prepare(&self, ballot: Ballot) -> Status {
        let mut st = self.state.lock().unwrap();
        if st.nh < ballot {
            st.nh = ballot;
        }
        if st.na == ballot || (st.accept_lease_len == 0 && st.master_lease_len == 0) {
            pf_trace!("RenewPrepare({}) OK", ballot);
            Status::Ok
        } else {
            pf_trace!(
                "RenewPrepare({}) rejected: na={} accept={} master={}",
                ballot,
                st.na,
                st.accept_lease_len,
                st.master_lease_len
            );
            Status::Reject
        }
    }

    /// Renewal phase 2: same predicate as `renew_prepare`, but on OK it
    /// refreshes this acceptor's promised lease. `na` is left untouched.
    fn renew_accept(&self, ballot: Ballot) -> Status {
        let mut st = self.state.lock().unwrap();
        if st.nh < ballot {
            st.nh = ballot;
        }
        if st.na == ballot || (st.accept_lease_len == 0 && st.master_lease_len == 0) {
            st.accept_lease_len = self.config.lease_len;
            pf_trace!("RenewAccept({}) OK", ballot);
            Status::Ok
        } else {
            pf_trace!(
                "RenewAccept({}) rejected: na={} accept={} master={}",
                ballot,
                st.na,
                st.accept_lease_len,
                st.master_lease_len
            );
            Status::Reject
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acceptor(id: u8, n: u8) -> Acceptor {
        Acceptor::new(
            Arc::new(Mutex::new(LeaseState::new(id, n))),
            NodeConfig::default(),
        )
    }

    #[test]
    fn prepare_rejects_stale_ballot() {
        let a = acceptor(0, 5);
        assert_eq!(a.dispatch(LeaseOp::Prepare, 10), Status::Ok);
        assert_eq!(a.dispatch(LeaseOp::Prepare, 5), Status::Reject);
        // nh floor still advances even though rejected by ballot staleness
        let st = a.state.lock().unwrap();
        assert_eq!(st.nh, 10);
    }

    #[test]
    fn prepare_rejects_while_lease_outstanding() {
        let a = acceptor(0, 5);
        assert_eq!(a.dispatch(LeaseOp::Prepare, 0), Status::Ok);
        assert_eq!(a.dispatch(LeaseOp::Accept, 0), Status::Ok);
        // a later, higher ballot is still rejected: accept_lease_len > 0
        assert_eq!(a.dispatch(LeaseOp::Prepare, 5), Status::Reject);
    }

    #[test]
    fn accept_sets_na_and_lease() {
        let a = acceptor(0, 5);
        assert_eq!(a.dispatch(LeaseOp::Accept, 3), Status::Ok);
        let st = a.state.lock().unwrap();
        assert_eq!(st.na, 3);
        assert_eq!(st.nh, 3);
        assert_eq!(st.accept_lease_len, 5);
    }

    #[test]
    fn renew_prepare_ok_on_matching_na() {
        let a = acceptor(0, 5);
        a.dispatch(LeaseOp::Accept, 7);
        assert_eq!(a.dispatch(LeaseOp::RenewPrepare, 7), Status::Ok);
        assert_eq!(a.dispatch(LeaseOp::RenewPrepare, 8), Status::Reject);
    }

    #[test]
    fn renew_prepare_ok_when_nothing_outstanding() {
        let a = acceptor(0, 5);
        // never accepted anything: both leases are zero
        assert_eq!(a.dispatch(LeaseOp::RenewPrepare, 42), Status::Ok);
    }

    #[test]
    fn renew_accept_refreshes_accept_lease_without_touching_na() {
        let a = acceptor(0, 5);
        a.dispatch(LeaseOp::Accept, 7);
        // let the accept lease decay by hand to simulate time passing
        {
            let mut st = a.state.lock().unwrap();
            st.accept_lease_len = 1;
        }
        assert_eq!(a.dispatch(LeaseOp::RenewAccept, 7), Status::Ok);
        let st = a.state.lock().unwrap();
        assert_eq!(st.accept_lease_len, 5);
        assert_eq!(st.na, 7);
    }

    #[test]
    fn renew_prepare_advances_nh_floor_even_on_reject() {
        let a = acceptor(0, 5);
        a.dispatch(LeaseOp::Accept, 3);
        assert_eq!(a.dispatch(LeaseOp::RenewPrepare, 99), Status::Reject);
        let st = a.state.lock().unwrap();
        assert_eq!(st.nh, 99);
    }
}
