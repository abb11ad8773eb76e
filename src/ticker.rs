//! Lease ticker: the sole initiator of proposer activity on a node. Fires
//! once per period, decays the lease counters, and decides (but does not
//! itself perform) whether this tick should trigger a fresh acquisition or
//! a renewal round.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::node::ReplicaId;
use crate::proposer::Proposer;
use crate::state::LeaseState;
use crate::utils::config::NodeConfig;
use crate::utils::timer::Timer;

/// Spawns the ticker task and returns its join handle plus a stop signal.
/// Sending `true` on the returned sender causes the ticker to exit its loop
/// after the in-flight action (if any) completes.
pub(crate) fn spawn(
    state: Arc<Mutex<LeaseState>>,
    proposer: Arc<Proposer>,
    config: NodeConfig,
) -> (JoinHandle<()>, watch::Sender<bool>) {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut timer = Timer::new(Duration::from_millis(config.period_len_ms));
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let (will_renew, will_get) = decay_and_decide(&state, &config);
                    // renew takes precedence: a current master should never
                    // uselessly race itself with a fresh acquisition
                    if will_renew {
                        if let Err(e) = proposer.renew_lease().await {
                            pf_debug!("renewLease round errored: {}", e);
                        }
                    } else if will_get {
                        if let Err(e) = proposer.get_lease().await {
                            pf_debug!("getLease round errored: {}", e);
                        }
                    }
                }

                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        pf_debug!("ticker stopped");
                        break;
                    }
                }
            }
        }
    });
    (handle, stop_tx)
}

/// Decays the three lease counters by one period and decides what action
/// (if any) this tick should trigger. Takes the mutex only for this; the
/// caller invokes the actual (blocking) round outside the lock.
fn decay_and_decide(state: &Arc<Mutex<LeaseState>>, config: &NodeConfig) -> (bool, bool) {
    let mut st = state.lock().unwrap();

    if st.renew_lease_len > 0 {
        st.renew_lease_len -= 1;
    }
    if st.master_lease_len > 0 {
        st.master_lease_len -= 1;
    }
    if st.accept_lease_len > 0 {
        st.accept_lease_len -= 1;
    }

    let mut will_renew = false;
    if st.is_master {
        if st.master_lease_len == 0 {
            st.is_master = false;
            pf_info!("IS NOT THE MASTER NOW");
        } else if st.master_lease_len < config.refresh_len {
            will_renew = true;
        }
    }

    let will_get = st.accept_lease_len == 0;
    (will_renew, will_get)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_state(id: ReplicaId, n: u8) -> Arc<Mutex<LeaseState>> {
        Arc::new(Mutex::new(LeaseState::new(id, n)))
    }

    #[test]
    fn cold_start_wants_to_get_lease() {
        let state = fresh_state(0, 5);
        let (will_renew, will_get) =
            decay_and_decide(&state, &NodeConfig::default());
        assert!(!will_renew);
        assert!(will_get);
    }

    #[test]
    fn master_below_refresh_wants_renew() {
        let state = fresh_state(0, 5);
        {
            let mut st = state.lock().unwrap();
            st.is_master = true;
            st.master_lease_len = 2; // decays to 1, below refresh_len=2
            st.accept_lease_len = 5;
        }
        let (will_renew, will_get) =
            decay_and_decide(&state, &NodeConfig::default());
        assert!(will_renew);
        assert!(!will_get);
    }

    #[test]
    fn master_lease_expiry_clears_is_master() {
        let state = fresh_state(0, 5);
        {
            let mut st = state.lock().unwrap();
            st.is_master = true;
            st.master_lease_len = 1; // decays to 0 this tick
            st.accept_lease_len = 5;
        }
        decay_and_decide(&state, &NodeConfig::default());
        let st = state.lock().unwrap();
        assert!(!st.is_master);
        assert!(!st.check_master());
    }

    #[test]
    fn renew_takes_precedence_over_get_in_caller() {
        // both conditions can be true in the same tick if accept_lease_len
        // independently hit zero while still master; the caller (spawn's
        // select loop) is responsible for the precedence, this just checks
        // both flags can legitimately be set together
        let state = fresh_state(0, 5);
        {
            let mut st = state.lock().unwrap();
            st.is_master = true;
            st.master_lease_len = 2;
            st.accept_lease_len = 1; // decays to 0
        }
        let (will_renew, will_get) =
            decay_and_decide(&state, &NodeConfig::default());
        assert!(will_renew);
        assert!(will_get);
    }
}
