//! Leveled, node-tagged logging macros built on the `log` facade, plus a
//! small "current node" tag so call sites don't need to thread `self.id`
//! through every log line.

use std::sync::OnceLock;

use crate::node::ReplicaId;

static ME: OnceLock<String> = OnceLock::new();

/// Sets the log line prefix for this process to `node <id>` and installs
/// `env_logger` reading its configuration from `RUST_LOG`. Safe to call more
/// than once; only the first call takes effect.
pub fn logger_init(id: ReplicaId) {
    let _ = ME.set(format!("node {}", id));
    let _ = env_logger::builder().format_timestamp_millis().try_init();
}

/// Returns the current node's log tag, or a placeholder if not yet set
/// (e.g. in unit tests that construct state directly without a full node).
pub(crate) fn me() -> &'static str {
    ME.get().map(String::as_str).unwrap_or("node ?")
}

macro_rules! pf_error {
    ($($arg:tt)+) => {
        log::error!("{} -- {}", $crate::utils::print::me(), format!($($arg)+))
    };
}

macro_rules! pf_warn {
    ($($arg:tt)+) => {
        log::warn!("{} -- {}", $crate::utils::print::me(), format!($($arg)+))
    };
}

macro_rules! pf_info {
    ($($arg:tt)+) => {
        log::info!("{} -- {}", $crate::utils::print::me(), format!($($arg)+))
    };
}

macro_rules! pf_debug {
    ($($arg:tt)+) => {
        log::debug!("{} -- {}", $crate::utils::print::me(), format!($($arg)+))
    };
}

macro_rules! pf_trace {
    ($($arg:tt)+) => {
        log::trace!("{} -- {}", $crate::utils::print::me(), format!($($arg)+))
    };
}

/// Logs an error at `error` level and builds a `LeaseError` from the same
/// message, for use as `return logged_err!("...");` in a `Result`-returning
/// function. An optional leading `tag;` overrides the node tag for call
/// sites where `logger_init` may not have run yet (e.g. config validation).
macro_rules! logged_err {
    ($tag:expr; $($arg:tt)+) => {{
        let msg = format!($($arg)+);
        log::error!("{} -- {}", $tag, msg);
        Err($crate::utils::error::LeaseError::msg(msg))
    }};
    ($($arg:tt)+) => {{
        let msg = format!($($arg)+);
        pf_error!("{}", msg);
        Err($crate::utils::error::LeaseError::msg(msg))
    }};
}
