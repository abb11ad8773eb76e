//! Node configuration: compiled-in defaults for the protocol's tunable
//! constants, overridable by an optional TOML fragment. This exists so
//! tests can shrink the period length to run the protocol at the speed of
//! the test suite instead of real time.

use serde::Deserialize;

/// Tunable knobs for one node. Defaults match the protocol's fixed
/// constants; production deployments should take the defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Length of one lease period, in milliseconds.
    pub period_len_ms: u64,

    /// Number of periods in a full lease.
    pub lease_len: u8,

    /// Number of remaining master periods at which renewal begins.
    pub refresh_len: u8,

    /// Per-peer RPC timeout, in milliseconds.
    pub peer_timeout_ms: u64,

    /// Number of retries for a failed connect/bind before giving up.
    pub retry_cnt: u8,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            period_len_ms: 1000,
            lease_len: 5,
            refresh_len: 2,
            peer_timeout_ms: 1000,
            retry_cnt: 3,
        }
    }
}

impl NodeConfig {
    /// Validates the config's cross-field invariants; called once right
    /// after parsing.
    pub(crate) fn validate(&self) -> Result<(), crate::LeaseError> {
        if self.lease_len < 3 {
            return logged_err!(
                "config"; "lease_len must be >= 3 for the safety margin, got {}",
                self.lease_len
            );
        }
        if self.refresh_len == 0 || self.refresh_len >= self.lease_len {
            return logged_err!(
                "config"; "refresh_len must be in [1, lease_len), got {}",
                self.refresh_len
            );
        }
        Ok(())
    }
}

/// Parses an optional TOML config fragment into a config struct, starting
/// from `Default::default()` and overriding only the named fields present
/// in the fragment. Unlisted or absent fields keep their default value.
macro_rules! parsed_config {
    ($raw:expr => $ty:ty; $($field:ident),+ $(,)?) => {{
        (|| -> Result<$ty, $crate::LeaseError> {
            let mut cfg = <$ty>::default();
            if let Some(raw) = $raw {
                let table: toml::Table = raw.parse().map_err(|e| {
                    $crate::LeaseError::msg(format!(
                        "failed to parse config fragment: {}",
                        e
                    ))
                })?;
                $(
                    if let Some(val) = table.get(stringify!($field)) {
                        cfg.$field = val.clone().try_into().map_err(|e| {
                            $crate::LeaseError::msg(format!(
                                "failed to parse config field '{}': {}",
                                stringify!($field),
                                e
                            ))
                        })?;
                    }
                )+
            }
            Ok(cfg)
        })()
    }};
}
