use std::time::{Duration, Instant};

use crate::{Error, Result};

/// K, the number of closest contacts a lookup converges on and a value is stored at.
pub const DEFAULT_K: usize = 3;
/// Alpha, the number of contacts queried per round while the lookup makes progress.
pub const DEFAULT_ALPHA: usize = 2;
pub const DEFAULT_NODE_ROUND_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_VALUE_ROUND_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_REPUBLISH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Lookup engine configurations
pub struct Config {
    /// Size of the closest set a lookup converges on, and the number of
    /// nodes a value is stored at.
    ///
    /// Also the width of the next round when a round made no progress.
    ///
    /// Defaults to [DEFAULT_K]
    pub k: usize,
    /// Number of contacts queried in the first round and in every round
    /// following a round that improved the closest set.
    ///
    /// Defaults to [DEFAULT_ALPHA]
    pub alpha: usize,
    /// How long each find node round collects responses.
    ///
    /// Every round waits for the full duration. The shorter it is, the more
    /// responses from slow nodes we miss out on.
    ///
    /// Defaults to [DEFAULT_NODE_ROUND_TIMEOUT]
    pub node_round_timeout: Duration,
    /// How long each find data round collects responses.
    ///
    /// Defaults to [DEFAULT_VALUE_ROUND_TIMEOUT]
    pub value_round_timeout: Duration,
    /// Period between two republishes of a stored value.
    ///
    /// Defaults to [DEFAULT_REPUBLISH_INTERVAL]
    pub republish_interval: Duration,
}

impl Config {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidConfig("k must be at least 1"));
        }
        if self.alpha == 0 {
            return Err(Error::InvalidConfig("alpha must be at least 1"));
        }
        if self.alpha > self.k {
            return Err(Error::InvalidConfig("alpha must not exceed k"));
        }
        if self.republish_interval.is_zero() {
            return Err(Error::InvalidConfig("republish_interval must not be zero"));
        }

        let now = Instant::now();
        if now.checked_add(self.node_round_timeout).is_none() {
            return Err(Error::InvalidConfig("node_round_timeout is too large"));
        }
        if now.checked_add(self.value_round_timeout).is_none() {
            return Err(Error::InvalidConfig("value_round_timeout is too large"));
        }
        if now.checked_add(self.republish_interval).is_none() {
            return Err(Error::InvalidConfig("republish_interval is too large"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            alpha: DEFAULT_ALPHA,
            node_round_timeout: DEFAULT_NODE_ROUND_TIMEOUT,
            value_round_timeout: DEFAULT_VALUE_ROUND_TIMEOUT,
            republish_interval: DEFAULT_REPUBLISH_INTERVAL,
        }
    }
}
