use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::registers::{DEFAULT_ADDRESS, SETTLE_DELAY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// 7-bit bus address of the board.
    pub address: u8,
    /// Log every register transaction at debug level.
    pub debug: bool,
    /// Wait after `set_i2c_address` before talking to the new address.
    pub settle_delay_ms: u64,
    /// Entries kept by the transaction log, 0 disables it.
    pub log_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            debug: false,
            settle_delay_ms: SETTLE_DELAY.as_millis() as u64,
            log_capacity: 256,
        }
    }
}

impl RelayConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let cfg: RelayConfig = serde_json::from_str(r#"{ "address": 9 }"#).unwrap();
        assert_eq!(cfg.address, 9);
        assert!(!cfg.debug);
        assert_eq!(cfg.settle_delay(), Duration::from_secs(1));
        assert_eq!(cfg.log_capacity, 256);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let res: Result<RelayConfig, _> = serde_json::from_str(r#"{ "adress": 9 }"#);
        assert!(res.is_err());
    }
}
