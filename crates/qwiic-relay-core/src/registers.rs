//! Register map of the Qwiic Quad Solid State Relay.
//!
//! The board exposes single-byte registers. Writing the address of a command
//! register is the command itself; status and PWM registers are read back one
//! byte at a time.

use std::ops::RangeInclusive;
use std::time::Duration;

/// Factory 7-bit bus address.
pub const DEFAULT_ADDRESS: u8 = 0x08;

/// Number of relays on the board.
pub const RELAY_COUNT: u8 = 4;

/// Addresses accepted by [`CHANGE_ADDRESS`].
pub const ADDRESS_RANGE: RangeInclusive<u8> = 8..=118;

/// Slow PWM duty ceiling: 0 keeps a relay off, 120 keeps it on over the 1 s cycle.
pub const PWM_MAX: u8 = 120;

/// Time the board needs to commit a new address and restart its listener.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

pub const RELAY_TOGGLE_BASE: u8 = 0x01;
pub const RELAY_STATUS_BASE: u8 = 0x05;
pub const RELAY_PWM_BASE: u8 = 0x10;
pub const ALL_OFF: u8 = 0x0A;
pub const ALL_ON: u8 = 0x0B;
pub const ALL_TOGGLE: u8 = 0x0C;
pub const CHANGE_ADDRESS: u8 = 0xC7;

/// True for relay numbers 1 through 4.
pub fn relay_in_range(relay: u8) -> bool {
    (1..=RELAY_COUNT).contains(&relay)
}

/// Toggle command for `relay` (1-based).
pub fn toggle_register(relay: u8) -> u8 {
    RELAY_TOGGLE_BASE + (relay - 1)
}

/// Status register read by `on`/`off` (1-based).
pub fn status_register(relay: u8) -> u8 {
    RELAY_STATUS_BASE + (relay - 1)
}

/// PWM duty register. Offset by the relay number itself, not `relay - 1`.
pub fn pwm_register(relay: u8) -> u8 {
    RELAY_PWM_BASE.wrapping_add(relay)
}

/// Status register read by `get_relay_state`. Offset by the relay number
/// itself, one register past [`status_register`].
pub fn state_register(relay: u8) -> u8 {
    RELAY_STATUS_BASE.wrapping_add(relay)
}

/// True when `address` may be stored with [`CHANGE_ADDRESS`].
pub fn address_in_range(address: u8) -> bool {
    ADDRESS_RANGE.contains(&address)
}
