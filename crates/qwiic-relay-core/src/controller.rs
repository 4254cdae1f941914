use embedded_hal::i2c::I2c;
use log::{debug, info, warn};
use std::time::Duration;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::registers::*;
use crate::txlog::{Direction, SharedLog, TransactionLog};

const BUS_TARGET: &str = "qwiic_relay::bus";

/// Driver for one Qwiic Quad Solid State Relay board.
///
/// Every operation is one or two single-byte transactions on the bus. The
/// controller keeps no relay state of its own; `on` and `off` read the
/// status register before deciding whether to toggle, so another bus master
/// changing a relay between the two transactions can defeat them. Share a
/// board between threads through [`crate::RelayService`].
pub struct RelayController<I2C> {
    i2c: I2C,
    address: u8,
    debug: bool,
    settle_delay: Duration,
    log: Option<SharedLog>,
}

impl<I2C: I2c> RelayController<I2C> {
    /// Binds to `address` on `i2c`. No bus traffic happens until the first
    /// operation.
    pub fn open(i2c: I2C, address: u8, debug: bool) -> Self {
        Self {
            i2c,
            address,
            debug,
            settle_delay: SETTLE_DELAY,
            log: None,
        }
    }

    pub fn from_config(i2c: I2C, cfg: &RelayConfig) -> Self {
        let mut relay = Self::open(i2c, cfg.address, cfg.debug).with_settle_delay(cfg.settle_delay());
        if cfg.log_capacity > 0 {
            relay.log = Some(TransactionLog::shared(cfg.log_capacity));
        }
        relay
    }

    /// Records every transaction into `log`.
    pub fn with_log(mut self, log: SharedLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn log(&self) -> Option<&SharedLog> {
        self.log.as_ref()
    }

    /// Address the controller currently talks to.
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Checks for the board by reading the first status register. A bus error
    /// means "not connected"; the answer is never cached.
    pub fn connected(&mut self) -> bool {
        self.read_command(RELAY_STATUS_BASE).is_ok()
    }

    /// Turns `relay` (1-4) on, writing only if it reads as off.
    pub fn on(&mut self, relay: u8) -> Result<(), RelayError<I2C::Error>> {
        if !self.check_relay(relay) {
            return Ok(());
        }
        if self.read_command(status_register(relay))? == 0 {
            self.write_command(toggle_register(relay))?;
        }
        Ok(())
    }

    /// Turns `relay` (1-4) off, writing only if it reads as on.
    pub fn off(&mut self, relay: u8) -> Result<(), RelayError<I2C::Error>> {
        if !self.check_relay(relay) {
            return Ok(());
        }
        if self.read_command(status_register(relay))? != 0 {
            self.write_command(toggle_register(relay))?;
        }
        Ok(())
    }

    pub fn toggle(&mut self, relay: u8) -> Result<(), RelayError<I2C::Error>> {
        if !self.check_relay(relay) {
            return Ok(());
        }
        self.write_command(toggle_register(relay))
    }

    pub fn all_on(&mut self) -> Result<(), RelayError<I2C::Error>> {
        self.write_command(ALL_ON)
    }

    pub fn all_off(&mut self) -> Result<(), RelayError<I2C::Error>> {
        self.write_command(ALL_OFF)
    }

    pub fn all_toggle(&mut self) -> Result<(), RelayError<I2C::Error>> {
        self.write_command(ALL_TOGGLE)
    }

    /// Sets the slow PWM duty of `relay`, 0 (off) to 120 (on), over a 1 s
    /// cycle. The register is `0x10 + relay`; the relay number is passed
    /// through unchecked.
    pub fn set_pwm(&mut self, relay: u8, duty: u8) -> Result<(), RelayError<I2C::Error>> {
        if duty > PWM_MAX {
            return Err(RelayError::InvalidPwm(duty));
        }
        self.write_register(pwm_register(relay), duty)
    }

    /// Reads the slow PWM duty of `relay` from `0x10 + relay`.
    pub fn get_pwm(&mut self, relay: u8) -> Result<u8, RelayError<I2C::Error>> {
        self.read_command(pwm_register(relay))
    }

    /// Reads `0x05 + relay` and reports it as on when non-zero.
    ///
    /// This is one register past the one `on`/`off` consult for the same
    /// relay; use [`Self::states`] for the status block as `on`/`off` see it.
    /// Out-of-range relays read as off without touching the bus.
    pub fn get_relay_state(&mut self, relay: u8) -> Result<bool, RelayError<I2C::Error>> {
        if !self.check_relay(relay) {
            return Ok(false);
        }
        Ok(self.read_command(state_register(relay))? != 0)
    }

    /// Status of relays 1 through 4, read from the registers `on`/`off` use.
    pub fn states(&mut self) -> Result<[bool; RELAY_COUNT as usize], RelayError<I2C::Error>> {
        let mut states = [false; RELAY_COUNT as usize];
        for (i, state) in states.iter_mut().enumerate() {
            *state = self.read_command(status_register(i as u8 + 1))? != 0;
        }
        Ok(states)
    }

    /// Stores `new_address` in the board's non-volatile memory and rebinds
    /// to it after the settle delay.
    ///
    /// Returns false without touching the bus when `new_address` is outside
    /// 8-118, and false when the command or the rebind fails. Once the
    /// command went through, the board only answers at the new address.
    pub fn set_i2c_address(&mut self, new_address: u8) -> bool {
        info!("changing relay address {:#04x} -> {:#04x}", self.address, new_address);
        if !address_in_range(new_address) {
            warn!("address {new_address} outside 8-118 range");
            return false;
        }

        if let Err(e) = self.write_register(CHANGE_ADDRESS, new_address) {
            warn!("address change command failed: {e}");
            return false;
        }

        std::thread::sleep(self.settle_delay);

        match self.check_binding(new_address) {
            Ok(()) => {
                self.address = new_address;
                info!("relay now at address {new_address:#04x}");
                true
            }
            Err(e) => {
                warn!("address change failure: no answer at {new_address:#04x}: {e:?}");
                false
            }
        }
    }

    // Zero-length write, falling back to a one-byte read for adapters that
    // cannot issue empty writes.
    fn check_binding(&mut self, address: u8) -> Result<(), I2C::Error> {
        let res = self.i2c.write(address, &[]);
        self.record(Direction::Tx, address, &[], res.is_ok());
        if res.is_ok() {
            return res;
        }

        let mut buf = [0u8; 1];
        let res = self.i2c.read(address, &mut buf);
        match &res {
            Ok(()) => self.record(Direction::Rx, address, &buf, true),
            Err(_) => self.record(Direction::Rx, address, &[], false),
        }
        res
    }

    fn check_relay(&self, relay: u8) -> bool {
        if relay_in_range(relay) {
            return true;
        }
        if self.debug {
            warn!("relay number {relay} out of range");
        }
        false
    }

    // Write the register address, then read one byte back.
    fn read_command(&mut self, register: u8) -> Result<u8, RelayError<I2C::Error>> {
        let mut buf = [0u8; 1];
        let res = self.i2c.write_read(self.address, &[register], &mut buf);
        self.record(Direction::Tx, self.address, &[register], res.is_ok());
        if let Err(e) = res {
            if self.debug {
                debug!(target: BUS_TARGET, "${register:02X} => {e:?}");
            }
            return Err(RelayError::Bus(e));
        }
        self.record(Direction::Rx, self.address, &buf, true);

        if self.debug {
            debug!(target: BUS_TARGET, "${register:02X} => [{:#04x}]", buf[0]);
        }
        Ok(buf[0])
    }

    fn write_command(&mut self, command: u8) -> Result<(), RelayError<I2C::Error>> {
        let res = self.i2c.write(self.address, &[command]);
        self.record(Direction::Tx, self.address, &[command], res.is_ok());
        if self.debug {
            match &res {
                Ok(()) => debug!(target: BUS_TARGET, "${command:02X}"),
                Err(e) => debug!(target: BUS_TARGET, "${command:02X} {e:?}"),
            }
        }
        res.map_err(RelayError::Bus)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), RelayError<I2C::Error>> {
        let res = self.i2c.write(self.address, &[register, value]);
        self.record(Direction::Tx, self.address, &[register, value], res.is_ok());
        if self.debug {
            match &res {
                Ok(()) => debug!(target: BUS_TARGET, "${register:02X} <= {value:#04x}"),
                Err(e) => debug!(target: BUS_TARGET, "${register:02X} <= {value:#04x} {e:?}"),
            }
        }
        res.map_err(RelayError::Bus)
    }

    fn record(&self, direction: Direction, device: u8, data: &[u8], acked: bool) {
        if let Some(log) = &self.log {
            log.lock().push(direction, device, data, acked);
        }
    }
}
