use embedded_hal::i2c::{ErrorType, I2c, Operation};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::i2c::{I2cFrame, SimError};

const TOGGLE_FIRST: u8 = 0x01;
const STATUS_FIRST: u8 = 0x05;
const ALL_OFF: u8 = 0x0A;
const ALL_ON: u8 = 0x0B;
const ALL_TOGGLE: u8 = 0x0C;
const CHANGE_ADDRESS: u8 = 0xC7;

const RELAYS: usize = 4;

struct BoardState {
    address: u8,
    address_locked: bool,
    relays: [bool; RELAYS],
    registers: [u8; 256],
    pointer: u8,
    fail_next: usize,
    frames: Vec<I2cFrame>,
    commands: Vec<Vec<u8>>,
    transactions: usize,
}

impl BoardState {
    fn command(&mut self, bytes: &[u8]) {
        let Some((&reg, data)) = bytes.split_first() else {
            return;
        };
        self.pointer = reg;
        match (reg, data) {
            (r, []) if (TOGGLE_FIRST..TOGGLE_FIRST + RELAYS as u8).contains(&r) => {
                let i = (r - TOGGLE_FIRST) as usize;
                self.relays[i] = !self.relays[i];
            }
            (ALL_OFF, []) => self.relays = [false; RELAYS],
            (ALL_ON, []) => self.relays = [true; RELAYS],
            (ALL_TOGGLE, []) => self.relays.iter_mut().for_each(|r| *r = !*r),
            (CHANGE_ADDRESS, [new, ..]) => {
                // firmware ignores addresses outside 0x07 < a < 0x78
                if !self.address_locked && (0x08..=0x77).contains(new) {
                    self.address = *new;
                }
            }
            (_, [value, ..]) => self.registers[reg as usize] = *value,
            _ => {}
        }
    }

    fn register(&self, reg: u8) -> u8 {
        match reg.checked_sub(STATUS_FIRST) {
            Some(i) if (i as usize) < RELAYS => self.relays[i as usize] as u8,
            _ => self.registers[reg as usize],
        }
    }
}

/// Simulated relay board speaking the board's register protocol.
///
/// Clones share the same board, so a test can keep one handle while a
/// controller owns another.
#[derive(Clone)]
pub struct SimBoard {
    state: Arc<Mutex<BoardState>>,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new(0x08)
    }
}

impl SimBoard {
    pub fn new(address: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState {
                address,
                address_locked: false,
                relays: [false; RELAYS],
                registers: [0u8; 256],
                pointer: 0,
                fail_next: 0,
                frames: Vec::new(),
                commands: Vec::new(),
                transactions: 0,
            })),
        }
    }

    /// Address the board currently answers at.
    pub fn address(&self) -> u8 {
        self.state.lock().address
    }

    /// State of relay `n` (1-4).
    ///
    /// # Panics
    ///
    /// Panics if `n` is outside 1-4.
    pub fn relay(&self, n: usize) -> bool {
        self.state.lock().relays[n - 1]
    }

    /// Forces relay `n` (1-4) without a bus transaction.
    ///
    /// # Panics
    ///
    /// Panics if `n` is outside 1-4.
    pub fn set_relay(&self, n: usize, on: bool) {
        self.state.lock().relays[n - 1] = on;
    }

    pub fn relays(&self) -> [bool; RELAYS] {
        self.state.lock().relays
    }

    /// Raw register content, as a read of `reg` would return it.
    pub fn register(&self, reg: u8) -> u8 {
        self.state.lock().register(reg)
    }

    /// Acknowledge address changes without applying them.
    pub fn lock_address(&self, locked: bool) {
        self.state.lock().address_locked = locked;
    }

    /// NACK the next `count` transactions.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().fail_next = count;
    }

    pub fn frames(&self) -> Vec<I2cFrame> {
        self.state.lock().frames.clone()
    }

    /// Payloads of acknowledged write-only transactions, in order. Register
    /// reads (address write plus read) are not included.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.state.lock().commands.clone()
    }

    /// Transactions attempted at any address, acknowledged or not.
    pub fn transactions(&self) -> usize {
        self.state.lock().transactions
    }

    pub fn clear_frames(&self) {
        let mut st = self.state.lock();
        st.frames.clear();
        st.commands.clear();
        st.transactions = 0;
    }
}

impl ErrorType for SimBoard {
    type Error = SimError;
}

impl I2c for SimBoard {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), SimError> {
        let mut st = self.state.lock();
        st.transactions += 1;

        let error = if address != st.address {
            Some(SimError::AddressNack)
        } else if st.fail_next > 0 {
            st.fail_next -= 1;
            Some(SimError::Injected)
        } else {
            None
        };
        if let Some(e) = error {
            let frame = match operations.first() {
                Some(Operation::Read(_)) => I2cFrame::read(address, &[], false),
                Some(Operation::Write(bytes)) => I2cFrame::write(address, bytes, false),
                None => I2cFrame::write(address, &[], false),
            };
            st.frames.push(frame);
            return Err(e);
        }

        let write_only = operations.iter().all(|op| matches!(op, Operation::Write(_)));
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let bytes: &[u8] = *bytes;
                    st.frames.push(I2cFrame::write(address, bytes, true));
                    if write_only {
                        st.commands.push(bytes.to_vec());
                    }
                    st.command(bytes);
                }
                Operation::Read(buf) => {
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = st.register(st.pointer.wrapping_add(i as u8));
                    }
                    st.frames.push(I2cFrame::read(address, &buf[..], true));
                }
            }
        }
        Ok(())
    }
}
