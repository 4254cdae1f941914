use serde::{Deserialize, Serialize};

/// One recorded bus frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cFrame {
    pub address: u8,
    /// true for reads, matching the R/W bit.
    pub rw: bool,
    pub data: Vec<u8>,
    pub acked: bool,
}

impl I2cFrame {
    pub fn write(address: u8, data: &[u8], acked: bool) -> Self {
        Self {
            address,
            rw: false,
            data: data.to_vec(),
            acked,
        }
    }

    pub fn read(address: u8, data: &[u8], acked: bool) -> Self {
        Self {
            address,
            rw: true,
            data: data.to_vec(),
            acked,
        }
    }

    pub fn is_write(&self) -> bool {
        !self.rw
    }
}

/// Error raised by the simulated bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Nobody answered at the address.
    AddressNack,
    /// Injected failure, see `SimBoard::fail_next`.
    Injected,
}

impl embedded_hal::i2c::Error for SimError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            SimError::AddressNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            SimError::Injected => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
        }
    }
}
