use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

/// Errors returned by the relay driver.
///
/// `E` is the error type of the underlying I2C bus.
#[derive(Debug, Error)]
pub enum RelayError<E: core::fmt::Debug> {
    #[error("I2C transaction failed: {0:?}")]
    Bus(E),

    #[error("PWM duty {0} outside 0-120")]
    InvalidPwm(u8),

    #[error("relay service is closed")]
    ServiceClosed,
}

impl<E: embedded_hal::i2c::Error> RelayError<E> {
    /// Bus error kind, `None` for argument and service errors.
    pub fn bus_kind(&self) -> Option<ErrorKind> {
        match self {
            RelayError::Bus(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// True when the board did not acknowledge the transaction.
    pub fn is_nack(&self) -> bool {
        matches!(self.bus_kind(), Some(ErrorKind::NoAcknowledge(_)))
    }
}
