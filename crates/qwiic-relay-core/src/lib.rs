//! Driver for the SparkFun Qwiic Quad Solid State Relay: register map,
//! controller, transaction log, and a thread-backed service.

pub mod config;
pub mod controller;
pub mod error;
pub mod registers;
pub mod relay_service;
pub mod txlog;

pub use config::RelayConfig;
pub use controller::RelayController;
pub use error::RelayError;
pub use registers::DEFAULT_ADDRESS;
pub use relay_service::RelayService;
pub use txlog::{Direction, SharedLog, TransactionLog, TxEntry};
