use crossbeam_channel::{bounded, unbounded, Sender};
use embedded_hal::i2c::I2c;
use log::debug;
use std::thread::JoinHandle;

use crate::controller::RelayController;
use crate::error::RelayError;
use crate::registers::RELAY_COUNT;
use crate::txlog::SharedLog;

type Job<I2C> = Box<dyn FnOnce(&mut RelayController<I2C>) + Send>;

enum Command<I2C> {
    Run(Job<I2C>),
    Close,
}

/// Runs a [`RelayController`] on its own thread.
///
/// Requests from every caller are queued and executed one at a time, so the
/// read-then-toggle of `on`/`off` cannot interleave with another caller of
/// the same service. It does not protect against other processes using the
/// bus.
pub struct RelayService<I2C: I2c> {
    tx_cmd: Sender<Command<I2C>>,
    worker: Option<JoinHandle<RelayController<I2C>>>,
    log: Option<SharedLog>,
}

impl<I2C> RelayService<I2C>
where
    I2C: I2c + Send + 'static,
    I2C::Error: Send + 'static,
{
    pub fn spawn(relay: RelayController<I2C>) -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<Command<I2C>>();
        let log = relay.log().cloned();

        let worker = std::thread::spawn(move || {
            let mut relay = relay;
            while let Ok(cmd) = rx_cmd.recv() {
                match cmd {
                    Command::Run(job) => job(&mut relay),
                    Command::Close => break,
                }
            }
            debug!("relay worker for {:#04x} stopped", relay.address());
            relay
        });

        Self {
            tx_cmd,
            worker: Some(worker),
            log,
        }
    }

    fn call<T, F>(&self, f: F) -> Result<T, RelayError<I2C::Error>>
    where
        T: Send + 'static,
        F: FnOnce(&mut RelayController<I2C>) -> T + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let job: Job<I2C> = Box::new(move |relay| {
            let _ = tx.send(f(relay));
        });
        self.tx_cmd
            .send(Command::Run(job))
            .map_err(|_| RelayError::ServiceClosed)?;
        rx.recv().map_err(|_| RelayError::ServiceClosed)
    }

    /// False when the board does not answer or the service is closed.
    pub fn connected(&self) -> bool {
        self.call(|r| r.connected()).unwrap_or(false)
    }

    pub fn on(&self, relay: u8) -> Result<(), RelayError<I2C::Error>> {
        self.call(move |r| r.on(relay))?
    }

    pub fn off(&self, relay: u8) -> Result<(), RelayError<I2C::Error>> {
        self.call(move |r| r.off(relay))?
    }

    pub fn toggle(&self, relay: u8) -> Result<(), RelayError<I2C::Error>> {
        self.call(move |r| r.toggle(relay))?
    }

    pub fn all_on(&self) -> Result<(), RelayError<I2C::Error>> {
        self.call(|r| r.all_on())?
    }

    pub fn all_off(&self) -> Result<(), RelayError<I2C::Error>> {
        self.call(|r| r.all_off())?
    }

    pub fn all_toggle(&self) -> Result<(), RelayError<I2C::Error>> {
        self.call(|r| r.all_toggle())?
    }

    pub fn set_pwm(&self, relay: u8, duty: u8) -> Result<(), RelayError<I2C::Error>> {
        self.call(move |r| r.set_pwm(relay, duty))?
    }

    pub fn get_pwm(&self, relay: u8) -> Result<u8, RelayError<I2C::Error>> {
        self.call(move |r| r.get_pwm(relay))?
    }

    pub fn get_relay_state(&self, relay: u8) -> Result<bool, RelayError<I2C::Error>> {
        self.call(move |r| r.get_relay_state(relay))?
    }

    pub fn states(&self) -> Result<[bool; RELAY_COUNT as usize], RelayError<I2C::Error>> {
        self.call(|r| r.states())?
    }

    /// Blocks the caller for the settle delay; other callers queue behind it.
    pub fn set_i2c_address(&self, new_address: u8) -> bool {
        self.call(move |r| r.set_i2c_address(new_address)).unwrap_or(false)
    }

    pub fn address(&self) -> Result<u8, RelayError<I2C::Error>> {
        self.call(|r| r.address())
    }

    pub fn log(&self) -> Option<&SharedLog> {
        self.log.as_ref()
    }

    /// Stops the worker after the requests already queued.
    pub fn close(&self) {
        let _ = self.tx_cmd.send(Command::Close);
    }

    /// Stops the worker and hands the controller back.
    pub fn join(mut self) -> Option<RelayController<I2C>> {
        self.close();
        self.worker.take().and_then(|w| w.join().ok())
    }
}

impl<I2C: I2c> Drop for RelayService<I2C> {
    fn drop(&mut self) {
        let _ = self.tx_cmd.send(Command::Close);
    }
}
