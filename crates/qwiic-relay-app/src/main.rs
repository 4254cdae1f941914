use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use embedded_hal::i2c::I2c;
use qwiic_relay_core::{RelayConfig, RelayController};
use qwiic_relay_sim::SimBoard;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod settings;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Opt {
    /// I2C bus device [default: /dev/i2c-1]
    #[clap(long)]
    bus: Option<PathBuf>,

    /// Talk to a simulated board instead of the hardware
    #[clap(long, conflicts_with = "bus")]
    simulate: bool,

    /// Board address, decimal or 0x-prefixed hex
    #[clap(short, long, value_parser = parse_address)]
    address: Option<u8>,

    /// Log every register transaction
    #[clap(long)]
    debug: bool,

    /// Print the bus transactions after the command
    #[clap(long)]
    trace: bool,

    /// Config file [default: <config dir>/qwiic-relay/config.json]
    #[clap(long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
enum Cmd {
    /// Check the board and print the relay states
    Status,
    /// Turn a relay (1-4) on
    On { relay: u8 },
    /// Turn a relay (1-4) off
    Off { relay: u8 },
    /// Toggle a relay (1-4)
    Toggle { relay: u8 },
    AllOn,
    AllOff,
    AllToggle,
    /// Read, or set when VALUE is given, the slow PWM duty (0-120)
    Pwm { relay: u8, value: Option<u8> },
    /// Store a new bus address (8-118) in the board
    SetAddress {
        #[clap(value_parser = parse_address)]
        new_address: u8,
    },
    /// Walk through every relay command
    Demo,
}

fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address `{s}`: {e}"))
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let app_cfg = settings::load(opt.config.as_deref())?;

    let mut cfg = app_cfg.relay;
    if let Some(address) = opt.address {
        cfg.address = address;
    }
    cfg.debug |= opt.debug;
    init_logging(cfg.debug);

    if opt.simulate {
        let board = SimBoard::new(cfg.address);
        run(board.clone(), &cfg, &opt)?;
        if opt.trace {
            println!("{}", serde_json::to_string_pretty(&board.frames())?);
        }
        return Ok(());
    }

    let bus = opt
        .bus
        .clone()
        .or(app_cfg.bus)
        .unwrap_or_else(|| PathBuf::from(settings::DEFAULT_BUS));
    run_hardware(bus, &cfg, &opt)
}

#[cfg(target_os = "linux")]
fn run_hardware(bus: PathBuf, cfg: &RelayConfig, opt: &Opt) -> Result<()> {
    use anyhow::Context;

    let i2c = linux_embedded_hal::I2cdev::new(&bus).with_context(|| format!("opening {}", bus.display()))?;
    run(i2c, cfg, opt)
}

#[cfg(not(target_os = "linux"))]
fn run_hardware(bus: PathBuf, _cfg: &RelayConfig, _opt: &Opt) -> Result<()> {
    bail!("no I2C support on this platform for {}, use --simulate", bus.display())
}

fn run<I2C>(bus: I2C, cfg: &RelayConfig, opt: &Opt) -> Result<()>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
{
    let mut relay = RelayController::from_config(bus, cfg);
    let result = execute(&mut relay, &opt.cmd);

    if opt.trace {
        if let Some(log) = relay.log() {
            print!("{}", log.lock().to_text(true));
        }
    }
    result
}

fn execute<I2C>(relay: &mut RelayController<I2C>, cmd: &Cmd) -> Result<()>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
{
    match *cmd {
        Cmd::Status => {
            if !relay.connected() {
                bail!(
                    "relay does not appear to be connected at {:#04x}, check wiring",
                    relay.address()
                );
            }
            println!("connected at {:#04x}", relay.address());
            print_states(relay)?;
        }
        Cmd::On { relay: n } => relay.on(n)?,
        Cmd::Off { relay: n } => relay.off(n)?,
        Cmd::Toggle { relay: n } => relay.toggle(n)?,
        Cmd::AllOn => relay.all_on()?,
        Cmd::AllOff => relay.all_off()?,
        Cmd::AllToggle => relay.all_toggle()?,
        Cmd::Pwm { relay: n, value: Some(v) } => relay.set_pwm(n, v)?,
        Cmd::Pwm { relay: n, value: None } => println!("{}", relay.get_pwm(n)?),
        Cmd::SetAddress { new_address } => {
            if !relay.set_i2c_address(new_address) {
                bail!("address change to {new_address:#04x} failed");
            }
            println!("board now answers at {new_address:#04x}; it keeps this address across power cycles");
        }
        Cmd::Demo => demo(relay)?,
    }
    Ok(())
}

fn print_states<I2C>(relay: &mut RelayController<I2C>) -> Result<()>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
{
    for (i, on) in relay.states()?.iter().enumerate() {
        println!("relay {}: {}", i + 1, if *on { "on" } else { "off" });
    }
    Ok(())
}

fn demo<I2C>(relay: &mut RelayController<I2C>) -> Result<()>
where
    I2C: I2c,
    I2C::Error: Send + Sync + 'static,
{
    const STEP: Duration = Duration::from_millis(500);

    if !relay.connected() {
        bail!("relay does not appear to be connected, check wiring");
    }
    log::info!("relay connected at {:#04x}", relay.address());

    for n in 1..=4 {
        relay.on(n)?;
        std::thread::sleep(STEP);
    }
    relay.off(1)?;
    relay.off(4)?;
    print_states(relay)?;
    std::thread::sleep(STEP);

    relay.all_toggle()?;
    print_states(relay)?;
    std::thread::sleep(STEP);

    relay.all_on()?;
    std::thread::sleep(STEP);
    relay.all_off()?;
    print_states(relay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("8"), Ok(8));
        assert_eq!(parse_address("0x2A"), Ok(0x2A));
        assert_eq!(parse_address("0X76"), Ok(118));
        assert!(parse_address("0x1FF").is_err());
        assert!(parse_address("eight").is_err());
    }

    #[test]
    fn test_cli_shape() {
        use clap::CommandFactory;
        Opt::command().debug_assert();
    }

    #[test]
    fn test_execute_against_simulator() {
        let board = SimBoard::default();
        let cfg = RelayConfig {
            settle_delay_ms: 0,
            ..Default::default()
        };
        let mut relay = RelayController::from_config(board.clone(), &cfg);

        execute(&mut relay, &Cmd::On { relay: 2 }).unwrap();
        execute(&mut relay, &Cmd::Pwm { relay: 1, value: Some(60) }).unwrap();
        assert!(board.relay(2));
        assert_eq!(board.register(0x11), 60);

        assert!(execute(&mut relay, &Cmd::Pwm { relay: 1, value: Some(121) }).is_err());
        assert!(execute(&mut relay, &Cmd::SetAddress { new_address: 119 }).is_err());
        execute(&mut relay, &Cmd::SetAddress { new_address: 0x09 }).unwrap();
        assert_eq!(board.address(), 0x09);
        execute(&mut relay, &Cmd::Status).unwrap();
    }

    #[test]
    fn test_status_fails_when_absent() {
        let board = SimBoard::new(0x30);
        let mut relay = RelayController::open(board, 0x08, false);
        assert!(execute(&mut relay, &Cmd::Status).is_err());
    }
}
