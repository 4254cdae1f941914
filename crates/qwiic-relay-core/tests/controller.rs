use qwiic_relay_core::registers::*;
use qwiic_relay_core::{RelayController, RelayError, TransactionLog};
use embedded_hal::i2c::{ErrorType, I2c, Operation};
use qwiic_relay_sim::{SimBoard, SimError};
use std::time::Duration;

/// Adapter that cannot put a zero-length write on the bus.
struct NoEmptyWrite(SimBoard);

impl ErrorType for NoEmptyWrite {
    type Error = SimError;
}

impl I2c for NoEmptyWrite {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), SimError> {
        if let [Operation::Write(bytes)] = operations {
            if bytes.is_empty() {
                return Err(SimError::AddressNack);
            }
        }
        self.0.transaction(address, operations)
    }
}

fn setup() -> (SimBoard, RelayController<SimBoard>) {
    let board = SimBoard::default();
    let relay = RelayController::open(board.clone(), DEFAULT_ADDRESS, true).with_settle_delay(Duration::ZERO);
    (board, relay)
}

#[test]
fn test_on_then_off_each_relay() {
    let (board, mut relay) = setup();
    for n in 1..=4u8 {
        relay.on(n).unwrap();
        assert_eq!(board.register(status_register(n)), 1);
        relay.off(n).unwrap();
        assert_eq!(board.register(status_register(n)), 0);
        relay.on(n).unwrap();
        assert_ne!(board.register(status_register(n)), 0);
    }
    assert_eq!(board.relays(), [true; 4]);
}

#[test]
fn test_on_when_already_on_writes_nothing() {
    let (board, mut relay) = setup();
    board.set_relay(2, true);
    relay.on(2).unwrap();
    assert!(board.commands().is_empty());
    // the status read still happened
    assert_eq!(board.transactions(), 1);
    assert!(board.relay(2));
}

#[test]
fn test_off_when_already_off_writes_nothing() {
    let (board, mut relay) = setup();
    relay.off(3).unwrap();
    assert!(board.commands().is_empty());
    assert!(!board.relay(3));
}

#[test]
fn test_on_toggles_only_its_relay() {
    let (board, mut relay) = setup();
    relay.on(3).unwrap();
    assert_eq!(board.commands(), vec![vec![toggle_register(3)]]);
    assert_eq!(board.relays(), [false, false, true, false]);
}

#[test]
fn test_out_of_range_relays_touch_nothing() {
    let (board, mut relay) = setup();
    for n in [0u8, 5, u8::MAX] {
        relay.on(n).unwrap();
        relay.off(n).unwrap();
        relay.toggle(n).unwrap();
        assert!(!relay.get_relay_state(n).unwrap());
    }
    assert_eq!(board.transactions(), 0);
}

#[test]
fn test_toggle_is_unconditional() {
    let (board, mut relay) = setup();
    relay.toggle(1).unwrap();
    relay.toggle(1).unwrap();
    relay.toggle(4).unwrap();
    assert_eq!(board.commands(), vec![vec![0x01], vec![0x01], vec![0x04]]);
    assert_eq!(board.relays(), [false, false, false, true]);
}

#[test]
fn test_all_commands_single_write() {
    let (board, mut relay) = setup();

    relay.all_on().unwrap();
    assert_eq!(board.commands(), vec![vec![ALL_ON]]);
    assert_eq!(board.relays(), [true; 4]);

    board.clear_frames();
    relay.all_toggle().unwrap();
    assert_eq!(board.commands(), vec![vec![ALL_TOGGLE]]);
    assert_eq!(board.relays(), [false; 4]);

    board.clear_frames();
    board.set_relay(1, true);
    relay.all_off().unwrap();
    assert_eq!(board.commands(), vec![vec![ALL_OFF]]);
    assert_eq!(board.transactions(), 1);
    assert_eq!(board.relays(), [false; 4]);
}

#[test]
fn test_connected() {
    let (board, mut relay) = setup();
    assert!(relay.connected());

    board.fail_next(1);
    assert!(!relay.connected());

    let mut absent = RelayController::open(board.clone(), 0x30, false);
    assert!(!absent.connected());
}

#[test]
fn test_pwm_round_trip() {
    let (board, mut relay) = setup();
    for v in [0u8, 60, 120] {
        relay.set_pwm(2, v).unwrap();
        assert_eq!(relay.get_pwm(2).unwrap(), v);
    }
    assert_eq!(board.register(0x12), 120);
}

#[test]
fn test_pwm_register_offset() {
    let (board, mut relay) = setup();
    relay.set_pwm(1, 30).unwrap();
    assert_eq!(board.commands(), vec![vec![0x11, 30]]);
}

#[test]
fn test_pwm_duty_above_max_rejected() {
    let (board, mut relay) = setup();
    let err = relay.set_pwm(1, 121).unwrap_err();
    assert!(matches!(err, RelayError::InvalidPwm(121)));
    assert_eq!(board.transactions(), 0);
}

#[test]
fn test_get_relay_state_reads_shifted_register() {
    let (board, mut relay) = setup();
    board.set_relay(2, true);
    // relay 1 reads 0x06, the status of relay 2
    assert!(relay.get_relay_state(1).unwrap());
    assert!(!relay.get_relay_state(2).unwrap());
    // relay 4 reads 0x09, past the status block
    board.set_relay(4, true);
    assert!(!relay.get_relay_state(4).unwrap());
    assert_eq!(board.transactions(), 3);
}

#[test]
fn test_states_match_on_off_addressing() {
    let (board, mut relay) = setup();
    board.set_relay(2, true);
    board.set_relay(4, true);
    assert_eq!(relay.states().unwrap(), [false, true, false, true]);
}

#[test]
fn test_bus_error_propagates() {
    let (board, mut relay) = setup();
    board.fail_next(1);
    let err = relay.toggle(1).unwrap_err();
    assert!(matches!(err, RelayError::Bus(SimError::Injected)));
    assert!(err.is_nack());
    assert!(!board.relay(1));
}

#[test]
fn test_set_address_out_of_range() {
    let (board, mut relay) = setup();
    assert!(!relay.set_i2c_address(7));
    assert!(!relay.set_i2c_address(119));
    assert_eq!(board.transactions(), 0);
    assert_eq!(relay.address(), DEFAULT_ADDRESS);
}

#[test]
fn test_set_address_bounds_succeed() {
    for new in [8u8, 118] {
        let board = SimBoard::new(0x20);
        let mut relay = RelayController::open(board.clone(), 0x20, false).with_settle_delay(Duration::ZERO);
        assert!(relay.set_i2c_address(new));
        // address command, then the empty write at the new address
        assert_eq!(board.commands(), vec![vec![CHANGE_ADDRESS, new], vec![]]);
        assert_eq!(relay.address(), new);
        assert!(relay.connected());
    }
}

#[test]
fn test_set_address_command_nack() {
    let (board, mut relay) = setup();
    board.fail_next(1);
    assert!(!relay.set_i2c_address(0x30));
    assert_eq!(relay.address(), DEFAULT_ADDRESS);
    assert_eq!(board.address(), DEFAULT_ADDRESS);
}

#[test]
fn test_set_address_rebind_failure_keeps_old_binding() {
    let (board, mut relay) = setup();
    board.lock_address(true);
    assert!(!relay.set_i2c_address(0x30));
    assert_eq!(board.commands(), vec![vec![CHANGE_ADDRESS, 0x30]]);
    assert_eq!(relay.address(), DEFAULT_ADDRESS);
    assert!(relay.connected());
}

#[test]
fn test_set_address_falls_back_to_read_without_empty_writes() {
    let board = SimBoard::default();
    let log = TransactionLog::shared(16);
    let mut relay = RelayController::open(NoEmptyWrite(board.clone()), DEFAULT_ADDRESS, false)
        .with_settle_delay(Duration::ZERO)
        .with_log(log.clone());

    assert!(relay.set_i2c_address(0x30));
    assert_eq!(relay.address(), 0x30);
    assert!(relay.connected());
    assert_eq!(
        log.lock().to_text(false),
        "0x08 TX: C7 30\n0x30 TX: NACK\n0x30 RX: 00\n0x30 TX: 05\n0x30 RX: 00\n"
    );
}

#[test]
fn test_set_address_rebind_failure_logs_both_attempts() {
    let (board, relay) = setup();
    let log = TransactionLog::shared(16);
    let mut relay = relay.with_log(log.clone());
    board.lock_address(true);

    assert!(!relay.set_i2c_address(0x30));
    assert_eq!(
        log.lock().to_text(false),
        "0x08 TX: C7 30\n0x30 TX: NACK\n0x30 RX: NACK\n"
    );
}

#[test]
fn test_stale_binding_after_address_change() {
    let (board, mut relay) = setup();
    let mut other = RelayController::open(board.clone(), DEFAULT_ADDRESS, false);
    assert!(relay.set_i2c_address(0x30));
    assert_eq!(board.address(), 0x30);
    assert!(!other.connected());
    assert!(matches!(other.on(1), Err(RelayError::Bus(SimError::AddressNack))));
}

#[test]
fn test_transactions_logged() {
    let board = SimBoard::default();
    let log = TransactionLog::shared(16);
    let mut relay = RelayController::open(board.clone(), DEFAULT_ADDRESS, false).with_log(log.clone());
    relay.on(1).unwrap();
    relay.set_pwm(1, 0x3C).unwrap();
    assert_eq!(
        log.lock().to_text(false),
        "0x08 TX: 05\n0x08 RX: 00\n0x08 TX: 01\n0x08 TX: 11 3C\n"
    );
}
