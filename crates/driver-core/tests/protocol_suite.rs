//! Session state machine integration coverage over the simulated device.

use driver_core::{
    DeviceConfig, DeviceSession, Program, ProtocolError, ResultCode, SessionState, SimFault,
    SimulatedDevice, Transport, TransportError,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use serialport as _;
use thiserror as _;
use tracing as _;

fn session_over(device: SimulatedDevice) -> DeviceSession {
    DeviceSession::new(Box::new(device), DeviceConfig::default())
}

fn sample_program() -> Program {
    Program::from_words(&[0x0049, 0xFF23]).expect("non-empty program")
}

#[test]
fn full_session_cycle_round_trips() {
    let mut device = SimulatedDevice::new();
    device.push_outcome(ResultCode::MatchFound, 120);
    device.push_outcome(ResultCode::MatchNotFound, 45);
    let mut session = session_over(device);
    assert_eq!(session.state(), SessionState::CommandMode);
    assert!(!session.program_loaded());

    session.load_program(&sample_program()).expect("load");
    assert!(session.program_loaded());
    assert_eq!(session.state(), SessionState::CommandMode);

    session.enter_text_mode().expect("enter text mode");
    assert_eq!(session.state(), SessionState::TextMode);

    session.submit_input(b"aaab").expect("submit");
    assert_eq!(session.state(), SessionState::ExecutionMode);
    let first = session.await_result().expect("result");
    assert!(first.matched());
    assert_eq!(first.elapsed_cycles, 120);
    assert_eq!(session.state(), SessionState::TextMode);

    session.submit_input(b"fdkllwk").expect("submit");
    let second = session.await_result().expect("result");
    assert!(!second.matched());
    assert_eq!(second.elapsed_cycles, 45);

    session.exit_text_mode().expect("exit text mode");
    assert_eq!(session.state(), SessionState::CommandMode);

    // The session cycle is repeatable: text mode can be re-entered.
    session.enter_text_mode().expect("re-enter text mode");
    assert_eq!(session.state(), SessionState::TextMode);
}

#[test]
fn loading_again_overwrites_the_previous_program() {
    let mut session = session_over(SimulatedDevice::new());
    session.load_program(&sample_program()).expect("first load");
    let replacement = Program::from_words(&[0x0001]).expect("non-empty program");
    session.load_program(&replacement).expect("second load");
    assert!(session.program_loaded());
}

#[test]
fn enter_text_mode_requires_command_mode() {
    let mut session = session_over(SimulatedDevice::new());
    session.enter_text_mode().expect("enter text mode");
    let err = session.enter_text_mode().expect_err("double enter");
    assert!(matches!(
        err,
        ProtocolError::InvalidStateTransition {
            operation: "enter_text_mode",
            state: SessionState::TextMode,
        }
    ));
    assert_eq!(session.state(), SessionState::TextMode);
}

#[test]
fn submit_input_requires_a_loaded_program() {
    let mut session = session_over(SimulatedDevice::new());
    session.enter_text_mode().expect("enter text mode");
    let err = session.submit_input(b"abc").expect_err("no program");
    assert!(matches!(err, ProtocolError::ProgramNotLoaded));
    assert_eq!(session.state(), SessionState::TextMode);
}

#[test]
fn submit_input_requires_text_mode() {
    let mut session = session_over(SimulatedDevice::new());
    session.load_program(&sample_program()).expect("load");
    let err = session.submit_input(b"abc").expect_err("wrong state");
    assert!(matches!(
        err,
        ProtocolError::InvalidStateTransition {
            operation: "submit_input",
            state: SessionState::CommandMode,
        }
    ));
    assert_eq!(session.state(), SessionState::CommandMode);
}

#[test]
fn exit_text_mode_requires_text_mode() {
    let mut session = session_over(SimulatedDevice::new());
    let err = session.exit_text_mode().expect_err("wrong state");
    assert!(matches!(
        err,
        ProtocolError::InvalidStateTransition {
            operation: "exit_text_mode",
            state: SessionState::CommandMode,
        }
    ));
    assert_eq!(session.state(), SessionState::CommandMode);
}

#[test]
fn missing_command_echo_fails_the_load() {
    let mut device = SimulatedDevice::new();
    device.inject_fault(SimFault::DropCommandEcho);
    let mut session = session_over(device);
    let err = session.load_program(&sample_program()).expect_err("no echo");
    assert!(matches!(
        err,
        ProtocolError::CommandNotAcknowledged {
            expected: 0x00,
            actual: None,
        }
    ));
    assert!(!session.program_loaded());
}

#[test]
fn corrupted_length_echo_fails_the_load() {
    let mut device = SimulatedDevice::new();
    device.inject_fault(SimFault::CorruptLengthEcho);
    let mut session = session_over(device);
    let err = session
        .load_program(&sample_program())
        .expect_err("bad length echo");
    match err {
        ProtocolError::LengthNotAcknowledged { expected, actual } => {
            assert_eq!(expected, b"4");
            assert_eq!(actual, b"");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_load_acknowledgment_fails_the_load() {
    let mut device = SimulatedDevice::new();
    device.inject_fault(SimFault::DropLoadAck);
    let mut session = session_over(device);
    let err = session.load_program(&sample_program()).expect_err("no ack");
    assert!(matches!(
        err,
        ProtocolError::ProgramLoadFailed { actual: None }
    ));
    assert!(!session.program_loaded());
}

#[test]
fn failed_reload_clears_the_loaded_flag() {
    // First load exchange completes; the reload never gets its final
    // acknowledgment. A partial reload leaves the device holding neither
    // program, so the session must refuse inputs again.
    let transport = CannedTransport::new(b"\x004\xFF\xFF\x004\xFF");
    let mut session = DeviceSession::new(Box::new(transport), DeviceConfig::default());
    session.load_program(&sample_program()).expect("first load");
    assert!(session.program_loaded());

    let err = session
        .load_program(&sample_program())
        .expect_err("unacknowledged reload");
    assert!(matches!(
        err,
        ProtocolError::ProgramLoadFailed { actual: None }
    ));
    assert!(!session.program_loaded());
}

#[test]
fn missing_input_acknowledgment_fails_the_submission() {
    let mut device = SimulatedDevice::new();
    device.inject_fault(SimFault::DropInputAck);
    let mut session = session_over(device);
    session.load_program(&sample_program()).expect("load");
    session.enter_text_mode().expect("enter text mode");
    let err = session.submit_input(b"abc").expect_err("no ack");
    assert!(matches!(
        err,
        ProtocolError::InputSubmissionFailed { actual: None }
    ));
    assert_eq!(session.state(), SessionState::TextMode);
}

#[test]
fn unknown_result_byte_is_rejected_and_state_unchanged() {
    let mut device = SimulatedDevice::new();
    device.push_outcome(ResultCode::MatchFound, 10);
    device.inject_fault(SimFault::InvalidResult);
    let mut session = session_over(device);
    session.load_program(&sample_program()).expect("load");
    session.enter_text_mode().expect("enter text mode");
    session.submit_input(b"abc").expect("submit");
    let err = session.await_result().expect_err("bad result byte");
    assert!(matches!(
        err,
        ProtocolError::InvalidResultCode {
            actual: Some(b'9'),
        }
    ));
    assert_eq!(session.state(), SessionState::ExecutionMode);
}

#[test]
fn corrupted_exit_echo_fails_the_exit() {
    let mut device = SimulatedDevice::new();
    device.inject_fault(SimFault::CorruptExitEcho);
    let mut session = session_over(device);
    session.enter_text_mode().expect("enter text mode");
    let err = session.exit_text_mode().expect_err("bad exit echo");
    match err {
        ProtocolError::TextModeExitFailed { echo, trailer } => {
            assert_eq!(echo, b"-9");
            assert_eq!(trailer, Some(0xFF));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.state(), SessionState::TextMode);
}

#[test]
fn device_error_outcome_is_a_successful_exchange() {
    // An exhausted script makes the simulator report a device error.
    let mut session = session_over(SimulatedDevice::new());
    session.load_program(&sample_program()).expect("load");
    session.enter_text_mode().expect("enter text mode");
    session.submit_input(b"abc").expect("submit");
    let outcome = session.await_result().expect("result");
    assert_eq!(outcome.code, ResultCode::DeviceError);
    assert_eq!(outcome.elapsed_cycles, 0);
    assert!(!outcome.matched());
    assert_eq!(session.state(), SessionState::TextMode);
}

struct CannedTransport {
    rx: Vec<u8>,
    cursor: usize,
}

impl CannedTransport {
    fn new(rx: &[u8]) -> Self {
        Self {
            rx: rx.to_vec(),
            cursor: 0,
        }
    }
}

impl Transport for CannedTransport {
    fn write_all(&mut self, _bytes: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let byte = self.rx.get(self.cursor).copied();
        if byte.is_some() {
            self.cursor += 1;
        }
        Ok(byte)
    }
}

#[test]
fn malformed_cycle_count_is_rejected() {
    // A device answering a valid result code but a garbage cycle field.
    let transport = CannedTransport::new(b"2x1\xFF");
    let mut session = DeviceSession::new(Box::new(transport), DeviceConfig::default());
    let err = session.await_result().expect_err("bad cycle digits");
    assert!(matches!(err, ProtocolError::MalformedLength { .. }));
}

#[test]
fn timed_out_result_read_is_rejected() {
    let transport = CannedTransport::new(b"");
    let mut session = DeviceSession::new(Box::new(transport), DeviceConfig::default());
    let err = session.await_result().expect_err("no result byte");
    assert!(matches!(
        err,
        ProtocolError::InvalidResultCode { actual: None }
    ));
}

#[test]
fn simulator_records_programs_and_inputs_in_order() {
    // Drive the device side directly through a full session cycle and check
    // what it retained for assertions.
    let mut device = SimulatedDevice::new();
    device.push_outcome(ResultCode::MatchFound, 120);

    device.write_all(&[0x00]).expect("command");
    assert_eq!(device.read_byte().expect("read"), Some(0x00));
    device.write_all(b"4\xFF").expect("length");
    assert_eq!(device.read_until(0xFF).expect("read"), b"4");
    device.write_all(&[0x00, 0x49, 0xFF, 0x23]).expect("body");
    assert_eq!(device.read_byte().expect("read"), Some(0xFF));

    device.write_all(&[0x01]).expect("enter text");
    assert_eq!(device.read_byte().expect("read"), Some(0x01));
    device.write_all(b"4\xFF").expect("input length");
    assert_eq!(device.read_until(0xFF).expect("read"), b"4");
    device.write_all(b"aaab").expect("input body");
    assert_eq!(device.read_byte().expect("read"), Some(0xFF));
    assert_eq!(device.read_byte().expect("read"), Some(b'2'));
    assert_eq!(device.read_until(0xFF).expect("read"), b"120");

    device.write_all(b"-2\xFF").expect("exit");
    assert_eq!(device.read_until(0xFF).expect("read"), b"-2");
    assert_eq!(device.read_byte().expect("read"), Some(0xFF));

    assert_eq!(device.loaded_programs(), &[vec![0x00, 0x49, 0xFF, 0x23]]);
    assert_eq!(device.submitted_inputs(), &[b"aaab".to_vec()]);
}
