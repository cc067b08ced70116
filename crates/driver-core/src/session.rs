//! Protocol state machine for one REX-7 device connection.
//!
//! A session owns its transport exclusively and moves through three states:
//! command mode (power-on state, single-byte commands), text mode (inputs
//! accepted for matching), and execution mode (a match is running). Loading
//! a program does not change state; entering text mode, submitting an input,
//! reading a result, and exiting text mode each move the machine one step.
//!
//! The protocol is strict call/response: every write is verified against the
//! device's echo, every failure is surfaced immediately, and nothing is
//! retried. A session that fails mid-operation should be discarded and
//! reopened rather than reused.

use std::fmt;

use tracing::debug;

use crate::error::ProtocolError;
use crate::framing::{self, ResultCode, CMD_ENTER_TEXT, CMD_LOAD_PROGRAM, EXIT_TEXT, TERMINATOR};
use crate::program::Program;
use crate::transport::Transport;

/// REX-7 core clock frequency in the reference configuration, in hertz.
pub const DEFAULT_CLOCK_HZ: u32 = 24_000_000;

/// Protocol states of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SessionState {
    /// Single-byte commands are accepted. The device powers up here.
    CommandMode,
    /// Inputs can be submitted for matching.
    TextMode,
    /// An execution is running; the next read yields its result.
    ExecutionMode,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CommandMode => "command mode",
            Self::TextMode => "text mode",
            Self::ExecutionMode => "execution mode",
        };
        f.write_str(name)
    }
}

/// Per-device-model configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DeviceConfig {
    /// Core clock frequency in hertz, used to derive execution time from
    /// cycle counts.
    pub clock_hz: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
        }
    }
}

/// Outcome of one execution on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExecutionOutcome {
    /// Raw result code reported by the device.
    pub code: ResultCode,
    /// Core clock cycles consumed by the execution.
    pub elapsed_cycles: u64,
    /// Clock frequency the cycle count was measured against, in hertz.
    pub clock_hz: u32,
}

impl ExecutionOutcome {
    /// Returns `true` when the device reported a match.
    #[must_use]
    pub const fn matched(&self) -> bool {
        self.code.is_match()
    }

    /// Estimated execution time in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_cycles as f64 / f64::from(self.clock_hz)
    }

    /// Estimated execution time in microseconds.
    #[must_use]
    pub fn elapsed_micros(&self) -> f64 {
        self.elapsed_seconds() * 1e6
    }
}

/// Protocol state machine driving one device over an owned byte transport.
///
/// Not reentrant: a second operation while one is pending is undefined, and
/// the caller must serialize access. Echo mismatches are fatal to the
/// current operation; whether to abort the run or skip the current pattern
/// is the caller's decision.
pub struct DeviceSession {
    transport: Box<dyn Transport>,
    state: SessionState,
    program_loaded: bool,
    clock_hz: u32,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("state", &self.state)
            .field("program_loaded", &self.program_loaded)
            .field("clock_hz", &self.clock_hz)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Creates a session over `transport`.
    ///
    /// The device is assumed to be in command mode, its power-on state.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, config: DeviceConfig) -> Self {
        Self {
            transport,
            state: SessionState::CommandMode,
            program_loaded: false,
            clock_hz: config.clock_hz,
        }
    }

    /// Current protocol state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` once a program load has completed.
    #[must_use]
    pub const fn program_loaded(&self) -> bool {
        self.program_loaded
    }

    /// Writes a command byte and verifies the device echoes it back.
    fn send_command(&mut self, command: u8) -> Result<(), ProtocolError> {
        self.transport.write_all(&[command])?;
        let actual = self.transport.read_byte()?;
        if actual != Some(command) {
            return Err(ProtocolError::CommandNotAcknowledged {
                expected: command,
                actual,
            });
        }
        Ok(())
    }

    /// Writes a length prefix and verifies the digit echo byte for byte.
    fn send_length_prefix(&mut self, payload_len: usize) -> Result<(), ProtocolError> {
        let encoded = framing::encode_length_prefix(payload_len);
        self.transport.write_all(&encoded)?;
        let expected = &encoded[..encoded.len() - 1];
        let actual = self.transport.read_until(TERMINATOR)?;
        if actual != expected {
            return Err(ProtocolError::LengthNotAcknowledged {
                expected: expected.to_vec(),
                actual,
            });
        }
        Ok(())
    }

    /// Loads a compiled program into device memory, overwriting any
    /// previously loaded one.
    ///
    /// Valid from any protocol state and does not change state. A failed
    /// load leaves the device holding neither program, so the session
    /// refuses input submissions until a load succeeds again.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::CommandNotAcknowledged`] when the command echo is
    /// wrong or missing, [`ProtocolError::LengthNotAcknowledged`] when the
    /// length echo mismatches, [`ProtocolError::ProgramLoadFailed`] when the
    /// final terminator acknowledgment is wrong or missing, and
    /// [`ProtocolError::Transport`] on stream failure.
    pub fn load_program(&mut self, program: &Program) -> Result<(), ProtocolError> {
        debug!(bytes = program.len(), "loading program");
        self.program_loaded = false;
        self.send_command(CMD_LOAD_PROGRAM)?;
        self.send_length_prefix(program.len())?;
        self.transport.write_all(program.as_bytes())?;
        let actual = self.transport.read_byte()?;
        if actual != Some(TERMINATOR) {
            return Err(ProtocolError::ProgramLoadFailed { actual });
        }
        self.program_loaded = true;
        Ok(())
    }

    /// Switches the device from command mode to text mode.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidStateTransition`] outside command mode,
    /// [`ProtocolError::CommandNotAcknowledged`] when the echo fails, and
    /// [`ProtocolError::Transport`] on stream failure.
    pub fn enter_text_mode(&mut self) -> Result<(), ProtocolError> {
        if self.state != SessionState::CommandMode {
            return Err(ProtocolError::InvalidStateTransition {
                operation: "enter_text_mode",
                state: self.state,
            });
        }
        self.send_command(CMD_ENTER_TEXT)?;
        self.state = SessionState::TextMode;
        debug!("entered text mode");
        Ok(())
    }

    /// Submits one input for matching and starts the execution.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ProgramNotLoaded`] before the first successful load,
    /// [`ProtocolError::InvalidStateTransition`] outside text mode,
    /// [`ProtocolError::LengthNotAcknowledged`] when the length echo
    /// mismatches, [`ProtocolError::InputSubmissionFailed`] when the
    /// terminator acknowledgment is wrong or missing, and
    /// [`ProtocolError::Transport`] on stream failure.
    pub fn submit_input(&mut self, input: &[u8]) -> Result<(), ProtocolError> {
        if !self.program_loaded {
            return Err(ProtocolError::ProgramNotLoaded);
        }
        if self.state != SessionState::TextMode {
            return Err(ProtocolError::InvalidStateTransition {
                operation: "submit_input",
                state: self.state,
            });
        }
        self.send_length_prefix(input.len())?;
        self.transport.write_all(input)?;
        let actual = self.transport.read_byte()?;
        if actual != Some(TERMINATOR) {
            return Err(ProtocolError::InputSubmissionFailed { actual });
        }
        self.state = SessionState::ExecutionMode;
        debug!(bytes = input.len(), "input submitted");
        Ok(())
    }

    /// Blocks until the device reports the outcome of the running execution,
    /// then returns the session to text mode.
    ///
    /// Failures leave the state unchanged.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidResultCode`] when the result byte is unknown
    /// or missing, [`ProtocolError::MalformedLength`] when the cycle count
    /// field does not decode, and [`ProtocolError::Transport`] on stream
    /// failure.
    pub fn await_result(&mut self) -> Result<ExecutionOutcome, ProtocolError> {
        let actual = self.transport.read_byte()?;
        let code = actual
            .and_then(ResultCode::from_wire)
            .ok_or(ProtocolError::InvalidResultCode { actual })?;
        let digits = self.transport.read_until(TERMINATOR)?;
        let elapsed_cycles = framing::decode_ascii_uint(&digits)?;
        self.state = SessionState::TextMode;
        debug!(?code, elapsed_cycles, "execution finished");
        Ok(ExecutionOutcome {
            code,
            elapsed_cycles,
            clock_hz: self.clock_hz,
        })
    }

    /// Returns the device from text mode to command mode.
    ///
    /// The request is the literal exit sequence written verbatim followed by
    /// the terminator; it is only valid from text mode, so it bypasses the
    /// single-byte command path. The device echoes the sequence delimited by
    /// the terminator, then sends one more terminator to confirm the mode
    /// change; both reads are verified.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidStateTransition`] outside text mode,
    /// [`ProtocolError::TextModeExitFailed`] when either read mismatches,
    /// and [`ProtocolError::Transport`] on stream failure.
    pub fn exit_text_mode(&mut self) -> Result<(), ProtocolError> {
        if self.state != SessionState::TextMode {
            return Err(ProtocolError::InvalidStateTransition {
                operation: "exit_text_mode",
                state: self.state,
            });
        }
        let mut request = EXIT_TEXT.to_vec();
        request.push(TERMINATOR);
        self.transport.write_all(&request)?;
        let echo = self.transport.read_until(TERMINATOR)?;
        let trailer = self.transport.read_byte()?;
        if echo.as_slice() != EXIT_TEXT || trailer != Some(TERMINATOR) {
            return Err(ProtocolError::TextModeExitFailed { echo, trailer });
        }
        self.state = SessionState::CommandMode;
        debug!("exited text mode");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DeviceConfig, ExecutionOutcome, SessionState, DEFAULT_CLOCK_HZ};
    use crate::framing::ResultCode;

    #[test]
    fn default_config_uses_reference_clock() {
        assert_eq!(DeviceConfig::default().clock_hz, DEFAULT_CLOCK_HZ);
        assert_eq!(DEFAULT_CLOCK_HZ, 24_000_000);
    }

    #[test]
    fn state_display_names_are_stable() {
        assert_eq!(SessionState::CommandMode.to_string(), "command mode");
        assert_eq!(SessionState::TextMode.to_string(), "text mode");
        assert_eq!(SessionState::ExecutionMode.to_string(), "execution mode");
    }

    #[test]
    fn one_clock_second_of_cycles_converts_both_ways() {
        let outcome = ExecutionOutcome {
            code: ResultCode::MatchFound,
            elapsed_cycles: 24_000_000,
            clock_hz: 24_000_000,
        };
        assert!((outcome.elapsed_seconds() - 1.0).abs() < f64::EPSILON);
        assert!((outcome.elapsed_micros() - 1_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn conversion_scales_with_the_configured_clock() {
        let outcome = ExecutionOutcome {
            code: ResultCode::MatchNotFound,
            elapsed_cycles: 120,
            clock_hz: 12_000_000,
        };
        assert!((outcome.elapsed_seconds() - 1e-5).abs() < 1e-12);
        assert!((outcome.elapsed_micros() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn only_match_found_reports_matched() {
        for (code, expected) in [
            (ResultCode::MatchFound, true),
            (ResultCode::MatchNotFound, false),
            (ResultCode::DeviceError, false),
        ] {
            let outcome = ExecutionOutcome {
                code,
                elapsed_cycles: 1,
                clock_hz: DEFAULT_CLOCK_HZ,
            };
            assert_eq!(outcome.matched(), expected);
        }
    }
}
