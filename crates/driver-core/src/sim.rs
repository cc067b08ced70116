//! In-process simulation of the REX-7 device side of the wire protocol.
//!
//! The simulator consumes host writes through the same state machine the
//! device firmware runs (command dispatch, length echoes, program and input
//! consumption, the text-mode exit handshake) and queues its responses for
//! host reads. It implements [`Transport`], so a
//! [`DeviceSession`](crate::session::DeviceSession) can own one directly and
//! host software can be developed and tested without hardware.
//!
//! Execution outcomes are scripted: each [`SimulatedDevice::push_outcome`]
//! call queues the result reported for the next submitted input. An
//! exhausted script reports a device error with zero elapsed cycles.

use std::collections::VecDeque;

use crate::framing::{self, ResultCode, CMD_ENTER_TEXT, CMD_LOAD_PROGRAM, EXIT_TEXT, TERMINATOR};
use crate::transport::{Transport, TransportError};

/// One-shot protocol faults, one per host-visible failure path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimFault {
    /// Swallow the next command byte without echoing or acting on it.
    DropCommandEcho,
    /// Drop the last digit from the next length echo.
    CorruptLengthEcho,
    /// Swallow the terminator acknowledging the next program load.
    DropLoadAck,
    /// Swallow the terminator acknowledging the next input submission.
    DropInputAck,
    /// Answer the next result request with an unknown code byte.
    InvalidResult,
    /// Corrupt the echo of the text-mode exit sequence.
    CorruptExitEcho,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Command,
    ProgramLength,
    ProgramBody {
        remaining: usize,
    },
    Text,
    InputBody {
        remaining: usize,
    },
}

/// Device-side protocol peer backed by in-memory byte queues.
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    mode: Mode,
    pending: Vec<u8>,
    tx: VecDeque<u8>,
    script: VecDeque<(ResultCode, u64)>,
    programs: Vec<Vec<u8>>,
    inputs: Vec<Vec<u8>>,
    fault: Option<SimFault>,
}

impl SimulatedDevice {
    /// Creates a simulator in command mode with an empty outcome script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome reported for the next execution.
    pub fn push_outcome(&mut self, code: ResultCode, elapsed_cycles: u64) {
        self.script.push_back((code, elapsed_cycles));
    }

    /// Arms a one-shot protocol fault.
    ///
    /// The fault fires at the first exchange it applies to and disarms
    /// itself; at most one fault is armed at a time.
    pub fn inject_fault(&mut self, fault: SimFault) {
        self.fault = Some(fault);
    }

    /// Programs loaded so far, in load order.
    #[must_use]
    pub fn loaded_programs(&self) -> &[Vec<u8>] {
        &self.programs
    }

    /// Inputs submitted so far, in submission order.
    #[must_use]
    pub fn submitted_inputs(&self) -> &[Vec<u8>] {
        &self.inputs
    }

    fn take_fault(&mut self, fault: SimFault) -> bool {
        if self.fault == Some(fault) {
            self.fault = None;
            return true;
        }
        false
    }

    fn process_byte(&mut self, byte: u8) {
        match self.mode {
            Mode::Command => self.process_command(byte),
            Mode::ProgramLength => {
                if byte == TERMINATOR {
                    self.finish_program_length();
                } else {
                    self.pending.push(byte);
                }
            }
            Mode::ProgramBody { remaining } => {
                self.pending.push(byte);
                if remaining == 1 {
                    self.finish_program_body();
                } else {
                    self.mode = Mode::ProgramBody {
                        remaining: remaining - 1,
                    };
                }
            }
            Mode::Text => {
                if byte == TERMINATOR {
                    self.finish_text_field();
                } else {
                    self.pending.push(byte);
                }
            }
            Mode::InputBody { remaining } => {
                self.pending.push(byte);
                if remaining == 1 {
                    self.finish_input_body();
                } else {
                    self.mode = Mode::InputBody {
                        remaining: remaining - 1,
                    };
                }
            }
        }
    }

    fn process_command(&mut self, byte: u8) {
        match byte {
            CMD_LOAD_PROGRAM | CMD_ENTER_TEXT => {
                if self.take_fault(SimFault::DropCommandEcho) {
                    return;
                }
                self.tx.push_back(byte);
                self.pending.clear();
                self.mode = if byte == CMD_LOAD_PROGRAM {
                    Mode::ProgramLength
                } else {
                    Mode::Text
                };
            }
            // Unknown command bytes are silently dropped; the host times out.
            _ => {}
        }
    }

    fn echo_length_field(&mut self) {
        let mut echo = self.pending.clone();
        if self.take_fault(SimFault::CorruptLengthEcho) {
            echo.pop();
        }
        self.tx.extend(echo);
        self.tx.push_back(TERMINATOR);
    }

    fn parsed_length(&self) -> Option<usize> {
        framing::decode_ascii_uint(&self.pending)
            .ok()
            .and_then(|n| usize::try_from(n).ok())
    }

    fn finish_program_length(&mut self) {
        self.echo_length_field();
        let Some(length) = self.parsed_length() else {
            self.pending.clear();
            self.mode = Mode::Command;
            return;
        };
        self.pending.clear();
        if length == 0 {
            self.finish_program_body();
        } else {
            self.mode = Mode::ProgramBody { remaining: length };
        }
    }

    fn finish_program_body(&mut self) {
        self.programs.push(std::mem::take(&mut self.pending));
        if !self.take_fault(SimFault::DropLoadAck) {
            self.tx.push_back(TERMINATOR);
        }
        self.mode = Mode::Command;
    }

    fn finish_text_field(&mut self) {
        if self.pending.as_slice() == EXIT_TEXT {
            let echo: &[u8] = if self.take_fault(SimFault::CorruptExitEcho) {
                b"-9"
            } else {
                EXIT_TEXT
            };
            self.tx.extend(echo.iter().copied());
            self.tx.push_back(TERMINATOR);
            self.tx.push_back(TERMINATOR);
            self.pending.clear();
            self.mode = Mode::Command;
            return;
        }
        self.echo_length_field();
        let Some(length) = self.parsed_length() else {
            self.pending.clear();
            self.mode = Mode::Text;
            return;
        };
        self.pending.clear();
        if length == 0 {
            self.finish_input_body();
        } else {
            self.mode = Mode::InputBody { remaining: length };
        }
    }

    fn finish_input_body(&mut self) {
        self.inputs.push(std::mem::take(&mut self.pending));
        if self.take_fault(SimFault::DropInputAck) {
            // No acknowledgment, no execution; the host times out.
            self.mode = Mode::Text;
            return;
        }
        self.tx.push_back(TERMINATOR);
        self.execute();
        self.mode = Mode::Text;
    }

    fn execute(&mut self) {
        let (code, elapsed_cycles) = self
            .script
            .pop_front()
            .unwrap_or((ResultCode::DeviceError, 0));
        let code_byte = if self.take_fault(SimFault::InvalidResult) {
            b'9'
        } else {
            code.to_wire()
        };
        self.tx.push_back(code_byte);
        self.tx.extend(elapsed_cycles.to_string().into_bytes());
        self.tx.push_back(TERMINATOR);
    }
}

impl Transport for SimulatedDevice {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        for &byte in bytes {
            self.process_byte(byte);
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        Ok(self.tx.pop_front())
    }
}
