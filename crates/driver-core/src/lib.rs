//! Host-side driver for the REX-7 pattern coprocessor.
//!
//! The REX-7 is a hardware regex-matching coprocessor attached over a
//! byte-oriented serial link. This crate implements the host side of its
//! wire protocol: a pure framing codec, a timeout-bound transport
//! abstraction, and the session state machine that loads compiled programs
//! and drives executions. An in-process device simulator supports
//! development and testing without hardware.

/// Pure wire codec: framing constants, length prefixes, result codes.
pub mod framing;
pub use framing::{
    decode_ascii_uint, encode_length_prefix, hex_dump, ResultCode, CMD_ENTER_TEXT,
    CMD_LOAD_PROGRAM, EXIT_TEXT, TERMINATOR,
};

/// Protocol failure taxonomy.
pub mod error;
pub use error::ProtocolError;

/// Byte transport abstraction and the serial implementation.
pub mod transport;
pub use transport::{
    available_ports, SerialConfig, SerialTransport, Transport, TransportError, DEFAULT_BAUD_RATE,
    DEFAULT_READ_TIMEOUT,
};

/// Compiled program container and listing parser.
pub mod program;
pub use program::{Program, ProgramError};

/// Protocol state machine and execution outcomes.
pub mod session;
pub use session::{DeviceConfig, DeviceSession, ExecutionOutcome, SessionState, DEFAULT_CLOCK_HZ};

/// Device-side protocol simulator for hardware-free testing.
pub mod sim;
pub use sim::{SimFault, SimulatedDevice};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
