//! Protocol failure taxonomy for the REX-7 wire exchanges.
//!
//! Every variant carries the offending state or the expected-versus-actual
//! bytes, so callers can pattern-match on the failure kind instead of string
//! matching messages. None of these failures is retried automatically.
//!
//! Timeouts are deliberately not a distinct kind: a timed-out read yields
//! zero bytes and fails the same equality checks a wrong answer would. Only
//! hard I/O failures surface as [`ProtocolError::Transport`].

use thiserror::Error;

use crate::framing::hex_dump;
use crate::session::SessionState;
use crate::transport::TransportError;

/// Protocol violations raised by session operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The device did not echo a command byte back.
    #[error("command 0x{expected:02x} not acknowledged ({})", byte_or_timeout(.actual))]
    CommandNotAcknowledged {
        /// Command byte that was written.
        expected: u8,
        /// Byte read back, if one arrived within the timeout.
        actual: Option<u8>,
    },
    /// The device did not echo a length prefix back exactly.
    #[error("length prefix {} not acknowledged (echo {})", hex_dump(.expected), hex_dump(.actual))]
    LengthNotAcknowledged {
        /// Digit bytes that were written.
        expected: Vec<u8>,
        /// Echo bytes read back before the delimiter or timeout.
        actual: Vec<u8>,
    },
    /// The device did not acknowledge the end of a program load.
    #[error("program load not acknowledged ({})", byte_or_timeout(.actual))]
    ProgramLoadFailed {
        /// Byte read where the terminator was expected.
        actual: Option<u8>,
    },
    /// An operation was invoked from a protocol state it is not valid in.
    #[error("{operation} is not valid in {state}")]
    InvalidStateTransition {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the session was in, unchanged by the failure.
        state: SessionState,
    },
    /// An input was submitted before any program load succeeded.
    #[error("no program loaded")]
    ProgramNotLoaded,
    /// The device did not acknowledge a submitted input.
    #[error("input submission not acknowledged ({})", byte_or_timeout(.actual))]
    InputSubmissionFailed {
        /// Byte read where the terminator was expected.
        actual: Option<u8>,
    },
    /// The byte read where a result code was expected is not a known code.
    #[error("invalid result code ({})", byte_or_timeout(.actual))]
    InvalidResultCode {
        /// Byte read, if one arrived within the timeout.
        actual: Option<u8>,
    },
    /// The text-mode exit handshake did not complete.
    #[error("text mode exit failed (echo {}, {})", hex_dump(.echo), byte_or_timeout(.trailer))]
    TextModeExitFailed {
        /// Echo bytes read before the delimiter or timeout.
        echo: Vec<u8>,
        /// Trailing byte read where the terminator was expected.
        trailer: Option<u8>,
    },
    /// An ASCII decimal field contained something other than digits.
    #[error("malformed decimal field ({})", hex_dump(.bytes))]
    MalformedLength {
        /// Bytes of the rejected field.
        bytes: Vec<u8>,
    },
    /// The byte stream itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn byte_or_timeout(byte: &Option<u8>) -> String {
    byte.map_or_else(
        || "no response within timeout".to_owned(),
        |b| format!("got 0x{b:02x}"),
    )
}
