//! Compiled program container and the textual listing parser.
//!
//! The external pattern compiler emits one 16-bit word in hexadecimal per
//! line; the listing ends at the first blank line. On the wire the program
//! is the words in big-endian byte order, and the protocol layer treats it
//! as opaque bytes.

use thiserror::Error;

/// Failures converting compiler output into a loadable program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    /// A listing line did not parse as a 16-bit hexadecimal word.
    #[error("listing line {line}: invalid program word {text:?}")]
    InvalidWord {
        /// 1-indexed line number in the listing.
        line: usize,
        /// Offending line text, trimmed.
        text: String,
    },
    /// The listing contained no words.
    #[error("program is empty")]
    Empty,
}

/// A device-executable program: 16-bit words in big-endian byte order.
///
/// A program is never empty; the invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    bytes: Vec<u8>,
}

impl Program {
    /// Parses the compiler's textual listing.
    ///
    /// One hexadecimal word per line; parsing stops at the first blank line
    /// and ignores anything after it.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::InvalidWord`] for a line that is not a
    /// 16-bit hexadecimal word, and [`ProgramError::Empty`] when no words
    /// precede the first blank line.
    pub fn from_hex_listing(listing: &str) -> Result<Self, ProgramError> {
        let mut bytes = Vec::new();
        for (index, line) in listing.lines().enumerate() {
            let text = line.trim();
            if text.is_empty() {
                break;
            }
            let word = u16::from_str_radix(text, 16).map_err(|_| ProgramError::InvalidWord {
                line: index + 1,
                text: text.to_owned(),
            })?;
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        if bytes.is_empty() {
            return Err(ProgramError::Empty);
        }
        Ok(Self { bytes })
    }

    /// Builds a program directly from 16-bit words.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::Empty`] when `words` is empty.
    pub fn from_words(words: &[u16]) -> Result<Self, ProgramError> {
        if words.is_empty() {
            return Err(ProgramError::Empty);
        }
        let mut bytes = Vec::with_capacity(words.len() * 2);
        for word in words {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        Ok(Self { bytes })
    }

    /// Raw wire bytes in transmission order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes on the wire.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; a program cannot be constructed empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of 16-bit words.
    #[must_use]
    pub const fn word_count(&self) -> usize {
        self.bytes.len() / 2
    }
}
