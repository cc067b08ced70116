//! Golden-model oracle collaborator.
//!
//! The golden model is an independent, trusted matcher used only to check
//! device results; it plays no part in the wire protocol. The shipped
//! implementation evaluates patterns with the `regex` crate's byte-oriented
//! engine, since device inputs are arbitrary byte sequences.

use regex::bytes::Regex;
use thiserror::Error;

use crate::compiler::CompileOptions;

/// Failures evaluating the golden model.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The pattern is not valid for the reference engine.
    #[error("golden model rejected pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Capability of deciding whether a pattern matches an input, independently
/// of the device.
pub trait GoldenModel {
    /// Evaluates `pattern` against `input`.
    ///
    /// Honors the anchoring options: `no_prefix` requires the match to start
    /// at the beginning of the input, `no_postfix` to end at its end.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the pattern is rejected.
    fn evaluate(
        &self,
        pattern: &str,
        input: &[u8],
        options: &CompileOptions,
    ) -> Result<bool, OracleError>;
}

/// Golden model backed by the `regex` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexGoldenModel;

impl GoldenModel for RegexGoldenModel {
    fn evaluate(
        &self,
        pattern: &str,
        input: &[u8],
        options: &CompileOptions,
    ) -> Result<bool, OracleError> {
        let mut effective = String::with_capacity(pattern.len() + 6);
        if options.no_prefix {
            effective.push('^');
        }
        effective.push_str("(?:");
        effective.push_str(pattern);
        effective.push(')');
        if options.no_postfix {
            effective.push('$');
        }
        let regex = Regex::new(&effective)?;
        Ok(regex.is_match(input))
    }
}
