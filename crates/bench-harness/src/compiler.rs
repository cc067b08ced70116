//! External pattern compiler collaborator.
//!
//! The compiler turns a textual pattern into REX-7 bytecode. It is an
//! external tool: the harness invokes it as a subprocess and only parses its
//! textual word listing. The contract is narrow so tests can substitute an
//! in-process stub.

use std::path::PathBuf;
use std::process::Command;

use driver_core::{Program, ProgramError};
use thiserror::Error;

/// Options forwarded to the pattern compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Enables the compiler's optimization pass.
    pub optimize: bool,
    /// Requires matches to start at the beginning of the input.
    pub no_prefix: bool,
    /// Requires matches to end at the end of the input.
    pub no_postfix: bool,
    /// Pattern syntax frontend understood by the compiler.
    pub frontend: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            no_prefix: false,
            no_postfix: false,
            frontend: "pcre".to_owned(),
        }
    }
}

/// Failures invoking the external compiler.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The compiler process could not be started.
    #[error("failed to run compiler {command}: {source}")]
    Spawn {
        /// Executable that was invoked.
        command: String,
        /// Underlying process error.
        #[source]
        source: std::io::Error,
    },
    /// The compiler exited unsuccessfully.
    #[error("compiler rejected pattern {pattern:?}: {stderr}")]
    Failed {
        /// Pattern that was being compiled.
        pattern: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },
    /// The compiler's word listing did not parse.
    #[error(transparent)]
    Listing(#[from] ProgramError),
}

/// Capability of turning a textual pattern into a device program.
pub trait PatternCompiler {
    /// Compiles `pattern` into device bytecode.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] when the compiler cannot be run, rejects the
    /// pattern, or emits an unparseable listing.
    fn compile(&self, pattern: &str, options: &CompileOptions) -> Result<Program, CompileError>;
}

/// Compiler invoked as an external executable.
///
/// The executable receives the frontend and anchoring flags plus the pattern
/// as its final argument, and prints one 16-bit word in hexadecimal per line
/// on stdout.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    executable: PathBuf,
}

impl CommandCompiler {
    /// Creates a compiler invoking `executable`.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl PatternCompiler for CommandCompiler {
    fn compile(&self, pattern: &str, options: &CompileOptions) -> Result<Program, CompileError> {
        let mut command = Command::new(&self.executable);
        command.arg("--frontend").arg(&options.frontend);
        if !options.optimize {
            command.arg("--no-optimize");
        }
        if options.no_prefix {
            command.arg("--no-prefix");
        }
        if options.no_postfix {
            command.arg("--no-postfix");
        }
        command.arg(pattern);

        let output = command.output().map_err(|source| CompileError::Spawn {
            command: self.executable.display().to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(CompileError::Failed {
                pattern: pattern.to_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(Program::from_hex_listing(&listing)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandCompiler, CompileError, CompileOptions, PatternCompiler};

    #[test]
    fn default_options_match_the_reference_toolchain() {
        let options = CompileOptions::default();
        assert!(options.optimize);
        assert!(!options.no_prefix);
        assert!(!options.no_postfix);
        assert_eq!(options.frontend, "pcre");
    }

    #[test]
    fn missing_executable_reports_spawn_failure() {
        let compiler = CommandCompiler::new("/nonexistent/rex7-compile");
        let err = compiler
            .compile("a+", &CompileOptions::default())
            .expect_err("no such executable");
        assert!(matches!(err, CompileError::Spawn { .. }));
    }
}
