//! Pattern and input corpus loading.
//!
//! Patterns come one per line; blank lines and `#` comments are skipped.
//! Inputs come one per line as raw bytes, preserved verbatim (inputs need
//! not be valid UTF-8). A trailing newline does not produce a final empty
//! input, but interior blank lines do: the empty input is legitimate.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures loading corpus files.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file contained no usable entries.
    #[error("{path} contains no entries")]
    Empty {
        /// Path that was read.
        path: PathBuf,
    },
}

/// Loads the pattern set from `path`.
///
/// # Errors
///
/// Returns [`CorpusError::Io`] when the file cannot be read and
/// [`CorpusError::Empty`] when no patterns remain after filtering.
pub fn load_patterns(path: &Path) -> Result<Vec<String>, CorpusError> {
    let content = fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let patterns: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect();
    if patterns.is_empty() {
        return Err(CorpusError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(patterns)
}

/// Loads the input set from `path`.
///
/// # Errors
///
/// Returns [`CorpusError::Io`] when the file cannot be read and
/// [`CorpusError::Empty`] when the file holds no inputs.
pub fn load_inputs(path: &Path) -> Result<Vec<Vec<u8>>, CorpusError> {
    let content = fs::read(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut inputs: Vec<Vec<u8>> = content
        .split(|&byte| byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
        .collect();
    if inputs.last().is_some_and(Vec::is_empty) {
        inputs.pop();
    }
    if inputs.is_empty() {
        return Err(CorpusError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{load_inputs, load_patterns, CorpusError};

    #[test]
    fn patterns_skip_blanks_and_comments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("patterns.txt");
        fs::write(&path, "# benchmark set\na+(b|c)+\n\ng+h+\n").expect("write");

        let patterns = load_patterns(&path).expect("load");
        assert_eq!(patterns, ["a+(b|c)+", "g+h+"]);
    }

    #[test]
    fn all_comment_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("patterns.txt");
        fs::write(&path, "# nothing\n\n").expect("write");

        assert!(matches!(
            load_patterns(&path),
            Err(CorpusError::Empty { .. })
        ));
    }

    #[test]
    fn inputs_preserve_bytes_and_interior_blanks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("inputs.txt");
        fs::write(&path, b"aaab\n\nfdkllwk\n").expect("write");

        let inputs = load_inputs(&path).expect("load");
        assert_eq!(
            inputs,
            [b"aaab".to_vec(), Vec::new(), b"fdkllwk".to_vec()]
        );
    }

    #[test]
    fn carriage_returns_are_stripped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("inputs.txt");
        fs::write(&path, b"aaab\r\nxyz\r\n").expect("write");

        let inputs = load_inputs(&path).expect("load");
        assert_eq!(inputs, [b"aaab".to_vec(), b"xyz".to_vec()]);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.txt");
        let err = load_patterns(&path).expect_err("missing file");
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}
