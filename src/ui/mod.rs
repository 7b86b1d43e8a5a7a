//! User interface module - terminal input and formatted output.
//!
//! - `formatter` - Styled warning and error lines
//! - This module - Reading input for commands that accept stdin

use std::io::{self, BufRead, IsTerminal};

use anyhow::{bail, Result};

pub mod formatter;

pub use formatter::{
    display_concern, display_error, display_error_chain, display_warning, format_error,
    format_error_chain, format_warning,
};

/// Read a version string from `reader`, skipping blank lines.
///
/// Used by `dunamai check` when no version is given on the command line,
/// so that `dunamai from git | dunamai check` works.
pub fn read_version(reader: impl BufRead) -> Result<String> {
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    bail!("No version provided on standard input")
}

/// Like [`read_version`], but refuses to wait on an interactive terminal.
pub fn read_piped_version(reader: impl BufRead, interactive: bool) -> Result<String> {
    if interactive {
        bail!("A version must be specified");
    }
    read_version(reader)
}

/// [`read_piped_version`] from the process's standard input
pub fn read_version_from_stdin() -> Result<String> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    read_piped_version(stdin.lock(), interactive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_version_skips_blank_lines() {
        let input = "\n  \n 1.2.3 \nignored\n";
        assert_eq!(read_version(input.as_bytes()).unwrap(), "1.2.3");
    }

    #[test]
    fn test_read_version_empty_input() {
        let err = read_version("".as_bytes()).unwrap_err();
        assert!(
            err.to_string().contains("No version"),
            "Error should explain that input was empty, got: {}",
            err
        );
    }

    #[test]
    fn test_terminal_input_requires_argument() {
        let err = read_piped_version("1.2.3\n".as_bytes(), true).unwrap_err();
        assert_eq!(err.to_string(), "A version must be specified");
        assert_eq!(read_piped_version("1.2.3\n".as_bytes(), false).unwrap(), "1.2.3");
    }
}
