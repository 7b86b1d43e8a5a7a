//! Styled message formatting.
//!
//! The `format_*` functions build the text and the `display_*` functions
//! print it to stderr, keeping stdout for the version itself.

use console::style;

use crate::concern::Concern;

/// Format an error line with a red prefix.
pub fn format_error(message: &str) -> String {
    format!("{} {}", style("ERROR:").red().bold(), message)
}

/// Format a warning line with a yellow prefix.
pub fn format_warning(message: &str) -> String {
    format!("{} {}", style("⚠ WARNING:").yellow(), message)
}

/// Format an error and its chain of causes, one per line.
pub fn format_error_chain(error: &anyhow::Error) -> String {
    let mut out = format_error(&error.to_string());
    for cause in error.chain().skip(1) {
        out.push_str(&format!("\n  {} {}", style("caused by:").dim(), cause));
    }
    out
}

pub fn display_error(message: &str) {
    eprintln!("{}", format_error(message));
}

pub fn display_error_chain(error: &anyhow::Error) {
    eprintln!("{}", format_error_chain(error));
}

pub fn display_warning(message: &str) {
    eprintln!("{}", format_warning(message));
}

/// Print a concern about the determined version.
pub fn display_concern(concern: &Concern) {
    display_warning(&concern.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use console::strip_ansi_codes;

    #[test]
    fn test_format_error() {
        assert_eq!(strip_ansi_codes(&format_error("boom")), "ERROR: boom");
    }

    #[test]
    fn test_format_warning() {
        let text = format_warning(&Concern::ShallowRepository.to_string());
        let plain = strip_ansi_codes(&text);
        assert!(
            plain.contains("shallow repository"),
            "Warning should mention the shallow repository, got: {}",
            plain
        );
    }

    #[test]
    fn test_format_error_chain() {
        let error = anyhow::anyhow!("root cause").context("outer failure");
        let plain = strip_ansi_codes(&format_error_chain(&error)).to_string();
        assert_eq!(plain, "ERROR: outer failure\n  caused by: root cause");
    }
}
