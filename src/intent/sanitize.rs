//! Pre-execution argument validation for whitelisted commands
//!
//! Arbitrary execution bypasses this gate — there, explicit spoken
//! confirmation substitutes for argument validation.

use crate::config::{Config, FORBIDDEN_CHARS, MAX_ARGS_LEN};
use crate::{Error, Result};

/// Validates whitelisted commands and their arguments before execution
#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer;

impl Sanitizer {
    /// Create a sanitizer using the built-in whitelist and limits
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Check a command and its arguments
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` with a human-readable reason when the
    /// command is not whitelisted, arguments are passed to a no-argument
    /// command, the joined arguments are too long, or they contain a
    /// forbidden metacharacter
    pub fn check(&self, command: &str, args: &[String]) -> Result<()> {
        let Some(accepts_args) = Config::whitelist_entry(command) else {
            return Err(Error::Validation(format!(
                "command '{command}' not allowed"
            )));
        };

        if !accepts_args && !args.is_empty() {
            return Err(Error::Validation(format!(
                "command '{command}' does not accept arguments"
            )));
        }

        let joined = args.join(" ");
        if joined.len() > MAX_ARGS_LEN {
            return Err(Error::Validation("arguments too long".to_string()));
        }
        if joined.chars().any(|c| FORBIDDEN_CHARS.contains(c)) {
            return Err(Error::Validation(
                "illegal characters in arguments".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_accepts_clean_command() {
        let s = Sanitizer::new();
        assert!(s.check("ping", &args(&["-n", "1", "8.8.8.8"])).is_ok());
        assert!(s.check("lock", &[]).is_ok());
    }

    #[test]
    fn test_rejects_unknown_command() {
        let s = Sanitizer::new();
        assert!(s.check("rm", &args(&["-rf", "/"])).is_err());
    }

    #[test]
    fn test_rejects_args_for_no_arg_command() {
        let s = Sanitizer::new();
        assert!(s.check("lock", &args(&["now"])).is_err());
    }

    #[test]
    fn test_rejects_overlong_arguments() {
        let s = Sanitizer::new();
        let long = "a".repeat(MAX_ARGS_LEN + 1);
        assert!(s.check("ping", &args(&[&long])).is_err());
    }

    #[test]
    fn test_rejects_forbidden_metacharacters() {
        let s = Sanitizer::new();
        for bad in ["8.8.8.8;reboot", "a|b", "x&y", "z>w", "q<r", "$HOME", "`id`"] {
            assert!(s.check("ping", &args(&[bad])).is_err(), "should reject {bad}");
        }
    }
}
