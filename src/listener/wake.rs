//! Wake phrase detection

use regex::{Regex, RegexBuilder};

use crate::{Error, Result};

/// Tests recognized text against the configured wake phrases
///
/// The phrases are compiled once into a single case-insensitive
/// alternation; detection is a pure match test with no internal state.
pub struct WakeDetector {
    pattern: Regex,
}

impl WakeDetector {
    /// Compile a detector from wake phrase patterns
    ///
    /// # Errors
    ///
    /// Returns error if a phrase is not a valid regex fragment
    pub fn new(phrases: &[String]) -> Result<Self> {
        if phrases.is_empty() {
            return Err(Error::Config("no wake phrases configured".to_string()));
        }

        let alternation = format!("({})", phrases.join("|"));
        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("invalid wake phrase pattern: {e}")))?;

        tracing::debug!(phrases = ?phrases, "wake detector initialized");

        Ok(Self { pattern })
    }

    /// Check whether the text contains a wake phrase
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> WakeDetector {
        let phrases: Vec<String> = crate::config::DEFAULT_WAKE_PHRASES
            .iter()
            .map(ToString::to_string)
            .collect();
        WakeDetector::new(&phrases).unwrap()
    }

    #[test]
    fn test_wake_phrase_detected() {
        let wake = detector();
        assert!(wake.matches("hey dj what time is it"));
        assert!(wake.matches("ok dj"));
        assert!(wake.matches("yo dj play something"));
    }

    #[test]
    fn test_case_insensitive() {
        let wake = detector();
        assert!(wake.matches("HEY DJ"));
        assert!(wake.matches("Hey Deejay"));
    }

    #[test]
    fn test_no_match_discarded() {
        let wake = detector();
        assert!(!wake.matches("turn on the lights"));
    }

    #[test]
    fn test_empty_phrase_list_rejected() {
        assert!(WakeDetector::new(&[]).is_err());
    }
}
