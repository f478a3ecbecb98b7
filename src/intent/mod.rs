//! Intent mapping
//!
//! Maps a recognized utterance to a structured action: pre-filter rules,
//! fuzzy matching against canonical example phrases, regex slot
//! extraction, and per-intent resolution.

pub mod sanitize;

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::config::{Config, FORBIDDEN_CHARS};
use crate::{Error, Result};

/// Minimum similarity score (0-100) for a fuzzy match to be accepted
pub const SCORE_CUTOFF: u8 = 60;

/// A structured action mapped from an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedAction {
    /// Stop the assistant
    Exit,

    /// A whitelisted OS command with its arguments
    Whitelisted {
        /// Command name present in the whitelist
        command: String,
        /// Arguments, still subject to the sanitizer
        args: Vec<String>,
    },

    /// A raw command line to execute verbatim after spoken confirmation
    Arbitrary(String),

    /// Weather lookup; city may need a follow-up listen
    Weather {
        /// City name, if one could be extracted
        city: Option<String>,
    },

    /// Play a video for the query in the browser
    YoutubePlay {
        /// Search query
        query: String,
    },

    /// Download a video; the phrase is cleaned later in the flow
    YoutubeDownload {
        /// Raw spoken phrase
        phrase: String,
    },

    /// Open a web search for the query
    WebSearch {
        /// Search query
        query: String,
    },

    /// No intent matched
    Unmapped {
        /// Human-readable reason
        reason: String,
    },
}

/// What a matched intent resolves to
#[derive(Debug, Clone, Copy)]
enum IntentKind {
    /// A whitelisted OS command
    Command(&'static str),
    Weather,
    YoutubePlay,
    YoutubeDownload,
    WebSearch,
}

/// A named slot extracted from the raw utterance by pattern
struct SlotRule {
    name: &'static str,
    pattern: &'static str,
    /// Advisory only; absence never fails the mapping at this layer
    #[allow(dead_code)]
    required: bool,
}

/// One intent: canonical examples plus slot extraction rules
struct IntentDefinition {
    name: &'static str,
    kind: IntentKind,
    examples: &'static [&'static str],
    slots: &'static [SlotRule],
}

/// IPv4, dotted hostname, or a bare name spoken right after the verb
/// ("ping google")
const PING_TARGET: &str = r"(\b\d{1,3}(?:[ .]\d{1,3}){3}\b)|([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})|(?:ping\s+(\S+))";
const TRACE_TARGET: &str = r"([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})|(\b\d{1,3}(?:[ .]\d{1,3}){3}\b)";
const LOOKUP_TARGET: &str = r"([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})";

static REGISTRY: &[IntentDefinition] = &[
    IntentDefinition {
        name: "ip_show",
        kind: IntentKind::Command("ipconfig"),
        examples: &["show my ip", "what is my ip", "ipconfig"],
        slots: &[],
    },
    IntentDefinition {
        name: "ping",
        kind: IntentKind::Command("ping"),
        examples: &["ping google", "ping 8.8.8.8", "check connectivity"],
        slots: &[SlotRule { name: "target", pattern: PING_TARGET, required: false }],
    },
    IntentDefinition {
        name: "tracert",
        kind: IntentKind::Command("tracert"),
        examples: &["traceroute google", "tracert example.com"],
        slots: &[SlotRule { name: "target", pattern: TRACE_TARGET, required: false }],
    },
    IntentDefinition {
        name: "nslookup",
        kind: IntentKind::Command("nslookup"),
        examples: &["dns lookup google", "nslookup example.com"],
        slots: &[SlotRule { name: "target", pattern: LOOKUP_TARGET, required: false }],
    },
    IntentDefinition {
        name: "systeminfo",
        kind: IntentKind::Command("systeminfo"),
        examples: &["system info", "system information"],
        slots: &[],
    },
    IntentDefinition {
        name: "whoami",
        kind: IntentKind::Command("whoami"),
        examples: &["who am i", "current user"],
        slots: &[],
    },
    IntentDefinition {
        name: "tasklist",
        kind: IntentKind::Command("tasklist"),
        examples: &["list processes", "tasklist"],
        slots: &[],
    },
    IntentDefinition {
        name: "calc",
        kind: IntentKind::Command("calc"),
        examples: &["open calculator", "launch calc"],
        slots: &[],
    },
    IntentDefinition {
        name: "lock",
        kind: IntentKind::Command("lock"),
        examples: &["lock computer", "lock pc"],
        slots: &[],
    },
    IntentDefinition {
        name: "music",
        kind: IntentKind::Command("music"),
        examples: &["open music folder", "play music"],
        slots: &[],
    },
    IntentDefinition {
        name: "weather",
        kind: IntentKind::Weather,
        examples: &["what's the weather in london", "weather new york"],
        slots: &[SlotRule { name: "city", pattern: r"in ([A-Za-z .]+)$", required: false }],
    },
    IntentDefinition {
        name: "youtube_play",
        kind: IntentKind::YoutubePlay,
        examples: &["play despacito on youtube", "play blinding lights"],
        slots: &[SlotRule { name: "query", pattern: r"play (.+) on youtube|play (.+)$", required: true }],
    },
    IntentDefinition {
        name: "youtube_download",
        kind: IntentKind::YoutubeDownload,
        examples: &["download this song", "download video", "download youtube video"],
        slots: &[SlotRule { name: "url_or_query", pattern: r"(https?://\S+)|(.+)", required: true }],
    },
    IntentDefinition {
        name: "web_search",
        kind: IntentKind::WebSearch,
        examples: &["search web for best lasagna recipe", "search for how to tie a tie"],
        slots: &[SlotRule { name: "query", pattern: r"(?:search (?:web|google|for) )(.+)", required: true }],
    },
];

/// Similarity score between two normalized strings, 0-100
///
/// Character-bigram Sørensen–Dice.
#[must_use]
pub fn similarity(a: &str, b: &str) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = (strsim::sorensen_dice(a, b) * 100.0).round() as u8;
    score
}

/// Maps normalized utterances to actions via the static intent registry
pub struct IntentMapper {
    /// (normalized example, registry index) pairs, in registry order
    examples: Vec<(String, usize)>,
    /// Compiled slot patterns per registry index
    slot_patterns: HashMap<usize, Vec<(&'static str, Regex)>>,
    exit_pattern: Regex,
    dot_word: Regex,
    play_strip: Regex,
    play_suffix: Regex,
    search_strip: Regex,
    cutoff: u8,
}

impl IntentMapper {
    /// Build the mapper with the default score cutoff
    ///
    /// # Errors
    ///
    /// Returns error if a registry pattern fails to compile
    pub fn new() -> Result<Self> {
        Self::with_cutoff(SCORE_CUTOFF)
    }

    /// Build the mapper with an explicit score cutoff
    ///
    /// # Errors
    ///
    /// Returns error if a registry pattern fails to compile
    pub fn with_cutoff(cutoff: u8) -> Result<Self> {
        let compile = |p: &str| {
            Regex::new(p).map_err(|e| Error::Config(format!("intent pattern: {e}")))
        };

        let mut mapper = Self {
            examples: Vec::new(),
            slot_patterns: HashMap::new(),
            exit_pattern: compile(r"\b(exit|quit|stop|shutdown assistant)\b")?,
            dot_word: compile(r"\bdot\b")?,
            play_strip: compile(r"(?i)play\s+")?,
            play_suffix: compile(r"(?i)\s+on youtube\s*$")?,
            search_strip: compile(r"(?i)search (?:(?:web|google) )?(?:for )?")?,
            cutoff,
        };

        for (idx, intent) in REGISTRY.iter().enumerate() {
            for example in intent.examples {
                let norm = mapper.normalize(example);
                mapper.examples.push((norm, idx));
            }

            let mut compiled = Vec::new();
            for rule in intent.slots {
                let re = RegexBuilder::new(rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        Error::Config(format!("slot pattern for {}: {e}", intent.name))
                    })?;
                compiled.push((rule.name, re));
            }
            mapper.slot_patterns.insert(idx, compiled);
        }

        Ok(mapper)
    }

    /// Map an utterance to an action
    #[must_use]
    pub fn map(&self, utterance: &str) -> MappedAction {
        let trimmed = utterance.trim();
        if trimmed.is_empty() {
            return MappedAction::Unmapped {
                reason: "no speech detected".to_string(),
            };
        }

        let lower = trimmed.to_lowercase();

        // Pre-filters, checked before fuzzy matching
        if self.exit_pattern.is_match(&lower) {
            return MappedAction::Exit;
        }
        if lower.contains("download") && (lower.contains("youtube") || lower.contains("video")) {
            return MappedAction::YoutubeDownload {
                phrase: trimmed.to_string(),
            };
        }

        let norm = self.normalize(trimmed);
        let (best_idx, best_score, best_example) = self.best_match(&norm);

        if best_score < self.cutoff {
            // Literal fallback: the first token may name a whitelisted
            // command outright.
            if let Some(tokens) = shlex::split(&lower) {
                if let Some((head, rest)) = tokens.split_first() {
                    if Config::whitelist_entry(head).is_some() {
                        return MappedAction::Whitelisted {
                            command: head.clone(),
                            args: rest.to_vec(),
                        };
                    }
                }
            }
            return MappedAction::Unmapped {
                reason: format!("no intent match (best score {best_score} for '{best_example}')"),
            };
        }

        self.resolve(best_idx, trimmed, &lower)
    }

    /// Normalize an utterance for fuzzy comparison
    ///
    /// Lowercases, turns the word "dot" into ".", collapses number words
    /// to digits, strips filler phrases, and collapses whitespace.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        let dotted = self.dot_word.replace_all(lower.trim(), ".");

        let digits = dotted
            .split_whitespace()
            .map(number_word_to_digit)
            .collect::<Vec<_>>()
            .join(" ");

        let mut cleaned = digits;
        for filler in ["please", "can you", "what's", "what is"] {
            cleaned = cleaned.replace(filler, " ");
        }

        cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Best-scoring (registry index, score, example) across all examples
    fn best_match(&self, normalized: &str) -> (usize, u8, &str) {
        let mut best: (usize, u8, &str) = (0, 0, "");
        for (example, idx) in &self.examples {
            let score = similarity(normalized, example);
            if score > best.1 {
                best = (*idx, score, example.as_str());
            }
        }
        best
    }

    /// Extract declared slots from the raw (non-normalized) utterance
    ///
    /// Takes the last non-empty capture group of a match, or the whole
    /// match when the pattern has no groups. Missing slots are absent.
    fn extract_slots(&self, intent_idx: usize, utterance: &str) -> HashMap<&'static str, String> {
        let mut slots = HashMap::new();
        let Some(rules) = self.slot_patterns.get(&intent_idx) else {
            return slots;
        };

        for (name, re) in rules {
            if let Some(caps) = re.captures(utterance.trim()) {
                let groups: Vec<&str> = caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str().trim())
                    .filter(|s| !s.is_empty())
                    .collect();
                let value = groups
                    .last()
                    .map_or_else(|| caps[0].trim().to_string(), ToString::to_string);
                if !value.is_empty() {
                    slots.insert(*name, value);
                }
            }
        }

        slots
    }

    /// Resolve a matched intent to a concrete action
    fn resolve(&self, intent_idx: usize, utterance: &str, lower: &str) -> MappedAction {
        let intent = &REGISTRY[intent_idx];
        let slots = self.extract_slots(intent_idx, utterance);

        match intent.kind {
            IntentKind::Command("ping") => {
                let target = slots
                    .get("target")
                    .cloned()
                    .unwrap_or_else(|| "8.8.8.8".to_string());
                if target.chars().any(|c| FORBIDDEN_CHARS.contains(c)) {
                    return MappedAction::Unmapped {
                        reason: "illegal characters in ping target".to_string(),
                    };
                }
                MappedAction::Whitelisted {
                    command: "ping".to_string(),
                    args: vec!["-n".to_string(), "1".to_string(), target.replace(' ', ".")],
                }
            }
            IntentKind::Command(cmd @ ("tracert" | "nslookup")) => {
                let args = slots
                    .get("target")
                    .map(|t| vec![t.replace(' ', ".")])
                    .unwrap_or_default();
                MappedAction::Whitelisted {
                    command: cmd.to_string(),
                    args,
                }
            }
            IntentKind::Command(cmd) => MappedAction::Whitelisted {
                command: cmd.to_string(),
                args: Vec::new(),
            },
            IntentKind::Weather => {
                let city = slots.get("city").cloned().or_else(|| {
                    lower
                        .rfind(" in ")
                        .map(|pos| lower[pos + 4..].trim().to_string())
                        .filter(|c| !c.is_empty())
                });
                MappedAction::Weather { city }
            }
            IntentKind::YoutubePlay => {
                let stripped = lower.contains("play ").then(|| {
                    let q = self.play_strip.replacen(utterance, 1, "");
                    self.play_suffix.replace(&q, "").trim().to_string()
                });
                let query = stripped
                    .filter(|q| !q.is_empty())
                    .or_else(|| slots.get("query").cloned())
                    .unwrap_or_else(|| utterance.trim().to_string());
                MappedAction::YoutubePlay { query }
            }
            IntentKind::YoutubeDownload => MappedAction::YoutubeDownload {
                phrase: utterance.trim().to_string(),
            },
            IntentKind::WebSearch => {
                let stripped = lower.contains("search ").then(|| {
                    self.search_strip.replacen(utterance, 1, "").trim().to_string()
                });
                let query = stripped
                    .filter(|q| !q.is_empty())
                    .or_else(|| slots.get("query").cloned())
                    .unwrap_or_else(|| utterance.trim().to_string());
                MappedAction::WebSearch { query }
            }
        }
    }
}

/// Collapse a spoken number word to its digit
fn number_word_to_digit(token: &str) -> &str {
    match token {
        "zero" => "0",
        "one" => "1",
        "two" => "2",
        "three" => "3",
        "four" => "4",
        "five" => "5",
        "six" => "6",
        "seven" => "7",
        "eight" => "8",
        "nine" => "9",
        other => other,
    }
}

/// Normalize a download phrase into a bare search query
///
/// Strips the trigger words ("download", "the video", "from/on youtube"),
/// filler, and non-alphanumeric noise; falls back to the raw phrase when
/// nothing is left.
#[must_use]
pub fn clean_download_query(phrase: &str) -> String {
    let mut u = phrase.to_lowercase().trim().to_string();

    for pat in [
        "download the video",
        "download the",
        "download this",
        "download",
        "from youtube",
        "on youtube",
        "please",
    ] {
        u = u.replace(pat, " ");
    }

    let noise_stripped: String = u
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '.' || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let cleaned = noise_stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.is_empty() {
        phrase.trim().to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> IntentMapper {
        IntentMapper::new().unwrap()
    }

    #[test]
    fn test_normalize_number_words_and_filler() {
        let m = mapper();
        assert_eq!(
            m.normalize("Please ping eight dot eight dot eight dot eight"),
            "ping 8 . 8 . 8 . 8"
        );
        assert_eq!(m.normalize("what is my ip"), "my ip");
        assert_eq!(m.normalize("can  you   show my ip"), "show my ip");
    }

    #[test]
    fn test_exit_prefilter() {
        let m = mapper();
        assert_eq!(m.map("exit"), MappedAction::Exit);
        assert_eq!(m.map("please stop now"), MappedAction::Exit);
        assert_eq!(m.map("shutdown assistant"), MappedAction::Exit);
    }

    #[test]
    fn test_download_prefilter_bypasses_fuzzy() {
        let m = mapper();
        let action = m.map("download despacito from youtube");
        assert_eq!(
            action,
            MappedAction::YoutubeDownload {
                phrase: "download despacito from youtube".to_string()
            }
        );
    }

    #[test]
    fn test_ping_with_bare_hostname() {
        let m = mapper();
        let action = m.map("ping google");
        assert_eq!(
            action,
            MappedAction::Whitelisted {
                command: "ping".to_string(),
                args: vec!["-n".to_string(), "1".to_string(), "google".to_string()],
            }
        );
    }

    #[test]
    fn test_ping_defaults_target() {
        let m = mapper();
        let action = m.map("check connectivity");
        assert_eq!(
            action,
            MappedAction::Whitelisted {
                command: "ping".to_string(),
                args: vec!["-n".to_string(), "1".to_string(), "8.8.8.8".to_string()],
            }
        );
    }

    #[test]
    fn test_ping_rejects_forbidden_target() {
        let m = mapper();
        let action = m.map("ping google;reboot");
        assert_eq!(
            action,
            MappedAction::Unmapped {
                reason: "illegal characters in ping target".to_string()
            }
        );
    }

    #[test]
    fn test_no_arg_command() {
        let m = mapper();
        assert_eq!(
            m.map("lock computer"),
            MappedAction::Whitelisted {
                command: "lock".to_string(),
                args: Vec::new(),
            }
        );
    }

    #[test]
    fn test_weather_city_from_slot() {
        let m = mapper();
        assert_eq!(
            m.map("what's the weather in london"),
            MappedAction::Weather {
                city: Some("london".to_string())
            }
        );
    }

    #[test]
    fn test_weather_without_city() {
        let m = mapper();
        assert_eq!(m.map("what's the weather"), MappedAction::Weather { city: None });
    }

    #[test]
    fn test_youtube_play_strips_trigger() {
        let m = mapper();
        assert_eq!(
            m.map("play despacito on youtube"),
            MappedAction::YoutubePlay {
                query: "despacito".to_string()
            }
        );
    }

    #[test]
    fn test_web_search_strips_trigger() {
        let m = mapper();
        assert_eq!(
            m.map("search web for best lasagna recipe"),
            MappedAction::WebSearch {
                query: "best lasagna recipe".to_string()
            }
        );
    }

    #[test]
    fn test_literal_fallback_to_whitelisted_command() {
        let m = mapper();
        assert_eq!(
            m.map("ipconfig /all /renew /release /flushdns"),
            MappedAction::Whitelisted {
                command: "ipconfig".to_string(),
                args: vec![
                    "/all".to_string(),
                    "/renew".to_string(),
                    "/release".to_string(),
                    "/flushdns".to_string()
                ],
            }
        );
    }

    #[test]
    fn test_gibberish_unmapped() {
        let m = mapper();
        assert!(matches!(
            m.map("florble the quantum banana sideways"),
            MappedAction::Unmapped { .. }
        ));
    }

    #[test]
    fn test_empty_utterance_unmapped() {
        let m = mapper();
        assert!(matches!(m.map("   "), MappedAction::Unmapped { .. }));
    }

    #[test]
    fn test_score_cutoff_boundary() {
        // The boundary is inclusive: a best score equal to the cutoff maps,
        // one point below does not. The head token must not name a
        // whitelisted command, or the literal fallback would kick in.
        let utterance = "pin googel";
        let m = mapper();
        let norm = m.normalize(utterance);
        let score = similarity(&norm, "ping google");
        assert!(score > 0 && score < 100);

        let at_cutoff = IntentMapper::with_cutoff(score).unwrap();
        assert!(matches!(
            at_cutoff.map(utterance),
            MappedAction::Whitelisted { .. }
        ));

        let above_cutoff = IntentMapper::with_cutoff(score + 1).unwrap();
        assert!(matches!(
            above_cutoff.map(utterance),
            MappedAction::Unmapped { .. }
        ));
    }

    #[test]
    fn test_clean_download_query() {
        assert_eq!(
            clean_download_query("download despacito from youtube please"),
            "despacito"
        );
        assert_eq!(clean_download_query("download the video rick roll"), "rick roll");
        // Nothing left after stripping falls back to the raw phrase
        assert_eq!(clean_download_query("download"), "download");
    }
}
