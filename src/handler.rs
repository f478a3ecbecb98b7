//! Per-wake command handling
//!
//! One `handle_wake` invocation runs the full flow: pause background
//! listening, actively listen for a command, map it to an action, confirm
//! sensitive actions aloud, execute, journal, and hand control back to the
//! background loop. Cleanup (resume + lock release) is tied to a guard's
//! `Drop` so it runs exactly once on every exit path, including
//! collaborator failures.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::actions::{Announcer, UrlOpener, VideoSource, WeatherProvider};
use crate::audio::Sampler;
use crate::config::{Config, ListenConfig};
use crate::exec::{CommandRunner, RAW_TIMEOUT, WHITELIST_TIMEOUT};
use crate::intent::sanitize::Sanitizer;
use crate::intent::{IntentMapper, MappedAction, clean_download_query};
use crate::journal::{CommandJournal, truncate};
use crate::listener::{HandlerPermit, ListenerState};
use crate::stt::{Recognition, Recognizer};
use crate::Result;

/// Accepted confirmation phrases for arbitrary execution
const ARBITRARY_CONFIRM: &[&str] = &["run command", "run", "execute", "yes"];

/// Accepted confirmation phrases for downloads
const DOWNLOAD_CONFIRM: &[&str] = &["download this", "download", "confirm", "yes"];

/// Accepted confirmation phrases for network probes with arguments
const PROBE_CONFIRM: &[&str] = &["yes", "confirm", "sure"];

/// Accepted confirmation phrases for system shutdown
const SHUTDOWN_CONFIRM: &[&str] = &["yes", "confirm", "shutdown"];

/// Whitelisted commands with network-probe semantics
const PROBE_COMMANDS: &[&str] = &["ping", "tracert", "nslookup"];

/// Extra time allowed beyond the capture window for recognition to finish
const LISTEN_GRACE: Duration = Duration::from_secs(5);

/// Timeout for one active-listen transcription call
const RECOGNITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Spoken-feedback truncation for command output
const SPOKEN_OUTPUT_LIMIT: usize = 1000;

/// A pending spoken confirmation for one action
struct Confirmation {
    prompt: String,
    accepted: &'static [&'static str],
}

/// Outcome of a spoken confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmOutcome {
    /// The reply matched an accepted phrase
    Confirmed,

    /// A reply was heard but did not match
    Declined,

    /// Nothing intelligible was heard within the window
    NoReply,
}

/// Settings the handler flow needs from the session configuration
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// Arbitrary command execution enabled
    pub allow_arbitrary: bool,

    /// Downloads enabled
    pub allow_download: bool,

    /// Listen windows
    pub listen: ListenConfig,

    /// Destination folder for downloads
    pub download_dir: PathBuf,
}

impl HandlerSettings {
    /// Extract handler settings from the session configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            allow_arbitrary: config.allow_arbitrary,
            allow_download: config.allow_download,
            listen: config.listen.clone(),
            download_dir: config.download_dir.clone(),
        }
    }
}

/// External collaborators injected into the handler at construction
pub struct Collaborators {
    /// Audio capture for active listens
    pub sampler: Arc<dyn Sampler>,

    /// Speech recognition for active listens
    pub recognizer: Arc<dyn Recognizer>,

    /// OS command execution
    pub runner: Arc<dyn CommandRunner>,

    /// Weather lookups
    pub weather: Arc<dyn WeatherProvider>,

    /// Video search and download
    pub videos: Arc<dyn VideoSource>,

    /// Browser opening
    pub opener: Arc<dyn UrlOpener>,

    /// Spoken/console feedback
    pub announcer: Arc<dyn Announcer>,
}

/// Restores the listener on every exit path of a handler flow
///
/// Construction pauses the background loop; drop releases the handler
/// slot and resumes it, in that order.
struct FlowGuard {
    state: Arc<ListenerState>,
    permit: Option<HandlerPermit>,
}

impl FlowGuard {
    fn new(state: Arc<ListenerState>, permit: HandlerPermit) -> Self {
        state.pause();
        Self {
            state,
            permit: Some(permit),
        }
    }
}

impl Drop for FlowGuard {
    fn drop(&mut self) {
        drop(self.permit.take());
        self.state.resume();
    }
}

/// Handles one wake event end to end
pub struct CommandHandler {
    state: Arc<ListenerState>,
    mapper: IntentMapper,
    sanitizer: Sanitizer,
    journal: Arc<CommandJournal>,
    settings: HandlerSettings,
    collab: Collaborators,
}

impl CommandHandler {
    /// Create a handler with injected collaborators
    ///
    /// # Errors
    ///
    /// Returns error if the intent registry fails to compile
    pub fn new(
        state: Arc<ListenerState>,
        collaborators: Collaborators,
        journal: Arc<CommandJournal>,
        settings: HandlerSettings,
    ) -> Result<Self> {
        Ok(Self {
            state,
            mapper: IntentMapper::new()?,
            sanitizer: Sanitizer::new(),
            journal,
            settings,
            collab: collaborators,
        })
    }

    /// Run one wake-to-resume flow
    ///
    /// Entered only after the caller won the handler slot; the permit is
    /// consumed and released when the flow finishes.
    pub async fn handle_wake(&self, permit: HandlerPermit) {
        let _guard = FlowGuard::new(Arc::clone(&self.state), permit);

        self.collab.announcer.say("Ready for your command.");
        let Some(utterance) = self.active_listen(self.settings.listen.command_window).await else {
            tracing::info!("no command heard, returning to background");
            return;
        };

        tracing::info!(utterance = %utterance, "heard command");
        let action = self.mapper.map(&utterance);
        self.dispatch(&utterance, action).await;
    }

    /// One bounded active listen: capture a window, transcribe it
    ///
    /// Timeouts and recognition failures all collapse to `None` — the
    /// flow treats them as "no response" and proceeds down the
    /// cancellation path.
    async fn active_listen(&self, window: Duration) -> Option<String> {
        let sampler = Arc::clone(&self.collab.sampler);
        let capture = tokio::task::spawn_blocking(move || sampler.capture(window));

        let chunk = match tokio::time::timeout(window + LISTEN_GRACE, capture).await {
            Err(_) => {
                tracing::warn!("active listen capture timed out");
                return None;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "active listen capture task failed");
                return None;
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "active listen capture failed");
                return None;
            }
            Ok(Ok(Ok(chunk))) => chunk,
        };

        match tokio::time::timeout(RECOGNITION_TIMEOUT, self.collab.recognizer.transcribe(&chunk)).await
        {
            Err(_) => {
                tracing::warn!("active listen recognition timed out");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "active listen recognition failed");
                None
            }
            Ok(Ok(Recognition::NoSpeech)) => {
                tracing::debug!("no speech in active listen window");
                None
            }
            Ok(Ok(Recognition::Transcript(text))) => Some(text),
        }
    }

    /// Speak a confirmation prompt and match the reply against the
    /// accepted phrase set
    async fn confirm(&self, confirmation: &Confirmation) -> ConfirmOutcome {
        self.collab.announcer.say(&confirmation.prompt);
        match self.active_listen(self.settings.listen.confirm_window).await {
            None => ConfirmOutcome::NoReply,
            Some(reply) => {
                let reply = reply.trim().to_lowercase();
                tracing::debug!(reply = %reply, "confirmation reply");
                if confirmation.accepted.contains(&reply.as_str()) {
                    ConfirmOutcome::Confirmed
                } else {
                    ConfirmOutcome::Declined
                }
            }
        }
    }

    /// Route a mapped action to its branch
    async fn dispatch(&self, utterance: &str, action: MappedAction) {
        match action {
            MappedAction::Exit => {
                self.collab.announcer.say("Shutting down. Goodbye.");
                self.state.stop();
            }
            MappedAction::Unmapped { reason } => self.handle_unmapped(utterance, &reason).await,
            MappedAction::Arbitrary(line) => self.run_arbitrary(&line).await,
            MappedAction::Whitelisted { command, args } => {
                self.run_whitelisted(utterance, &command, &args).await;
            }
            MappedAction::Weather { city } => self.run_weather(utterance, city).await,
            MappedAction::YoutubePlay { query } => self.run_play(utterance, &query).await,
            MappedAction::YoutubeDownload { phrase } => self.run_download(&phrase).await,
            MappedAction::WebSearch { query } => self.run_search(utterance, &query).await,
        }
    }

    /// Unmapped utterance: abort, or confirm and run verbatim
    async fn handle_unmapped(&self, utterance: &str, reason: &str) {
        tracing::info!(reason = %reason, "could not map utterance");
        self.collab.announcer.say(&format!("Couldn't map that: {reason}"));

        if !self.settings.allow_arbitrary {
            self.collab.announcer.say(
                "Arbitrary commands are disabled. Restart with --allow-arbitrary to enable.",
            );
            return;
        }

        let confirmation = Confirmation {
            prompt: format!(
                "Do you want me to run the exact command: {utterance}? Say 'run command' to confirm."
            ),
            accepted: ARBITRARY_CONFIRM,
        };
        if self.confirm(&confirmation).await == ConfirmOutcome::Confirmed {
            // Explicit confirmation substitutes for argument validation
            self.run_arbitrary(utterance).await;
        } else {
            self.collab.announcer.say("Cancelled.");
            self.journal.log_arbitrary(utterance, false, None, "user declined");
        }
    }

    /// Execute a confirmed raw command line
    async fn run_arbitrary(&self, line: &str) {
        let out = self.collab.runner.run_raw(line, RAW_TIMEOUT).await;
        self.journal.log_arbitrary(line, true, Some(&out), "");

        if out.ok() {
            if out.stdout.is_empty() {
                self.collab.announcer.say("Command executed.");
            } else {
                self.collab.announcer.say(&truncate(&out.stdout, SPOKEN_OUTPUT_LIMIT));
            }
        } else {
            self.collab.announcer.say(&format!("Command failed: {}", out.stderr));
        }
    }

    /// Sanitize, optionally confirm, and execute a whitelisted command
    async fn run_whitelisted(&self, utterance: &str, command: &str, args: &[String]) {
        if let Err(e) = self.sanitizer.check(command, args) {
            tracing::warn!(command, error = %e, "sanitizer rejected command");
            self.collab.announcer.say(&format!("Rejected: {e}"));
            return;
        }

        if let Some(confirmation) = sensitive_confirmation(command, args) {
            if self.confirm(&confirmation).await != ConfirmOutcome::Confirmed {
                self.collab.announcer.say("Cancelled.");
                return;
            }
        }

        let display = if args.is_empty() {
            command.to_string()
        } else {
            format!("{command} {}", args.join(" "))
        };
        self.collab.announcer.say(&format!("Running {display}"));

        let out = self.collab.runner.run(command, args, WHITELIST_TIMEOUT).await;
        self.journal.log_command(
            utterance,
            "WHITELIST",
            command,
            args,
            out.code,
            &out.stdout,
            &out.stderr,
            "",
        );

        if out.ok() {
            if out.stdout.is_empty() {
                self.collab.announcer.say("Command completed successfully.");
            } else {
                self.collab.announcer.say(&truncate(&out.stdout, SPOKEN_OUTPUT_LIMIT));
            }
        } else {
            self.collab.announcer.say(&format!("Command failed: {}", out.stderr));
        }
    }

    /// Weather lookup, asking for the city when it is missing
    async fn run_weather(&self, utterance: &str, city: Option<String>) {
        let city = match city {
            Some(c) => Some(c),
            None => {
                self.collab.announcer.say("Which city?");
                self.active_listen(self.settings.listen.confirm_window).await
            }
        };
        let Some(city) = city.filter(|c| !c.trim().is_empty()) else {
            self.collab.announcer.say("No city given. Cancelling.");
            return;
        };

        match self.collab.weather.lookup(&city).await {
            Ok(report) => {
                self.collab.announcer.say(&report);
                self.journal.log_command(
                    utterance,
                    "WEATHER",
                    "weather",
                    std::slice::from_ref(&city),
                    0,
                    &report,
                    "",
                    "",
                );
            }
            Err(e) => {
                let reason = e.to_string();
                self.collab.announcer.say(&reason);
                self.journal.log_command(
                    utterance,
                    "WEATHER",
                    "weather",
                    std::slice::from_ref(&city),
                    -1,
                    "",
                    &reason,
                    "",
                );
            }
        }
    }

    /// Resolve the top video URL and open it
    async fn run_play(&self, utterance: &str, query: &str) {
        self.collab.announcer.say(&format!("Searching for {query}"));
        let url = self.collab.videos.resolve_top_url(query).await;
        self.collab.opener.open(&url);
        self.journal.log_command(
            utterance,
            "YOUTUBE_PLAY",
            "youtube_play",
            &[query.to_string()],
            0,
            &url,
            "",
            "",
        );
        self.collab.announcer.say(&format!("Opening {url}"));
    }

    /// Clean the phrase, confirm, and download
    async fn run_download(&self, phrase: &str) {
        let query = clean_download_query(phrase);

        if !self.settings.allow_download {
            self.collab
                .announcer
                .say("Downloads are disabled. Restart with --allow-download to enable.");
            self.journal.log_download(phrase, &query, "", -1, "downloads_disabled");
            return;
        }

        let confirmation = Confirmation {
            prompt: format!("You asked to download: {query}. Say 'download this' to confirm."),
            accepted: DOWNLOAD_CONFIRM,
        };
        if self.confirm(&confirmation).await != ConfirmOutcome::Confirmed {
            self.collab.announcer.say("Download cancelled.");
            self.journal.log_download(phrase, &query, "", -1, "user_cancelled");
            return;
        }

        self.collab.announcer.say("Starting download.");
        let outcome = self.collab.videos.download(&query, &self.settings.download_dir).await;
        self.journal
            .log_download(phrase, &query, &outcome.filename, outcome.code, &outcome.error);

        if outcome.ok() {
            self.collab.announcer.say(&format!("Finished. Saved as {}", outcome.filename));
        } else {
            self.collab.announcer.say(&format!("Download failed: {}", outcome.error));
        }
    }

    /// Open a web search for the query
    async fn run_search(&self, utterance: &str, query: &str) {
        let url = format!(
            "https://www.google.com/search?q={}",
            urlencoding::encode(query)
        );
        self.collab.opener.open(&url);
        self.journal.log_command(
            utterance,
            "WEB_SEARCH",
            "web_search",
            &[query.to_string()],
            0,
            &url,
            "",
            "",
        );
        self.collab.announcer.say(&format!("Opening {url}"));
    }
}

/// Confirmation required before a sensitive whitelisted command, if any
fn sensitive_confirmation(command: &str, args: &[String]) -> Option<Confirmation> {
    if command == "shutdown" {
        return Some(Confirmation {
            prompt: "This will shut down the computer. Say 'yes' to confirm.".to_string(),
            accepted: SHUTDOWN_CONFIRM,
        });
    }
    if PROBE_COMMANDS.contains(&command) && !args.is_empty() {
        return Some(Confirmation {
            prompt: format!("Will run {command} {}. Say 'yes' to confirm.", args.join(" ")),
            accepted: PROBE_CONFIRM,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_guard_releases_and_resumes_once() {
        let state = Arc::new(ListenerState::new(Duration::from_secs(3)));
        let permit = state.try_begin_handling().expect("slot free");

        let guard = FlowGuard::new(Arc::clone(&state), permit);
        assert!(state.is_paused());
        assert!(state.is_handling());

        drop(guard);
        assert!(!state.is_paused());
        assert!(!state.is_handling());
    }

    #[test]
    fn test_probe_confirmation_only_with_args() {
        assert!(sensitive_confirmation("ping", &["-n".to_string()]).is_some());
        assert!(sensitive_confirmation("ping", &[]).is_none());
        assert!(sensitive_confirmation("tracert", &["example.com".to_string()]).is_some());
        assert!(sensitive_confirmation("ipconfig", &["/all".to_string()]).is_none());
    }

    #[test]
    fn test_shutdown_always_confirms() {
        assert!(sensitive_confirmation("shutdown", &[]).is_some());
        let c = sensitive_confirmation("shutdown", &[]).unwrap();
        assert!(c.accepted.contains(&"shutdown"));
    }
}
