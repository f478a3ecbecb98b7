//! Shared test fakes
//!
//! In-memory collaborators for exercising the handler flow without audio
//! hardware, a speech service, or real subprocesses.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use deejay::actions::{Announcer, DownloadOutcome, UrlOpener, VideoSource, WeatherProvider};
use deejay::audio::{AudioChunk, SAMPLE_RATE, Sampler};
use deejay::config::{ListenConfig, WakeConfig};
use deejay::exec::{CommandOutput, CommandRunner};
use deejay::handler::{Collaborators, CommandHandler, HandlerSettings};
use deejay::journal::CommandJournal;
use deejay::listener::{Listener, ListenerState, ListenerTuning, WakeDetector};
use deejay::stt::{Recognition, Recognizer};
use deejay::{Error, Result};

/// Sampler returning a short silent chunk instantly
pub struct SilentSampler;

impl Sampler for SilentSampler {
    fn capture(&self, _duration: Duration) -> Result<AudioChunk> {
        Ok(AudioChunk {
            samples: vec![0.0; 160],
            sample_rate: SAMPLE_RATE,
        })
    }
}

/// Recognizer replaying a scripted sequence of transcripts
///
/// An empty string scripts a no-speech window; an exhausted script keeps
/// returning no-speech.
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Recognition>>,
}

impl ScriptedRecognizer {
    pub fn new(lines: &[&str]) -> Self {
        let script = lines
            .iter()
            .map(|l| {
                if l.is_empty() {
                    Recognition::NoSpeech
                } else {
                    Recognition::Transcript((*l).to_string())
                }
            })
            .collect();
        Self {
            script: Mutex::new(script),
        }
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn transcribe(&self, _chunk: &AudioChunk) -> Result<Recognition> {
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Recognition::NoSpeech))
    }
}

/// Runner recording invocations and returning canned success
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
    pub raw_calls: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str, args: &[String], _timeout: Duration) -> CommandOutput {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), args.to_vec()));
        CommandOutput::message("ok")
    }

    async fn run_raw(&self, command_line: &str, _timeout: Duration) -> CommandOutput {
        self.raw_calls.lock().unwrap().push(command_line.to_string());
        CommandOutput::message("ok")
    }
}

/// Weather provider returning a canned report
pub struct FakeWeather;

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn lookup(&self, city: &str) -> Result<String> {
        Ok(format!(
            "{city}: Clear (clear sky). Temperature 20.0°C, feels like 19.0°C. Humidity 50%."
        ))
    }
}

/// Weather provider that always fails, for cleanup-path tests
pub struct FailingWeather;

#[async_trait]
impl WeatherProvider for FailingWeather {
    async fn lookup(&self, _city: &str) -> Result<String> {
        Err(Error::Weather("service unavailable".to_string()))
    }
}

/// Video source recording calls
#[derive(Default)]
pub struct FakeVideos {
    pub resolves: Mutex<Vec<String>>,
    pub downloads: Mutex<Vec<String>>,
}

#[async_trait]
impl VideoSource for FakeVideos {
    async fn resolve_top_url(&self, query: &str) -> String {
        self.resolves.lock().unwrap().push(query.to_string());
        "https://www.youtube.com/watch?v=test".to_string()
    }

    async fn download(&self, query_or_url: &str, _dest: &Path) -> DownloadOutcome {
        self.downloads.lock().unwrap().push(query_or_url.to_string());
        DownloadOutcome {
            code: 0,
            filename: "song.mp3".to_string(),
            error: String::new(),
        }
    }
}

/// Browser opener recording URLs
#[derive(Default)]
pub struct RecordingOpener {
    pub urls: Mutex<Vec<String>>,
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

/// Announcer recording spoken lines
#[derive(Default)]
pub struct RecordingAnnouncer {
    pub lines: Mutex<Vec<String>>,
}

impl Announcer for RecordingAnnouncer {
    fn say(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}

/// A fully wired handler flow over fakes
pub struct Harness {
    pub state: Arc<ListenerState>,
    pub handler: Arc<CommandHandler>,
    pub listener: Listener,
    pub runner: Arc<RecordingRunner>,
    pub videos: Arc<FakeVideos>,
    pub opener: Arc<RecordingOpener>,
    pub announcer: Arc<RecordingAnnouncer>,
    dir: tempfile::TempDir,
}

impl Harness {
    /// Build a harness with the given recognizer script and permissions
    pub fn new(script: &[&str], allow_arbitrary: bool, allow_download: bool) -> Self {
        Self::build(script, allow_arbitrary, allow_download, Arc::new(FakeWeather), Duration::from_millis(100))
    }

    /// Harness whose weather collaborator always fails
    pub fn with_failing_weather(script: &[&str]) -> Self {
        Self::build(script, false, false, Arc::new(FailingWeather), Duration::from_millis(100))
    }

    /// Harness with a custom debounce window
    pub fn with_debounce(script: &[&str], debounce: Duration) -> Self {
        Self::build(script, false, false, Arc::new(FakeWeather), debounce)
    }

    fn build(
        script: &[&str],
        allow_arbitrary: bool,
        allow_download: bool,
        weather: Arc<dyn WeatherProvider>,
        debounce: Duration,
    ) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = Arc::new(ListenerState::new(debounce));
        let journal = Arc::new(CommandJournal::new(dir.path()));

        let sampler: Arc<dyn Sampler> = Arc::new(SilentSampler);
        let recognizer: Arc<dyn Recognizer> = Arc::new(ScriptedRecognizer::new(script));
        let runner = Arc::new(RecordingRunner::default());
        let videos = Arc::new(FakeVideos::default());
        let opener = Arc::new(RecordingOpener::default());
        let announcer = Arc::new(RecordingAnnouncer::default());

        let settings = HandlerSettings {
            allow_arbitrary,
            allow_download,
            listen: ListenConfig {
                command_window: Duration::from_millis(50),
                confirm_window: Duration::from_millis(50),
            },
            download_dir: dir.path().to_path_buf(),
        };

        let collaborators = Collaborators {
            sampler: Arc::clone(&sampler),
            recognizer: Arc::clone(&recognizer),
            runner: Arc::clone(&runner) as Arc<dyn CommandRunner>,
            weather,
            videos: Arc::clone(&videos) as Arc<dyn VideoSource>,
            opener: Arc::clone(&opener) as Arc<dyn UrlOpener>,
            announcer: Arc::clone(&announcer) as Arc<dyn Announcer>,
        };

        let handler = Arc::new(
            CommandHandler::new(Arc::clone(&state), collaborators, journal, settings)
                .expect("handler"),
        );

        let wake_phrases: Vec<String> = deejay::config::DEFAULT_WAKE_PHRASES
            .iter()
            .map(ToString::to_string)
            .collect();
        let wake = WakeDetector::new(&wake_phrases).expect("wake detector");

        let listener = Listener::new(
            Arc::clone(&state),
            sampler,
            recognizer,
            wake,
            Arc::clone(&handler),
            &WakeConfig::default(),
            ListenerTuning::default(),
        );

        Self {
            state,
            handler,
            listener,
            runner,
            videos,
            opener,
            announcer,
            dir,
        }
    }

    /// Run one handler flow directly, as if a wake trigger won the race
    pub async fn run_flow(&self) {
        let permit = self.state.try_begin_handling().expect("handler slot free");
        self.handler.handle_wake(permit).await;
    }

    /// Read a journal file; empty string when it was never written
    pub fn read_log(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).unwrap_or_default()
    }

    /// Everything the announcer said, joined for matching
    pub fn spoken(&self) -> String {
        self.announcer.lines.lock().unwrap().join("\n")
    }
}
