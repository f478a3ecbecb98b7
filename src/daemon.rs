//! Daemon - the assistant service
//!
//! Wires capture, recognition, wake detection, and the command handler
//! together and drives the background loop until an exit intent or
//! interrupt is observed.

use std::sync::Arc;

use crate::actions::{ConsoleAnnouncer, OpenWeatherClient, SystemBrowser, YtDlp};
use crate::audio::{CpalSampler, Sampler};
use crate::config::Config;
use crate::exec::ProcessRunner;
use crate::handler::{Collaborators, CommandHandler, HandlerSettings};
use crate::journal::CommandJournal;
use crate::listener::{Listener, ListenerState, ListenerTuning, WakeDetector};
use crate::stt::{Recognizer, WhisperStt};
use crate::Result;

/// The assistant daemon
pub struct Daemon {
    config: Config,
}

impl Daemon {
    /// Create a daemon from loaded configuration
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until an exit intent or ctrl-c
    ///
    /// # Errors
    ///
    /// Returns error if the audio device cannot be opened at startup —
    /// the only fatal condition. Everything after startup is absorbed by
    /// the flows and logged.
    pub async fn run(self) -> Result<()> {
        let sampler: Arc<dyn Sampler> = Arc::new(CpalSampler::new()?);
        let recognizer: Arc<dyn Recognizer> = Arc::new(WhisperStt::new(self.config.stt.clone()));

        let state = Arc::new(ListenerState::new(self.config.wake.debounce));
        let journal = Arc::new(CommandJournal::new(&self.config.data_dir));
        let wake = WakeDetector::new(&self.config.wake.phrases)?;

        let collaborators = Collaborators {
            sampler: Arc::clone(&sampler),
            recognizer: Arc::clone(&recognizer),
            runner: Arc::new(ProcessRunner),
            weather: Arc::new(OpenWeatherClient::new(self.config.openweather_key.clone())),
            videos: Arc::new(YtDlp::new()),
            opener: Arc::new(SystemBrowser),
            announcer: Arc::new(ConsoleAnnouncer),
        };

        let handler = Arc::new(CommandHandler::new(
            Arc::clone(&state),
            collaborators,
            Arc::clone(&journal),
            HandlerSettings::from_config(&self.config),
        )?);

        let listener = Listener::new(
            Arc::clone(&state),
            sampler,
            recognizer,
            wake,
            handler,
            &self.config.wake,
            ListenerTuning::default(),
        );

        // ctrl-c clears the running flag; the loop exits on its next check
        let shutdown_state = Arc::clone(&state);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                shutdown_state.stop();
            }
        });

        if self.config.allow_download {
            tracing::info!("downloads enabled for this session");
        }
        if self.config.allow_arbitrary {
            tracing::info!("arbitrary commands enabled for this session");
        }
        tracing::info!("assistant ready - say \"hey dj\"");

        listener.run().await;

        tracing::info!("assistant stopped");
        Ok(())
    }
}
