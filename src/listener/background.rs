//! Background capture loop and recognition workers
//!
//! Continuously records overlapping audio windows and hands each one to a
//! recognition worker without blocking on recognition latency. Workers
//! test transcripts for the wake phrase and, when the debounce gate and
//! the handler slot allow, spawn a command-handling flow.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::audio::Sampler;
use crate::config::WakeConfig;
use crate::handler::CommandHandler;
use crate::listener::state::{ListenerState, WakeGate};
use crate::listener::wake::WakeDetector;
use crate::stt::{Recognition, Recognizer};

/// Loop timing knobs not tied to the wake configuration
#[derive(Debug, Clone)]
pub struct ListenerTuning {
    /// Poll interval while paused
    pub pause_poll: Duration,

    /// Idle sleep after a failed capture
    pub retry_idle: Duration,

    /// Cap on concurrent recognition workers; chunks arriving beyond the
    /// cap are dropped
    pub max_workers: usize,
}

impl Default for ListenerTuning {
    fn default() -> Self {
        Self {
            pause_poll: Duration::from_millis(100),
            retry_idle: Duration::from_millis(200),
            max_workers: 4,
        }
    }
}

/// Drives background capture and wake detection
pub struct Listener {
    state: Arc<ListenerState>,
    sampler: Arc<dyn Sampler>,
    recognizer: Arc<dyn Recognizer>,
    wake: Arc<WakeDetector>,
    handler: Arc<CommandHandler>,
    chunk: Duration,
    overlap: f32,
    tuning: ListenerTuning,
    workers: Arc<Semaphore>,
}

impl Listener {
    /// Create a listener over the shared state and collaborators
    #[must_use]
    pub fn new(
        state: Arc<ListenerState>,
        sampler: Arc<dyn Sampler>,
        recognizer: Arc<dyn Recognizer>,
        wake: WakeDetector,
        handler: Arc<CommandHandler>,
        wake_config: &WakeConfig,
        tuning: ListenerTuning,
    ) -> Self {
        let workers = Arc::new(Semaphore::new(tuning.max_workers));
        Self {
            state,
            sampler,
            recognizer,
            wake: Arc::new(wake),
            handler,
            chunk: wake_config.chunk,
            overlap: wake_config.overlap,
            tuning,
            workers,
        }
    }

    /// Run the capture loop until the running flag clears
    ///
    /// Capture failures idle briefly and retry; they never abort the
    /// loop. While paused the loop polls without capturing so it can
    /// resume instantly.
    pub async fn run(&self) {
        let mut hop = self.chunk.mul_f32(1.0 - self.overlap);
        if hop.is_zero() {
            hop = self.chunk.mul_f32(0.5);
        }

        tracing::info!(
            chunk_ms = self.chunk.as_millis() as u64,
            hop_ms = hop.as_millis() as u64,
            "background loop started"
        );

        while self.state.is_running() {
            if self.state.is_paused() {
                tokio::time::sleep(self.tuning.pause_poll).await;
                continue;
            }

            let started = Instant::now();

            let sampler = Arc::clone(&self.sampler);
            let duration = self.chunk;
            let captured =
                tokio::task::spawn_blocking(move || sampler.capture(duration)).await;

            let chunk = match captured {
                Ok(Ok(chunk)) if !chunk.is_empty() => chunk,
                Ok(Ok(_)) => {
                    tokio::time::sleep(self.tuning.retry_idle).await;
                    continue;
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "background capture failed");
                    tokio::time::sleep(self.tuning.retry_idle).await;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "background capture task failed");
                    tokio::time::sleep(self.tuning.retry_idle).await;
                    continue;
                }
            };

            self.spawn_recognition(chunk);

            // Sleep out the rest of the hop so successive windows overlap
            if let Some(rest) = hop.checked_sub(started.elapsed()) {
                tokio::time::sleep(rest).await;
            }
        }

        tracing::info!("background loop stopped");
    }

    /// Hand a captured chunk to a recognition worker, fire-and-forget
    fn spawn_recognition(&self, chunk: crate::audio::AudioChunk) {
        let Ok(permit) = Arc::clone(&self.workers).try_acquire_owned() else {
            tracing::debug!("recognition workers saturated, dropping chunk");
            return;
        };

        let recognizer = Arc::clone(&self.recognizer);
        let wake = Arc::clone(&self.wake);
        let state = Arc::clone(&self.state);
        let handler = Arc::clone(&self.handler);

        tokio::spawn(async move {
            let _permit = permit;
            match recognizer.transcribe(&chunk).await {
                Ok(Recognition::NoSpeech) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "background recognition error");
                }
                Ok(Recognition::Transcript(text)) => {
                    tracing::debug!(transcript = %text, "heard");
                    let _ = dispatch_wake(&wake, &state, &handler, &text);
                }
            }
        });
    }

    /// Feed a transcript through wake detection, debounce, and the lock
    /// race, spawning a handler flow when all three pass
    ///
    /// Returns the handler task when one was spawned.
    pub fn on_transcript(&self, text: &str) -> Option<JoinHandle<()>> {
        dispatch_wake(&self.wake, &self.state, &self.handler, text)
    }
}

/// The wake gating pipeline shared by workers and `on_transcript`
fn dispatch_wake(
    wake: &Arc<WakeDetector>,
    state: &Arc<ListenerState>,
    handler: &Arc<CommandHandler>,
    text: &str,
) -> Option<JoinHandle<()>> {
    if !wake.matches(text) {
        return None;
    }

    tracing::info!(transcript = %text, "wake phrase detected");

    match state.gate_wake() {
        WakeGate::Debounced { since_last } => {
            tracing::debug!(
                since_last_ms = since_last.as_millis() as u64,
                "wake debounced"
            );
            None
        }
        WakeGate::Accepted => match state.try_begin_handling() {
            // Lost the lock race: the trigger is dropped, never queued
            None => {
                tracing::info!("handler busy, skipping trigger");
                None
            }
            Some(permit) => {
                let handler = Arc::clone(handler);
                Some(tokio::spawn(async move {
                    handler.handle_wake(permit).await;
                }))
            }
        },
    }
}
