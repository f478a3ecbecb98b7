//! deejay - hands-free voice command assistant
//!
//! Continuously listens for a wake phrase in the background, then
//! actively listens for a spoken command, maps it to an action, confirms
//! sensitive actions aloud, executes, and returns to background
//! listening.
//!
//! # Architecture
//!
//! ```text
//! microphone
//!     │
//! ┌───▼──────────────────────────────────────────────┐
//! │ BackgroundLoop      overlapping capture windows  │
//! │   └─ RecognitionWorker (per chunk, bounded)      │
//! │        └─ WakeDetector → debounce → lock race    │
//! └───────────────────┬──────────────────────────────┘
//!                     │ wake accepted
//! ┌───────────────────▼──────────────────────────────┐
//! │ CommandHandler   pause → listen → map → confirm  │
//! │                  → execute → journal → resume    │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod audio;
pub mod config;
pub mod daemon;
pub mod error;
pub mod exec;
pub mod handler;
pub mod intent;
pub mod journal;
pub mod listener;
pub mod stt;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use handler::{Collaborators, CommandHandler, HandlerSettings};
pub use intent::{IntentMapper, MappedAction};
pub use journal::CommandJournal;
pub use listener::{Listener, ListenerState, ListenerTuning, WakeDetector, WakeGate};
pub use stt::{Recognition, Recognizer};
