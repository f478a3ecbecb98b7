//! Background listening
//!
//! Continuous overlapping audio capture, per-chunk recognition workers,
//! wake-phrase gating, and the shared listener state that coordinates the
//! background loop with the command handler.

mod background;
mod state;
mod wake;

pub use background::{Listener, ListenerTuning};
pub use state::{HandlerPermit, ListenerState, WakeGate};
pub use wake::WakeDetector;
