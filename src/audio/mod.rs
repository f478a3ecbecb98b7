//! Audio capture
//!
//! Fixed-duration microphone sampling for the background listener and the
//! active command listens. Speech recognition consumes the captured chunks
//! (see `stt`).

mod capture;

pub use capture::{AudioChunk, CpalSampler, SAMPLE_RATE, Sampler, samples_to_wav};
