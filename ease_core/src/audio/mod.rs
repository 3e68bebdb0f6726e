//! Procedural therapeutic audio.
//!
//! [`AudioEngine`] is the entry point. The submodules are usable on their
//! own: tone and noise synthesis are pure functions, and the graph can be
//! rendered without any device.

pub mod buffer;
pub mod device;
pub mod dsp;
pub mod engine;
pub mod graph;
pub mod noise;
pub mod tones;

pub use device::{AudioDevice, DeviceInfo, DeviceState, OfflineDevice, UnavailableDevice};
#[cfg(feature = "cpal-output")]
pub use device::CpalDevice;
pub use engine::{
    AudioEngine, AudioSessionKind, SessionHandle, SessionInfo, DEFAULT_BINAURAL_BASE_HZ,
    DEFAULT_BINAURAL_BEAT_HZ, DEFAULT_SESSION_SECONDS,
};
pub use graph::{AudioGraph, SharedGraph};
pub use tones::{HealingTone, NatureSound, PAIN_RELIEF_SEQUENCE};
