#![forbid(unsafe_code)]

//! Core of the PainEase guided exercise and audio therapy system.
//!
//! This crate provides:
//! - Domain types (exercises, programs, phase steps, metrics)
//! - Catalog of built-in programs
//! - The guided session runtime and its lifecycle events
//! - The procedural audio engine
//! - Configuration, logging and the session journal

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod timer;
pub mod phases;
pub mod metrics;
pub mod events;
pub mod runtime;
pub mod audio;
pub mod journal;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, SessionCatalog};
pub use config::Config;
pub use events::{EventKind, ListenerId, SessionEvent};
pub use runtime::{SessionRuntime, SessionStatus};
pub use audio::{AudioEngine, HealingTone, NatureSound, SessionHandle};
pub use journal::{JsonlJournal, RecordSink, RunOutcome, SessionRecord};
