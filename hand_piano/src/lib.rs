//! # hand_piano
//!
//! Counts fingers on detected hands and plays the matching note of an
//! eight-note scale as a single square-wave tone, with a piano-key
//! visualizer.
//!
//! ## Hands → Tone
//!
//! | Mode | Hand | Result |
//! |---|---|---|
//! | single | first detected | 1–5 fingers → Do..Sol |
//! | cooperative | Right | melody note at table frequency |
//! | cooperative | Left (right silent) | chord note, table frequency + 20 Hz |
//! | game (either mode) | — | +10 when the note matches the target, new target every 3 s |
//!
//! ## Threads
//!
//! The **tick loop** runs on its own thread: block on the hand source,
//! count, resolve, drive the tone sink, score, publish a snapshot.  The
//! **presenter** (window or headless logger) runs on the main thread and
//! only reads snapshots.  On quit or source failure the tick loop stops
//! the tone, releases the source, and then tells the presenter to finish.
//!
//! ## Hand sources
//!
//! * (default) — **Keyboard simulation** in the window:
//!
//! | Keys | Hand | Digits |
//! |---|---|---|
//! | `A S D F G` | Left | pinky → thumb |
//! | `H J K L ;` | Right | thumb → pinky |
//! | `Esc` | — | quit |
//!
//! * `--input <file|->` — **Landmark feed**: one JSON frame per line, as
//!   printed by `finger_menu` or an external hand detector.
//!
//! ## Feature flags
//!
//! * `speaker` — render the tone on the default audio device via rodio.

pub mod error;
pub mod config;
pub mod source;
pub mod tone;
pub mod game;
pub mod snapshot;
pub mod engine;
pub mod visualizer;
pub mod app;

pub use error::{AcquireError, PianoError, Result};
