//! Thread coordination: the tick loop on its own thread, the presenter on
//! the main thread.
//!
//! The presenter runs on the main thread because the window must; the tick
//! loop opens its tone sink on its own thread because audio handles are
//! not `Send`.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use note_table::NoteTable;
use tracing::{info, warn};

use crate::config::{PianoConfig, SourceKind};
use crate::engine::Engine;
use crate::error::{AcquireError, PianoError, Result};
use crate::snapshot::SharedState;
use crate::source::{open_source, HandSource, SimHands};
use crate::tone::{open_tone_sink, ToneSink};
use crate::visualizer::Visualizer;

/// How often the headless presenter looks at the snapshot.
const HEADLESS_POLL: Duration = Duration::from_millis(50);

// ════════════════════════════════════════════════════════════════════════════
// StopReason
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum StopReason {
    /// Ctrl-C, Escape or the window closing.
    Quit,
    /// The hand source stopped producing frames.
    SourceFailed(AcquireError),
}

impl StopReason {
    /// End of input and quitting are normal; anything else is a failure.
    pub fn is_error(&self) -> bool {
        match self {
            StopReason::Quit            => false,
            StopReason::SourceFailed(e) => !e.is_orderly(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run_tick_loop
// ════════════════════════════════════════════════════════════════════════════

/// Tick until quit is requested or the source fails, then clean up in
/// order: stop the tone, release the source, signal the presenter.
pub fn run_tick_loop(
    mut source: Box<dyn HandSource + Send>,
    engine:     &mut Engine,
    sink:       &mut dyn ToneSink,
    shared:     &SharedState,
) -> StopReason {
    info!(source = source.name(), sink = sink.name(), mode = %engine.mode(), "tick loop started");

    let reason = loop {
        if shared.quit_requested() {
            break StopReason::Quit;
        }
        match source.next_frame() {
            Ok(frame) => {
                let report = engine.step(&frame, Instant::now(), sink);
                shared.publish(engine.snapshot(&report));
            }
            // A window closed on purpose also disconnects the keyboard source.
            Err(e) if e.is_orderly() && shared.quit_requested() => break StopReason::Quit,
            Err(e) => break StopReason::SourceFailed(e),
        }
    };

    engine.shutdown(sink);
    drop(source);
    shared.mark_finished();

    info!(ticks = engine.ticks(), reason = ?reason, "tick loop finished");
    reason
}

// ════════════════════════════════════════════════════════════════════════════
// Coordinator
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the tick-loop thread.
pub struct Coordinator {
    handle: JoinHandle<StopReason>,
}

impl Coordinator {
    pub fn spawn(
        config: &PianoConfig,
        source: Box<dyn HandSource + Send>,
        shared: Arc<SharedState>,
    ) -> Result<Self> {
        let config = config.clone();
        let handle = thread::Builder::new()
            .name("tick-loop".to_string())
            .spawn(move || {
                let mut sink   = open_tone_sink(&config.tone);
                if let Some(kill) = sink.kill_switch() {
                    shared.set_kill_switch(kill);
                }
                let mut engine = Engine::from_config(&config, Instant::now());
                shared.publish(engine.initial_snapshot());
                run_tick_loop(source, &mut engine, sink.as_mut(), &shared)
            })?;
        Ok(Coordinator { handle })
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn join(self) -> Result<StopReason> {
        self.handle.join().map_err(|_| PianoError::TickLoopPanicked)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the application entry point
// ════════════════════════════════════════════════════════════════════════════

/// Run until quit or source failure.  Blocks the calling (main) thread in
/// the presenter.
pub fn run(config: &PianoConfig, shared: Arc<SharedState>) -> Result<StopReason> {
    config.validate()?;

    if !config.window.enabled {
        let source = open_source(config, None)?;
        let coordinator = Coordinator::spawn(config, source, Arc::clone(&shared))?;
        present_headless(&shared, &coordinator);
        return coordinator.join();
    }

    let (sim_tx, sim_rx) = mpsc::channel::<SimHands>();
    let sim_rx = (config.source.kind == SourceKind::Keyboard).then_some(sim_rx);
    let source = open_source(config, sim_rx)?;

    let vis = Visualizer::new(&config.window.title, sim_tx)?;
    let coordinator = Coordinator::spawn(config, source, Arc::clone(&shared))?;

    if let Err(e) = vis.run(&shared, &coordinator, &NoteTable::standard()) {
        warn!(error = %e, "visualizer stopped");
    }
    shared.request_quit();
    coordinator.join()
}

/// Log visible changes until the tick loop finishes.
fn present_headless(shared: &SharedState, coordinator: &Coordinator) {
    let mut last = shared.snapshot();
    while !shared.is_finished() && coordinator.is_running() {
        thread::sleep(HEADLESS_POLL);
        let snap = shared.snapshot();
        if snap.differs_visibly(&last) {
            info!(
                left = %snap.left,
                right = %snap.right,
                note = snap.note_name.unwrap_or("-"),
                role = snap.role.name(),
                target = ?snap.target,
                score = snap.score,
                "state"
            );
            last = snap;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
