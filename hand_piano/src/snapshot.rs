//! State shared between the tick loop (sole writer) and the presenter.

use std::sync::atomic::{AtomicBool, Ordering};

use finger_count::FingerCount;
use note_table::{NoteEvent, PlayMode, Role};
use parking_lot::Mutex;
use serde::Serialize;

use crate::tone::{KillSwitch, ToneState};

/// Everything the presenter draws, captured after one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick:      u64,
    pub mode:      PlayMode,
    pub left:      FingerCount,
    pub right:     FingerCount,
    pub note:      NoteEvent,
    /// Display name of `note`, e.g. "Mi".
    pub note_name: Option<&'static str>,
    pub role:      Role,
    pub tone:      ToneState,
    /// Present only when the game is enabled.
    pub target:    Option<u8>,
    pub score:     u32,
}

impl Snapshot {
    /// True when anything the presenter shows differs, ignoring the tick number.
    pub fn differs_visibly(&self, other: &Snapshot) -> bool {
        Snapshot { tick: 0, ..self.clone() } != Snapshot { tick: 0, ..other.clone() }
    }
}

/// The snapshot is replaced whole under the lock, so a reader never sees
/// half of one tick and half of the next.
#[derive(Default)]
pub struct SharedState {
    snapshot: Mutex<Snapshot>,
    quit:     AtomicBool,
    finished: AtomicBool,
    kill:     Mutex<Option<KillSwitch>>,
}

impl SharedState {
    pub fn new() -> Self { Self::default() }

    pub fn publish(&self, snapshot: Snapshot) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().clone()
    }

    /// Ask the tick loop to stop (Ctrl-C, Escape, window closed).
    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    /// Set by the tick loop after its cleanup; the presenter exits on it.
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Installed by the tick loop once its sink is open.
    pub fn set_kill_switch(&self, kill: KillSwitch) {
        *self.kill.lock() = Some(kill);
    }

    /// Silence the output without the tick loop, for exits that skip its
    /// cleanup.  Returns false when no kill switch is installed.
    pub fn hard_stop(&self) -> bool {
        match self.kill.lock().as_ref() {
            Some(kill) => {
                kill();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn publish_replaces_whole_snapshot() {
        let shared = SharedState::new();
        assert_eq!(shared.snapshot(), Snapshot::default());

        let snap = Snapshot {
            tick: 3,
            right: FingerCount::new(3),
            note: NoteEvent::Sounding { index: 3, frequency: 329 },
            note_name: Some("Mi"),
            role: Role::Melody,
            ..Snapshot::default()
        };
        shared.publish(snap.clone());
        assert_eq!(shared.snapshot(), snap);
    }

    #[test]
    fn readers_never_see_torn_snapshots() {
        let shared = Arc::new(SharedState::new());
        let writer = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for i in 0..2_000u64 {
                    let n = (i % 5) as u8 + 1;
                    shared.publish(Snapshot {
                        tick: i,
                        right: FingerCount::new(n),
                        note: NoteEvent::Sounding { index: n, frequency: 100 * n as u32 },
                        score: i as u32,
                        ..Snapshot::default()
                    });
                }
                shared.mark_finished();
            })
        };
        while !shared.is_finished() {
            let s = shared.snapshot();
            assert_eq!(s.score as u64, s.tick);
            if let Some(i) = s.note.index() {
                assert_eq!(i, s.right.get());
            }
        }
        writer.join().unwrap();
    }

    #[test]
    fn flags() {
        let shared = SharedState::new();
        assert!(!shared.quit_requested());
        assert!(!shared.is_finished());
        shared.request_quit();
        shared.mark_finished();
        assert!(shared.quit_requested());
        assert!(shared.is_finished());
    }

    #[test]
    fn hard_stop_runs_installed_kill_switch() {
        use std::sync::atomic::AtomicUsize;

        let shared = SharedState::new();
        assert!(!shared.hard_stop(), "nothing installed yet");

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        shared.set_kill_switch(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(shared.hard_stop());
        assert!(shared.hard_stop());
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn tick_alone_is_not_a_visible_change() {
        let a = Snapshot { tick: 1, ..Snapshot::default() };
        let b = Snapshot { tick: 2, ..Snapshot::default() };
        assert!(!a.differs_visibly(&b));
        let c = Snapshot { score: 10, ..b.clone() };
        assert!(c.differs_visibly(&b));
    }
}
