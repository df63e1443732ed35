//! The per-tick decision engine.
//!
//! `Engine::step` is the whole of one tick minus acquisition: count the
//! hands, resolve a note, drive the tone sink, score.  It touches no
//! device except through the `ToneSink` it is handed, so tests drive it
//! with synthetic counts and a recording sink.

use std::time::Instant;

use finger_count::{HandCounts, HandFrame};
use note_table::{resolve_counts, CooperativeFrame, NoteEvent, NoteTable, PlayMode};
use tracing::{debug, info};

use crate::config::PianoConfig;
use crate::game::{GameEvent, GameScorer};
use crate::snapshot::Snapshot;
use crate::tone::{ToneCommand, ToneSink, ToneTrigger};

/// What one tick did.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub tick:    u64,
    pub frame:   CooperativeFrame,
    /// Command sent to the sink this tick, if any.
    pub command: Option<ToneCommand>,
    pub events:  Vec<GameEvent>,
}

pub struct Engine {
    table:     NoteTable,
    mode:      PlayMode,
    trigger:   ToneTrigger,
    game:      Option<GameScorer>,
    ticks:     u64,
    last_note: NoteEvent,
}

impl Engine {
    pub fn new(table: NoteTable, mode: PlayMode, game: Option<GameScorer>) -> Self {
        Engine {
            table,
            mode,
            trigger:   ToneTrigger::new(),
            game,
            ticks:     0,
            last_note: NoteEvent::Silence,
        }
    }

    /// Standard table; the game starts at `now` when enabled.
    pub fn from_config(config: &PianoConfig, now: Instant) -> Self {
        let game = config.game.enabled.then(|| GameScorer::from_config(&config.game, now));
        Engine::new(NoteTable::standard(), config.engine.mode, game)
    }

    pub fn table(&self) -> &NoteTable { &self.table }
    pub fn mode(&self)  -> PlayMode   { self.mode }
    pub fn ticks(&self) -> u64        { self.ticks }
    pub fn game(&self)  -> Option<&GameScorer> { self.game.as_ref() }
    pub fn game_mut(&mut self) -> Option<&mut GameScorer> { self.game.as_mut() }

    /// Pure resolution of one tick's counts.
    pub fn resolve(&self, counts: HandCounts) -> CooperativeFrame {
        resolve_counts(&self.table, self.mode, counts)
    }

    pub fn step(&mut self, frame: &HandFrame, now: Instant, sink: &mut dyn ToneSink) -> TickReport {
        self.step_counts(frame.counts(), now, sink)
    }

    pub fn step_counts(&mut self, counts: HandCounts, now: Instant, sink: &mut dyn ToneSink) -> TickReport {
        let frame   = self.resolve(counts);
        let command = self.trigger.update(frame.note, sink);
        let events  = match self.game.as_mut() {
            Some(game) => game.tick(now, frame.note),
            None       => Vec::new(),
        };
        self.ticks += 1;

        if frame.note != self.last_note {
            info!(
                note = self.table.name_of(frame.note).unwrap_or("-"),
                frequency = frame.note.frequency().unwrap_or(0),
                role = frame.role.name(),
                "note changed"
            );
            self.last_note = frame.note;
        }
        debug!(tick = self.ticks, left = %frame.left, right = %frame.right, note = %frame.note, "tick");

        TickReport { tick: self.ticks, frame, command, events }
    }

    /// Stop the tone unconditionally.
    pub fn shutdown(&mut self, sink: &mut dyn ToneSink) -> ToneCommand {
        info!(sink = sink.name(), "stopping tone");
        self.trigger.silence(sink)
    }

    /// What the presenter should show after `report`.
    pub fn snapshot(&self, report: &TickReport) -> Snapshot {
        Snapshot {
            tick:      report.tick,
            mode:      self.mode,
            left:      report.frame.left,
            right:     report.frame.right,
            note:      report.frame.note,
            note_name: self.table.name_of(report.frame.note),
            role:      report.frame.role,
            tone:      self.trigger.state(),
            target:    self.game.as_ref().map(|g| g.target()),
            score:     self.game.as_ref().map(|g| g.score()).unwrap_or(0),
        }
    }

    /// Snapshot before the first tick.
    pub fn initial_snapshot(&self) -> Snapshot {
        Snapshot {
            mode:   self.mode,
            tone:   self.trigger.state(),
            target: self.game.as_ref().map(|g| g.target()),
            ..Snapshot::default()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::tone::RecordingSink;
    use finger_count::{FingerCount, HandPose, Handedness};
    use note_table::Role;
    use std::time::Duration;

    fn counts(left: u8, right: u8) -> HandCounts {
        HandCounts {
            left:    FingerCount::new(left),
            right:   FingerCount::new(right),
            primary: FingerCount::new(if right > 0 { right } else { left }),
        }
    }

    fn coop() -> Engine {
        Engine::new(NoteTable::standard(), PlayMode::Cooperative, None)
    }

    #[test]
    fn cooperative_sequence_drives_sink() {
        let mut engine = coop();
        let mut sink = RecordingSink::default();
        let t = Instant::now();

        let r1 = engine.step_counts(counts(2, 3), t, &mut sink);
        assert_eq!(r1.frame.role, Role::Melody);
        assert_eq!(r1.command, Some(ToneCommand::play(329)));

        let r2 = engine.step_counts(counts(4, 3), t, &mut sink);
        assert_eq!(r2.command, None, "same melody note, left ignored");

        let r3 = engine.step_counts(counts(4, 0), t, &mut sink);
        assert_eq!(r3.frame.role, Role::Chord);
        assert_eq!(r3.command, Some(ToneCommand::play(369)));

        let r4 = engine.step_counts(counts(0, 0), t, &mut sink);
        assert_eq!(r4.frame.note, NoteEvent::Silence);
        assert_eq!(r4.command, Some(ToneCommand::stop(369)));

        assert_eq!(sink.commands.len(), 3);
        assert_eq!(engine.ticks(), 4);
    }

    #[test]
    fn single_mode_follows_first_hand() {
        let mut engine = Engine::new(NoteTable::standard(), PlayMode::Single, None);
        let mut sink = RecordingSink::default();
        let frame = HandFrame::new(vec![
            HandPose::with_count(1).observe(Handedness::Left),
            HandPose::with_count(5).observe(Handedness::Right),
        ]);
        let report = engine.step(&frame, Instant::now(), &mut sink);
        assert_eq!(report.frame.note, NoteEvent::Sounding { index: 1, frequency: 261 });
        assert_eq!(report.frame.role, Role::None);
    }

    #[test]
    fn empty_frame_is_silence() {
        let mut engine = coop();
        let mut sink = RecordingSink::default();
        let report = engine.step(&HandFrame::empty(), Instant::now(), &mut sink);
        assert_eq!(report.frame.note, NoteEvent::Silence);
        assert_eq!(report.command, Some(ToneCommand::stop(0)));
        assert_eq!(sink.commands, vec![ToneCommand::stop(0)]);
    }

    #[test]
    fn shutdown_stops_playing_tone() {
        let mut engine = coop();
        let mut sink = RecordingSink::default();
        engine.step_counts(counts(0, 5), Instant::now(), &mut sink);
        assert_eq!(engine.shutdown(&mut sink), ToneCommand::stop(392));
        assert!(!engine.snapshot(&TickReport {
            tick: 1, frame: CooperativeFrame::default(), command: None, events: vec![],
        }).tone.playing);
    }

    #[test]
    fn game_scores_through_engine() {
        let t0 = Instant::now();
        let game_cfg = GameConfig { enabled: true, seed: Some(1), ..GameConfig::default() };
        let game = GameScorer::from_config(&game_cfg, t0);
        let mut engine = Engine::new(NoteTable::standard(), PlayMode::Cooperative, Some(game));
        if let Some(g) = engine.game_mut() {
            g.set_target(4, t0);
        }
        let mut sink = RecordingSink::default();

        // Fa through the left hand: index 4 at 369 Hz still matches.
        let report = engine.step_counts(counts(4, 0), t0 + Duration::from_millis(10), &mut sink);
        assert_eq!(report.events, vec![GameEvent::Scored { delta: 10, total: 10 }]);

        let snap = engine.snapshot(&report);
        assert_eq!(snap.score, 10);
        assert_eq!(snap.target, Some(4));
        assert_eq!(snap.note_name, Some("Fa"));
        assert_eq!(snap.role, Role::Chord);
        assert!(snap.tone.playing);
    }

    #[test]
    fn indices_above_five_only_reachable_as_targets() {
        let engine = coop();
        for l in 0..=5 {
            for r in 0..=5 {
                let f = engine.resolve(counts(l, r));
                assert!(f.note.index().map_or(true, |i| i <= 5));
            }
        }
    }
}
