//! Note-matching game: a random target note every few seconds, points when
//! the played note matches it.

use std::time::{Duration, Instant};

use note_table::{NoteEvent, NOTE_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GameConfig;

/// When a matching tick earns points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScorePolicy {
    /// Every tick whose note matches the target scores.
    #[default]
    PerTick,
    /// Only the first matching tick of each target period scores.
    OncePerTarget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GameEvent {
    TargetChanged { target: u8 },
    Scored { delta: u32, total: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameState {
    /// Note index in `1..=8`.
    pub target:     u8,
    pub score:      u32,
    pub spawned_at: Instant,
}

pub struct GameScorer<R: Rng = StdRng> {
    rng:      R,
    state:    GameState,
    interval: Duration,
    points:   u32,
    policy:   ScorePolicy,
    /// Whether the current target has already scored.
    matched:  bool,
}

impl GameScorer<StdRng> {
    /// Seeded from `config.seed` when given, else from the OS.
    pub fn from_config(config: &GameConfig, now: Instant) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_os_rng(),
        };
        GameScorer::new(rng, config, now)
    }
}

impl<R: Rng> GameScorer<R> {
    /// Draws the first target immediately.
    pub fn new(mut rng: R, config: &GameConfig, now: Instant) -> Self {
        let target = draw_target(&mut rng);
        info!(target, "game started");
        GameScorer {
            rng,
            state: GameState { target, score: 0, spawned_at: now },
            interval: config.interval(),
            points:   config.points,
            policy:   config.scoring,
            matched:  false,
        }
    }

    pub fn state(&self) -> &GameState { &self.state }
    pub fn target(&self) -> u8 { self.state.target }
    pub fn score(&self) -> u32 { self.state.score }

    /// Replace the target now, restarting its period.
    pub fn set_target(&mut self, target: u8, now: Instant) {
        self.state.target = target;
        self.state.spawned_at = now;
        self.matched = false;
    }

    /// Advance to `now`, then score `note`.
    ///
    /// Expiry is checked first, so a note played on the tick that crosses a
    /// boundary is compared against the new target.
    ///
    /// Targets only rotate here.  While the hand feed stalls no tick runs,
    /// so the presenter keeps showing the expired target; the next tick
    /// draws once and realigns `spawned_at` to the last boundary passed.
    pub fn tick(&mut self, now: Instant, note: NoteEvent) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if !self.interval.is_zero() && now.duration_since(self.state.spawned_at) >= self.interval {
            // Whole periods only, so the cadence does not drift with tick jitter.
            while now.duration_since(self.state.spawned_at) >= self.interval {
                self.state.spawned_at += self.interval;
            }
            self.state.target = draw_target(&mut self.rng);
            self.matched = false;
            info!(target = self.state.target, "new target");
            events.push(GameEvent::TargetChanged { target: self.state.target });
        }

        if note.index() == Some(self.state.target) {
            let scores = match self.policy {
                ScorePolicy::PerTick       => true,
                ScorePolicy::OncePerTarget => !self.matched,
            };
            self.matched = true;
            if scores {
                self.state.score += self.points;
                events.push(GameEvent::Scored { delta: self.points, total: self.state.score });
            }
        }

        events
    }
}

fn draw_target<R: Rng>(rng: &mut R) -> u8 {
    rng.random_range(1..=NOTE_COUNT as u8)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
