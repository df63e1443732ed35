//! # finger_count
//!
//! Counts extended fingers on the 21-point hand landmark sets produced by an
//! external hand-landmark detector.
//!
//! ## Landmark layout
//!
//! | Index | Joint |
//! |---|---|
//! | 0 | wrist |
//! | 1–4 | thumb: CMC, MCP, IP, tip |
//! | 5–8 | index: MCP, PIP, DIP, tip |
//! | 9–12 | middle: MCP, PIP, DIP, tip |
//! | 13–16 | ring: MCP, PIP, DIP, tip |
//! | 17–20 | pinky: MCP, PIP, DIP, tip |
//!
//! Coordinates are normalised image coordinates: `x` grows to the right,
//! `y` grows **downward**.
//!
//! ## Counting rule
//!
//! * **Index, middle, ring, pinky** — extended when the tip is strictly
//!   above (smaller `y`) the PIP joint two indices below it.
//! * **Thumb** — compares the tip's `x` with the IP joint's `x`.  A right
//!   hand's thumb is extended when the tip lies left of the joint; the test
//!   is mirrored for a left hand.
//!
//! This is a plain coordinate threshold evaluated per frame.  Tilted or
//! oblique hands can be misclassified and there is no smoothing between
//! frames.
//!
//! ## Quick start
//!
//! ```rust
//! use finger_count::{count_fingers, Handedness, HandPose};
//!
//! let peace = HandPose::new([false, true, true, false, false]);
//! let hand  = peace.observe(Handedness::Right);
//! assert_eq!(count_fingers(&hand).get(), 2);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod pose;

pub use pose::HandPose;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indexing
// ════════════════════════════════════════════════════════════════════════════

/// Landmarks per detected hand.
pub const LANDMARK_COUNT: usize = 21;

/// Upper bound of a [`FingerCount`].
pub const MAX_FINGERS: u8 = 5;

pub const WRIST:      usize = 0;
pub const THUMB_IP:   usize = 3;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP:   usize = 16;
pub const PINKY_TIP:  usize = 20;

/// Tips of the four non-thumb fingers, index to pinky.
pub const FINGER_TIPS: [usize; 4] = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// Distance in the canonical ordering from a fingertip back to its PIP joint.
const PIP_OFFSET: usize = 2;

/// The five digits, in landmark order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    /// Landmark index of this digit's tip.
    pub fn tip(self) -> usize {
        match self {
            Finger::Thumb  => THUMB_TIP,
            Finger::Index  => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring   => RING_TIP,
            Finger::Pinky  => PINKY_TIP,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb  => "thumb",
            Finger::Index  => "index",
            Finger::Middle => "middle",
            Finger::Ring   => "ring",
            Finger::Pinky  => "pinky",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark / Handedness
// ════════════════════════════════════════════════════════════════════════════

/// One normalised landmark position.  `z` is optional on the wire and
/// ignored by the counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }

    /// The same point reflected about the vertical centre line of the image.
    pub fn mirrored(self) -> Self {
        Landmark { x: 1.0 - self.x, ..self }
    }
}

/// Handedness label attached by the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn name(self) -> &'static str {
        match self {
            Handedness::Left  => "Left",
            Handedness::Right => "Right",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Handedness::Left  => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandObservation
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LandmarkError {
    #[error("expected {expected} landmarks per hand, found {found}")]
    WrongLandmarkCount { expected: usize, found: usize },
}

/// One detected hand in one frame: handedness, exactly 21 landmarks and the
/// detector's confidence.  Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservation", into = "RawObservation")]
pub struct HandObservation {
    handedness: Handedness,
    landmarks:  [Landmark; LANDMARK_COUNT],
    score:      f32,
}

impl HandObservation {
    /// Build from a landmark list, rejecting anything but 21 points.
    pub fn new(
        handedness: Handedness,
        landmarks:  Vec<Landmark>,
        score:      f32,
    ) -> Result<Self, LandmarkError> {
        let landmarks: [Landmark; LANDMARK_COUNT] = landmarks
            .try_into()
            .map_err(|v: Vec<Landmark>| LandmarkError::WrongLandmarkCount {
                expected: LANDMARK_COUNT,
                found:    v.len(),
            })?;
        Ok(Self::from_array(handedness, landmarks, score))
    }

    pub fn from_array(
        handedness: Handedness,
        landmarks:  [Landmark; LANDMARK_COUNT],
        score:      f32,
    ) -> Self {
        HandObservation { handedness, landmarks, score }
    }

    pub fn handedness(&self) -> Handedness { self.handedness }
    pub fn landmarks(&self)  -> &[Landmark; LANDMARK_COUNT] { &self.landmarks }
    pub fn landmark(&self, index: usize) -> Landmark { self.landmarks[index] }
    /// Detection confidence, 0.0–1.0.
    pub fn score(&self) -> f32 { self.score }
}

/// Wire shape of an observation; `landmarks` is length-checked on conversion.
#[derive(Serialize, Deserialize)]
struct RawObservation {
    handedness: Handedness,
    #[serde(default = "full_confidence")]
    score:      f32,
    landmarks:  Vec<Landmark>,
}

fn full_confidence() -> f32 { 1.0 }

impl TryFrom<RawObservation> for HandObservation {
    type Error = LandmarkError;

    fn try_from(raw: RawObservation) -> Result<Self, Self::Error> {
        HandObservation::new(raw.handedness, raw.landmarks, raw.score)
    }
}

impl From<HandObservation> for RawObservation {
    fn from(obs: HandObservation) -> Self {
        RawObservation {
            handedness: obs.handedness,
            score:      obs.score,
            landmarks:  obs.landmarks.to_vec(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FingerCount and the counter
// ════════════════════════════════════════════════════════════════════════════

/// Number of extended digits on one hand, always within `0..=5`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FingerCount(u8);

impl FingerCount {
    pub const ZERO: FingerCount = FingerCount(0);

    /// Saturates at [`MAX_FINGERS`].
    pub fn new(n: u8) -> Self {
        FingerCount(n.min(MAX_FINGERS))
    }

    pub fn get(self) -> u8 { self.0 }
}

impl From<FingerCount> for u8 {
    fn from(c: FingerCount) -> u8 { c.0 }
}

impl fmt::Display for FingerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-digit extension flags, thumb first.
pub fn extended_fingers(hand: &HandObservation) -> [bool; 5] {
    let lm = hand.landmarks();
    let mut out = [false; 5];
    out[0] = thumb_extended(hand.handedness(), lm[THUMB_TIP], lm[THUMB_IP]);
    for (slot, &tip) in out[1..].iter_mut().zip(FINGER_TIPS.iter()) {
        *slot = lm[tip].y < lm[tip - PIP_OFFSET].y;
    }
    out
}

fn thumb_extended(handedness: Handedness, tip: Landmark, ip: Landmark) -> bool {
    match handedness {
        Handedness::Right => tip.x < ip.x,
        Handedness::Left  => tip.x > ip.x,
    }
}

/// Count the extended digits on one hand.
pub fn count_fingers(hand: &HandObservation) -> FingerCount {
    let n = extended_fingers(hand).iter().filter(|&&e| e).count();
    FingerCount::new(n as u8)
}

/// Count for a hand that may be absent; an absent hand counts 0.
pub fn count_hand(hand: Option<&HandObservation>) -> FingerCount {
    hand.map(count_fingers).unwrap_or(FingerCount::ZERO)
}

// ════════════════════════════════════════════════════════════════════════════
// HandFrame — everything the detector reported for one tick
// ════════════════════════════════════════════════════════════════════════════

/// Zero or more hands detected in one frame, in detector order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    #[serde(default)]
    pub hands: Vec<HandObservation>,
}

/// Finger counts derived from one [`HandFrame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandCounts {
    pub left:    FingerCount,
    pub right:   FingerCount,
    /// Count of the first detected hand, whatever its label.
    pub primary: FingerCount,
}

impl HandFrame {
    pub fn empty() -> Self { HandFrame::default() }

    pub fn new(hands: Vec<HandObservation>) -> Self { HandFrame { hands } }

    pub fn is_empty(&self) -> bool  { self.hands.is_empty() }
    pub fn len(&self)      -> usize { self.hands.len() }

    /// First detected hand.
    pub fn first(&self) -> Option<&HandObservation> { self.hands.first() }

    /// Hand carrying the given label.  When the detector reports two hands
    /// with the same label, the later one wins.
    pub fn hand(&self, handedness: Handedness) -> Option<&HandObservation> {
        self.hands.iter().rev().find(|h| h.handedness() == handedness)
    }

    /// Keep at most `max_hands` observations (detector order).
    pub fn truncate(&mut self, max_hands: usize) {
        self.hands.truncate(max_hands);
    }

    /// Drop observations whose confidence is below `min_score`.
    pub fn retain_confident(&mut self, min_score: f32) {
        self.hands.retain(|h| h.score() >= min_score);
    }

    pub fn counts(&self) -> HandCounts {
        HandCounts {
            left:    count_hand(self.hand(Handedness::Left)),
            right:   count_hand(self.hand(Handedness::Right)),
            primary: count_hand(self.first()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn right(pose: [bool; 5]) -> HandObservation {
        HandPose::new(pose).observe(Handedness::Right)
    }

    fn left(pose: [bool; 5]) -> HandObservation {
        HandPose::new(pose).observe(Handedness::Left)
    }

    // ── counter ───────────────────────────────────────────────────────────
    #[test]
    fn open_hand_counts_five_on_both_sides() {
        assert_eq!(count_fingers(&right([true; 5])).get(), 5);
        assert_eq!(count_fingers(&left([true; 5])).get(), 5);
    }

    #[test]
    fn fist_counts_zero() {
        assert_eq!(count_fingers(&right([false; 5])), FingerCount::ZERO);
        assert_eq!(count_fingers(&left([false; 5])), FingerCount::ZERO);
    }

    #[test]
    fn thumb_rule_is_mirrored_by_handedness() {
        // A right-hand landmark set relabelled as Left flips the thumb only.
        let thumb_only = right([true, false, false, false, false]);
        let relabelled = HandObservation::from_array(
            Handedness::Left, *thumb_only.landmarks(), 1.0,
        );
        assert_eq!(count_fingers(&thumb_only).get(), 1);
        assert_eq!(count_fingers(&relabelled).get(), 0);
    }

    #[test]
    fn tip_level_with_pip_is_not_extended() {
        let mut lm = *right([false, true, false, false, false]).landmarks();
        lm[INDEX_TIP].y = lm[INDEX_TIP - 2].y;
        let hand = HandObservation::from_array(Handedness::Right, lm, 1.0);
        assert_eq!(count_fingers(&hand).get(), 0);
    }

    #[test]
    fn extended_flags_are_thumb_first() {
        let flags = extended_fingers(&right([true, false, true, false, true]));
        assert_eq!(flags, [true, false, true, false, true]);
    }

    #[test]
    fn absent_hand_counts_zero() {
        assert_eq!(count_hand(None), FingerCount::ZERO);
    }

    #[test]
    fn finger_count_saturates() {
        assert_eq!(FingerCount::new(9).get(), MAX_FINGERS);
    }

    proptest! {
        #[test]
        fn count_matches_extended_digits(
            pose in proptest::array::uniform5(any::<bool>()),
            is_left in any::<bool>(),
            dx in -0.2f32..0.2,
            dy in -0.05f32..0.05,
        ) {
            let handedness = if is_left { Handedness::Left } else { Handedness::Right };
            let mut lm = HandPose::new(pose).landmarks(handedness);
            for p in lm.iter_mut() {
                p.x += dx;
                p.y += dy;
            }
            let hand = HandObservation::from_array(handedness, lm, 0.9);
            let expected = pose.iter().filter(|&&e| e).count() as u8;
            prop_assert_eq!(count_fingers(&hand).get(), expected);
        }
    }

    // ── observation validation ────────────────────────────────────────────
    #[test]
    fn wrong_landmark_count_rejected() {
        let err = HandObservation::new(Handedness::Right, vec![Landmark::default(); 20], 1.0)
            .unwrap_err();
        assert_eq!(err, LandmarkError::WrongLandmarkCount { expected: 21, found: 20 });
    }

    #[test]
    fn json_observation_parses_without_z_or_score() {
        let points: Vec<String> = (0..21)
            .map(|i| format!(r#"{{"x":{},"y":0.5}}"#, i as f32 / 21.0))
            .collect();
        let json = format!(
            r#"{{"handedness":"Left","landmarks":[{}]}}"#,
            points.join(",")
        );
        let obs: HandObservation = serde_json::from_str(&json).unwrap();
        assert_eq!(obs.handedness(), Handedness::Left);
        assert_eq!(obs.score(), 1.0);
        assert_eq!(obs.landmark(WRIST).z, 0.0);
    }

    #[test]
    fn json_observation_with_short_landmarks_fails() {
        let json = r#"{"handedness":"Right","score":0.9,"landmarks":[{"x":0.1,"y":0.2}]}"#;
        assert!(serde_json::from_str::<HandObservation>(json).is_err());
    }

    #[test]
    fn json_round_trip_keeps_landmarks() {
        let obs = right([true, true, false, false, true]);
        let text = serde_json::to_string(&obs).unwrap();
        let back: HandObservation = serde_json::from_str(&text).unwrap();
        assert_eq!(back, obs);
    }

    // ── frames ────────────────────────────────────────────────────────────
    #[test]
    fn frame_counts_by_label_and_primary() {
        let frame = HandFrame::new(vec![left([true; 5]), right([false, true, true, false, false])]);
        let c = frame.counts();
        assert_eq!(c.left.get(), 5);
        assert_eq!(c.right.get(), 2);
        assert_eq!(c.primary.get(), 5);
    }

    #[test]
    fn empty_frame_counts_zero() {
        assert_eq!(HandFrame::empty().counts(), HandCounts::default());
    }

    #[test]
    fn duplicate_label_uses_last_hand() {
        let frame = HandFrame::new(vec![right([true; 5]), right([false, true, false, false, false])]);
        assert_eq!(frame.counts().right.get(), 1);
        assert_eq!(frame.counts().left, FingerCount::ZERO);
        // Single mode still follows the first detected hand.
        assert_eq!(frame.counts().primary.get(), 5);
    }

    #[test]
    fn frame_truncate_and_confidence_filter() {
        let weak = HandObservation::from_array(
            Handedness::Left, HandPose::OPEN.landmarks(Handedness::Left), 0.4,
        );
        let mut frame = HandFrame::new(vec![weak, right([true; 5])]);
        frame.retain_confident(0.7);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.first().map(|h| h.handedness()), Some(Handedness::Right));
        frame.truncate(0);
        assert!(frame.is_empty());
    }
}
