//! Synthetic hand poses.
//!
//! [`HandPose`] builds a plausible 21-point landmark set for a chosen set of
//! extended fingers.  The right hand is laid out in image space with the
//! thumb on the image-left side; a left hand is the same layout mirrored
//! about `x = 0.5`.  The keyboard simulation feeds these to the counter
//! exactly as a real detector's output would be fed.

use crate::{Handedness, HandObservation, Landmark, LANDMARK_COUNT};

// Right-hand layout.  y grows downward.
const WRIST_POS: (f32, f32) = (0.50, 0.90);

const THUMB_CMC: (f32, f32) = (0.42, 0.82);
const THUMB_MCP: (f32, f32) = (0.36, 0.74);
const THUMB_IP:  (f32, f32) = (0.32, 0.66);
const THUMB_TIP_OPEN:   (f32, f32) = (0.26, 0.60);
const THUMB_TIP_FOLDED: (f32, f32) = (0.40, 0.68);

/// Column of each non-thumb finger, index to pinky.
const FINGER_X: [f32; 4] = [0.42, 0.50, 0.58, 0.65];
const MCP_Y: f32 = 0.62;
const PIP_Y: f32 = 0.50;
const DIP_Y_OPEN:   f32 = 0.42;
const TIP_Y_OPEN:   f32 = 0.35;
const DIP_Y_FOLDED: f32 = 0.56;
const TIP_Y_FOLDED: f32 = 0.60;

/// Which digits are extended, thumb first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandPose {
    pub extended: [bool; 5],
}

impl HandPose {
    pub const FIST: HandPose = HandPose { extended: [false; 5] };
    pub const OPEN: HandPose = HandPose { extended: [true; 5] };

    pub fn new(extended: [bool; 5]) -> Self {
        HandPose { extended }
    }

    /// A pose showing `n` fingers, raised index first and thumb last.
    pub fn with_count(n: u8) -> Self {
        let mut extended = [false; 5];
        for slot in 0..(n.min(5) as usize) {
            // index, middle, ring, pinky, thumb
            extended[(slot + 1) % 5] = true;
        }
        HandPose { extended }
    }

    pub fn count(&self) -> u8 {
        self.extended.iter().filter(|&&e| e).count() as u8
    }

    /// Toggle one digit (0 = thumb … 4 = pinky).
    pub fn toggle(&mut self, digit: usize) {
        if let Some(e) = self.extended.get_mut(digit) {
            *e = !*e;
        }
    }

    pub fn landmarks(&self, handedness: Handedness) -> [Landmark; LANDMARK_COUNT] {
        let at = |(x, y): (f32, f32)| Landmark::new(x, y);
        let mut lm = [Landmark::default(); LANDMARK_COUNT];

        lm[0] = at(WRIST_POS);
        lm[1] = at(THUMB_CMC);
        lm[2] = at(THUMB_MCP);
        lm[3] = at(THUMB_IP);
        lm[4] = at(if self.extended[0] { THUMB_TIP_OPEN } else { THUMB_TIP_FOLDED });

        for (finger, &x) in FINGER_X.iter().enumerate() {
            let base = 5 + finger * 4;
            let (dip_y, tip_y) = if self.extended[finger + 1] {
                (DIP_Y_OPEN, TIP_Y_OPEN)
            } else {
                (DIP_Y_FOLDED, TIP_Y_FOLDED)
            };
            lm[base]     = Landmark::new(x, MCP_Y);
            lm[base + 1] = Landmark::new(x, PIP_Y);
            lm[base + 2] = Landmark::new(x, dip_y);
            lm[base + 3] = Landmark::new(x, tip_y);
        }

        if handedness == Handedness::Left {
            for p in lm.iter_mut() {
                *p = p.mirrored();
            }
        }
        lm
    }

    /// Wrap the pose as a full-confidence detector observation.
    pub fn observe(&self, handedness: Handedness) -> HandObservation {
        HandObservation::from_array(handedness, self.landmarks(handedness), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count_fingers;

    #[test]
    fn with_count_raises_index_first() {
        assert_eq!(HandPose::with_count(1).extended, [false, true, false, false, false]);
        assert_eq!(HandPose::with_count(4).extended, [false, true, true, true, true]);
        assert_eq!(HandPose::with_count(5), HandPose::OPEN);
        assert_eq!(HandPose::with_count(0), HandPose::FIST);
    }

    #[test]
    fn with_count_agrees_with_counter() {
        for n in 0..=5 {
            for h in [Handedness::Left, Handedness::Right] {
                let obs = HandPose::with_count(n).observe(h);
                assert_eq!(count_fingers(&obs).get(), n, "{} hand, {} fingers", h, n);
            }
        }
    }

    #[test]
    fn left_hand_is_mirror_of_right() {
        let r = HandPose::OPEN.landmarks(Handedness::Right);
        let l = HandPose::OPEN.landmarks(Handedness::Left);
        for (a, b) in r.iter().zip(l.iter()) {
            assert!((a.x + b.x - 1.0).abs() < 1e-6);
            assert_eq!(a.y, b.y);
        }
    }

    #[test]
    fn toggle_flips_single_digit() {
        let mut p = HandPose::FIST;
        p.toggle(0);
        p.toggle(4);
        p.toggle(9);
        assert_eq!(p.extended, [true, false, false, false, true]);
        assert_eq!(p.count(), 2);
    }
}
