//! Hand sources — where the per-tick `HandFrame`s come from.
//!
//! The tick loop only sees [`HandSource`]; it does not know whether the
//! hands came from held keys in the window or from a landmark feed.  Every
//! `Err` returned by `next_frame` ends the session.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use finger_count::{HandFrame, HandPose, Handedness};
use tracing::{debug, info};

use crate::config::{PianoConfig, SourceKind};
use crate::error::{AcquireError, PianoError, Result};

// ════════════════════════════════════════════════════════════════════════════
// HandSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver one [`HandFrame`] per tick.
pub trait HandSource {
    /// Block until the next frame is available.
    fn next_frame(&mut self) -> std::result::Result<HandFrame, AcquireError>;

    fn name(&self) -> &'static str;
}

// ════════════════════════════════════════════════════════════════════════════
// Pacer
// ════════════════════════════════════════════════════════════════════════════

/// Sleeps so that successive `wait` calls return once per period.
#[derive(Debug)]
pub struct Pacer {
    period: Duration,
    next:   Option<Instant>,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Pacer { period, next: None }
    }

    pub fn wait(&mut self) {
        let now = Instant::now();
        let due = self.next.unwrap_or(now);
        if due > now {
            thread::sleep(due - now);
        }
        // A late tick does not cause a burst of catch-up ticks.
        self.next = Some(due.max(now) + self.period);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHands — held keys → synthetic hands
// ════════════════════════════════════════════════════════════════════════════

/// The hands currently shown by the keyboard simulation.
/// `None` means the hand is out of view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimHands {
    pub left:  Option<HandPose>,
    pub right: Option<HandPose>,
}

impl SimHands {
    /// Build from held digits, thumb first.  A hand with no held digit is
    /// out of view.
    pub fn from_held(left: [bool; 5], right: [bool; 5]) -> Self {
        let pose = |held: [bool; 5]| held.iter().any(|&d| d).then(|| HandPose::new(held));
        SimHands { left: pose(left), right: pose(right) }
    }

    /// The frame a detector would report for these hands.  Right is listed
    /// first so that single mode follows the right hand when both show.
    pub fn frame(&self) -> HandFrame {
        let mut hands = Vec::with_capacity(2);
        if let Some(p) = self.right {
            hands.push(p.observe(Handedness::Right));
        }
        if let Some(p) = self.left {
            hands.push(p.observe(Handedness::Left));
        }
        HandFrame::new(hands)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// KeyboardHandSource
// ════════════════════════════════════════════════════════════════════════════

/// Synthetic hands driven by [`SimHands`] updates from the window.
///
/// The window only sends on change; this source keeps the latest state and
/// reports it once per tick.  The window dropping its sender is
/// [`AcquireError::Disconnected`].
pub struct KeyboardHandSource {
    rx:      Receiver<SimHands>,
    current: SimHands,
    pacer:   Pacer,
    max_hands: usize,
}

impl KeyboardHandSource {
    pub fn new(rx: Receiver<SimHands>, tick_period: Duration, max_hands: usize) -> Self {
        KeyboardHandSource {
            rx,
            current: SimHands::default(),
            pacer: Pacer::new(tick_period),
            max_hands,
        }
    }
}

impl HandSource for KeyboardHandSource {
    fn next_frame(&mut self) -> std::result::Result<HandFrame, AcquireError> {
        self.pacer.wait();
        loop {
            match self.rx.try_recv() {
                Ok(hands) => self.current = hands,
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => return Err(AcquireError::Disconnected),
            }
        }
        let mut frame = self.current.frame();
        frame.truncate(self.max_hands);
        Ok(frame)
    }

    fn name(&self) -> &'static str { "keyboard" }
}

// ════════════════════════════════════════════════════════════════════════════
// JsonHandSource — landmark feed, one frame per line
// ════════════════════════════════════════════════════════════════════════════

/// Reads `{"hands":[...]}` documents, one per line.  Blank lines are
/// skipped.  The detector limits (hand count and confidence) are applied
/// here, at the boundary.
pub struct JsonHandSource<R> {
    reader:         R,
    line:           usize,
    buf:            String,
    max_hands:      usize,
    min_confidence: f32,
    pacer:          Option<Pacer>,
}

impl<R: BufRead> JsonHandSource<R> {
    pub fn new(reader: R, max_hands: usize, min_confidence: f32) -> Self {
        JsonHandSource {
            reader,
            line: 0,
            buf: String::new(),
            max_hands,
            min_confidence,
            pacer: None,
        }
    }

    /// Deliver at most one frame per `period`.
    pub fn paced(mut self, period: Duration) -> Self {
        self.pacer = Some(Pacer::new(period));
        self
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> usize { self.line }
}

impl<R: BufRead> HandSource for JsonHandSource<R> {
    fn next_frame(&mut self) -> std::result::Result<HandFrame, AcquireError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Err(AcquireError::EndOfStream);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            let mut frame: HandFrame = serde_json::from_str(text)
                .map_err(|source| AcquireError::Parse { line: self.line, source })?;
            frame.retain_confident(self.min_confidence);
            frame.truncate(self.max_hands);

            if let Some(p) = self.pacer.as_mut() {
                p.wait();
            }
            return Ok(frame);
        }
    }

    fn name(&self) -> &'static str { "json" }
}

// ════════════════════════════════════════════════════════════════════════════
// open_source
// ════════════════════════════════════════════════════════════════════════════

/// Build the configured hand source.
///
/// `sim_rx` is the window's key channel; it is required for the keyboard
/// source and ignored otherwise.
pub fn open_source(
    config: &PianoConfig,
    sim_rx: Option<Receiver<SimHands>>,
) -> Result<Box<dyn HandSource + Send>> {
    let max_hands = config.engine.mode.max_hands();
    let period    = config.engine.tick_period();

    match config.source.kind {
        SourceKind::Keyboard => {
            let rx = sim_rx.ok_or_else(|| {
                PianoError::Config("the keyboard source needs the visualizer window".to_string())
            })?;
            info!(tick_hz = config.engine.tick_hz, "hand source: keyboard simulation");
            Ok(Box::new(KeyboardHandSource::new(rx, period, max_hands)))
        }
        SourceKind::Json if config.source.reads_stdin() => {
            info!("hand source: landmark feed on stdin");
            let reader = BufReader::new(io::stdin());
            Ok(Box::new(JsonHandSource::new(reader, max_hands, config.source.min_confidence)))
        }
        SourceKind::Json => {
            let path = config.source.path.as_deref().unwrap_or_else(|| std::path::Path::new("-"));
            let file = File::open(path)?;
            info!(path = %path.display(), paced = config.source.paced, "hand source: landmark feed");
            let source = JsonHandSource::new(BufReader::new(file), max_hands, config.source.min_confidence);
            if config.source.paced {
                debug!(?period, "pacing landmark feed");
                Ok(Box::new(source.paced(period)))
            } else {
                Ok(Box::new(source))
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use finger_count::{count_hand, HandObservation};
    use std::io::Cursor;
    use std::sync::mpsc;

    fn feed_line(hands: &[(Handedness, u8, f32)]) -> String {
        let observations: Vec<HandObservation> = hands
            .iter()
            .map(|&(h, n, score)| {
                let lm = HandPose::with_count(n).landmarks(h);
                HandObservation::from_array(h, lm, score)
            })
            .collect();
        serde_json::to_string(&HandFrame::new(observations)).unwrap()
    }

    #[test]
    fn sim_hands_from_held_keys() {
        let hands = SimHands::from_held([false; 5], [true, true, false, false, false]);
        assert!(hands.left.is_none());
        let frame = hands.frame();
        assert_eq!(frame.len(), 1);
        assert_eq!(count_hand(frame.hand(Handedness::Right)).get(), 2);
    }

    #[test]
    fn sim_hands_frame_lists_right_first() {
        let hands = SimHands::from_held([true; 5], [true; 5]);
        let frame = hands.frame();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.first().unwrap().handedness(), Handedness::Right);
        assert_eq!(count_hand(frame.hand(Handedness::Left)).get(), 5);
    }

    #[test]
    fn keyboard_source_keeps_latest_state() {
        let (tx, rx) = mpsc::channel();
        let mut src = KeyboardHandSource::new(rx, Duration::from_millis(1), 2);

        assert!(src.next_frame().unwrap().is_empty());

        tx.send(SimHands::from_held([false; 5], [true; 5])).unwrap();
        tx.send(SimHands::from_held([false; 5], [true, true, true, false, false])).unwrap();
        let frame = src.next_frame().unwrap();
        assert_eq!(frame.counts().right.get(), 3);

        // No new input: the same hands are reported again.
        let frame = src.next_frame().unwrap();
        assert_eq!(frame.counts().right.get(), 3);
    }

    #[test]
    fn keyboard_source_truncates_to_mode_limit() {
        let (tx, rx) = mpsc::channel();
        let mut src = KeyboardHandSource::new(rx, Duration::from_millis(1), 1);
        tx.send(SimHands::from_held([true; 5], [true; 5])).unwrap();
        let frame = src.next_frame().unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.first().unwrap().handedness(), Handedness::Right);
    }

    #[test]
    fn keyboard_source_disconnect_is_failure() {
        let (tx, rx) = mpsc::channel::<SimHands>();
        let mut src = KeyboardHandSource::new(rx, Duration::from_millis(1), 2);
        drop(tx);
        let err = src.next_frame().unwrap_err();
        assert!(matches!(err, AcquireError::Disconnected));
        assert!(err.is_orderly());
    }

    #[test]
    fn json_source_reads_frames_then_ends() {
        let text = format!(
            "{}\n\n{}\n{{\"hands\":[]}}\n",
            feed_line(&[(Handedness::Right, 3, 0.9)]),
            feed_line(&[(Handedness::Left, 4, 0.95), (Handedness::Right, 0, 0.9)]),
        );
        let mut src = JsonHandSource::new(Cursor::new(text), 2, 0.7);

        let f1 = src.next_frame().unwrap();
        assert_eq!(f1.counts().right.get(), 3);

        let f2 = src.next_frame().unwrap();
        assert_eq!(f2.counts().left.get(), 4);
        assert_eq!(f2.counts().right.get(), 0);
        assert_eq!(src.lines_read(), 3, "blank line consumed");

        assert!(src.next_frame().unwrap().is_empty());
        assert!(matches!(src.next_frame(), Err(AcquireError::EndOfStream)));
    }

    #[test]
    fn json_source_applies_detector_limits() {
        let text = feed_line(&[
            (Handedness::Left, 2, 0.5),
            (Handedness::Right, 5, 0.8),
            (Handedness::Left, 1, 0.9),
        ]);
        let mut src = JsonHandSource::new(Cursor::new(text.clone()), 2, 0.7);
        let frame = src.next_frame().unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.counts().left.get(), 1, "low-confidence left hand dropped");

        let mut single = JsonHandSource::new(Cursor::new(text), 1, 0.7);
        let frame = single.next_frame().unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.first().unwrap().handedness(), Handedness::Right);
    }

    #[test]
    fn default_config_keeps_low_score_hands() {
        let path = std::env::temp_dir()
            .join(format!("hand_piano_{}_low_score.jsonl", std::process::id()));
        std::fs::write(&path, feed_line(&[(Handedness::Right, 3, 0.5)])).unwrap();

        let mut config = PianoConfig::default();
        config.source.kind  = SourceKind::Json;
        config.source.path  = Some(path.clone());
        config.source.paced = false;
        let mut src = open_source(&config, None).unwrap();
        let frame = src.next_frame().unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.counts().right.get(), 3);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn json_source_malformed_line_is_terminal() {
        let text = format!("{}\nnot json\n", feed_line(&[(Handedness::Right, 1, 1.0)]));
        let mut src = JsonHandSource::new(Cursor::new(text), 2, 0.0);
        assert!(src.next_frame().is_ok());
        match src.next_frame() {
            Err(e @ AcquireError::Parse { line: 2, .. }) => assert!(!e.is_orderly()),
            other => panic!("expected parse error on line 2, got {:?}", other.map(|f| f.len())),
        }
    }

    #[test]
    fn json_source_rejects_short_landmark_list() {
        let text = r#"{"hands":[{"handedness":"Right","landmarks":[{"x":0.1,"y":0.2}]}]}"#;
        let mut src = JsonHandSource::new(Cursor::new(text), 2, 0.0);
        assert!(matches!(src.next_frame(), Err(AcquireError::Parse { line: 1, .. })));
    }

    #[test]
    fn open_source_keyboard_needs_window() {
        let config = PianoConfig::default();
        assert!(matches!(open_source(&config, None), Err(PianoError::Config(_))));
    }

    #[test]
    fn open_source_missing_file_is_io_error() {
        let mut config = PianoConfig::default();
        config.source.kind = SourceKind::Json;
        config.source.path = Some("/nonexistent/hand_piano/feed.jsonl".into());
        assert!(matches!(open_source(&config, None), Err(PianoError::Io(_))));
    }
}
