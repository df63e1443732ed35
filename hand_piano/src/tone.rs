//! Tone output: the trigger state machine and the sinks it drives.
//!
//! [`ToneTrigger`] turns one [`NoteEvent`] per tick into at most one
//! [`ToneCommand`].  Sinks render commands; they hold no decision logic.
//!
//! | Backend | Rendering |
//! |---|---|
//! | `none` | logged at debug level, discarded |
//! | `midi` | nearest MIDI note + pitch bend on the first (or named) port |
//! | `speaker` | 50 % square wave on the default audio device (`speaker` feature) |

use std::sync::Arc;

use note_table::NoteEvent;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ToneBackend, ToneConfig};

/// Duty cycle of every tone, in percent.
pub const DUTY_PERCENT: u8 = 50;

// ════════════════════════════════════════════════════════════════════════════
// ToneCommand
// ════════════════════════════════════════════════════════════════════════════

/// One command to the tone sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ToneCommand {
    pub frequency_hz: u32,
    pub duty_percent: u8,
    pub active:       bool,
}

impl ToneCommand {
    pub fn play(frequency_hz: u32) -> Self {
        ToneCommand { frequency_hz, duty_percent: DUTY_PERCENT, active: true }
    }

    /// Stop; `frequency_hz` carries the tone being stopped (0 if none).
    pub fn stop(frequency_hz: u32) -> Self {
        ToneCommand { frequency_hz, duty_percent: DUTY_PERCENT, active: false }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ToneSink — abstraction over midir / rodio / null
// ════════════════════════════════════════════════════════════════════════════

/// Silences a device from outside the tick loop, e.g. from the Ctrl-C
/// thread just before a hard exit.
pub type KillSwitch = Box<dyn Fn() + Send + Sync>;

pub trait ToneSink {
    fn apply(&mut self, command: ToneCommand);
    fn name(&self) -> &'static str;

    /// Sinks whose sound outlives the process return a way to cut it.
    fn kill_switch(&self) -> Option<KillSwitch> { None }
}

// ── null backend ──────────────────────────────────────────────────────────

/// Discards commands.  Used when no output is configured or available.
pub struct NullSink;

impl ToneSink for NullSink {
    fn apply(&mut self, command: ToneCommand) {
        debug!(?command, "tone (null sink)");
    }
    fn name(&self) -> &'static str { "none" }
}

// ── midir backend ─────────────────────────────────────────────────────────

/// Pitch-bend range assumed on the receiving synth, in semitones.
const BEND_RANGE_SEMITONES: f64 = 2.0;
const BEND_CENTRE: u16 = 8192;
const NOTE_VELOCITY: u8 = 100;

/// Nearest MIDI note for `frequency_hz` and the 14-bit pitch bend that
/// makes up the remainder.
pub fn midi_pitch(frequency_hz: u32) -> (u8, u16) {
    let exact = 69.0 + 12.0 * (frequency_hz.max(1) as f64 / 440.0).log2();
    let note  = exact.round().clamp(0.0, 127.0);
    let semis = (exact - note).clamp(-BEND_RANGE_SEMITONES, BEND_RANGE_SEMITONES);
    let bend  = BEND_CENTRE as f64 + semis / BEND_RANGE_SEMITONES * BEND_CENTRE as f64;
    (note as u8, bend.round().clamp(0.0, 16383.0) as u16)
}

/// Channel-mode message "All Notes Off" (CC 123).
pub fn all_notes_off(channel: u8) -> [u8; 3] {
    [0xB0 | (channel & 0x0F), 123, 0]
}

/// Plays each tone as one sustained MIDI note, retuned by pitch bend.
pub struct MidiSink {
    conn:    Arc<Mutex<midir::MidiOutputConnection>>,
    channel: u8,
    note:    Option<u8>,
}

impl MidiSink {
    fn note_off(&mut self) {
        if let Some(n) = self.note.take() {
            let _ = self.conn.lock().send(&[0x80 | (self.channel & 0x0F), n, 0]);
        }
    }
}

impl ToneSink for MidiSink {
    fn apply(&mut self, command: ToneCommand) {
        self.note_off();
        if !command.active {
            return;
        }
        let (note, bend) = midi_pitch(command.frequency_hz);
        let ch = self.channel & 0x0F;
        let mut conn = self.conn.lock();
        let _ = conn.send(&[0xE0 | ch, (bend & 0x7F) as u8, (bend >> 7) as u8]);
        let _ = conn.send(&[0x90 | ch, note, NOTE_VELOCITY]);
        self.note = Some(note);
    }

    fn name(&self) -> &'static str { "midi" }

    fn kill_switch(&self) -> Option<KillSwitch> {
        let conn    = Arc::clone(&self.conn);
        let message = all_notes_off(self.channel);
        Some(Box::new(move || {
            let _ = conn.lock().send(&message);
        }))
    }
}

impl Drop for MidiSink {
    fn drop(&mut self) {
        self.note_off();
    }
}

/// Open the preferred (or first) MIDI output port.
fn open_midi_sink(config: &ToneConfig) -> Option<MidiSink> {
    let midi_out = match midir::MidiOutput::new("hand_piano") {
        Ok(m)  => m,
        Err(e) => {
            warn!(error = %e, "MIDI init failed, using null output");
            return None;
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        warn!("no MIDI output ports found, using null output \
               (try `timidity -iA` or `fluidsynth` on Linux)");
        return None;
    }

    let wanted = config.midi_port.as_deref().map(str::to_lowercase);
    let port_idx = ports.iter()
        .position(|p| {
            midi_out.port_name(p).map(|n| {
                let n = n.to_lowercase();
                match &wanted {
                    Some(w) => n.contains(w.as_str()),
                    None    => n.contains("fluid") || n.contains("timidity") || n.contains("synth"),
                }
            }).unwrap_or(false)
        })
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out.port_name(port).unwrap_or_else(|_| "Unknown".to_string());
    info!(port = %name, channel = config.midi_channel, "opening MIDI port");

    match midi_out.connect(port, "hand-piano-tone") {
        Ok(conn) => Some(MidiSink {
            conn:    Arc::new(Mutex::new(conn)),
            channel: config.midi_channel,
            note:    None,
        }),
        Err(e) => {
            warn!(error = %e, "failed to connect MIDI port, using null output");
            None
        }
    }
}

// ── rodio backend ─────────────────────────────────────────────────────────

#[cfg(feature = "speaker")]
mod speaker {
    use std::time::Duration;

    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

    use super::{ToneCommand, ToneSink};
    use crate::error::{PianoError, Result};

    const SAMPLE_RATE: u32 = 44_100;
    const AMPLITUDE:   f32 = 0.2;

    /// Endless square wave at a fixed frequency and duty.
    struct SquareWave {
        frequency: f32,
        duty:      f32,
        phase:     f32,
    }

    impl Iterator for SquareWave {
        type Item = f32;

        fn next(&mut self) -> Option<f32> {
            let sample = if self.phase < self.duty { AMPLITUDE } else { -AMPLITUDE };
            self.phase = (self.phase + self.frequency / SAMPLE_RATE as f32).fract();
            Some(sample)
        }
    }

    impl Source for SquareWave {
        fn current_frame_len(&self) -> Option<usize> { None }
        fn channels(&self) -> u16 { 1 }
        fn sample_rate(&self) -> u32 { SAMPLE_RATE }
        fn total_duration(&self) -> Option<Duration> { None }
    }

    /// Square-wave output on the default audio device.  Each play command
    /// replaces the previous sink outright, with no fade.
    pub struct SpeakerSink {
        _stream: OutputStream,
        handle:  OutputStreamHandle,
        sink:    Option<Sink>,
    }

    impl SpeakerSink {
        pub fn open() -> Result<Self> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| PianoError::Config(format!("failed to open audio device: {}", e)))?;
            Ok(SpeakerSink { _stream: stream, handle, sink: None })
        }
    }

    impl ToneSink for SpeakerSink {
        fn apply(&mut self, command: ToneCommand) {
            if let Some(old) = self.sink.take() {
                old.stop();
            }
            if !command.active {
                return;
            }
            match Sink::try_new(&self.handle) {
                Ok(sink) => {
                    sink.append(SquareWave {
                        frequency: command.frequency_hz as f32,
                        duty:      command.duty_percent as f32 / 100.0,
                        phase:     0.0,
                    });
                    self.sink = Some(sink);
                }
                Err(e) => tracing::warn!(error = %e, "failed to create audio sink"),
            }
        }

        fn name(&self) -> &'static str { "speaker" }
    }
}

#[cfg(feature = "speaker")]
pub use speaker::SpeakerSink;

/// Open the configured backend, falling back to [`NullSink`] when it is
/// unavailable.  Call on the thread that will use the sink.
pub fn open_tone_sink(config: &ToneConfig) -> Box<dyn ToneSink> {
    match config.backend {
        ToneBackend::None => Box::new(NullSink),
        ToneBackend::Midi => match open_midi_sink(config) {
            Some(sink) => Box::new(sink),
            None       => Box::new(NullSink),
        },
        #[cfg(feature = "speaker")]
        ToneBackend::Speaker => match SpeakerSink::open() {
            Ok(sink) => {
                info!("tone output: default audio device");
                Box::new(sink)
            }
            Err(e) => {
                warn!(error = %e, "using null output");
                Box::new(NullSink)
            }
        },
        #[cfg(not(feature = "speaker"))]
        ToneBackend::Speaker => {
            warn!("built without the `speaker` feature, using null output");
            Box::new(NullSink)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ToneTrigger
// ════════════════════════════════════════════════════════════════════════════

/// The last command sent to the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ToneState {
    pub frequency:    Option<u32>,
    pub duty_percent: u8,
    pub playing:      bool,
}

impl Default for ToneState {
    fn default() -> Self {
        ToneState { frequency: None, duty_percent: DUTY_PERCENT, playing: false }
    }
}

/// Two-state machine, Idle and Playing(f), re-evaluated every tick with no
/// debounce.
#[derive(Debug, Default)]
pub struct ToneTrigger {
    state: ToneState,
}

impl ToneTrigger {
    pub fn new() -> Self { Self::default() }

    pub fn state(&self) -> ToneState { self.state }

    /// Apply this tick's note.  Returns the command sent, if any.
    ///
    /// Only a repeated frequency is skipped.  Every silent tick commands a
    /// stop, carrying the stopped frequency (0 when already idle).
    pub fn update(&mut self, event: NoteEvent, sink: &mut dyn ToneSink) -> Option<ToneCommand> {
        let command = match event.frequency() {
            Some(f) if self.state.playing && self.state.frequency == Some(f) => return None,
            Some(f) => ToneCommand::play(f),
            None    => ToneCommand::stop(self.state.frequency.unwrap_or(0)),
        };
        self.send(command, sink);
        Some(command)
    }

    /// Stop the output whatever the current state.  Used at shutdown.
    pub fn silence(&mut self, sink: &mut dyn ToneSink) -> ToneCommand {
        let command = ToneCommand::stop(self.state.frequency.unwrap_or(0));
        self.send(command, sink);
        command
    }

    fn send(&mut self, command: ToneCommand, sink: &mut dyn ToneSink) {
        sink.apply(command);
        self.state = if command.active {
            ToneState { frequency: Some(command.frequency_hz), duty_percent: command.duty_percent, playing: true }
        } else {
            ToneState::default()
        };
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

/// Records every command; shared by the engine and app tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    pub commands: Vec<ToneCommand>,
}

#[cfg(test)]
impl ToneSink for RecordingSink {
    fn apply(&mut self, command: ToneCommand) { self.commands.push(command); }
    fn name(&self) -> &'static str { "recording" }
}
