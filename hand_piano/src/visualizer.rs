//! Software-rendered piano visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  L:2 R:3                                  COOPERATIVE         │
//! │ ┌─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┐            │
//! │ │     │     │█████│     │     │ ┏━┓ │     │     │            │
//! │ │ Do  │ Re  │ Mi  │ Fa  │ Sol │ La  │ Si  │ Do' │            │
//! │ └─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┘            │
//! │  status bar: note, role, target, score                       │
//! │  key legend                                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The window only reads snapshots.  Held keys become [`SimHands`] sent to
//! the keyboard source, and only when they change.

use std::sync::mpsc::Sender;
use std::time::Duration;

use minifb::{Key, Window, WindowOptions};
use note_table::{NoteTable, Role, NOTE_COUNT};

use crate::app::Coordinator;
use crate::error::{PianoError, Result};
use crate::snapshot::{SharedState, Snapshot};
use crate::source::SimHands;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:    usize = 800;
pub const WIN_H:    usize = 380;
const KEY_W:        usize = 90;
const KEY_H:        usize = 200;
const KEYS_X:       usize = (WIN_W - KEY_W * NOTE_COUNT) / 2;
const KEYS_Y:       usize = 70;
const STATUS_Y:     usize = WIN_H - 70;
const BG_COLOR:     u32   = 0xFF1A1A2E;
const KEY_COLOR:    u32   = 0xFFF5F5F5;
const MELODY_COLOR: u32   = 0xFF87CEFA;  // light blue
const CHORD_COLOR:  u32   = 0xFF90EE90;  // light green
const TARGET_COLOR: u32   = 0xFFFFD700;  // gold
const TEXT_BG:      u32   = 0xFF0F3460;

/// Left hand keys, pinky → thumb.
const LEFT_KEYS:  [Key; 5] = [Key::A, Key::S, Key::D, Key::F, Key::G];
/// Right hand keys, thumb → pinky.
const RIGHT_KEYS: [Key; 5] = [Key::H, Key::J, Key::K, Key::L, Key::Semicolon];

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
    sim_tx: Sender<SimHands>,
    title:  String,
}

impl Visualizer {
    pub fn new(title: &str, sim_tx: Sender<SimHands>) -> Result<Self> {
        let mut window = Window::new(
            title,
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| PianoError::Window(e.to_string()))?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
            title: title.to_string(),
        })
    }

    /// Present until the tick loop finishes or the window is closed.
    /// Escape requests quit and keeps drawing until the tick loop is done.
    pub fn run(mut self, shared: &SharedState, coordinator: &Coordinator, table: &NoteTable) -> Result<()> {
        let mut last_hands = SimHands::default();
        let mut last_title = String::new();

        while self.window.is_open() && !shared.is_finished() && coordinator.is_running() {
            if self.window.is_key_down(Key::Escape) {
                shared.request_quit();
            }

            let hands = self.held_hands();
            if hands != last_hands {
                // Nobody listens when the hands come from a feed.
                let _ = self.sim_tx.send(hands);
                last_hands = hands;
            }

            let snap = shared.snapshot();
            let title = window_title(&self.title, &snap);
            if title != last_title {
                self.window.set_title(&title);
                last_title = title;
            }
            self.render(&snap, table)?;
        }

        // Window closed: quit before the key channel disconnects.
        shared.request_quit();
        Ok(())
    }

    fn held_hands(&self) -> SimHands {
        let mut left  = [false; 5];
        let mut right = [false; 5];
        for (i, &k) in LEFT_KEYS.iter().enumerate() {
            left[4 - i] = self.window.is_key_down(k);
        }
        for (i, &k) in RIGHT_KEYS.iter().enumerate() {
            right[i] = self.window.is_key_down(k);
        }
        SimHands::from_held(left, right)
    }

    /// Render one frame.
    fn render(&mut self, snap: &Snapshot, table: &NoteTable) -> Result<()> {
        self.buf.fill(BG_COLOR);

        // ── Header ────────────────────────────────────────────────────────
        let counts = format!("L:{} R:{}", snap.left, snap.right);
        self.draw_label(&counts, KEYS_X, 20, 0xFFEEEEEE, 4);
        let mode = snap.mode.name().to_uppercase();
        let mode_x = WIN_W - KEYS_X - mode.len() * 4 * 3;
        self.draw_label(&mode, mode_x, 28, 0xFFAADDFF, 3);

        // ── Keys ──────────────────────────────────────────────────────────
        for (i, entry) in table.entries().iter().enumerate() {
            let x = KEYS_X + i * KEY_W;
            self.fill_rect(x, KEYS_Y, KEY_W, KEY_H, key_fill(entry.index, snap));
            self.draw_border(x, KEYS_Y, KEY_W, KEY_H, 0xFF000000);

            let name_x = x + (KEY_W.saturating_sub(entry.name.chars().count() * 4 * 3)) / 2;
            self.draw_label(entry.name, name_x, KEYS_Y + KEY_H - 50, 0xFF000000, 3);
            let pitch_x = x + (KEY_W.saturating_sub(entry.pitch.len() * 4 * 2)) / 2;
            self.draw_label(entry.pitch, pitch_x, KEYS_Y + KEY_H - 22, 0xFF555555, 2);

            if snap.target == Some(entry.index) {
                for inset in 1..4 {
                    self.draw_border(x + inset, KEYS_Y + inset, KEY_W - 2 * inset, KEY_H - 2 * inset, TARGET_COLOR);
                }
            }
        }

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        self.draw_label(&status_line(snap), 10, STATUS_Y + 12, 0xFFEEEEEE, 2);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "A S D F G = left pinky..thumb   H J K L ; = right thumb..pinky   Esc = quit",
            10, WIN_H - 18, 0xFF888888, 1,
        );

        self.window
            .update_with_buffer(&self.buf, WIN_W, WIN_H)
            .map_err(|e| PianoError::Window(e.to_string()))
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x+w).min(WIN_W) {
            if y < WIN_H           { self.buf[y           * WIN_W + col] = color; }
            if y+h-1 < WIN_H       { self.buf[(y+h-1)     * WIN_W + col] = color; }
        }
        for row in y..(y+h).min(WIN_H) {
            if x < WIN_W           { self.buf[row * WIN_W + x    ] = color; }
            if x+w-1 < WIN_W       { self.buf[row * WIN_W + x+w-1] = color; }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// 3×5 bitmap font, each pixel drawn as a `scale`×`scale` block.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32, scale: usize) {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        for dy in 0..scale {
                            for dx in 0..scale {
                                self.set_pixel(cx + col * scale + dx, y + row * scale + dy, color);
                            }
                        }
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
            if cx + 4 * scale > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// What to draw
// ────────────────────────────────────────────────────────────────────────────

/// Fill colour of the key for note `index`.  The sounding key is tinted by
/// role; in single mode it takes the melody colour.
fn key_fill(index: u8, snap: &Snapshot) -> u32 {
    if snap.note.index() != Some(index) {
        return KEY_COLOR;
    }
    match snap.role {
        Role::Chord => CHORD_COLOR,
        Role::Melody | Role::None => MELODY_COLOR,
    }
}

/// Base title plus the sounding note's name.
fn window_title(base: &str, snap: &Snapshot) -> String {
    match snap.note_name {
        Some(name) => format!("{} - {}", base, name),
        None       => base.to_string(),
    }
}

fn status_line(snap: &Snapshot) -> String {
    let note = match (snap.note_name, snap.note.frequency()) {
        (Some(name), Some(hz)) => format!("{} {}Hz", name, hz),
        _                      => "-".to_string(),
    };
    let mut line = format!("Note: {}   Role: {}", note, snap.role.name());
    if let Some(target) = snap.target {
        line.push_str(&format!("   Target: #{}   Score: {}", target, snap.score));
    }
    line
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        ';' => [0b000, 0b010, 0b000, 0b010, 0b100],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
