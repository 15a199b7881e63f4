use std::collections::HashMap;

// ──────────────────────────────────────────────
// Geometry (cell-grid, not pixels — there is no GPU surface downstream)
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl CellRect {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

// ──────────────────────────────────────────────
// Identity
// ──────────────────────────────────────────────

pub type PaneId = u64;

/// An opaque, totally ordered peer identifier (typically a public-key hash).
/// Ordering and equality are byte-wise, which is what makes cursor-overlay
/// and palette assignment deterministic across peers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(Vec<u8>);

impl PeerId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The distinguished local peer id used before any remote peer id is
    /// known (i.e. when the process is hosting with nobody joined yet).
    pub fn local() -> Self {
        Self(b"self".to_vec())
    }

    /// Six-character label used under a cursor overlay (§4.5). Non-UTF8-safe
    /// bytes are rendered as a short hex prefix.
    pub fn short_label(&self) -> String {
        match std::str::from_utf8(&self.0) {
            Ok(s) if s.is_ascii() => s.chars().take(6).collect(),
            _ => {
                let mut s = String::new();
                for b in self.0.iter().take(3) {
                    s.push_str(&format!("{:02x}", b));
                }
                s
            }
        }
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) if s.is_ascii() => write!(f, "{s}"),
            _ => {
                for b in &self.0 {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

// ──────────────────────────────────────────────
// Colors
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Sentinel meaning "use the viewer's own default foreground/background".
    pub const DEFAULT: Self = Self::rgb(0, 0, 0);
}

// ──────────────────────────────────────────────
// Glyph / Cursor / VT state (§3)
// ──────────────────────────────────────────────

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GlyphAttrs: u8 {
        const BOLD      = 0b0000_0001;
        const ITALIC    = 0b0000_0010;
        const UNDERLINE = 0b0000_0100;
        const REVERSE   = 0b0000_1000;
        const DIM       = 0b0001_0000;
    }
}

impl Default for GlyphAttrs {
    fn default() -> Self {
        GlyphAttrs::empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub combining: Vec<char>,
    pub fg: Color,
    pub bg: Color,
    pub attrs: GlyphAttrs,
    /// Display width: 1 for most glyphs, 2 for wide (e.g. CJK) characters.
    pub width: u8,
}

impl Default for Glyph {
    fn default() -> Self {
        Self {
            ch: ' ',
            combining: Vec::new(),
            fg: Color::DEFAULT,
            bg: Color::DEFAULT,
            attrs: GlyphAttrs::empty(),
            width: 1,
        }
    }
}

impl Glyph {
    pub fn space() -> Self {
        Self::default()
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VtMode: u16 {
        const HIDE_CURSOR      = 0b0000_0000_0001;
        const MOUSE_BUTTON     = 0b0000_0000_0010;
        const MOUSE_MOTION     = 0b0000_0000_0100;
        const MOUSE_ANY        = 0b0000_0000_1000;
        const MOUSE_SGR        = 0b0000_0001_0000;
        const ALT_SCREEN       = 0b0000_0010_0000;
        const BRACKETED_PASTE  = 0b0000_0100_0000;
        const APP_CURSOR_KEYS  = 0b0000_1000_0000;
    }
}

impl Default for VtMode {
    fn default() -> Self {
        VtMode::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Beam,
    Underline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub x: u16,
    pub y: u16,
    pub visible: bool,
    pub shape: CursorShape,
    /// color/style, never the character
    pub style: Glyph,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            visible: true,
            shape: CursorShape::Block,
            style: Glyph::default(),
        }
    }
}

/// One row of the scrollback ring.
pub type ScrollbackRow = Vec<Glyph>;

/// A VT10x-compatible terminal emulator's full state.
///
/// Invariant: `grid.len() == rows as usize` and every row has exactly `cols`
/// glyphs; `cursor.x < cols`, `cursor.y < rows`.
#[derive(Clone)]
pub struct VtState {
    pub cols: u16,
    pub rows: u16,
    pub mode: VtMode,
    pub title: String,
    pub grid: Vec<Vec<Glyph>>,
    pub cursor: Cursor,
    pub scrollback: std::collections::VecDeque<ScrollbackRow>,
}

impl VtState {
    pub fn blank(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            mode: VtMode::empty(),
            title: String::new(),
            grid: vec![vec![Glyph::default(); cols as usize]; rows as usize],
            cursor: Cursor::default(),
            scrollback: std::collections::VecDeque::new(),
        }
    }

    /// Checks the invariant documented above; used by tests and by the
    /// layout-invariant-violation recovery path (§7).
    pub fn is_well_formed(&self) -> bool {
        self.grid.len() == self.rows as usize
            && self.grid.iter().all(|row| row.len() == self.cols as usize)
            && self.cursor.x < self.cols.max(1)
            && self.cursor.y < self.rows.max(1)
    }
}

// ──────────────────────────────────────────────
// Frame (§3) — whole-screen snapshot sent over the wire
// ──────────────────────────────────────────────

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WireColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<Color> for WireColor {
    fn from(c: Color) -> Self {
        WireColor { r: c.r, g: c.g, b: c.b }
    }
}

impl From<WireColor> for Color {
    fn from(c: WireColor) -> Self {
        Color::rgb(c.r, c.g, c.b)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WireGlyph {
    pub ch: char,
    pub combining: Vec<char>,
    pub fg: WireColor,
    pub bg: WireColor,
    pub attrs: u8,
    pub width: u8,
}

impl From<&Glyph> for WireGlyph {
    fn from(g: &Glyph) -> Self {
        WireGlyph {
            ch: g.ch,
            combining: g.combining.clone(),
            fg: g.fg.into(),
            bg: g.bg.into(),
            attrs: g.attrs.bits(),
            width: g.width,
        }
    }
}

impl From<&WireGlyph> for Glyph {
    fn from(g: &WireGlyph) -> Self {
        Glyph {
            ch: g.ch,
            combining: g.combining.clone(),
            fg: g.fg.clone().into(),
            bg: g.bg.clone().into(),
            attrs: GlyphAttrs::from_bits_truncate(g.attrs),
            width: g.width,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WireCursor {
    pub x: u16,
    pub y: u16,
    pub visible: bool,
}

/// A whole-screen snapshot: the composited cell grid plus every peer's
/// cursor. Frames are idempotent — applying the same frame twice is a no-op
/// — which is what lets the share server coalesce its send channel (§4.7).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    pub cols: u16,
    pub rows: u16,
    pub cells: Vec<WireGlyph>,
    pub cursors: HashMap<String, WireCursor>,
}

impl Frame {
    pub fn blank(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![WireGlyph::from(&Glyph::default()); (cols as usize) * (rows as usize)],
            cursors: HashMap::new(),
        }
    }

    pub fn cell(&self, x: u16, y: u16) -> &WireGlyph {
        &self.cells[y as usize * self.cols as usize + x as usize]
    }

    pub fn cell_mut(&mut self, x: u16, y: u16) -> &mut WireGlyph {
        let cols = self.cols as usize;
        &mut self.cells[y as usize * cols + x as usize]
    }
}

// ──────────────────────────────────────────────
// Event (§3) — input events, optionally peer-tagged
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Tab,
    Escape,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct MouseButtons: u8 {
        const NONE   = 0b000;
        const LEFT   = 0b001;
        const RIGHT  = 0b010;
        const MIDDLE = 0b100;
    }
}

/// Tagged input event. Carries an originating `PeerId` only once it has been
/// routed server-side (§4.6); locally-generated events are untagged until
/// the share client attaches its own peer id before sending.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Event {
    Key { key: Key, rune: Option<char>, mods: Modifiers },
    Mouse { x: u16, y: u16, buttons: MouseButtons, mods: Modifiers },
    Resize { cols: u16, rows: u16 },
    Paste { start: bool },
}

// ──────────────────────────────────────────────
// Peer palette (C9)
// ──────────────────────────────────────────────

/// Fixed palette cycled in discovery order. Matches the order terminals
/// conventionally use for the bright ANSI ramp so cursor colors stay
/// distinguishable against default terminal backgrounds.
pub const PALETTE: &[Color] = &[
    Color::rgb(0x4f, 0x9c, 0xff), // blue
    Color::rgb(0x4c, 0xd9, 0x64), // green
    Color::rgb(0xe0, 0x5a, 0xe0), // magenta
    Color::rgb(0xff, 0xb3, 0x4c), // orange
    Color::rgb(0x4c, 0xd9, 0xd9), // cyan
    Color::rgb(0xe0, 0xd9, 0x4c), // yellow
    Color::rgb(0xff, 0x6a, 0x6a), // red
];

/// Assigns a distinct palette color to each peer in discovery order and
/// records each peer's last known cursor. Cycles through `PALETTE` when the
/// number of concurrent peers exceeds its length.
#[derive(Debug, Clone, Default)]
pub struct PeerPalette {
    order: Vec<PeerId>,
    colors: HashMap<PeerId, Color>,
    cursors: HashMap<PeerId, Cursor>,
}

impl PeerPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next palette slot to `id` if it isn't already registered.
    pub fn insert(&mut self, id: PeerId) {
        if self.colors.contains_key(&id) {
            return;
        }
        let color = PALETTE[self.order.len() % PALETTE.len()];
        self.order.push(id.clone());
        self.colors.insert(id, color);
    }

    /// Frees the palette slot. Slots are not reused by position — the next
    /// inserted peer simply continues cycling from `order.len()`.
    pub fn remove(&mut self, id: &PeerId) {
        self.order.retain(|p| p != id);
        self.colors.remove(id);
        self.cursors.remove(id);
    }

    pub fn color(&self, id: &PeerId) -> Option<Color> {
        self.colors.get(id).copied()
    }

    pub fn set_cursor(&mut self, id: PeerId, cursor: Cursor) {
        self.cursors.insert(id, cursor);
    }

    pub fn cursor(&self, id: &PeerId) -> Option<&Cursor> {
        self.cursors.get(id)
    }

    /// Peers in id-sorted order, as required for deterministic cursor
    /// overlay draw order (§4.5).
    pub fn peers_sorted(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.colors.keys().cloned().collect();
        ids.sort();
        ids
    }
}

// ──────────────────────────────────────────────
// Split direction
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDirection {
    /// `%` — new pane to the right.
    Vertical,
    /// `"` — new pane below.
    Horizontal,
}

// ──────────────────────────────────────────────
// Trait: TerminalBackend (C1/C2)
// ──────────────────────────────────────────────

/// A pty-backed VT10x terminal: owns the child process and its parsed state.
pub trait TerminalBackend {
    fn write(&mut self, data: &[u8]);
    fn resize(&mut self, cols: u16, rows: u16);
    /// Locks and returns a read-only snapshot view; callers must not hold
    /// this across a pty write (§5 lock discipline).
    fn with_vt<R>(&self, f: impl FnOnce(&VtState) -> R) -> R;
    fn title(&self) -> String;
    /// `true` once the child process has exited; the sole trigger for
    /// removing the owning Pane from the tree (§4.2).
    fn is_done(&self) -> bool;
}

// ──────────────────────────────────────────────
// Trait: Renderer (C5)
// ──────────────────────────────────────────────

/// Composites a layout tree plus a peer palette into a `Frame`.
pub trait Renderer {
    fn render(&self, target: CellRect) -> Frame;
}

// ──────────────────────────────────────────────
// Trait: InputRouter (C6)
// ──────────────────────────────────────────────

/// Routes an event to the focused pane under the given peer, or consumes it
/// as a layout hot-key. Returns the pane id the event was ultimately
/// delivered to, if any.
pub trait InputRouter {
    fn route(&mut self, peer: &PeerId, event: Event) -> Option<PaneId>;
}
