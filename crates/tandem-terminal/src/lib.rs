// Terminal backend implementation
// Implements tandem_core::TerminalBackend using alacritty_terminal
//
// Threading model:
//   PTY Thread (alacritty EventLoop) — reads PTY, parses VT, updates Term state
//   Sync Thread — copies grid state from Term, converts colors, produces a VtState snapshot
//   Caller thread — swaps in the latest snapshot via with_vt(), never blocks on pty output
//
// The sync thread decouples expensive grid synchronization from the caller, so
// input writes and layout/render ticks are never blocked by terminal output
// processing — the same separation the GUI build used to keep input latency
// off the output-parsing critical path.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alacritty_terminal::event::{Event as AlacrittyEvent, EventListener, WindowSize};
use alacritty_terminal::event_loop::{EventLoop, Msg, Notifier};
use alacritty_terminal::grid::{Dimensions, Scroll};
use alacritty_terminal::index::{Column, Line, Point};
use alacritty_terminal::sync::FairMutex;
use alacritty_terminal::term::cell::Flags as CellFlags;
use alacritty_terminal::term::{Config as TermConfig, Term, TermMode};
use alacritty_terminal::tty;
use alacritty_terminal::vte::ansi::{Color as AnsiColor, CursorShape as AnsiCursorShape, NamedColor, Rgb as AnsiRgb};

mod color;

use tandem_core::{Color, Cursor, CursorShape, Glyph, GlyphAttrs, TerminalBackend, VtMode, VtState};

/// Number of scrollback history lines alacritty keeps for us.
const SCROLLBACK_LINES: usize = 10_000;

struct TermDimensions {
    cols: usize,
    rows: usize,
}

impl TermDimensions {
    fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }
}

impl Dimensions for TermDimensions {
    fn columns(&self) -> usize {
        self.cols
    }

    fn screen_lines(&self) -> usize {
        self.rows
    }

    fn total_lines(&self) -> usize {
        self.rows + SCROLLBACK_LINES
    }
}

// ──────────────────────────────────────────────
// Event listener (PTY thread → sync thread signaling)
// ──────────────────────────────────────────────

/// Sets a dirty flag when the terminal has new output, forwards PtyWrite
/// events back to the PTY, tracks title changes, and flags process exit.
#[derive(Clone)]
struct TermEventListener {
    dirty: Arc<AtomicBool>,
    pty_writer: Arc<Mutex<Option<Notifier>>>,
    sync_thread: Arc<Mutex<Option<std::thread::Thread>>>,
    title: Arc<Mutex<String>>,
    exited: Arc<AtomicBool>,
}

impl EventListener for TermEventListener {
    fn send_event(&self, event: AlacrittyEvent) {
        match &event {
            AlacrittyEvent::PtyWrite(text) => {
                if let Ok(guard) = self.pty_writer.lock() {
                    if let Some(notifier) = guard.as_ref() {
                        let _ = notifier.0.send(Msg::Input(Cow::Owned(text.clone().into_bytes())));
                    }
                }
            }
            AlacrittyEvent::Title(title) => {
                if let Ok(mut guard) = self.title.lock() {
                    *guard = title.clone();
                }
            }
            AlacrittyEvent::ResetTitle => {
                if let Ok(mut guard) = self.title.lock() {
                    guard.clear();
                }
            }
            AlacrittyEvent::Exit => {
                self.exited.store(true, Ordering::Relaxed);
            }
            _ => {}
        }
        self.dirty.store(true, Ordering::Relaxed);
        if let Ok(guard) = self.sync_thread.lock() {
            if let Some(ref thread) = *guard {
                thread.unpark();
            }
        }
    }
}

// ──────────────────────────────────────────────
// GridSyncer: owns all state for grid synchronization (runs on sync thread)
// ──────────────────────────────────────────────

type RawCell = (char, Vec<char>, AnsiColor, AnsiColor, CellFlags);

struct GridSyncer {
    term: Arc<FairMutex<Term<TermEventListener>>>,
    raw_buf: Vec<RawCell>,
    prev_raw_buf: Vec<RawCell>,
    palette_buf: [Option<AnsiRgb>; 256],
    vt: VtState,
    generation: u64,
    stay_at_bottom: Arc<AtomicBool>,
}

impl GridSyncer {
    /// One grid synchronization cycle.
    /// Phase 1: lock Term briefly to copy raw cell data + palette + cursor.
    /// Phase 2: convert colors and diff against the previous frame (no lock held).
    fn sync(&mut self) -> bool {
        let stay_at_bottom = self.stay_at_bottom.load(Ordering::Relaxed);

        let (cols, total_lines, cursor_point, cursor_shape, cursor_visible, mode) = {
            let mut term = self.term.lock();

            if stay_at_bottom {
                term.scroll_display(Scroll::Bottom);
            }

            let grid = term.grid();
            let cols = grid.columns();
            let total_lines = grid.screen_lines();
            let display_offset = grid.display_offset();
            let total_cells = cols * total_lines;

            let colors = term.colors();
            for i in 0..256 {
                self.palette_buf[i] = colors[i];
            }

            self.raw_buf.resize(
                total_cells,
                (' ', Vec::new(), AnsiColor::Named(NamedColor::Foreground), AnsiColor::Named(NamedColor::Background), CellFlags::empty()),
            );
            for line_idx in 0..total_lines {
                let line = Line(line_idx as i32 - display_offset as i32);
                let base = line_idx * cols;
                for col_idx in 0..cols {
                    let point = Point::new(line, Column(col_idx));
                    let cell = &grid[point];
                    let combining = cell.zerowidth().map(|z| z.to_vec()).unwrap_or_default();
                    self.raw_buf[base + col_idx] = (cell.c, combining, cell.fg, cell.bg, cell.flags);
                }
            }

            let cursor_point = grid.cursor.point;
            let cursor_shape = match term.cursor_style().shape {
                AnsiCursorShape::Block => CursorShape::Block,
                AnsiCursorShape::Beam => CursorShape::Beam,
                AnsiCursorShape::Underline => CursorShape::Underline,
                _ => CursorShape::Block,
            };
            let cursor_visible = term.mode().contains(TermMode::SHOW_CURSOR);
            let mode = term_mode_to_vt_mode(*term.mode());

            (cols, total_lines, cursor_point, cursor_shape, cursor_visible, mode)
        }; // lock released

        let total_cells = cols * total_lines;
        let same_size = self.prev_raw_buf.len() == total_cells && self.vt.cols as usize == cols && self.vt.rows as usize == total_lines;

        self.vt.grid.resize_with(total_lines, || vec![Glyph::default(); cols]);

        let mut any_changed = false;

        for (line_idx, row) in self.vt.grid.iter_mut().enumerate().take(total_lines) {
            row.resize_with(cols, Glyph::default);
            let base = line_idx * cols;

            for (col_idx, glyph) in row.iter_mut().enumerate().take(cols) {
                let idx = base + col_idx;
                if same_size && self.prev_raw_buf[idx] == self.raw_buf[idx] {
                    continue;
                }
                any_changed = true;

                let (c, ref combining, fg, bg, flags) = self.raw_buf[idx];

                if flags.contains(CellFlags::WIDE_CHAR_SPACER) {
                    *glyph = Glyph { ch: '\0', combining: Vec::new(), width: 0, ..Glyph::default() };
                    continue;
                }

                let mut fg_color = color::convert_color(&fg, &self.palette_buf);
                let mut bg_color = color::convert_color(&bg, &self.palette_buf);
                if flags.contains(CellFlags::INVERSE) {
                    std::mem::swap(&mut fg_color, &mut bg_color);
                }

                let mut attrs = GlyphAttrs::empty();
                if flags.contains(CellFlags::BOLD) { attrs |= GlyphAttrs::BOLD; }
                if flags.contains(CellFlags::ITALIC) { attrs |= GlyphAttrs::ITALIC; }
                if flags.contains(CellFlags::DIM) { attrs |= GlyphAttrs::DIM; }
                if flags.contains(CellFlags::INVERSE) { attrs |= GlyphAttrs::REVERSE; }
                if flags.contains(CellFlags::UNDERLINE)
                    || flags.contains(CellFlags::DOUBLE_UNDERLINE)
                    || flags.contains(CellFlags::UNDERCURL)
                {
                    attrs |= GlyphAttrs::UNDERLINE;
                }

                *glyph = Glyph {
                    ch: c,
                    combining: combining.clone(),
                    fg: fg_color,
                    bg: bg_color,
                    attrs,
                    width: if flags.contains(CellFlags::WIDE_CHAR) { 2 } else { 1 },
                };
            }
        }

        std::mem::swap(&mut self.prev_raw_buf, &mut self.raw_buf);

        self.vt.grid.truncate(total_lines);
        self.vt.cols = cols as u16;
        self.vt.rows = total_lines as u16;
        self.vt.mode = mode;

        let cursor_row = cursor_point.line.0.max(0) as u16;
        let cursor_col = cursor_point.column.0 as u16;
        let cursor_style = self
            .vt
            .grid
            .get(cursor_row as usize)
            .and_then(|row| row.get(cursor_col as usize))
            .cloned()
            .unwrap_or_default();
        self.vt.cursor = Cursor {
            x: cursor_col.min(cols.saturating_sub(1) as u16),
            y: cursor_row.min(total_lines.saturating_sub(1) as u16),
            visible: cursor_visible,
            shape: cursor_shape,
            style: cursor_style,
        };

        if any_changed || !same_size {
            self.generation += 1;
        }

        any_changed || !same_size
    }
}

/// Maps alacritty's `TermMode` bits onto our wire-agnostic `VtMode` (§3),
/// which is all the input router and renderer need to know about.
fn term_mode_to_vt_mode(tm: TermMode) -> VtMode {
    let mut mode = VtMode::empty();
    if !tm.contains(TermMode::SHOW_CURSOR) { mode |= VtMode::HIDE_CURSOR; }
    if tm.contains(TermMode::MOUSE_REPORT_CLICK) { mode |= VtMode::MOUSE_BUTTON; }
    if tm.contains(TermMode::MOUSE_MOTION) { mode |= VtMode::MOUSE_MOTION; }
    if tm.contains(TermMode::MOUSE_DRAG) { mode |= VtMode::MOUSE_ANY; }
    if tm.contains(TermMode::SGR_MOUSE) { mode |= VtMode::MOUSE_SGR; }
    if tm.contains(TermMode::ALT_SCREEN) { mode |= VtMode::ALT_SCREEN; }
    if tm.contains(TermMode::BRACKETED_PASTE) { mode |= VtMode::BRACKETED_PASTE; }
    if tm.contains(TermMode::APP_CURSOR) { mode |= VtMode::APP_CURSOR_KEYS; }
    mode
}

// ──────────────────────────────────────────────
// Sync thread entry point
// ──────────────────────────────────────────────

fn grid_sync_thread_main(
    thread_handle: Arc<Mutex<Option<std::thread::Thread>>>,
    mut syncer: GridSyncer,
    dirty: Arc<AtomicBool>,
    shared_vt: Arc<Mutex<VtState>>,
    shared_generation: Arc<std::sync::atomic::AtomicU64>,
    snapshot_ready: Arc<AtomicBool>,
    waker: Arc<Mutex<Option<Box<dyn Fn() + Send>>>>,
    shutdown: Arc<AtomicBool>,
) {
    {
        let mut guard = thread_handle.lock().unwrap();
        *guard = Some(std::thread::current());
    }

    loop {
        while dirty.swap(false, Ordering::Relaxed) {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }

            syncer.sync();

            {
                let mut vt = shared_vt.lock().unwrap();
                vt.cols = syncer.vt.cols;
                vt.rows = syncer.vt.rows;
                vt.grid.clone_from(&syncer.vt.grid);
                vt.cursor = syncer.vt.cursor.clone();
                vt.mode = syncer.vt.mode;
            }
            shared_generation.store(syncer.generation, Ordering::Relaxed);
            snapshot_ready.store(true, Ordering::Relaxed);

            if let Ok(guard) = waker.lock() {
                if let Some(f) = guard.as_ref() {
                    f();
                }
            }
        }

        std::thread::park();

        if shutdown.load(Ordering::Relaxed) {
            return;
        }
    }
}

// ──────────────────────────────────────────────
// Terminal backend
// ──────────────────────────────────────────────

/// Terminal backend using alacritty_terminal for PTY management and VT emulation.
pub struct Terminal {
    term: Arc<FairMutex<Term<TermEventListener>>>,
    notifier: Notifier,
    vt: Arc<Mutex<VtState>>,
    generation: Arc<std::sync::atomic::AtomicU64>,
    current_dir: Option<PathBuf>,
    cols: u16,
    rows: u16,
    child_pid: Option<u32>,
    snapshot_ready: Arc<AtomicBool>,
    stay_at_bottom: Arc<AtomicBool>,
    dirty: Arc<AtomicBool>,
    waker: Arc<Mutex<Option<Box<dyn Fn() + Send>>>>,
    pending_pty_resize: Option<(WindowSize, Instant)>,
    sync_thread_handle: Arc<Mutex<Option<std::thread::Thread>>>,
    sync_shutdown: Arc<AtomicBool>,
    _sync_join: Option<std::thread::JoinHandle<()>>,
    title: Arc<Mutex<String>>,
    exited: Arc<AtomicBool>,
    shutdown_grace: Duration,
}

impl Terminal {
    pub fn new(cols: u16, rows: u16) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_cwd(cols, rows, None)
    }

    /// Create a new terminal backend, optionally starting in the given directory.
    pub fn with_cwd(cols: u16, rows: u16, cwd: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let cell_width = 8;
        let cell_height = 16;

        let window_size = WindowSize { num_cols: cols, num_lines: rows, cell_width, cell_height };
        let term_size = TermDimensions::new(cols as usize, rows as usize);

        let dirty = Arc::new(AtomicBool::new(true));
        let pty_writer = Arc::new(Mutex::new(None));
        let sync_thread_handle: Arc<Mutex<Option<std::thread::Thread>>> = Arc::new(Mutex::new(None));
        let title = Arc::new(Mutex::new(String::new()));
        let exited = Arc::new(AtomicBool::new(false));
        let listener = TermEventListener {
            dirty: dirty.clone(),
            pty_writer: pty_writer.clone(),
            sync_thread: sync_thread_handle.clone(),
            title: title.clone(),
            exited: exited.clone(),
        };

        let config = TermConfig::default();
        let term = Term::new(config, &term_size, listener.clone());
        let term = Arc::new(FairMutex::new(term));

        let shell = Self::detect_shell();
        let working_directory = cwd.or_else(|| std::env::var("HOME").ok().map(PathBuf::from));
        let mut env = std::collections::HashMap::new();
        env.insert(String::from("TERM"), String::from("xterm-256color"));
        env.insert(String::from("COLORTERM"), String::from("truecolor"));
        env.insert(String::from("PROMPT_EOL_MARK"), String::new());
        let pty_config = tty::Options {
            shell: Some(tty::Shell::new(shell, vec![String::from("-i")])),
            working_directory,
            env,
            ..tty::Options::default()
        };

        let pty = tty::new(&pty_config, window_size, 0)?;
        let child_pid = pty.child().id();

        let event_loop = EventLoop::new(term.clone(), listener, pty, false, false)?;
        let notifier = Notifier(event_loop.channel());
        if let Ok(mut guard) = pty_writer.lock() {
            *guard = Some(Notifier(event_loop.channel()));
        }
        event_loop.spawn();

        let vt = Arc::new(Mutex::new(VtState::blank(cols, rows)));
        let generation = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let stay_at_bottom = Arc::new(AtomicBool::new(false));
        let snapshot_ready = Arc::new(AtomicBool::new(false));
        let sync_shutdown = Arc::new(AtomicBool::new(false));
        let waker: Arc<Mutex<Option<Box<dyn Fn() + Send>>>> = Arc::new(Mutex::new(None));

        let syncer = GridSyncer {
            term: term.clone(),
            raw_buf: Vec::new(),
            prev_raw_buf: Vec::new(),
            palette_buf: [None; 256],
            vt: VtState::blank(cols, rows),
            generation: 0,
            stay_at_bottom: stay_at_bottom.clone(),
        };

        let sync_join = {
            let handle = sync_thread_handle.clone();
            let dirty = dirty.clone();
            let vt = vt.clone();
            let generation = generation.clone();
            let snapshot_ready = snapshot_ready.clone();
            let waker = waker.clone();
            let shutdown = sync_shutdown.clone();
            std::thread::Builder::new()
                .name("grid-sync".to_string())
                .spawn(move || {
                    grid_sync_thread_main(handle, syncer, dirty, vt, generation, snapshot_ready, waker, shutdown);
                })
                .expect("failed to spawn grid sync thread")
        };

        Ok(Terminal {
            term,
            notifier,
            vt,
            generation,
            current_dir: None,
            cols,
            rows,
            child_pid: Some(child_pid),
            snapshot_ready,
            stay_at_bottom,
            dirty,
            waker,
            pending_pty_resize: None,
            sync_thread_handle,
            sync_shutdown,
            _sync_join: Some(sync_join),
            title,
            exited,
            shutdown_grace: Duration::from_millis(200),
        })
    }

    /// Overrides how long `Drop` waits for the child after `SIGHUP` before
    /// escalating to `SIGKILL`. Defaults to 200ms.
    pub fn set_shutdown_grace(&mut self, grace: Duration) {
        self.shutdown_grace = grace;
    }

    fn detect_shell() -> String {
        std::env::var("SHELL").unwrap_or_else(|_| {
            if std::path::Path::new("/bin/zsh").exists() {
                "/bin/zsh".to_string()
            } else {
                "/bin/bash".to_string()
            }
        })
    }

    /// Detect the CWD of the child process using native OS APIs (no subprocess).
    #[cfg(target_os = "macos")]
    pub fn detect_cwd_fallback(&self) -> Option<PathBuf> {
        let pid = self.child_pid? as i32;

        const PROC_PIDVNODEPATHINFO: i32 = 9;
        const BUF_SIZE: usize = 2352;
        const PATH_OFFSET: usize = 152;
        const MAXPATHLEN: usize = 1024;

        let mut buf = [0u8; BUF_SIZE];
        let ret = unsafe {
            libc::proc_pidinfo(pid, PROC_PIDVNODEPATHINFO, 0, buf.as_mut_ptr() as *mut libc::c_void, BUF_SIZE as i32)
        };

        if ret <= 0 {
            return None;
        }

        let path_bytes = &buf[PATH_OFFSET..PATH_OFFSET + MAXPATHLEN];
        let len = path_bytes.iter().position(|&b| b == 0).unwrap_or(0);
        if len == 0 {
            return None;
        }

        let path = std::str::from_utf8(&path_bytes[..len]).ok()?;
        let p = PathBuf::from(path);
        if p.is_dir() { Some(p) } else { None }
    }

    #[cfg(not(target_os = "macos"))]
    pub fn detect_cwd_fallback(&self) -> Option<PathBuf> {
        if let Some(pid) = self.child_pid {
            let path = format!("/proc/{}/cwd", pid);
            std::fs::read_link(path).ok()
        } else {
            None
        }
    }

    fn notify_sync_thread(&self) {
        if let Ok(guard) = self.sync_thread_handle.lock() {
            if let Some(ref thread) = *guard {
                thread.unpark();
            }
        }
    }

    pub fn set_waker(&self, f: Box<dyn Fn() + Send>) {
        if let Ok(mut guard) = self.waker.lock() {
            *guard = Some(f);
        }
    }

    pub fn child_pid(&self) -> Option<u32> {
        self.child_pid
    }

    /// Detect whether the shell is idle (no foreground child process running).
    /// Supplemental feature: drives "reactivate the leader key after 1s
    /// since output" only loosely — callers use this to decide whether a
    /// lingering foreground job should suppress a reconnect notification.
    #[cfg(target_os = "macos")]
    pub fn is_shell_idle(&self) -> bool {
        let pid = match self.child_pid {
            Some(p) => p,
            None => return false,
        };
        let mut pids = [0i32; 16];
        let ret = unsafe {
            libc::proc_listchildpids(pid as i32, pids.as_mut_ptr() as *mut libc::c_void, (pids.len() * std::mem::size_of::<i32>()) as i32)
        };
        ret <= 0
    }

    #[cfg(not(target_os = "macos"))]
    pub fn is_shell_idle(&self) -> bool {
        let pid = match self.child_pid {
            Some(p) => p,
            None => return false,
        };
        let stat_path = format!("/proc/{}/stat", pid);
        if let Ok(contents) = std::fs::read_to_string(&stat_path) {
            let fields: Vec<&str> = contents.split_whitespace().collect();
            if fields.len() > 7 {
                let pgrp = fields[4].parse::<i32>().unwrap_or(0);
                let tpgid = fields[7].parse::<i32>().unwrap_or(-1);
                return pgrp == tpgid;
            }
        }
        false
    }

    pub fn has_new_output(&self) -> bool {
        self.snapshot_ready.load(Ordering::Relaxed)
    }

    pub fn grid_generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Force a sync cycle for benchmarking purposes.
    #[doc(hidden)]
    pub fn bench_sync_grid(&mut self) {
        self.dirty.store(true, Ordering::Relaxed);
        self.notify_sync_thread();
        while !self.snapshot_ready.load(Ordering::Relaxed) {
            std::thread::yield_now();
        }
        self.snapshot_ready.store(false, Ordering::Relaxed);
    }

    /// Inject bytes directly into the terminal emulator for benchmarking.
    /// Bypasses the PTY — feeds data straight into vte::ansi::Processor → Term.
    #[doc(hidden)]
    pub fn bench_write_to_term(&self, data: &[u8]) {
        use alacritty_terminal::vte::ansi::{Processor, StdSyncHandler};
        let mut processor: Processor<StdSyncHandler> = Processor::new();
        let mut term = self.term.lock();
        processor.advance(&mut *term, data);
    }

    /// Best-effort current working directory of the shell, refreshed on
    /// every call via `detect_cwd_fallback` (native OS API, no subprocess).
    pub fn cwd(&mut self) -> Option<PathBuf> {
        self.current_dir = self.detect_cwd_fallback();
        self.current_dir.clone()
    }

    pub fn current_cols(&self) -> u16 {
        self.cols
    }

    pub fn current_rows(&self) -> u16 {
        self.rows
    }

    /// Search the full scrollback + screen buffer for case-insensitive
    /// substring matches. Returns `(absolute_line_from_top, char_col,
    /// char_len)` tuples. Goes straight through the Term lock rather than a
    /// materialized VtState.scrollback, since scanning 10k history lines on
    /// every sync would be wasted work the vast majority of syncs never need.
    pub fn search_buffer(&self, query: &str) -> Vec<(usize, usize, usize)> {
        let mut results = Vec::new();
        if query.is_empty() {
            return results;
        }

        let query_lower = query.to_lowercase();
        let query_char_len = query.chars().count();
        let term = self.term.lock();
        let grid = term.grid();
        let total_lines = grid.screen_lines();
        let history_len = grid.history_size();
        let cols = grid.columns();

        for abs_line in 0..(history_len + total_lines) {
            let line_idx = Line(abs_line as i32 - history_len as i32);
            let mut row_text = String::with_capacity(cols);
            for col_idx in 0..cols {
                let point = Point::new(line_idx, Column(col_idx));
                let c = grid[point].c;
                row_text.push(if c == '\0' { ' ' } else { c });
            }

            let row_lower = row_text.to_lowercase();
            let mut start = 0;
            while let Some(byte_pos) = row_lower[start..].find(&query_lower) {
                let byte_col = start + byte_pos;
                let char_col = row_text[..byte_col].chars().count();
                results.push((abs_line, char_col, query_char_len));
                start = byte_col + row_lower[byte_col..].chars().next().map_or(1, |c| c.len_utf8());
            }
        }

        results
    }

    pub fn display_offset(&self) -> usize {
        let term = self.term.lock();
        term.grid().display_offset()
    }

    pub fn history_size(&self) -> usize {
        let term = self.term.lock();
        term.grid().history_size()
    }

    pub fn is_bracketed_paste_mode(&self) -> bool {
        let term = self.term.lock();
        term.mode().contains(TermMode::BRACKETED_PASTE)
    }

    /// Enter stay-at-bottom mode: every sync will scroll to bottom until the
    /// user explicitly scrolls away via scroll_display().
    pub fn request_scroll_to_bottom(&mut self) {
        self.stay_at_bottom.store(true, Ordering::Relaxed);
        self.dirty.store(true, Ordering::Relaxed);
        self.notify_sync_thread();
    }

    /// Scroll the terminal display by the given delta (positive = scroll up
    /// into history). Cancels stay-at-bottom mode.
    pub fn scroll_display(&mut self, delta: i32) {
        self.stay_at_bottom.store(false, Ordering::Relaxed);

        let mut term = self.term.lock();
        let old_offset = term.grid().display_offset();
        term.scroll_display(Scroll::Delta(delta));
        let new_offset = term.grid().display_offset();
        drop(term);

        if old_offset != new_offset {
            self.dirty.store(true, Ordering::Relaxed);
            self.notify_sync_thread();
        }
    }
}

impl TerminalBackend for Terminal {
    fn write(&mut self, data: &[u8]) {
        let _ = self.notifier.0.send(Msg::Input(Cow::Owned(data.to_vec())));
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        // Clamp to sane maximums to prevent catastrophic allocation.
        let cols = cols.min(1000);
        let rows = rows.min(500);
        if self.cols == cols && self.rows == rows {
            return;
        }
        self.cols = cols;
        self.rows = rows;

        let cell_width = 8;
        let cell_height = 16;
        let window_size = WindowSize { num_cols: cols, num_lines: rows, cell_width, cell_height };
        let term_size = TermDimensions::new(cols as usize, rows as usize);

        {
            let mut term = self.term.lock();
            term.resize(term_size);
        }

        // Debounce the PTY resize notification (SIGWINCH) to avoid prompt artifacts.
        self.pending_pty_resize = Some((window_size, Instant::now()));

        self.dirty.store(true, Ordering::Relaxed);
        self.notify_sync_thread();
    }

    fn with_vt<R>(&self, f: impl FnOnce(&VtState) -> R) -> R {
        if let Some((window_size, stamp)) = self.pending_pty_resize {
            if stamp.elapsed().as_millis() >= 50 {
                let _ = self.notifier.0.send(Msg::Resize(window_size));
            }
        }
        let vt = self.vt.lock().unwrap();
        f(&vt)
    }

    fn title(&self) -> String {
        self.title.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn is_done(&self) -> bool {
        self.exited.load(Ordering::Relaxed)
    }
}

/// Wait for a child process to exit after SIGHUP, polling with `waitpid`. If
/// it doesn't exit within `grace`, escalate to SIGKILL.
fn wait_for_child_exit(pid: u32, grace: Duration) {
    let deadline = Instant::now() + grace;
    loop {
        let ret = unsafe { libc::waitpid(pid as i32, std::ptr::null_mut(), libc::WNOHANG) };
        if ret != 0 {
            return;
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    unsafe {
        libc::kill(-(pid as i32), libc::SIGKILL);
    }
    let kill_deadline = Instant::now() + Duration::from_millis(50);
    loop {
        let ret = unsafe { libc::waitpid(pid as i32, std::ptr::null_mut(), libc::WNOHANG) };
        if ret != 0 || Instant::now() >= kill_deadline {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        // Send SIGHUP to the child process group so the shell can run trap
        // handlers and clean up (e.g. pyenv rehash lock files) before the pty
        // fd closes out from under it.
        if let Some(pid) = self.child_pid {
            unsafe {
                libc::kill(-(pid as i32), libc::SIGHUP);
            }
            wait_for_child_exit(pid, self.shutdown_grace);
        }

        self.sync_shutdown.store(true, Ordering::Relaxed);
        self.notify_sync_thread();
        if let Some(handle) = self._sync_join.take() {
            let _ = handle.join();
        }

        #[allow(unused)]
        let _ = self.notifier.0.send(Msg::Shutdown);
    }
}

#[cfg(test)]
mod tests;
