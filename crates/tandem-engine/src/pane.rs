//! Binds one VT+pty with a frame (§3 Pane): the engine's concrete
//! `PaneView`, thin enough to just lock a `Terminal` and read it.

use std::sync::Mutex;

use tandem_core::{Cursor, TerminalBackend, VtState};
use tandem_render::PaneView;
use tandem_terminal::Terminal;

/// One pane's backing terminal. `write`/`resize` take `&self` here (unlike
/// `TerminalBackend`'s `&mut self`) because the engine shares this behind an
/// `Arc` with both the render path and the event-delivery path; the mutex
/// is the only thing that needs exclusive access.
pub struct PaneHandle {
    terminal: Mutex<Terminal>,
}

impl PaneHandle {
    pub fn new(terminal: Terminal) -> Self {
        Self { terminal: Mutex::new(terminal) }
    }

    pub fn write(&self, data: &[u8]) {
        self.terminal.lock().unwrap().write(data);
    }

    pub fn resize(&self, cols: u16, rows: u16) {
        self.terminal.lock().unwrap().resize(cols, rows);
    }

    pub fn mode(&self) -> tandem_core::VtMode {
        self.terminal.lock().unwrap().with_vt(|vt| vt.mode)
    }

    pub fn cursor(&self) -> Cursor {
        self.terminal.lock().unwrap().with_vt(|vt| vt.cursor.clone())
    }

    pub fn is_done(&self) -> bool {
        self.terminal.lock().unwrap().is_done()
    }

    pub fn set_waker(&self, f: Box<dyn Fn() + Send>) {
        self.terminal.lock().unwrap().set_waker(f);
    }
}

impl PaneView for PaneHandle {
    fn snapshot(&self) -> VtState {
        self.terminal.lock().unwrap().with_vt(|vt| vt.clone())
    }

    fn title(&self) -> String {
        self.terminal.lock().unwrap().title()
    }
}
