//! Cell-grid compositor: walks the layout tree into a `Frame` and overlays
//! per-peer cursors (§4.5).

mod border;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use unicode_width::UnicodeWidthChar;

use tandem_core::{
    CellRect, Color, Frame, GlyphAttrs, PaneId, PeerId, PeerPalette, Renderer, VtState, WireCursor,
    WireGlyph,
};
use tandem_layout::LayoutTree;

use border::draw_border;

/// A pane's renderable surface, as seen by the compositor. The engine
/// implements this over whatever owns the actual `TerminalBackend` (usually
/// an `Arc<Mutex<Terminal>>`); the compositor never touches a pty directly.
pub trait PaneView: Send + Sync {
    fn snapshot(&self) -> VtState;
    fn title(&self) -> String;
}

/// Composites the shared layout tree and peer palette into a `Frame`.
///
/// Owns the same `Arc<Mutex<LayoutTree>>`/`Arc<Mutex<PeerPalette>>` the
/// engine and input router share, per the §5 lock order (tree before
/// anything downstream of it). Per-peer cursor positions in `PeerPalette`
/// are expected to already be translated into frame-absolute cell
/// coordinates by whoever calls `PeerPalette::set_cursor` — the compositor
/// only draws them, it does not know which pane a peer is focused on.
pub struct Compositor {
    tree: Arc<Mutex<LayoutTree>>,
    palette: Arc<Mutex<PeerPalette>>,
    panes: Mutex<HashMap<PaneId, Arc<dyn PaneView>>>,
}

impl Compositor {
    pub fn new(tree: Arc<Mutex<LayoutTree>>, palette: Arc<Mutex<PeerPalette>>) -> Self {
        Self { tree, palette, panes: Mutex::new(HashMap::new()) }
    }

    pub fn register_pane(&self, id: PaneId, view: Arc<dyn PaneView>) {
        self.panes.lock().unwrap().insert(id, view);
    }

    pub fn unregister_pane(&self, id: PaneId) {
        self.panes.lock().unwrap().remove(&id);
    }
}

impl Renderer for Compositor {
    fn render(&self, target: CellRect) -> Frame {
        let mut frame = Frame::blank(target.width, target.height);

        let rects = self.tree.lock().unwrap().compute(target);
        let panes = self.panes.lock().unwrap();
        for (pane_id, rect) in rects {
            if let Some(view) = panes.get(&pane_id) {
                compose_pane(&mut frame, target, rect, &view.snapshot(), &view.title());
            } else {
                log::warn!("layout tree references unregistered pane {pane_id}");
            }
        }
        drop(panes);

        overlay_cursors(&mut frame, target, &self.palette.lock().unwrap());
        frame
    }
}

/// Copies `vt`'s grid into `rect` (given in `target`'s coordinate space),
/// clipped to whichever is smaller, then (if there's room) draws a one-cell
/// border with the pane title embedded in the top edge. A border needs at
/// least 3 cells on each axis; smaller rects just get the raw grid with no
/// frame.
fn compose_pane(frame: &mut Frame, target: CellRect, rect: CellRect, vt: &VtState, title: &str) {
    let has_border = rect.width >= 3 && rect.height >= 3;
    let interior = if has_border {
        CellRect::new(rect.x + 1, rect.y + 1, rect.width - 2, rect.height - 2)
    } else {
        rect
    };

    let rows = interior.height.min(vt.rows);
    let cols = interior.width.min(vt.cols);
    for row in 0..rows {
        for col in 0..cols {
            let glyph = &vt.grid[row as usize][col as usize];
            let (fx, fy) = (interior.x + col - target.x, interior.y + row - target.y);
            *frame.cell_mut(fx, fy) = WireGlyph::from(glyph);
        }
    }

    if has_border {
        draw_border(frame, target, rect, title);
    }
}

/// Peers in id-sorted order, local peer drawn last (§4.5 tie-break).
fn cursor_draw_order(palette: &PeerPalette) -> Vec<PeerId> {
    let mut order = palette.peers_sorted();
    if let Some(pos) = order.iter().position(|p| *p == PeerId::local()) {
        let local = order.remove(pos);
        order.push(local);
    }
    order
}

fn overlay_cursors(frame: &mut Frame, target: CellRect, palette: &PeerPalette) {
    for peer in cursor_draw_order(palette) {
        let Some(cursor) = palette.cursor(&peer) else { continue };
        frame.cursors.insert(
            peer.to_string(),
            WireCursor { x: cursor.x, y: cursor.y, visible: cursor.visible },
        );
        if !cursor.visible || !target.contains(cursor.x, cursor.y) {
            continue;
        }
        let color: Color = palette.color(&peer).unwrap_or(Color::WHITE);
        let (fx, fy) = (cursor.x - target.x, cursor.y - target.y);

        let cell = frame.cell_mut(fx, fy);
        cell.fg = color.into();
        if cell.ch == ' ' {
            cell.ch = '│';
        } else {
            let attrs = GlyphAttrs::from_bits_truncate(cell.attrs) | GlyphAttrs::REVERSE;
            cell.attrs = attrs.bits();
        }

        write_cursor_label(frame, target, cursor.x, cursor.y + 1, &peer, color);
    }
}

/// Up to six characters of the peer id beneath the cursor cell, clipped to
/// `target`'s right and bottom edges. `x`/`y` are in `target`'s coordinate
/// space, matching `cursor.x`/`cursor.y`.
fn write_cursor_label(frame: &mut Frame, target: CellRect, x: u16, y: u16, peer: &PeerId, color: Color) {
    if y >= target.y + target.height {
        return;
    }
    let mut cx = x;
    for ch in peer.short_label().chars() {
        if cx >= target.x + target.width {
            break;
        }
        let width = ch.width().unwrap_or(1) as u16;
        if width == 0 {
            continue;
        }
        let cell = frame.cell_mut(cx - target.x, y - target.y);
        cell.ch = ch;
        cell.fg = color.into();
        cx += width;
    }
}
