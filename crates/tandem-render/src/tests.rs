use std::sync::{Arc, Mutex};

use tandem_core::{CellRect, Cursor, GlyphAttrs, PeerId, PeerPalette, Renderer, VtState};
use tandem_layout::LayoutTree;

use super::{Compositor, PaneView};

struct FakePane {
    vt: Mutex<VtState>,
    title: Mutex<String>,
}

impl FakePane {
    fn new(cols: u16, rows: u16, title: &str) -> Arc<Self> {
        Arc::new(Self { vt: Mutex::new(VtState::blank(cols, rows)), title: Mutex::new(title.to_string()) })
    }

    fn fill(&self, ch: char) {
        let mut vt = self.vt.lock().unwrap();
        for row in vt.grid.iter_mut() {
            for glyph in row.iter_mut() {
                glyph.ch = ch;
            }
        }
    }
}

impl PaneView for FakePane {
    fn snapshot(&self) -> VtState {
        self.vt.lock().unwrap().clone()
    }

    fn title(&self) -> String {
        self.title.lock().unwrap().clone()
    }
}

fn setup(cols: u16, rows: u16) -> (Arc<Mutex<LayoutTree>>, Arc<Mutex<PeerPalette>>, Compositor, u64) {
    let (tree, root) = LayoutTree::with_initial_pane();
    let tree = Arc::new(Mutex::new(tree));
    let palette = Arc::new(Mutex::new(PeerPalette::new()));
    let compositor = Compositor::new(tree.clone(), palette.clone());
    let pane = FakePane::new(cols, rows, "shell");
    pane.fill('x');
    compositor.register_pane(root, pane);
    (tree, palette, compositor, root)
}

#[test]
fn single_pane_fills_target_minus_border() {
    let (_tree, _palette, compositor, _root) = setup(20, 10);
    let target = CellRect::new(0, 0, 20, 10);
    let frame = compositor.render(target);

    // Interior cell: should carry the pane's fill glyph.
    assert_eq!(frame.cell(5, 5).ch, 'x');
    // Corner: should be the border's top-left glyph, not the fill.
    assert_eq!(frame.cell(0, 0).ch, '┌');
}

#[test]
fn tiny_rect_skips_border() {
    let (_tree, _palette, compositor, _root) = setup(2, 2);
    let target = CellRect::new(0, 0, 2, 2);
    let frame = compositor.render(target);
    // No room for a border: raw grid fills the whole rect.
    assert_eq!(frame.cell(0, 0).ch, 'x');
}

#[test]
fn title_is_embedded_in_top_border() {
    let (_tree, _palette, compositor, _root) = setup(20, 10);
    let target = CellRect::new(0, 0, 20, 10);
    let frame = compositor.render(target);
    assert_eq!(frame.cell(1, 0).ch, 's');
    assert_eq!(frame.cell(2, 0).ch, 'h');
}

#[test]
fn long_title_is_clipped_to_available_width() {
    let (_tree, _palette, compositor, root) = setup(8, 5);
    // Replace with a title longer than the interior can hold.
    let pane = FakePane::new(8, 5, "a-very-long-pane-title");
    compositor.register_pane(root, pane);
    let target = CellRect::new(0, 0, 8, 5);
    let frame = compositor.render(target);
    // Should not panic or write past the right border column.
    assert_eq!(frame.cell(7, 0).ch, '┐');
}

#[test]
fn cursor_overlay_replaces_space_on_blank_cell() {
    // setup() fills the pane with 'x'; register a fresh blank-grid pane
    // instead so the cursor cell under test is a plain space.
    let (_tree, palette, compositor, root) = setup(20, 10);
    let pane = FakePane::new(20, 10, "shell");
    compositor.register_pane(root, pane);
    {
        let mut p = palette.lock().unwrap();
        let peer = PeerId::new(b"alice".to_vec());
        p.insert(peer.clone());
        p.set_cursor(peer, Cursor { x: 5, y: 5, ..Cursor::default() });
    }
    let target = CellRect::new(0, 0, 20, 10);
    let frame = compositor.render(target);
    assert_eq!(frame.cell(5, 5).ch, '│');
}

#[test]
fn cursor_overlay_toggles_reverse_on_non_space() {
    let (_tree, palette, compositor, _root) = setup(20, 10);
    {
        let mut p = palette.lock().unwrap();
        let peer = PeerId::new(b"bob".to_vec());
        p.insert(peer.clone());
        p.set_cursor(peer, Cursor { x: 5, y: 5, ..Cursor::default() });
    }
    let target = CellRect::new(0, 0, 20, 10);
    let frame = compositor.render(target);
    // Pane content was filled with 'x', a non-space glyph, so the overlay
    // must flip the reverse attribute rather than replace the character.
    assert_eq!(frame.cell(5, 5).ch, 'x');
    assert_ne!(frame.cell(5, 5).attrs & GlyphAttrs::REVERSE.bits(), 0);
}

#[test]
fn local_peer_cursor_is_drawn_last() {
    let (_tree, palette, compositor, _root) = setup(20, 10);
    {
        let mut p = palette.lock().unwrap();
        let remote = PeerId::new(b"zeta".to_vec());
        let local = PeerId::local();
        p.insert(remote.clone());
        p.insert(local.clone());
        // Both cursors land on the same cell; local must win the overlay.
        p.set_cursor(remote, Cursor { x: 3, y: 3, ..Cursor::default() });
        p.set_cursor(local.clone(), Cursor { x: 3, y: 3, ..Cursor::default() });
    }
    let target = CellRect::new(0, 0, 20, 10);
    let frame = compositor.render(target);
    assert_eq!(frame.cursors.get(&PeerId::local().to_string()).unwrap().x, 3);
}

#[test]
fn invisible_cursor_is_recorded_but_not_drawn() {
    let (_tree, palette, compositor, _root) = setup(20, 10);
    let peer = PeerId::new(b"carol".to_vec());
    {
        let mut p = palette.lock().unwrap();
        p.insert(peer.clone());
        p.set_cursor(peer.clone(), Cursor { x: 5, y: 5, visible: false, ..Cursor::default() });
    }
    let target = CellRect::new(0, 0, 20, 10);
    let frame = compositor.render(target);
    assert_eq!(frame.cell(5, 5).ch, 'x');
    assert!(!frame.cursors.get(&peer.to_string()).unwrap().visible);
}

#[test]
fn unregistered_pane_does_not_panic() {
    let (tree, palette, _compositor, _root) = setup(20, 10);
    let fresh = Compositor::new(tree, palette);
    let target = CellRect::new(0, 0, 20, 10);
    let frame = fresh.render(target);
    assert_eq!(frame.cell(0, 0).ch, ' ');
}
