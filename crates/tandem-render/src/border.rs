//! One-cell pane border with an embedded title, drawn by the compositor
//! itself — `LayoutTree::compute` hands out the pane's full rect with no
//! gutter reserved for chrome.

use unicode_width::UnicodeWidthStr;

use tandem_core::{CellRect, Color, Frame, GlyphAttrs, WireColor};

const BORDER_COLOR: Color = Color::rgb(0x60, 0x60, 0x60);
const TOP_LEFT: char = '┌';
const TOP_RIGHT: char = '┐';
const BOTTOM_LEFT: char = '└';
const BOTTOM_RIGHT: char = '┘';
const HORIZONTAL: char = '─';
const VERTICAL: char = '│';

/// Draws `rect`'s border in `frame`, whose local coordinate space starts at
/// `target`'s origin. `rect` itself is at least 3x3 (checked by the caller).
pub(crate) fn draw_border(frame: &mut Frame, target: CellRect, rect: CellRect, title: &str) {
    let fg: WireColor = BORDER_COLOR.into();
    let put = |frame: &mut Frame, x: u16, y: u16, ch: char| {
        let cell = frame.cell_mut(x - target.x, y - target.y);
        cell.ch = ch;
        cell.combining.clear();
        cell.fg = fg.clone();
        cell.attrs = GlyphAttrs::empty().bits();
        cell.width = 1;
    };

    let (left, right) = (rect.x, rect.x + rect.width - 1);
    let (top, bottom) = (rect.y, rect.y + rect.height - 1);

    put(frame, left, top, TOP_LEFT);
    put(frame, right, top, TOP_RIGHT);
    put(frame, left, bottom, BOTTOM_LEFT);
    put(frame, right, bottom, BOTTOM_RIGHT);
    for x in (left + 1)..right {
        put(frame, x, top, HORIZONTAL);
        put(frame, x, bottom, HORIZONTAL);
    }
    for y in (top + 1)..bottom {
        put(frame, left, y, VERTICAL);
        put(frame, right, y, VERTICAL);
    }

    let available = (right - left).saturating_sub(1) as usize;
    if available == 0 {
        return;
    }
    let clipped = clip_to_width(title, available);
    let mut x = left + 1;
    for ch in clipped.chars() {
        put(frame, x, top, ch);
        x += 1;
    }
}

/// Truncates `s` to at most `max_width` display columns, dropping the final
/// character rather than splitting a wide one across the boundary.
fn clip_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut w = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(1);
        if w + cw > max_width {
            break;
        }
        out.push(ch);
        w += cw;
    }
    out
}
