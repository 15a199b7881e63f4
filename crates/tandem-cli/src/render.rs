//! Paints a `Frame` (§3) to the real controlling terminal. Both host and
//! joiner share this: the host calls `draw_frame` directly off its own
//! `Session::render`, the joiner is driven through the `FrameSink` a
//! `ShareClient` pushes frames into.

use std::io::{self, Write};
use std::sync::Mutex;

use crossterm::{cursor, queue, style, terminal};
use tandem_core::{Frame, WireColor};
use tandem_share::FrameSink;

pub struct TerminalRenderer {
    out: Mutex<io::Stdout>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self { out: Mutex::new(io::stdout()) }
    }

    pub fn draw_frame(&self, frame: &Frame) -> io::Result<()> {
        let mut out = self.out.lock().unwrap();
        queue!(out, terminal::Clear(terminal::ClearType::All))?;

        for y in 0..frame.rows {
            queue!(out, cursor::MoveTo(0, y))?;
            for x in 0..frame.cols {
                let idx = y as usize * frame.cols as usize + x as usize;
                let Some(glyph) = frame.cells.get(idx) else { continue };
                let mut text = String::with_capacity(1 + glyph.combining.len());
                text.push(glyph.ch);
                text.extend(glyph.combining.iter());
                queue!(
                    out,
                    style::SetForegroundColor(wire_color(glyph.fg)),
                    style::SetBackgroundColor(wire_color(glyph.bg)),
                    style::Print(text),
                )?;
            }
        }
        queue!(out, style::ResetColor)?;

        if let Some(cursor) = frame.cursors.values().find(|c| c.visible) {
            if cursor.x < frame.cols && cursor.y < frame.rows {
                queue!(out, cursor::MoveTo(cursor.x, cursor.y), cursor::Show)?;
            }
        } else {
            queue!(out, cursor::Hide)?;
        }

        out.flush()
    }
}

fn wire_color(c: WireColor) -> style::Color {
    style::Color::Rgb { r: c.r, g: c.g, b: c.b }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_color_maps_channels_straight_through() {
        let c = WireColor { r: 10, g: 20, b: 30 };
        assert_eq!(wire_color(c), style::Color::Rgb { r: 10, g: 20, b: 30 });
    }
}

impl FrameSink for TerminalRenderer {
    fn present(&self, frame: Frame) {
        if let Err(e) = self.draw_frame(&frame) {
            tracing::warn!(error = %e, "failed to draw frame");
        }
    }
}
