// Color palette and conversion logic for Terminal.
//
// Unlike the GUI build this has no pane background to contrast against —
// the composited Frame is just RGB values a joiner's own terminal paints
// verbatim — so there is one palette, not a dark/light pair, and no
// post-hoc contrast boost.

use alacritty_terminal::vte::ansi::{Color as AnsiColor, NamedColor, Rgb as AnsiRgb};

use tandem_core::Color;

/// Standard xterm 16-color ANSI palette.
fn named_color_to_rgb(named: NamedColor) -> Color {
    match named {
        NamedColor::Black => Color::rgb(0x00, 0x00, 0x00),
        NamedColor::Red => Color::rgb(0xcd, 0x31, 0x31),
        NamedColor::Green => Color::rgb(0x0d, 0xbc, 0x79),
        NamedColor::Yellow => Color::rgb(0xe5, 0xe5, 0x10),
        NamedColor::Blue => Color::rgb(0x24, 0x72, 0xc8),
        NamedColor::Magenta => Color::rgb(0xbc, 0x3f, 0xbc),
        NamedColor::Cyan => Color::rgb(0x11, 0xa8, 0xcd),
        NamedColor::White => Color::rgb(0xe5, 0xe5, 0xe5),
        NamedColor::BrightBlack => Color::rgb(0x66, 0x66, 0x66),
        NamedColor::BrightRed => Color::rgb(0xf1, 0x4c, 0x4c),
        NamedColor::BrightGreen => Color::rgb(0x23, 0xd1, 0x8b),
        NamedColor::BrightYellow => Color::rgb(0xf5, 0xf5, 0x43),
        NamedColor::BrightBlue => Color::rgb(0x3b, 0x8e, 0xea),
        NamedColor::BrightMagenta => Color::rgb(0xd6, 0x70, 0xd6),
        NamedColor::BrightCyan => Color::rgb(0x29, 0xb8, 0xdb),
        NamedColor::BrightWhite => Color::rgb(0xe5, 0xe5, 0xe5),
        NamedColor::Foreground => Color::rgb(0xe5, 0xe5, 0xe5),
        NamedColor::Background => Color::BLACK,
        _ => Color::rgb(0xe5, 0xe5, 0xe5),
    }
}

/// 256-color palette fallback, used only when alacritty hasn't reported an
/// explicit RGB override for the index (`term.colors()`).
fn indexed_color_fallback(idx: u8) -> Color {
    match idx {
        0..=15 => named_color_to_rgb(index_to_named(idx)),
        16..=231 => {
            let idx = idx - 16;
            let r = idx / 36;
            let g = (idx % 36) / 6;
            let b = idx % 6;
            let scale = |c: u8| if c == 0 { 0 } else { 55 + 40 * c };
            Color::rgb(scale(r), scale(g), scale(b))
        }
        _ => {
            let v = 8 + 10 * (idx - 232);
            Color::rgb(v, v, v)
        }
    }
}

pub(crate) fn convert_color(color: &AnsiColor, palette: &[Option<AnsiRgb>; 256]) -> Color {
    match color {
        AnsiColor::Named(named) => named_color_to_rgb(*named),
        AnsiColor::Spec(rgb) => Color::rgb(rgb.r, rgb.g, rgb.b),
        AnsiColor::Indexed(idx) => {
            if *idx < 16 {
                return named_color_to_rgb(index_to_named(*idx));
            }
            match palette[*idx as usize] {
                Some(rgb) => Color::rgb(rgb.r, rgb.g, rgb.b),
                None => indexed_color_fallback(*idx),
            }
        }
    }
}

fn index_to_named(idx: u8) -> NamedColor {
    match idx {
        0 => NamedColor::Black,
        1 => NamedColor::Red,
        2 => NamedColor::Green,
        3 => NamedColor::Yellow,
        4 => NamedColor::Blue,
        5 => NamedColor::Magenta,
        6 => NamedColor::Cyan,
        7 => NamedColor::White,
        8 => NamedColor::BrightBlack,
        9 => NamedColor::BrightRed,
        10 => NamedColor::BrightGreen,
        11 => NamedColor::BrightYellow,
        12 => NamedColor::BrightBlue,
        13 => NamedColor::BrightMagenta,
        14 => NamedColor::BrightCyan,
        15 => NamedColor::BrightWhite,
        _ => NamedColor::Foreground,
    }
}
