//! Raw local-terminal input decoding: the CLI's own `crossterm` event
//! stream, translated into the same `Event` the wire protocol carries (§4.6
//! speaks only of routing an already-decoded `Event`; this is the missing
//! half, local to the host/joiner's own controlling terminal).

use std::collections::VecDeque;
use std::io;

use crossterm::event::{Event as CtEvent, EventStream, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use futures::StreamExt;
use tandem_core::{Event, Key, Modifiers, MouseButtons};

pub struct InputReader {
    stream: EventStream,
    pending: VecDeque<Event>,
}

impl InputReader {
    pub fn new() -> Self {
        Self { stream: EventStream::new(), pending: VecDeque::new() }
    }

    /// Yields the next decoded event, draining a pasted block one `Key` at a
    /// time between its `Paste{start: true}`/`Paste{start: false}` markers
    /// before pulling a fresh `crossterm` event off the stream.
    pub async fn next(&mut self) -> Option<io::Result<Event>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            match self.stream.next().await {
                Some(Ok(ct_event)) => translate(ct_event, &mut self.pending),
                Some(Err(e)) => return Some(Err(e)),
                None => return None,
            }
        }
    }
}

fn translate(ct_event: CtEvent, out: &mut VecDeque<Event>) {
    match ct_event {
        CtEvent::Key(key_event) => {
            if key_event.kind == KeyEventKind::Release {
                return;
            }
            if let Some((key, rune)) = translate_key_code(key_event.code) {
                out.push_back(Event::Key { key, rune, mods: translate_mods(key_event.modifiers) });
            }
        }
        CtEvent::Mouse(m) => {
            out.push_back(Event::Mouse {
                x: m.column,
                y: m.row,
                buttons: translate_mouse_kind(m.kind),
                mods: translate_mods(m.modifiers),
            });
        }
        CtEvent::Resize(cols, rows) => out.push_back(Event::Resize { cols, rows }),
        CtEvent::Paste(text) => {
            out.push_back(Event::Paste { start: true });
            out.extend(text.chars().map(|c| Event::Key { key: Key::Char(c), rune: Some(c), mods: Modifiers::default() }));
            out.push_back(Event::Paste { start: false });
        }
        CtEvent::FocusGained | CtEvent::FocusLost => {}
    }
}

fn translate_mods(mods: KeyModifiers) -> Modifiers {
    Modifiers {
        shift: mods.contains(KeyModifiers::SHIFT),
        ctrl: mods.contains(KeyModifiers::CONTROL),
        alt: mods.contains(KeyModifiers::ALT),
        meta: mods.contains(KeyModifiers::SUPER),
    }
}

fn translate_mouse_kind(kind: MouseEventKind) -> MouseButtons {
    use crossterm::event::MouseButton as CtButton;
    match kind {
        MouseEventKind::Down(CtButton::Left) | MouseEventKind::Drag(CtButton::Left) => MouseButtons::LEFT,
        MouseEventKind::Down(CtButton::Right) | MouseEventKind::Drag(CtButton::Right) => MouseButtons::RIGHT,
        MouseEventKind::Down(CtButton::Middle) | MouseEventKind::Drag(CtButton::Middle) => MouseButtons::MIDDLE,
        _ => MouseButtons::NONE,
    }
}

fn translate_key_code(code: KeyCode) -> Option<(Key, Option<char>)> {
    Some(match code {
        KeyCode::Char(c) => (Key::Char(c), Some(c)),
        KeyCode::Enter => (Key::Enter, None),
        KeyCode::Backspace => (Key::Backspace, None),
        KeyCode::Tab => (Key::Tab, None),
        KeyCode::Esc => (Key::Escape, None),
        KeyCode::Delete => (Key::Delete, None),
        KeyCode::Up => (Key::Up, None),
        KeyCode::Down => (Key::Down, None),
        KeyCode::Left => (Key::Left, None),
        KeyCode::Right => (Key::Right, None),
        KeyCode::Home => (Key::Home, None),
        KeyCode::End => (Key::End, None),
        KeyCode::PageUp => (Key::PageUp, None),
        KeyCode::PageDown => (Key::PageDown, None),
        KeyCode::Insert => (Key::Insert, None),
        KeyCode::F(n) => (Key::F(n), None),
        _ => return None,
    })
}
