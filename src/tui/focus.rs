// Focus-mode pane multiplexer
//
// While a pane has focus, keys and in-pane mouse events are encoded into the
// byte sequences a terminal program expects and written to the pane's sink.
// At most one sink is open at a time: attaching always closes the previous
// one first.

use crate::session::{PaneKind, PaneSink, SessionBackend};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

const ESC: u8 = 0x1b;

/// The pane currently receiving input
struct Attached {
    pane: PaneKind,
    session_id: String,
    sink: Box<dyn PaneSink>,
}

#[derive(Default)]
pub struct FocusMux {
    attached: Option<Attached>,
}

impl FocusMux {
    /// Close whatever is attached, then open `pane` of `session_id`
    pub fn attach(
        &mut self,
        backend: &dyn SessionBackend,
        session_id: &str,
        pane: PaneKind,
        area: Rect,
    ) -> Result<()> {
        self.detach();
        let sink = backend.attach(session_id, pane, area.width, area.height)?;
        tracing::debug!("Attached {} pane of {}", pane.label(), session_id);
        self.attached = Some(Attached {
            pane,
            session_id: session_id.to_string(),
            sink,
        });
        Ok(())
    }

    /// Close the attached sink, if any. Returns whether one was open.
    pub fn detach(&mut self) -> bool {
        match self.attached.take() {
            Some(mut attached) => {
                attached.sink.close();
                tracing::debug!(
                    "Detached {} pane of {}",
                    attached.pane.label(),
                    attached.session_id
                );
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn pane(&self) -> Option<PaneKind> {
        self.attached.as_ref().map(|a| a.pane)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.attached.as_ref().map(|a| a.session_id.as_str())
    }

    pub fn is_attached_to(&self, session_id: &str) -> bool {
        self.session_id() == Some(session_id)
    }

    /// Write bytes to the attached sink. Returns false when there is no
    /// live sink to write to.
    pub fn forward(&mut self, bytes: &[u8]) -> Result<bool> {
        match self.attached.as_mut() {
            Some(attached) if attached.sink.is_running() => {
                attached.sink.send(bytes)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn resize(&mut self, area: Rect) -> Result<()> {
        if let Some(attached) = self.attached.as_mut() {
            attached.sink.resize(area.width, area.height)?;
        }
        Ok(())
    }

    /// Screen text of the attached pane, if it shows `pane` of `session_id`
    pub fn contents(&self, session_id: &str, pane: PaneKind) -> Option<String> {
        self.attached
            .as_ref()
            .filter(|a| a.session_id == session_id && a.pane == pane)
            .map(|a| a.sink.contents())
    }
}

/// Ctrl+O leaves focus mode
pub fn is_detach_key(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('o') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Encode a key press as terminal input bytes; None for keys with no encoding
pub fn key_to_bytes(key: &KeyEvent) -> Option<Vec<u8>> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let bytes = match key.code {
        KeyCode::Char(ch) if ctrl => match ch.to_ascii_lowercase() {
            'a' => vec![0x01],
            'c' => vec![0x03],
            'd' => vec![0x04],
            'e' => vec![0x05],
            'k' => vec![0x0b],
            'l' => vec![0x0c],
            'u' => vec![0x15],
            'w' => vec![0x17],
            _ => return None,
        },
        KeyCode::Char(ch) => {
            let mut buf = [0u8; 4];
            ch.encode_utf8(&mut buf).as_bytes().to_vec()
        }
        KeyCode::Enter => vec![0x0d],
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Tab => vec![0x09],
        KeyCode::BackTab => vec![ESC, b'[', b'Z'],
        KeyCode::Delete => vec![ESC, b'[', b'3', b'~'],
        KeyCode::Esc => vec![ESC],
        KeyCode::Up | KeyCode::Down | KeyCode::Right | KeyCode::Left
            if key.modifiers.is_empty() =>
        {
            let dir = match key.code {
                KeyCode::Up => b'A',
                KeyCode::Down => b'B',
                KeyCode::Right => b'C',
                _ => b'D',
            };
            vec![ESC, b'[', dir]
        }
        _ => return None,
    };
    Some(bytes)
}

/// Encode a mouse event as an SGR report relative to `area`.
/// Events outside the area are dropped.
pub fn mouse_to_sgr(event: &MouseEvent, area: Rect) -> Option<String> {
    if event.column < area.x || event.row < area.y {
        return None;
    }
    let x = event.column - area.x + 1;
    let y = event.row - area.y + 1;
    if x > area.width || y > area.height {
        return None;
    }

    let button_code = |button: MouseButton| match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
    };
    let (code, suffix) = match event.kind {
        MouseEventKind::Down(button) => (button_code(button), 'M'),
        MouseEventKind::Up(button) => (button_code(button), 'm'),
        MouseEventKind::Drag(button) => (button_code(button) + 32, 'M'),
        // Motion with no button held
        MouseEventKind::Moved => (3 + 32, 'M'),
        MouseEventKind::ScrollUp => (64, 'M'),
        MouseEventKind::ScrollDown => (65, 'M'),
        MouseEventKind::ScrollLeft => (66, 'M'),
        MouseEventKind::ScrollRight => (67, 'M'),
    };
    Some(format!("\x1b[<{};{};{}{}", code, x, y, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn enter_is_carriage_return() {
        assert_eq!(
            key_to_bytes(&key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(vec![0x0d])
        );
    }

    #[test]
    fn ctrl_c_is_etx() {
        assert_eq!(
            key_to_bytes(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(vec![0x03])
        );
        assert_eq!(
            key_to_bytes(&key(KeyCode::Char('w'), KeyModifiers::CONTROL)),
            Some(vec![0x17])
        );
    }

    #[test]
    fn unmapped_keys_emit_nothing() {
        assert_eq!(key_to_bytes(&key(KeyCode::F(5), KeyModifiers::NONE)), None);
        assert_eq!(
            key_to_bytes(&key(KeyCode::Char('z'), KeyModifiers::CONTROL)),
            None
        );
        assert_eq!(key_to_bytes(&key(KeyCode::Home, KeyModifiers::NONE)), None);
        // Shifted arrows belong to navigation, not the pane
        assert_eq!(key_to_bytes(&key(KeyCode::Up, KeyModifiers::SHIFT)), None);
    }

    #[test]
    fn runes_and_special_keys() {
        let none = KeyModifiers::NONE;
        assert_eq!(key_to_bytes(&key(KeyCode::Char(' '), none)), Some(vec![0x20]));
        assert_eq!(
            key_to_bytes(&key(KeyCode::Char('é'), none)),
            Some("é".as_bytes().to_vec())
        );
        assert_eq!(key_to_bytes(&key(KeyCode::Backspace, none)), Some(vec![0x7f]));
        assert_eq!(key_to_bytes(&key(KeyCode::Tab, none)), Some(vec![0x09]));
        assert_eq!(
            key_to_bytes(&key(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Some(b"\x1b[Z".to_vec())
        );
        assert_eq!(key_to_bytes(&key(KeyCode::Delete, none)), Some(b"\x1b[3~".to_vec()));
        assert_eq!(key_to_bytes(&key(KeyCode::Esc, none)), Some(vec![0x1b]));
        assert_eq!(key_to_bytes(&key(KeyCode::Left, none)), Some(b"\x1b[D".to_vec()));
    }

    #[test]
    fn left_press_encodes_relative_position() {
        let area = Rect::new(10, 4, 40, 20);
        // Column 14, row 6 is the 5th column and 3rd row of the pane
        let event = mouse(MouseEventKind::Down(MouseButton::Left), 14, 6);
        assert_eq!(mouse_to_sgr(&event, area).as_deref(), Some("\x1b[<0;5;3M"));
    }

    #[test]
    fn wheel_up_at_origin() {
        let area = Rect::new(10, 4, 40, 20);
        let event = mouse(MouseEventKind::ScrollUp, 10, 4);
        assert_eq!(mouse_to_sgr(&event, area).as_deref(), Some("\x1b[<64;1;1M"));
    }

    #[test]
    fn release_drag_and_hover() {
        let area = Rect::new(0, 0, 80, 24);
        let up = mouse(MouseEventKind::Up(MouseButton::Right), 0, 0);
        assert_eq!(mouse_to_sgr(&up, area).as_deref(), Some("\x1b[<2;1;1m"));
        let drag = mouse(MouseEventKind::Drag(MouseButton::Left), 1, 1);
        assert_eq!(mouse_to_sgr(&drag, area).as_deref(), Some("\x1b[<32;2;2M"));
        let hover = mouse(MouseEventKind::Moved, 2, 2);
        assert_eq!(mouse_to_sgr(&hover, area).as_deref(), Some("\x1b[<35;3;3M"));
    }

    #[test]
    fn outside_events_are_dropped() {
        let area = Rect::new(10, 4, 40, 20);
        let left_of = mouse(MouseEventKind::Down(MouseButton::Left), 9, 5);
        let below = mouse(MouseEventKind::Down(MouseButton::Left), 12, 24);
        let right_of = mouse(MouseEventKind::ScrollDown, 50, 5);
        assert_eq!(mouse_to_sgr(&left_of, area), None);
        assert_eq!(mouse_to_sgr(&below, area), None);
        assert_eq!(mouse_to_sgr(&right_of, area), None);
    }

    #[test]
    fn detach_chord() {
        assert!(is_detach_key(&key(KeyCode::Char('o'), KeyModifiers::CONTROL)));
        assert!(!is_detach_key(&key(KeyCode::Char('o'), KeyModifiers::NONE)));
    }
}
