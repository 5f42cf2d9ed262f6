//! Input mapping for the terminal front-end
//!
//! Converts crossterm key and mouse events into tab manager commands.
//! Mouse coordinates are desktop cells, so they pass straight through to the
//! drag coordinator.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::core::Point;

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NewTab,
    CloseTab,
    CloseWindow,
    ToggleMerge,
    CancelDrag,
    Back,
    Forward,
    Refresh,
    Stop,
    CopyUrl,
    /// Start typing an address for the focused window
    EditAddress,
    Quit,
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
}

/// Keystrokes while the address line is being edited
#[derive(Debug, Clone, PartialEq)]
pub enum AddressInput {
    Insert(char),
    Backspace,
    Submit,
    Abort,
}

/// Maps terminal events to commands
pub struct KeyMapper;

impl KeyMapper {
    /// Map a key press. Releases and repeats of non-character keys are ignored.
    pub fn map_key(event: &KeyEvent) -> Option<Command> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let mods = Modifiers::from(event.modifiers);

        if mods.contains(Modifiers::CTRL) {
            return match event.code {
                KeyCode::Char('c') | KeyCode::Char('q') => Some(Command::Quit),
                KeyCode::Char('t') => Some(Command::NewTab),
                KeyCode::Char('w') => Some(Command::CloseTab),
                KeyCode::Char('l') => Some(Command::EditAddress),
                _ => None,
            };
        }

        match event.code {
            KeyCode::Char('t') => Some(Command::NewTab),
            KeyCode::Char('w') => Some(Command::CloseTab),
            KeyCode::Char('W') => Some(Command::CloseWindow),
            KeyCode::Char('m') => Some(Command::ToggleMerge),
            KeyCode::Char('[') => Some(Command::Back),
            KeyCode::Char(']') => Some(Command::Forward),
            KeyCode::Left if mods.contains(Modifiers::ALT) => Some(Command::Back),
            KeyCode::Right if mods.contains(Modifiers::ALT) => Some(Command::Forward),
            KeyCode::Char('r') | KeyCode::F(5) => Some(Command::Refresh),
            KeyCode::Char('x') => Some(Command::Stop),
            KeyCode::Char('y') => Some(Command::CopyUrl),
            KeyCode::Char('g') => Some(Command::EditAddress),
            KeyCode::Char('q') => Some(Command::Quit),
            KeyCode::Esc => Some(Command::CancelDrag),
            _ => None,
        }
    }

    /// Map a key press while the address line has focus
    pub fn map_address_key(event: &KeyEvent) -> Option<AddressInput> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let mods = Modifiers::from(event.modifiers);
        match event.code {
            KeyCode::Enter => Some(AddressInput::Submit),
            KeyCode::Esc => Some(AddressInput::Abort),
            KeyCode::Backspace => Some(AddressInput::Backspace),
            KeyCode::Char('c') if mods.contains(Modifiers::CTRL) => Some(AddressInput::Abort),
            KeyCode::Char(ch) if !mods.intersects(Modifiers::CTRL | Modifiers::ALT) => {
                Some(AddressInput::Insert(ch))
            }
            _ => None,
        }
    }

    /// Map a mouse event. Only the left button drives the drag coordinator.
    pub fn map_mouse(event: &MouseEvent) -> Option<Command> {
        let point = Point::new(event.column as i32, event.row as i32);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(Command::PointerDown(point)),
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                Some(Command::PointerMove(point))
            }
            MouseEventKind::Up(MouseButton::Left) => Some(Command::PointerUp(point)),
            // Another button mid-drag takes the capture away
            MouseEventKind::Down(_) => Some(Command::CancelDrag),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

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
    fn test_plain_keys() {
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Char('t'), KeyModifiers::NONE)), Some(Command::NewTab));
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Char('m'), KeyModifiers::NONE)), Some(Command::ToggleMerge));
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Esc, KeyModifiers::NONE)), Some(Command::CancelDrag));
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Char('z'), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_shift_w_closes_window() {
        let event = key(KeyCode::Char('W'), KeyModifiers::SHIFT);
        assert_eq!(KeyMapper::map_key(&event), Some(Command::CloseWindow));
    }

    #[test]
    fn test_ctrl_keys() {
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some(Command::Quit));
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Char('l'), KeyModifiers::CONTROL)), Some(Command::EditAddress));
        // Ctrl+M is not the merge toggle
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Char('m'), KeyModifiers::CONTROL)), None);
    }

    #[test]
    fn test_alt_arrows_navigate() {
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Left, KeyModifiers::ALT)), Some(Command::Back));
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Right, KeyModifiers::ALT)), Some(Command::Forward));
        assert_eq!(KeyMapper::map_key(&key(KeyCode::Left, KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_release_is_ignored() {
        let event = KeyEvent {
            code: KeyCode::Char('t'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(KeyMapper::map_key(&event), None);
    }

    #[test]
    fn test_address_keys() {
        assert_eq!(
            KeyMapper::map_address_key(&key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(AddressInput::Insert('q'))
        );
        assert_eq!(
            KeyMapper::map_address_key(&key(KeyCode::Char(':'), KeyModifiers::SHIFT)),
            Some(AddressInput::Insert(':'))
        );
        assert_eq!(
            KeyMapper::map_address_key(&key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(AddressInput::Submit)
        );
        assert_eq!(
            KeyMapper::map_address_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(AddressInput::Abort)
        );
    }

    #[test]
    fn test_mouse_maps_to_pointer() {
        assert_eq!(
            KeyMapper::map_mouse(&mouse(MouseEventKind::Down(MouseButton::Left), 5, 7)),
            Some(Command::PointerDown(Point::new(5, 7)))
        );
        assert_eq!(
            KeyMapper::map_mouse(&mouse(MouseEventKind::Drag(MouseButton::Left), 6, 9)),
            Some(Command::PointerMove(Point::new(6, 9)))
        );
        assert_eq!(
            KeyMapper::map_mouse(&mouse(MouseEventKind::Up(MouseButton::Left), 6, 9)),
            Some(Command::PointerUp(Point::new(6, 9)))
        );
        assert_eq!(
            KeyMapper::map_mouse(&mouse(MouseEventKind::Down(MouseButton::Right), 0, 0)),
            Some(Command::CancelDrag)
        );
        assert_eq!(KeyMapper::map_mouse(&mouse(MouseEventKind::ScrollUp, 0, 0)), None);
    }
}
