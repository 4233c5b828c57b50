// Copyright (C) 2026 The keyclack authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io;

use rdev::EventType;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, Level};

use super::KeyEvent;
use crate::keymap::{Key, NamedKey};

/// A keyboard hook backed by rdev's global listener.
///
/// The translation table below is static so presses and releases of the same
/// physical key always resolve to the same `Key`, which the mapping rule
/// needs for determinism. rdev's listener has no stop API; the task runs
/// until the process exits, and forwarding simply stops once the receiving
/// side is dropped.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Translates an rdev key into the mapping domain. Returns None for keys
    /// the mapping has no concept of (media keys, unknown scancodes); those
    /// are dropped at the hook rather than dispatched.
    fn translate(key: rdev::Key) -> Option<Key> {
        use rdev::Key::*;

        let translated = match key {
            // Printable keys, assuming a US layout. Releases carry no
            // character in rdev, so both transitions go through this table.
            KeyA => Key::Char('a'),
            KeyB => Key::Char('b'),
            KeyC => Key::Char('c'),
            KeyD => Key::Char('d'),
            KeyE => Key::Char('e'),
            KeyF => Key::Char('f'),
            KeyG => Key::Char('g'),
            KeyH => Key::Char('h'),
            KeyI => Key::Char('i'),
            KeyJ => Key::Char('j'),
            KeyK => Key::Char('k'),
            KeyL => Key::Char('l'),
            KeyM => Key::Char('m'),
            KeyN => Key::Char('n'),
            KeyO => Key::Char('o'),
            KeyP => Key::Char('p'),
            KeyQ => Key::Char('q'),
            KeyR => Key::Char('r'),
            KeyS => Key::Char('s'),
            KeyT => Key::Char('t'),
            KeyU => Key::Char('u'),
            KeyV => Key::Char('v'),
            KeyW => Key::Char('w'),
            KeyX => Key::Char('x'),
            KeyY => Key::Char('y'),
            KeyZ => Key::Char('z'),
            Num0 => Key::Char('0'),
            Num1 => Key::Char('1'),
            Num2 => Key::Char('2'),
            Num3 => Key::Char('3'),
            Num4 => Key::Char('4'),
            Num5 => Key::Char('5'),
            Num6 => Key::Char('6'),
            Num7 => Key::Char('7'),
            Num8 => Key::Char('8'),
            Num9 => Key::Char('9'),
            Minus => Key::Char('-'),
            Equal => Key::Char('='),
            LeftBracket => Key::Char('['),
            RightBracket => Key::Char(']'),
            SemiColon => Key::Char(';'),
            Quote => Key::Char('\''),
            BackSlash | IntlBackslash => Key::Char('\\'),
            Comma => Key::Char(','),
            Dot => Key::Char('.'),
            Slash => Key::Char('/'),
            BackQuote => Key::Char('`'),

            // Named keys in the fixed mapping table.
            Alt => Key::Named(NamedKey::Alt),
            AltGr => Key::Named(NamedKey::AltGr),
            Backspace => Key::Named(NamedKey::Backspace),
            CapsLock => Key::Named(NamedKey::CapsLock),
            ControlLeft => Key::Named(NamedKey::CtrlL),
            ControlRight => Key::Named(NamedKey::CtrlR),
            Delete => Key::Named(NamedKey::Delete),
            DownArrow => Key::Named(NamedKey::Down),
            End => Key::Named(NamedKey::End),
            Return => Key::Named(NamedKey::Enter),
            Escape => Key::Named(NamedKey::Esc),
            F1 => Key::Named(NamedKey::F1),
            F2 => Key::Named(NamedKey::F2),
            F3 => Key::Named(NamedKey::F3),
            F4 => Key::Named(NamedKey::F4),
            F5 => Key::Named(NamedKey::F5),
            F6 => Key::Named(NamedKey::F6),
            F7 => Key::Named(NamedKey::F7),
            F8 => Key::Named(NamedKey::F8),
            F9 => Key::Named(NamedKey::F9),
            F10 => Key::Named(NamedKey::F10),
            F11 => Key::Named(NamedKey::F11),
            F12 => Key::Named(NamedKey::F12),
            Home => Key::Named(NamedKey::Home),
            LeftArrow => Key::Named(NamedKey::Left),
            MetaLeft => Key::Named(NamedKey::CmdL),
            MetaRight => Key::Named(NamedKey::CmdR),
            PageDown => Key::Named(NamedKey::PageDown),
            PageUp => Key::Named(NamedKey::PageUp),
            RightArrow => Key::Named(NamedKey::Right),
            ShiftLeft => Key::Named(NamedKey::ShiftL),
            ShiftRight => Key::Named(NamedKey::ShiftR),
            Space => Key::Named(NamedKey::Space),
            Tab => Key::Named(NamedKey::Tab),
            UpArrow => Key::Named(NamedKey::Up),

            // Recognized but intentionally unmapped; the dispatcher logs and
            // ignores these.
            Insert => Key::Named(NamedKey::Insert),
            NumLock => Key::Named(NamedKey::NumLock),
            Pause => Key::Named(NamedKey::Pause),
            PrintScreen => Key::Named(NamedKey::PrintScreen),
            ScrollLock => Key::Named(NamedKey::ScrollLock),

            _ => return None,
        };
        Some(translated)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Hook for Driver {
    fn monitor_events(&self, events_tx: Sender<KeyEvent>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard hook");
            let _enter = span.enter();

            info!("Keyboard hook started.");

            rdev::listen(move |event| {
                let key_event = match event.event_type {
                    EventType::KeyPress(key) => Driver::translate(key).map(KeyEvent::Down),
                    EventType::KeyRelease(key) => Driver::translate(key).map(KeyEvent::Up),
                    _ => None,
                };
                if let Some(key_event) = key_event {
                    // A send failure means the dispatcher is gone; nothing
                    // left to do but drop the event.
                    let _ = events_tx.blocking_send(key_event);
                }
            })
            .map_err(|e| io::Error::other(format!("keyboard hook failed: {:?}", e)))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_translate_printable() {
        assert_eq!(Driver::translate(rdev::Key::KeyA), Some(Key::Char('a')));
        assert_eq!(Driver::translate(rdev::Key::Num7), Some(Key::Char('7')));
        assert_eq!(Driver::translate(rdev::Key::Comma), Some(Key::Char(',')));
    }

    #[test]
    fn test_translate_named() {
        assert_eq!(
            Driver::translate(rdev::Key::Escape),
            Some(Key::Named(NamedKey::Esc))
        );
        assert_eq!(
            Driver::translate(rdev::Key::Space),
            Some(Key::Named(NamedKey::Space))
        );
        assert_eq!(
            Driver::translate(rdev::Key::ControlLeft),
            Some(Key::Named(NamedKey::CtrlL))
        );
    }

    #[test]
    fn test_translate_unknown_is_dropped() {
        assert_eq!(Driver::translate(rdev::Key::Unknown(0xffff)), None);
    }
}
