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

//! Pure key-to-channel mapping.
//!
//! Printable keys hash by codepoint modulo the pool size, so distinct
//! characters routinely alias to the same channel; that aliasing is intended
//! behavior. Non-printable keys go through a fixed table. Both rules are
//! deterministic, so a key always plays the same sample within a run.

use std::str::FromStr;

/// A keyboard key as delivered by the hook, reduced to what the mapping
/// needs: either a printable character or a recognized named key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Named(NamedKey),
}

/// Non-printable keys the hook can deliver. Keys listed here but absent from
/// the mapping table (Insert, Menu, NumLock, Pause, PrintScreen, ScrollLock)
/// are recognized yet intentionally unmapped: pressing them makes no sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Alt,
    AltL,
    AltR,
    AltGr,
    Backspace,
    CapsLock,
    Cmd,
    CmdL,
    CmdR,
    Ctrl,
    CtrlL,
    CtrlR,
    Delete,
    Down,
    End,
    Enter,
    Esc,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    Home,
    Insert,
    Left,
    Menu,
    NumLock,
    PageDown,
    PageUp,
    Pause,
    PrintScreen,
    Right,
    ScrollLock,
    Shift,
    ShiftL,
    ShiftR,
    Space,
    Tab,
    Up,
}

/// A non-printable key with no table entry. Recovered locally by the
/// dispatcher: the event is logged and ignored.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("no sound mapping for key {0:?}")]
pub struct UnmappedKey(pub NamedKey);

/// A key name in the configuration that isn't recognized.
#[derive(Debug, thiserror::Error)]
#[error("unknown key name: {0}")]
pub struct UnknownKeyName(pub String);

/// The fixed table for non-printable keys. Raw values assume a pool of 26
/// samples and wrap past F9; `map` reduces them modulo the actual pool size.
fn named_index(key: NamedKey) -> Option<usize> {
    use NamedKey::*;
    Some(match key {
        Alt => 0,
        AltL => 1,
        AltR => 2,
        AltGr => 3,
        Backspace => 4,
        CapsLock => 5,
        Cmd => 6,
        CmdL => 7,
        CmdR => 8,
        Ctrl => 9,
        CtrlL => 10,
        CtrlR => 11,
        Delete => 12,
        Down => 13,
        End => 14,
        Enter => 15,
        Esc => 16,
        F1 => 17,
        F2 => 18,
        F3 => 19,
        F4 => 20,
        F5 => 21,
        F6 => 22,
        F7 => 23,
        F8 => 24,
        F9 => 25,
        F10 => 0,
        F11 => 1,
        F12 => 2,
        F13 => 3,
        F14 => 4,
        F15 => 5,
        F16 => 6,
        F17 => 7,
        F18 => 8,
        F19 => 9,
        F20 => 10,
        Home => 11,
        Left => 12,
        PageDown => 13,
        PageUp => 14,
        Right => 15,
        Shift => 16,
        ShiftL => 17,
        ShiftR => 18,
        Space => 19,
        Tab => 20,
        Up => 21,
        Insert | Menu | NumLock | Pause | PrintScreen | ScrollLock => return None,
    })
}

/// Maps a key to a channel index in `0..pool_size`.
///
/// The caller guarantees `pool_size > 0`; the sample bank refuses to load an
/// empty pool, so the bank must exist before any mapping happens.
pub fn map(key: &Key, pool_size: usize) -> Result<usize, UnmappedKey> {
    debug_assert!(pool_size > 0);
    match key {
        Key::Char(c) => Ok(*c as usize % pool_size),
        Key::Named(named) => named_index(*named)
            .map(|index| index % pool_size)
            .ok_or(UnmappedKey(*named)),
    }
}

impl FromStr for Key {
    type Err = UnknownKeyName;

    /// Parses a key from its configuration name: a single printable character
    /// or a lowercase named key ("esc", "space", "f1", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use NamedKey::*;

        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if !c.is_whitespace() {
                return Ok(Key::Char(c));
            }
        }

        let named = match s {
            "alt" => Alt,
            "alt_l" => AltL,
            "alt_r" => AltR,
            "alt_gr" => AltGr,
            "backspace" => Backspace,
            "caps_lock" => CapsLock,
            "cmd" => Cmd,
            "cmd_l" => CmdL,
            "cmd_r" => CmdR,
            "ctrl" => Ctrl,
            "ctrl_l" => CtrlL,
            "ctrl_r" => CtrlR,
            "delete" => Delete,
            "down" => Down,
            "end" => End,
            "enter" => Enter,
            "esc" => Esc,
            "f1" => F1,
            "f2" => F2,
            "f3" => F3,
            "f4" => F4,
            "f5" => F5,
            "f6" => F6,
            "f7" => F7,
            "f8" => F8,
            "f9" => F9,
            "f10" => F10,
            "f11" => F11,
            "f12" => F12,
            "f13" => F13,
            "f14" => F14,
            "f15" => F15,
            "f16" => F16,
            "f17" => F17,
            "f18" => F18,
            "f19" => F19,
            "f20" => F20,
            "home" => Home,
            "insert" => Insert,
            "left" => Left,
            "menu" => Menu,
            "num_lock" => NumLock,
            "page_down" => PageDown,
            "page_up" => PageUp,
            "pause" => Pause,
            "print_screen" => PrintScreen,
            "right" => Right,
            "scroll_lock" => ScrollLock,
            "shift" => Shift,
            "shift_l" => ShiftL,
            "shift_r" => ShiftR,
            "space" => Space,
            "tab" => Tab,
            "up" => Up,
            _ => return Err(UnknownKeyName(s.to_string())),
        };
        Ok(Key::Named(named))
    }
}
