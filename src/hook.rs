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

use tokio::{sync::mpsc::Sender, task::JoinHandle};

use crate::keymap::Key;

#[cfg(test)]
pub mod mock;
pub mod rdev;

/// A key transition delivered by the system-wide keyboard hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
}

/// A system-wide keyboard hook. Implementations monitor the OS input
/// subsystem on a dedicated blocking task and forward every key transition
/// they can translate into the events channel.
pub trait Hook: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<KeyEvent>) -> JoinHandle<Result<(), io::Error>>;
}
