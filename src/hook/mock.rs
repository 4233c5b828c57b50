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

use super::KeyEvent;

/// A scripted keyboard hook for tests. Feeds its events into the channel in
/// order, then finishes.
pub struct Driver {
    events: Vec<KeyEvent>,
}

impl Driver {
    pub fn new(events: Vec<KeyEvent>) -> Driver {
        Driver { events }
    }
}

impl super::Hook for Driver {
    fn monitor_events(&self, events_tx: Sender<KeyEvent>) -> JoinHandle<Result<(), io::Error>> {
        let events = self.events.clone();
        tokio::task::spawn_blocking(move || {
            for event in events {
                // The dispatcher hanging up mid-script is fine; the remaining
                // events just never happened.
                if events_tx.blocking_send(event).is_err() {
                    break;
                }
            }
            Ok(())
        })
    }
}
