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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::audio::{OutputStream, StreamError, StreamFormat};

/// Shared state of one mock stream, observable from tests while the stream
/// itself is owned by a channel.
pub struct StreamState {
    format: StreamFormat,
    active: AtomicBool,
    frames_written: AtomicU64,
    completed_plays: AtomicUsize,
    /// Number of upcoming writes that should fail with a transient error.
    inject_write_failures: AtomicUsize,
}

impl StreamState {
    /// Returns true if the stream is currently active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Total frames written across all plays.
    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    /// Number of start/stop cycles that have completed.
    pub fn completed_plays(&self) -> usize {
        self.completed_plays.load(Ordering::Relaxed)
    }

    /// Makes the next `count` writes fail with a transient underflow.
    pub fn inject_write_failures(&self, count: usize) {
        self.inject_write_failures.store(count, Ordering::Relaxed);
    }

    /// The format this stream was opened with.
    pub fn format(&self) -> &StreamFormat {
        &self.format
    }
}

/// A mock output stream. Doesn't actually play anything; records writes.
pub struct Stream {
    state: Arc<StreamState>,
}

impl OutputStream for Stream {
    fn start(&mut self) -> Result<(), StreamError> {
        self.state.active.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn write(&mut self, frames: &[f32]) -> Result<(), StreamError> {
        let to_fail = self.state.inject_write_failures.load(Ordering::Relaxed);
        if to_fail > 0 {
            self.state
                .inject_write_failures
                .store(to_fail - 1, Ordering::Relaxed);
            return Err(StreamError::Underflow);
        }

        self.state.frames_written.fetch_add(
            (frames.len() / self.state.format.channels as usize) as u64,
            Ordering::Relaxed,
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        self.state.active.store(false, Ordering::Relaxed);
        self.state.completed_plays.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A mock device. Streams it opens are tracked so tests can observe them.
#[derive(Clone)]
pub struct Device {
    name: String,
    streams: Arc<Mutex<Vec<Arc<StreamState>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            streams: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the state handles of all streams opened so far, in open order.
    pub fn streams(&self) -> Vec<Arc<StreamState>> {
        self.streams.lock().clone()
    }

    /// Returns the number of streams opened on this device.
    pub fn outputs_opened(&self) -> usize {
        self.streams.lock().len()
    }

    /// Returns true if any stream on this device is active.
    pub fn is_playing(&self) -> bool {
        self.streams.lock().iter().any(|state| state.is_active())
    }
}

impl crate::audio::Device for Device {
    fn open_output(&self, format: &StreamFormat) -> Result<Box<dyn OutputStream>, Box<dyn Error>> {
        let state = Arc::new(StreamState {
            format: format.clone(),
            active: AtomicBool::new(false),
            frames_written: AtomicU64::new(0),
            completed_plays: AtomicUsize::new(0),
            inject_write_failures: AtomicUsize::new(0),
        });
        self.streams.lock().push(state.clone());
        Ok(Box::new(Stream { state }))
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
