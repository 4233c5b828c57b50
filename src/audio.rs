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
use std::any::Any;
use std::{error::Error, fmt, sync::Arc};

use crate::config;

pub mod cpal;
pub mod format;
pub mod mock;

// Re-export the format types for convenience.
pub use format::{SampleFormat, StreamFormat};

/// Errors surfaced by an output stream. Underflow and backpressure are
/// transient: the playback loop logs them and proceeds with the next chunk.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("output underflow")]
    Underflow,
    #[error("output stream closed")]
    Closed,
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// An opened audio output endpoint, exclusively owned by one channel.
/// `write` may block while the device drains previous chunks; that
/// backpressure is what paces the playback loop in real time.
pub trait OutputStream: Send {
    /// Activates the stream for writing.
    fn start(&mut self) -> Result<(), StreamError>;

    /// Writes one chunk of interleaved f32 frames.
    fn write(&mut self, frames: &[f32]) -> Result<(), StreamError>;

    /// Deactivates the stream, letting queued audio drain first.
    fn stop(&mut self) -> Result<(), StreamError>;
}

pub trait Device: Any + fmt::Display + std::marker::Send + std::marker::Sync {
    /// Opens an output stream bound to the given hardware format.
    fn open_output(&self, format: &StreamFormat) -> Result<Box<dyn OutputStream>, Box<dyn Error>>;

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, Box<dyn Error>>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device by configured name. A missing configuration selects the
/// host's default output device.
pub fn get_device(config: Option<&config::Audio>) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let name = match config {
        Some(config) => config.device(),
        None => "default",
    };

    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };
    if name == "default" {
        return Ok(Arc::new(cpal::Device::get_default()?));
    }

    Ok(Arc::new(cpal::Device::get(name)?))
}
