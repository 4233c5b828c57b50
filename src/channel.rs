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

//! The per-channel playback state machine.
//!
//! One channel exists per discovered sample, identified by its stable index.
//! The channel exclusively owns the output stream bound to its sample's
//! format; the state machine guards that stream against re-entrant playback
//! from key-repeat.

use std::error::Error;
use std::sync::Arc;

use tracing::debug;

use crate::audio::OutputStream;
use crate::samplebank::SampleResource;

/// Playback state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No audio in flight, cursor at start.
    Idle,
    /// Actively streaming.
    Playing,
    /// Key-up observed. Recorded for diagnostics; does not stop an in-flight
    /// stream, and the next completion still resets to Idle.
    Released,
}

/// The unit of playback: a sample resource, its exclusively owned output
/// stream, the state machine and the read cursor.
pub struct Channel {
    index: usize,
    sample: Arc<dyn SampleResource>,
    /// Taken out while a playback is streaming so state transitions stay
    /// responsive; None also while the channel is closed.
    stream: Option<Box<dyn OutputStream>>,
    state: ChannelState,
    cursor: u64,
}

impl Channel {
    /// Creates a new idle channel.
    pub fn new(index: usize, sample: Arc<dyn SampleResource>, stream: Box<dyn OutputStream>) -> Channel {
        Channel {
            index,
            sample,
            stream: Some(stream),
            state: ChannelState::Idle,
            cursor: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Begins a playback: flips the channel to Playing and hands out the
    /// sample and stream. Returns None when the channel is already Playing
    /// (re-entrant trigger dropped) or has been closed.
    pub fn begin_play(&mut self) -> Option<(Arc<dyn SampleResource>, Box<dyn OutputStream>)> {
        if self.state == ChannelState::Playing {
            return None;
        }
        let stream = self.stream.take()?;
        self.state = ChannelState::Playing;
        Some((self.sample.clone(), stream))
    }

    /// Records read progress so the cursor is observable mid-playback.
    pub fn set_cursor(&mut self, cursor: u64) {
        self.cursor = cursor;
    }

    /// Ends a playback attempt, successful or not: the stream is returned to
    /// the channel, the cursor rewinds to the start and the channel goes back
    /// to Idle, even if the physical key is still held.
    pub fn finish_play(&mut self, stream: Box<dyn OutputStream>) {
        self.stream = Some(stream);
        self.cursor = 0;
        self.state = ChannelState::Idle;
    }

    /// Records a key-up on this channel.
    pub fn mark_released(&mut self) {
        self.state = ChannelState::Released;
    }

    /// Tears the channel down, stopping its stream. The channel is unusable
    /// afterwards. A playback still in flight keeps the taken-out stream
    /// alive until it finishes on its own; that is expected during shutdown.
    pub fn close(&mut self) -> Result<(), Box<dyn Error>> {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop()?;
                debug!(channel = self.index, "Channel closed.");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{mock, Device, SampleFormat, StreamFormat};
    use crate::samplebank::ReadError;

    struct SilentSample {
        format: StreamFormat,
        frames: u64,
    }

    impl SampleResource for SilentSample {
        fn read_chunk(
            &self,
            cursor: u64,
            max_frames: usize,
            out: &mut Vec<f32>,
        ) -> Result<usize, ReadError> {
            out.clear();
            let remaining = self.frames.saturating_sub(cursor) as usize;
            let frames = remaining.min(max_frames);
            out.resize(frames * self.format.channels as usize, 0.0);
            Ok(frames)
        }

        fn format(&self) -> &StreamFormat {
            &self.format
        }

        fn frames(&self) -> u64 {
            self.frames
        }
    }

    fn test_channel(index: usize) -> Channel {
        let format = StreamFormat::new(1, 44100, 16, SampleFormat::Int).unwrap();
        let device = mock::Device::get("mock-test");
        let stream = device.open_output(&format).unwrap();
        let sample = Arc::new(SilentSample { format, frames: 64 });
        Channel::new(index, sample, stream)
    }

    #[test]
    fn test_initial_state() {
        let channel = test_channel(3);
        assert_eq!(channel.index(), 3);
        assert_eq!(channel.state(), ChannelState::Idle);
        assert_eq!(channel.cursor(), 0);
    }

    #[test]
    fn test_begin_play_guards_reentry() {
        let mut channel = test_channel(0);

        let first = channel.begin_play();
        assert!(first.is_some());
        assert_eq!(channel.state(), ChannelState::Playing);

        // A press while Playing is dropped, not queued.
        assert!(channel.begin_play().is_none());
        assert_eq!(channel.state(), ChannelState::Playing);
    }

    #[test]
    fn test_finish_play_rewinds_and_idles() {
        let mut channel = test_channel(0);
        let (_, stream) = channel.begin_play().expect("begin_play failed");
        channel.set_cursor(64);

        channel.finish_play(stream);
        assert_eq!(channel.state(), ChannelState::Idle);
        assert_eq!(channel.cursor(), 0);

        // The stream is back: a new playback can begin.
        assert!(channel.begin_play().is_some());
    }

    #[test]
    fn test_release_does_not_block_replay() {
        let mut channel = test_channel(0);
        channel.mark_released();
        assert_eq!(channel.state(), ChannelState::Released);

        // Released channels accept a new press.
        assert!(channel.begin_play().is_some());
        assert_eq!(channel.state(), ChannelState::Playing);
    }

    #[test]
    fn test_release_while_playing_then_completion_idles() {
        let mut channel = test_channel(0);
        let (_, stream) = channel.begin_play().expect("begin_play failed");

        channel.mark_released();
        assert_eq!(channel.state(), ChannelState::Released);

        channel.finish_play(stream);
        assert_eq!(channel.state(), ChannelState::Idle);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut channel = test_channel(0);
        assert!(channel.close().is_ok());
        assert!(channel.close().is_ok());
        // Closed channels refuse playback.
        assert!(channel.begin_play().is_none());
    }
}
