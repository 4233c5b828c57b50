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

//! The chunked playback loop.
//!
//! One call to `play` streams one full sample to the channel's output stream
//! in bounded chunks, then rewinds the channel. The channel lock is only held
//! for state transitions and cursor updates, never across device I/O, so
//! release transitions on the same channel stay responsive while streaming.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::samplebank;

/// Frames per read/write chunk.
pub const CHUNK_FRAMES: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// A resource read failed mid-stream. Fatal to this attempt only; the
    /// channel is left Idle and the session continues.
    #[error(transparent)]
    Read(#[from] samplebank::ReadError),
}

/// The outcome of a playback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Played {
    /// The sample streamed to completion.
    Completed,
    /// The channel was already playing; the trigger was dropped.
    Skipped,
}

/// Plays the channel's sample from the cursor to exhaustion. Blocks for the
/// duration of the sample; run it on a blocking task.
///
/// Device write failures (underflow and the like) are transient: the loop
/// logs them and continues with the next chunk. Read failures abort this
/// attempt, returning the channel to Idle with the cursor rewound.
pub fn play(channel: &Mutex<Channel>) -> Result<Played, PlaybackError> {
    let (index, mut cursor, sample, mut stream) = {
        let mut channel = channel.lock();
        let index = channel.index();
        match channel.begin_play() {
            Some((sample, stream)) => (index, channel.cursor(), sample, stream),
            None => {
                debug!(channel = index, "Channel busy, trigger dropped.");
                return Ok(Played::Skipped);
            }
        }
    };

    if let Err(e) = stream.start() {
        warn!(channel = index, err = %e, "Failed to activate output stream.");
    }

    let channels = sample.format().channels as usize;
    let mut buf: Vec<f32> = Vec::with_capacity(CHUNK_FRAMES * channels);
    let result = loop {
        let frames = match sample.read_chunk(cursor, CHUNK_FRAMES, &mut buf) {
            Ok(0) => break Ok(Played::Completed),
            Ok(frames) => frames,
            Err(e) => break Err(PlaybackError::Read(e)),
        };

        if let Err(e) = stream.write(&buf) {
            // Transient device condition. Keep going with the next chunk.
            debug!(channel = index, err = %e, "Output write failed.");
        }

        cursor += frames as u64;
        channel.lock().set_cursor(cursor);
    };

    if let Err(e) = stream.stop() {
        warn!(channel = index, err = %e, "Failed to deactivate output stream.");
    }

    // Successful or not, the channel rewinds and returns to Idle.
    channel.lock().finish_play(stream);

    if let Err(e) = &result {
        warn!(channel = index, err = %e, "Playback attempt failed.");
    } else {
        debug!(channel = index, "Playback complete.");
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::{mock, Device, SampleFormat, StreamFormat};
    use crate::channel::ChannelState;
    use crate::samplebank::{ReadError, SampleResource};

    struct CountingSample {
        format: StreamFormat,
        frames: u64,
        /// Reads past this cursor fail, when set.
        fail_after: Option<u64>,
    }

    impl SampleResource for CountingSample {
        fn read_chunk(
            &self,
            cursor: u64,
            max_frames: usize,
            out: &mut Vec<f32>,
        ) -> Result<usize, ReadError> {
            if let Some(fail_after) = self.fail_after {
                if cursor >= fail_after {
                    return Err(ReadError {
                        frame: cursor,
                        message: "injected read failure".to_string(),
                    });
                }
            }
            out.clear();
            let remaining = self.frames.saturating_sub(cursor) as usize;
            let frames = remaining.min(max_frames);
            out.resize(frames * self.format.channels as usize, 0.25);
            Ok(frames)
        }

        fn format(&self) -> &StreamFormat {
            &self.format
        }

        fn frames(&self) -> u64 {
            self.frames
        }
    }

    fn playable_channel(
        frames: u64,
        fail_after: Option<u64>,
    ) -> (Mutex<Channel>, Arc<mock::StreamState>) {
        let format = StreamFormat::new(2, 44100, 16, SampleFormat::Int).unwrap();
        let device = mock::Device::get("mock-playback");
        let stream = device.open_output(&format).unwrap();
        let state = device.streams().pop().unwrap();
        let sample = Arc::new(CountingSample {
            format,
            frames,
            fail_after,
        });
        (Mutex::new(Channel::new(0, sample, stream)), state)
    }

    #[test]
    fn test_play_streams_whole_sample() {
        // 2500 frames is two full chunks plus a partial one.
        let (channel, state) = playable_channel(2500, None);

        let played = play(&channel).expect("playback failed");
        assert_eq!(played, Played::Completed);
        assert_eq!(state.frames_written(), 2500);
        assert_eq!(state.completed_plays(), 1);

        let channel = channel.lock();
        assert_eq!(channel.state(), ChannelState::Idle);
        assert_eq!(channel.cursor(), 0);
    }

    #[test]
    fn test_play_while_playing_is_dropped() {
        let (channel, state) = playable_channel(2048, None);

        // Simulate an in-flight playback holding the stream.
        let (_, stream) = channel.lock().begin_play().expect("begin_play failed");

        let played = play(&channel).expect("playback failed");
        assert_eq!(played, Played::Skipped);
        assert_eq!(state.frames_written(), 0);
        assert_eq!(state.completed_plays(), 0);

        // The first playback finishes; a retrigger now streams exactly once.
        channel.lock().finish_play(stream);
        let played = play(&channel).expect("playback failed");
        assert_eq!(played, Played::Completed);
        assert_eq!(state.completed_plays(), 1);
        assert_eq!(state.frames_written(), 2048);
    }

    #[test]
    fn test_write_failures_are_transient() {
        let (channel, state) = playable_channel(3 * CHUNK_FRAMES as u64, None);
        state.inject_write_failures(1);

        let played = play(&channel).expect("playback failed");
        assert_eq!(played, Played::Completed);
        // The first chunk was dropped by the device; the loop carried on.
        assert_eq!(state.frames_written(), 2 * CHUNK_FRAMES as u64);
        assert_eq!(channel.lock().cursor(), 0);
        assert_eq!(channel.lock().state(), ChannelState::Idle);
    }

    #[test]
    fn test_read_failure_aborts_single_attempt() {
        let (channel, state) = playable_channel(4096, Some(CHUNK_FRAMES as u64));

        let result = play(&channel);
        assert!(matches!(result, Err(PlaybackError::Read(_))));

        // The channel recovered: Idle, rewound, stream returned.
        {
            let channel = channel.lock();
            assert_eq!(channel.state(), ChannelState::Idle);
            assert_eq!(channel.cursor(), 0);
        }
        assert_eq!(state.completed_plays(), 1);

        // The next attempt on a healthy resource would play; the channel is
        // not poisoned by the failure.
        assert!(channel.lock().begin_play().is_some());
    }
}
