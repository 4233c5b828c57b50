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

//! Routing of hook events to channels.
//!
//! Dispatch is synchronous: a key-down maps to its channel and the dispatcher
//! waits for that playback attempt to finish before taking the next event.
//! Events arriving meanwhile queue in the channel buffer. A key-up marks the
//! channel released and, for the terminate key, ends the dispatch loop.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::channel::Channel;
use crate::hook::{Hook, KeyEvent};
use crate::keymap::{self, Key};
use crate::playback;

/// Buffered hook events. Key transitions are small and dispatch drains
/// quickly relative to typing speed.
const EVENT_BUFFER: usize = 64;

/// Drives the dispatch loop against a keyboard hook.
pub struct Dispatcher {
    handle: tokio::task::JoinHandle<()>,
}

impl Dispatcher {
    /// Starts monitoring the hook and dispatching its events. The returned
    /// dispatcher finishes when the terminate key is released or the hook
    /// stops delivering events.
    pub fn new(
        channels: Arc<Vec<Mutex<Channel>>>,
        hook: Arc<dyn Hook>,
        terminate_key: Key,
    ) -> Dispatcher {
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);
        let hook_handle = hook.monitor_events(events_tx);

        let handle = tokio::spawn(async move {
            loop {
                let Some(event) = events_rx.recv().await else {
                    // The hook hung up. Surface why, then stop dispatching.
                    match hook_handle.await {
                        Ok(Ok(())) => info!("Keyboard hook finished."),
                        Ok(Err(e)) => error!(err = %e, "Keyboard hook failed."),
                        Err(e) => error!(err = %e, "Keyboard hook task panicked."),
                    }
                    return;
                };

                match event {
                    KeyEvent::Down(key) => {
                        let index = match keymap::map(&key, channels.len()) {
                            Ok(index) => index,
                            Err(e) => {
                                debug!(err = %e, "Key-down ignored.");
                                continue;
                            }
                        };

                        debug!(key = ?key, channel = index, "Dispatching key-down.");
                        let channels = channels.clone();
                        match tokio::task::spawn_blocking(move || {
                            playback::play(&channels[index])
                        })
                        .await
                        {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => {
                                error!(channel = index, err = %e, "Playback failed.")
                            }
                            Err(e) => {
                                error!(channel = index, err = %e, "Playback task panicked.")
                            }
                        }
                    }
                    KeyEvent::Up(key) => {
                        match keymap::map(&key, channels.len()) {
                            Ok(index) => channels[index].lock().mark_released(),
                            Err(e) => debug!(err = %e, "Key-up ignored."),
                        }

                        if key == terminate_key {
                            info!(key = ?key, "Terminate key released, stopping dispatch.");
                            // The hook task cannot be interrupted; it stops
                            // forwarding once the receiver drops.
                            debug!("Leaving keyboard hook task to the runtime.");
                            return;
                        }
                    }
                }
            }
        });

        Dispatcher { handle }
    }

    /// Waits for the dispatch loop to finish.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.handle.await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::{mock, Device, SampleFormat, StreamFormat};
    use crate::channel::ChannelState;
    use crate::keymap::NamedKey;
    use crate::samplebank::{ReadError, SampleResource};

    struct ToneSample {
        format: StreamFormat,
        frames: u64,
    }

    impl SampleResource for ToneSample {
        fn read_chunk(
            &self,
            cursor: u64,
            max_frames: usize,
            out: &mut Vec<f32>,
        ) -> Result<usize, ReadError> {
            out.clear();
            let remaining = self.frames.saturating_sub(cursor) as usize;
            let frames = remaining.min(max_frames);
            out.resize(frames * self.format.channels as usize, 0.5);
            Ok(frames)
        }

        fn format(&self) -> &StreamFormat {
            &self.format
        }

        fn frames(&self) -> u64 {
            self.frames
        }
    }

    fn test_channels(count: usize) -> (Arc<Vec<Mutex<Channel>>>, Arc<mock::Device>) {
        let device = mock::Device::get("mock-dispatch");
        let format = StreamFormat::new(1, 44100, 16, SampleFormat::Int).unwrap();
        let channels = (0..count)
            .map(|index| {
                let stream = device.open_output(&format).unwrap();
                let sample = Arc::new(ToneSample {
                    format: format.clone(),
                    frames: 256,
                });
                Mutex::new(Channel::new(index, sample, stream))
            })
            .collect();
        (Arc::new(channels), Arc::new(device))
    }

    #[tokio::test]
    async fn test_key_down_plays_mapped_channel() {
        let (channels, device) = test_channels(3);
        // 'a' is 97: 97 % 3 == 1.
        let hook = Arc::new(crate::hook::mock::Driver::new(vec![
            KeyEvent::Down(Key::Char('a')),
            KeyEvent::Up(Key::Char('a')),
            KeyEvent::Up(Key::Named(NamedKey::Esc)),
        ]));

        let dispatcher = Dispatcher::new(channels.clone(), hook, Key::Named(NamedKey::Esc));
        dispatcher.join().await.expect("dispatch panicked");

        let streams = device.streams();
        assert_eq!(streams[1].completed_plays(), 1);
        assert_eq!(streams[1].frames_written(), 256);
        assert_eq!(streams[0].completed_plays(), 0);
        assert_eq!(streams[2].completed_plays(), 0);
    }

    #[tokio::test]
    async fn test_aliased_key_on_busy_channel_is_dropped() {
        let (channels, device) = test_channels(3);
        // 'a' (97) and 'd' (100) both map to channel 1 with three samples.
        // Hold the channel as if a playback from 'a' were still in flight.
        let (_, stream) = channels[1].lock().begin_play().expect("begin_play failed");

        let hook = Arc::new(crate::hook::mock::Driver::new(vec![
            KeyEvent::Down(Key::Char('d')),
            KeyEvent::Up(Key::Named(NamedKey::Esc)),
        ]));
        let dispatcher = Dispatcher::new(channels.clone(), hook, Key::Named(NamedKey::Esc));
        dispatcher.join().await.expect("dispatch panicked");

        // The 'd' press was dropped, not queued.
        let streams = device.streams();
        assert_eq!(streams[1].completed_plays(), 0);
        assert_eq!(streams[1].frames_written(), 0);

        // Once the first playback completes, the channel plays exactly once
        // on the next trigger.
        channels[1].lock().finish_play(stream);
        let played = playback::play(&channels[1]).expect("playback failed");
        assert_eq!(played, playback::Played::Completed);
        assert_eq!(streams[1].completed_plays(), 1);
        assert_eq!(streams[1].frames_written(), 256);
    }

    #[tokio::test]
    async fn test_terminate_key_stops_dispatch() {
        let (channels, device) = test_channels(2);
        // The trailing key-down arrives after the terminate release and must
        // never be dispatched.
        let hook = Arc::new(crate::hook::mock::Driver::new(vec![
            KeyEvent::Up(Key::Named(NamedKey::Esc)),
            KeyEvent::Down(Key::Char('a')),
        ]));

        let dispatcher = Dispatcher::new(channels.clone(), hook, Key::Named(NamedKey::Esc));
        dispatcher.join().await.expect("dispatch panicked");

        for stream in device.streams() {
            assert_eq!(stream.completed_plays(), 0);
            assert_eq!(stream.frames_written(), 0);
        }
    }

    #[tokio::test]
    async fn test_key_up_marks_channel_released() {
        let (channels, _) = test_channels(26);
        let hook = Arc::new(crate::hook::mock::Driver::new(vec![
            KeyEvent::Up(Key::Char('b')),
            KeyEvent::Up(Key::Named(NamedKey::Esc)),
        ]));

        let dispatcher = Dispatcher::new(channels.clone(), hook, Key::Named(NamedKey::Esc));
        dispatcher.join().await.expect("dispatch panicked");

        // 'b' is 98: 98 % 26 == 20.
        assert_eq!(channels[20].lock().state(), ChannelState::Released);
    }

    #[tokio::test]
    async fn test_unmapped_keys_are_ignored() {
        let (channels, device) = test_channels(4);
        let hook = Arc::new(crate::hook::mock::Driver::new(vec![
            KeyEvent::Down(Key::Named(NamedKey::NumLock)),
            KeyEvent::Up(Key::Named(NamedKey::NumLock)),
            KeyEvent::Up(Key::Named(NamedKey::Esc)),
        ]));

        let dispatcher = Dispatcher::new(channels.clone(), hook, Key::Named(NamedKey::Esc));
        dispatcher.join().await.expect("dispatch panicked");

        for stream in device.streams() {
            assert_eq!(stream.completed_plays(), 0);
        }
        for channel in channels.iter() {
            assert_eq!(channel.lock().state(), ChannelState::Idle);
        }
    }
}
