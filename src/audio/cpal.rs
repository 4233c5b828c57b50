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
    collections::VecDeque,
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info};

use crate::audio::{Device as AudioDevice, OutputStream, SampleFormat, StreamError, StreamFormat};

/// Number of chunks the device queue holds before `write` blocks.
const QUEUE_CHUNKS: usize = 8;

/// A small wrapper around a cpal::Device. Used for storing some extra
/// data that makes opening per-channel output streams more convenient.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let mut max_channels = 0;

                let output_configs = device.supported_output_configs();
                if let Err(_e) = output_configs {
                    continue;
                }

                for output_config in device.supported_output_configs()? {
                    if max_channels < output_config.channels() {
                        max_channels = output_config.channels();
                    }
                }

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device.
    pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
        match Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(device) => Ok(device),
            None => Err(format!("no device found with name {}", name).into()),
        }
    }

    /// Gets the default output device of the default host.
    pub fn get_default() -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no default output device found")?;

        let mut max_channels = 0;
        for output_config in device.supported_output_configs()? {
            if max_channels < output_config.channels() {
                max_channels = output_config.channels();
            }
        }

        Ok(Device {
            name: device.name()?,
            max_channels,
            host_id: host.id(),
            device,
        })
    }
}

impl AudioDevice for Device {
    /// Opens an output stream bound to the given format. Each stream owns a
    /// dedicated thread, since cpal streams are not Send.
    fn open_output(&self, format: &StreamFormat) -> Result<Box<dyn OutputStream>, Box<dyn Error>> {
        if format.channels > self.max_channels {
            return Err(format!(
                "{} channels requested, audio device {} only has {}",
                format.channels, self.name, self.max_channels
            )
            .into());
        }

        let stream = Stream::open(self.device.clone(), format.clone())?;
        info!(device = self.name, format = %format, "Output stream opened.");
        Ok(Box::new(stream))
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}

/// The callback that feeds queued chunks into the hardware buffer. Shortfalls
/// while active are underruns: the buffer is zero-filled and playback carries
/// on with whatever arrives next.
fn feed_callback<T>(
    chunk_rx: crossbeam_channel::Receiver<Vec<f32>>,
    active: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut pending: VecDeque<f32> = VecDeque::new();
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        if !active.load(Ordering::Acquire) {
            // Inactive streams discard anything still queued so a later
            // playback starts from silence.
            pending.clear();
            while chunk_rx.try_recv().is_ok() {}
            data.fill(T::EQUILIBRIUM);
            return;
        }

        let mut underran = false;
        for slot in data.iter_mut() {
            if pending.is_empty() {
                if let Ok(chunk) = chunk_rx.try_recv() {
                    pending.extend(chunk);
                }
            }
            *slot = match pending.pop_front() {
                Some(sample) => T::from_sample(sample),
                None => {
                    underran = true;
                    T::EQUILIBRIUM
                }
            };
        }
        if underran {
            underruns.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// A push-style output stream over cpal. Writers push f32 chunks into a
/// bounded queue; a stream-owning thread keeps the cpal stream alive and the
/// audio callback drains the queue in real time.
pub(crate) struct Stream {
    format: StreamFormat,
    chunk_tx: crossbeam_channel::Sender<Vec<f32>>,
    active: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Stream {
    /// Opens a stream on the given device. Blocks until the stream-owning
    /// thread reports that the cpal stream has been built and started.
    fn open(device: cpal::Device, format: StreamFormat) -> Result<Stream, StreamError> {
        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded::<Vec<f32>>(QUEUE_CHUNKS);
        let active = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));
        let underruns = Arc::new(AtomicU64::new(0));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        let thread = {
            let active = active.clone();
            let closed = closed.clone();
            let underruns = underruns.clone();
            let format = format.clone();
            thread::spawn(move || {
                let config = cpal::StreamConfig {
                    channels: format.channels,
                    sample_rate: cpal::SampleRate(format.sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                };
                let err_fn = |err| error!("cpal output stream error: {}", err);

                let stream_result = match (format.sample_format, format.bits_per_sample) {
                    (SampleFormat::Float, _) => device.build_output_stream(
                        &config,
                        feed_callback::<f32>(chunk_rx, active, underruns),
                        err_fn,
                        None,
                    ),
                    (SampleFormat::Int, 16) => device.build_output_stream(
                        &config,
                        feed_callback::<i16>(chunk_rx, active, underruns),
                        err_fn,
                        None,
                    ),
                    (SampleFormat::Int, 32) => device.build_output_stream(
                        &config,
                        feed_callback::<i32>(chunk_rx, active, underruns),
                        err_fn,
                        None,
                    ),
                    (SampleFormat::Int, bits) => {
                        let _ = ready_tx.send(Err(format!(
                            "unsupported bit depth {} for integer format",
                            bits
                        )));
                        return;
                    }
                };

                let stream = match stream_result {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Keep the cpal stream alive until the handle is dropped.
                while !closed.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(100));
                }
            })
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Stream {
                format,
                chunk_tx,
                active,
                closed,
                underruns,
                thread: Some(thread),
            }),
            Ok(Err(message)) => Err(StreamError::Backend(message)),
            Err(_) => Err(StreamError::Backend(
                "output stream thread exited before reporting readiness".to_string(),
            )),
        }
    }

    /// Duration of one queued chunk, used to size the drain wait on stop.
    fn chunk_duration(&self, frames: usize) -> Duration {
        Duration::from_secs_f64(frames as f64 / self.format.sample_rate as f64)
    }
}

impl OutputStream for Stream {
    fn start(&mut self) -> Result<(), StreamError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StreamError::Closed);
        }
        self.active.store(true, Ordering::Release);
        Ok(())
    }

    fn write(&mut self, frames: &[f32]) -> Result<(), StreamError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StreamError::Closed);
        }
        // A full queue blocks here until the callback catches up. This is the
        // pacing mechanism for the playback loop.
        self.chunk_tx
            .send(frames.to_vec())
            .map_err(|_| StreamError::Closed)
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        // Let queued audio drain before deactivating, otherwise the sample
        // tail gets cut off.
        let frames_per_chunk = 1024 * self.format.channels as usize;
        let mut waited = Duration::ZERO;
        let limit = self.chunk_duration(frames_per_chunk) * (QUEUE_CHUNKS as u32 + 2);
        while !self.chunk_tx.is_empty() && waited < limit {
            thread::sleep(Duration::from_millis(5));
            waited += Duration::from_millis(5);
        }
        thread::sleep(self.chunk_duration(frames_per_chunk / self.format.channels as usize));

        self.active.store(false, Ordering::Release);
        let underruns = self.underruns.swap(0, Ordering::Relaxed);
        if underruns > 0 {
            debug!(underruns, "Output stream underran during playback.");
        }
        Ok(())
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        self.closed.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
