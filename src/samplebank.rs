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

//! Sample discovery, decoding and indexing.
//!
//! Samples are decoded entirely into memory at startup for zero-latency
//! playback. The bank's index order is the sorted file name order, which
//! keeps key-to-channel assignments stable across runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::audio::{SampleFormat, StreamFormat};

/// Errors raised while building the sample bank. All of them are fatal to
/// startup; the session never starts with a partial pool.
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("no samples found in {0}")]
    NoSamplesFound(PathBuf),
    #[error("failed to read samples directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode sample {path}: {source}")]
    Decode {
        path: PathBuf,
        source: hound::Error,
    },
}

/// A failed read from a sample resource. Fatal to the single playback attempt
/// that observed it, never to the session.
#[derive(Debug, thiserror::Error)]
#[error("failed to read sample data at frame {frame}: {message}")]
pub struct ReadError {
    pub frame: u64,
    pub message: String,
}

/// An immutable handle to decoded audio data plus its format descriptor.
/// Reads are fallible at the trait level so backends that can fail mid-stream
/// surface errors through the same playback path.
pub trait SampleResource: Send + Sync {
    /// Reads up to `max_frames` interleaved frames starting at `cursor` into
    /// `out` (cleared first). Returns the number of frames read; 0 means the
    /// resource is exhausted.
    fn read_chunk(
        &self,
        cursor: u64,
        max_frames: usize,
        out: &mut Vec<f32>,
    ) -> Result<usize, ReadError>;

    /// The hardware format this resource's stream must be opened with.
    fn format(&self) -> &StreamFormat;

    /// Total length in frames.
    fn frames(&self) -> u64;
}

/// A WAV sample decoded fully into memory.
pub struct Sample {
    path: PathBuf,
    data: Arc<Vec<f32>>,
    format: StreamFormat,
}

impl Sample {
    /// Decodes the WAV file at `path`. Integer samples are scaled to f32 in
    /// [-1.0, 1.0]; the original format descriptor is kept so the output
    /// stream can be opened with matching hardware settings.
    pub fn load(path: &Path) -> Result<Sample, BankError> {
        let decode_err = |source| BankError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = hound::WavReader::open(path).map_err(decode_err)?;
        let spec = reader.spec();

        let data: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(decode_err)?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|sample| sample as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(decode_err)?
            }
        };

        let sample_format = match spec.sample_format {
            hound::SampleFormat::Float => SampleFormat::Float,
            hound::SampleFormat::Int => SampleFormat::Int,
        };
        let format = StreamFormat {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format,
        };

        let sample = Sample {
            path: path.to_path_buf(),
            data: Arc::new(data),
            format,
        };

        debug!(
            path = ?path,
            format = %sample.format,
            duration_ms = sample.duration().as_millis(),
            memory_kb = sample.memory_size() / 1024,
            "Sample loaded"
        );

        Ok(sample)
    }

    /// The file this sample was decoded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duration of the decoded audio.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.format.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl SampleResource for Sample {
    fn read_chunk(
        &self,
        cursor: u64,
        max_frames: usize,
        out: &mut Vec<f32>,
    ) -> Result<usize, ReadError> {
        out.clear();
        let channels = self.format.channels as usize;
        let start = cursor as usize * channels;
        if start >= self.data.len() {
            return Ok(0);
        }
        let end = (start + max_frames * channels).min(self.data.len());
        out.extend_from_slice(&self.data[start..end]);
        Ok((end - start) / channels)
    }

    fn format(&self) -> &StreamFormat {
        &self.format
    }

    fn frames(&self) -> u64 {
        (self.data.len() / self.format.channels as usize) as u64
    }
}

/// Returns the sorted list of WAV files in the given directory. An empty
/// result is a startup failure: the key mapping's modulus needs a non-empty
/// pool.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, BankError> {
    let entries = fs::read_dir(dir).map_err(|source| BankError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| BankError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(BankError::NoSamplesFound(dir.to_path_buf()));
    }
    Ok(files)
}

/// The fixed pool of decoded samples, addressed by channel index.
pub struct SampleBank {
    samples: Vec<Arc<Sample>>,
}

impl SampleBank {
    /// Discovers and decodes every sample in the directory. Fails if the
    /// directory yields no WAV files or any file fails to decode.
    pub fn load(dir: &Path) -> Result<SampleBank, BankError> {
        let files = discover(dir)?;

        let mut samples = Vec::with_capacity(files.len());
        for file in &files {
            samples.push(Arc::new(Sample::load(file)?));
        }

        let bank = SampleBank { samples };
        info!(
            dir = ?dir,
            samples = bank.len(),
            memory_kb = bank.memory_usage() / 1024,
            "Sample bank loaded"
        );
        Ok(bank)
    }

    /// The number of samples in the pool.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sample at the given channel index.
    pub fn get(&self, index: usize) -> Arc<Sample> {
        self.samples[index].clone()
    }

    /// Returns the total memory used by decoded samples.
    pub fn memory_usage(&self) -> usize {
        self.samples.iter().map(|s| s.memory_size()).sum()
    }
}
