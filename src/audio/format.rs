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

use std::{error::Error, fmt, str::FromStr};

/// Sample format enumeration for audio processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Integer samples (e.g., 16-bit, 24-bit, 32-bit)
    Int,
    /// Floating point samples (e.g., 32-bit float)
    Float,
}

impl FromStr for SampleFormat {
    /// Convert from string representation
    fn from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        match s {
            "float" | "Float" => Ok(SampleFormat::Float),
            "int" | "Int" => Ok(SampleFormat::Int),
            _ => Err(format!("Unsupported sample format: {}", s).into()),
        }
    }

    type Err = Box<dyn Error>;
}

impl SampleFormat {
    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            SampleFormat::Float => "float",
            SampleFormat::Int => "int",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The hardware format an output stream is opened with. Derived from a decoded
/// sample's header, never from configuration: each channel's stream is bound
/// to its own sample's native format.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFormat {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per sample
    pub bits_per_sample: u16,
    /// Sample format (integer or float)
    pub sample_format: SampleFormat,
}

impl StreamFormat {
    /// Creates a new StreamFormat
    pub fn new(
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
        sample_format: SampleFormat,
    ) -> Result<Self, Box<dyn Error>> {
        // Basic sanity check - let the audio interface decide what's actually supported
        if channels == 0 {
            return Err("Channel count must be greater than 0".into());
        }
        if sample_rate == 0 {
            return Err("Sample rate must be greater than 0".into());
        }

        Ok(StreamFormat {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        })
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ch/{}Hz/{}-bit {}",
            self.channels, self.sample_rate, self.bits_per_sample, self.sample_format
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_format_from_str() {
        assert_eq!(
            SampleFormat::from_str("float").unwrap(),
            SampleFormat::Float
        );
        assert_eq!(
            SampleFormat::from_str("Float").unwrap(),
            SampleFormat::Float
        );
        assert_eq!(SampleFormat::from_str("int").unwrap(), SampleFormat::Int);
        assert_eq!(SampleFormat::from_str("Int").unwrap(), SampleFormat::Int);
    }

    #[test]
    fn test_sample_format_from_str_invalid() {
        assert!(SampleFormat::from_str("invalid").is_err());
        assert!(SampleFormat::from_str("").is_err());
        assert!(SampleFormat::from_str("double").is_err());
    }

    #[test]
    fn test_stream_format_new() {
        let format = StreamFormat::new(2, 44100, 16, SampleFormat::Int).unwrap();
        assert_eq!(format.channels, 2);
        assert_eq!(format.sample_rate, 44100);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.sample_format, SampleFormat::Int);
    }

    #[test]
    fn test_stream_format_new_invalid() {
        assert!(StreamFormat::new(0, 44100, 16, SampleFormat::Int).is_err());
        assert!(StreamFormat::new(2, 0, 16, SampleFormat::Int).is_err());
    }

    #[test]
    fn test_stream_format_display() {
        let format = StreamFormat::new(1, 48000, 32, SampleFormat::Float).unwrap();
        assert_eq!(format!("{}", format), "1ch/48000Hz/32-bit float");
    }
}
