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
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::audio::Audio;
use crate::keymap::{Key, NamedKey, UnknownKeyName};

/// The configuration for a listening session.
#[derive(Deserialize, Clone)]
pub struct Session {
    /// The directory holding the WAV samples.
    samples: PathBuf,
    /// The key whose release terminates the session. Defaults to escape.
    terminate_key: Option<String>,
    /// The audio configuration.
    audio: Option<Audio>,
}

impl Session {
    /// New will create a new Session configuration.
    pub fn new(samples: &Path) -> Session {
        Session {
            samples: samples.to_path_buf(),
            terminate_key: None,
            audio: None,
        }
    }

    /// Returns the sample directory from the configuration.
    pub fn samples(&self) -> &Path {
        &self.samples
    }

    /// Returns the terminate key from the configuration (default: esc).
    pub fn terminate_key(&self) -> Result<Key, UnknownKeyName> {
        match self.terminate_key.as_deref() {
            Some(name) => name.parse(),
            None => Ok(Key::Named(NamedKey::Esc)),
        }
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> Option<&Audio> {
        self.audio.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_key_defaults_to_esc() {
        let session = Session::new(Path::new("/tmp/sounds"));
        assert_eq!(
            session.terminate_key().unwrap(),
            Key::Named(NamedKey::Esc)
        );
    }

    #[test]
    fn test_terminate_key_rejects_unknown_names() {
        let session = Session {
            samples: PathBuf::from("/tmp/sounds"),
            terminate_key: Some("hyperspace".to_string()),
            audio: None,
        };
        assert!(session.terminate_key().is_err());
    }
}
