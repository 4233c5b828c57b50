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
use std::fs;
use std::path::Path;

use serde::Deserialize;

pub mod audio;
pub mod error;
pub mod session;

pub use audio::Audio;
pub use error::ConfigError;
pub use session::Session;

/// Parses a session configuration from a YAML file.
pub fn load_session(path: &Path) -> Result<Session, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let session = Session::deserialize(serde_yml::Deserializer::from_str(&contents))?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_session() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("session.yaml");
        let mut file = fs::File::create(&path).expect("failed to create config");
        write!(
            file,
            "samples: /var/lib/keyclack/sounds\nterminate_key: f12\naudio:\n  device: mock-device\n"
        )
        .expect("failed to write config");

        let session = load_session(&path).expect("failed to load config");
        assert_eq!(
            session.samples(),
            Path::new("/var/lib/keyclack/sounds")
        );
        assert_eq!(
            session.terminate_key().expect("bad terminate key"),
            "f12".parse().unwrap()
        );
        assert_eq!(
            session.audio().map(|audio| audio.device().to_string()),
            Some("mock-device".to_string())
        );
    }

    #[test]
    fn test_load_session_missing_file() {
        let result = load_session(Path::new("/nonexistent/session.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_session_bad_yaml() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("session.yaml");
        fs::write(&path, "samples: [unclosed").expect("failed to write config");

        let result = load_session(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
