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
mod audio;
mod channel;
mod config;
mod dispatch;
mod hook;
mod keymap;
mod playback;
mod samplebank;
mod session;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};

use crate::samplebank::SampleResource;

#[derive(Parser)]
#[clap(
    author = "The keyclack authors",
    version = crate_version!(),
    about = "Plays typewriter sounds on every keystroke."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists and verifies the samples in the given directory.
    Samples {
        /// The path to the sample directory on disk.
        path: String,
    },
    /// Start will start listening for keystrokes.
    Start {
        /// The path to the session config.
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Samples { path } => {
            let bank = samplebank::SampleBank::load(&PathBuf::from(&path))?;

            println!("Samples (count: {}):", bank.len());
            for index in 0..bank.len() {
                let sample = bank.get(index);
                println!(
                    "- [{}] {} ({}, {} ms)",
                    index,
                    sample.path().display(),
                    sample.format(),
                    sample.duration().as_millis()
                );
            }
            println!("\nTotal sample memory: {} KiB", bank.memory_usage() / 1024);
        }
        Commands::Start { config_path } => {
            let config = config::load_session(&PathBuf::from(&config_path))?;
            let device = audio::get_device(config.audio())?;
            let hook: Arc<dyn hook::Hook> = Arc::new(hook::rdev::Driver::new());

            let session = session::Session::new(&config, device, hook)?;
            session.run().await;
        }
    }

    Ok(())
}
