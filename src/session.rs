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

//! Session lifecycle: startup, the running listener, teardown.
//!
//! Construction is initialization: a `Session` value only exists once every
//! sample is decoded and every output stream is open, so nothing downstream
//! ever sees a partial pool. Teardown releases resources in reverse order of
//! acquisition and is idempotent, so a terminate key racing an OS signal
//! tears down exactly once.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::audio::Device;
use crate::channel::Channel;
use crate::config;
use crate::dispatch::Dispatcher;
use crate::hook::Hook;
use crate::keymap::{Key, UnknownKeyName};
use crate::samplebank::{BankError, SampleBank, SampleResource};

/// Errors that abort startup. None of them leave resources behind: the bank
/// fails before any stream opens, and a stream failure drops the streams
/// opened so far.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error("failed to open output stream for {path}: {message}")]
    Stream { path: PathBuf, message: String },
    #[error(transparent)]
    TerminateKey(#[from] UnknownKeyName),
}

/// Lifecycle phase of a session. The pre-construction phases have no variant:
/// `Session::new` is the initialization step, and a failed one produces no
/// session at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    Running,
    Terminating,
    Terminated,
}

/// One listening session: the channel pool, the hook driving it and the
/// teardown state.
pub struct Session {
    device: Arc<dyn Device>,
    channels: Arc<Vec<Mutex<Channel>>>,
    hook: Arc<dyn Hook>,
    terminate_key: Key,
    state: Mutex<SessionState>,
    terminated: AtomicBool,
}

impl Session {
    /// Initializes a session: decodes the sample pool and opens one output
    /// stream per sample, bound to that sample's format.
    pub fn new(
        config: &config::Session,
        device: Arc<dyn Device>,
        hook: Arc<dyn Hook>,
    ) -> Result<Session, StartupError> {
        let terminate_key = config.terminate_key()?;
        let bank = SampleBank::load(config.samples())?;

        let mut channels = Vec::with_capacity(bank.len());
        for index in 0..bank.len() {
            let sample = bank.get(index);
            let stream =
                device
                    .open_output(sample.format())
                    .map_err(|e| StartupError::Stream {
                        path: sample.path().to_path_buf(),
                        message: e.to_string(),
                    })?;
            debug!(channel = index, path = ?sample.path(), "Channel ready.");
            channels.push(Mutex::new(Channel::new(index, sample, stream)));
        }

        info!(
            device = %device,
            channels = channels.len(),
            terminate_key = ?terminate_key,
            "Session initialized."
        );
        Ok(Session {
            device,
            channels: Arc::new(channels),
            hook,
            terminate_key,
            state: Mutex::new(SessionState::Initialized),
            terminated: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Runs the session until the terminate key is released or the process
    /// receives an interrupt or termination signal, then tears down.
    pub async fn run(&self) {
        *self.state.lock() = SessionState::Running;
        info!("Session running.");

        let dispatcher = Dispatcher::new(
            self.channels.clone(),
            self.hook.clone(),
            self.terminate_key,
        );

        tokio::select! {
            result = dispatcher.join() => {
                if let Err(e) = result {
                    error!(err = %e, "Dispatch loop panicked.");
                }
            }
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Interrupt received."),
                    Err(e) => error!(err = %e, "Unable to listen for interrupts."),
                }
            }
            _ = terminate_signal() => {
                info!("Termination signal received.");
            }
        }

        self.terminate();
    }

    /// Tears the session down: closes every channel in reverse order of
    /// creation, then releases the device handle. Safe to call more than
    /// once; only the first call does work. Failures while closing are
    /// logged and teardown continues.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.lock() = SessionState::Terminating;
        info!("Session terminating.");

        for channel in self.channels.iter().rev() {
            let mut channel = channel.lock();
            if let Err(e) = channel.close() {
                error!(
                    channel = channel.index(),
                    err = e.as_ref(),
                    "Error closing channel."
                );
            }
        }
        debug!(device = %self.device, "Audio device released.");

        *self.state.lock() = SessionState::Terminated;
        info!("Session terminated.");
    }
}

/// Resolves when the process receives a termination signal. Never resolves
/// on platforms without one, or if the handler cannot be installed.
#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            terminate.recv().await;
        }
        Err(e) => {
            error!(err = %e, "Unable to listen for termination signals.");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await
}
