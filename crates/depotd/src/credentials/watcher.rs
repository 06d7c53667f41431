//! Filesystem watch that keeps a [`CredentialStore`] current.
//!
//! The watcher observes the directory containing the credential file rather
//! than the file itself. Editors and deployment tools usually replace a file by
//! writing a sibling and renaming it into place, which a watch on the file's
//! inode would miss.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::loader::CredentialLoader;
use super::store::CredentialStore;
use crate::health::HealthReporter;

const CREDENTIALS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::credentials");
const WORKER_THREAD_NAME: &str = "credential-watcher";

/// Filesystem change that triggers a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// The file appeared.
    Created,
    /// The file's content or metadata changed.
    Modified,
    /// The file was renamed into or out of place.
    Renamed,
}

/// A change observed on the credential file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub kind: WatchEventKind,
    /// Path reported by the filesystem notification.
    pub path: PathBuf,
}

/// Errors raised while starting a [`CredentialWatcher`].
#[derive(Debug, Error)]
pub enum WatchError {
    /// The credential path does not name a file.
    #[error("credential path '{}' does not name a file", path.display())]
    InvalidPath {
        /// Rejected path.
        path: PathBuf,
    },
    /// The containing directory could not be watched.
    #[error("failed to watch '{}': {source}", directory.display())]
    Watch {
        /// Directory the watch was requested for.
        directory: PathBuf,
        /// Error reported by the notification backend.
        #[source]
        source: notify::Error,
    },
    /// The reload thread could not be spawned.
    #[error("failed to spawn credential watcher thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Maps a raw notification onto a reload trigger for `file_name`.
///
/// Returns `None` for events that do not name the file and for kinds that do
/// not warrant a reload (access, removal). A removal leaves the last loaded
/// credential in service.
#[must_use]
pub fn classify(event: &Event, file_name: &OsStr) -> Option<WatchEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => WatchEventKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => WatchEventKind::Renamed,
        EventKind::Modify(_) => WatchEventKind::Modified,
        _ => return None,
    };
    // Rename pairs list the source first; prefer the destination.
    event
        .paths
        .iter()
        .rev()
        .find(|path| path.file_name() == Some(file_name))
        .map(|path| WatchEvent {
            kind,
            path: path.clone(),
        })
}

enum WatchMessage {
    Fs(notify::Result<Event>),
    Shutdown,
}

struct Reloader<L: CredentialLoader> {
    path: PathBuf,
    loader: L,
    store: Arc<CredentialStore<L::Credential>>,
    reporter: Arc<dyn HealthReporter>,
}

impl<L: CredentialLoader> Reloader<L> {
    fn reload(&self, trigger: Option<WatchEventKind>) {
        match self.loader.load(&self.path) {
            Ok(credential) => {
                let generation = self.store.set(credential);
                info!(
                    target: CREDENTIALS_TARGET,
                    path = %self.path.display(),
                    generation,
                    trigger = ?trigger,
                    "credential loaded"
                );
                self.reporter.credential_loaded(&self.path, generation);
            }
            Err(error) if error.is_missing() => {
                debug!(
                    target: CREDENTIALS_TARGET,
                    path = %self.path.display(),
                    trigger = ?trigger,
                    "credential file absent; keeping current credential"
                );
            }
            Err(error) => self.reporter.credential_load_failed(&error),
        }
    }

    fn run(self, file_name: &OsStr, receiver: &Receiver<WatchMessage>) {
        while let Ok(message) = receiver.recv() {
            let mut trigger = match message {
                WatchMessage::Shutdown => break,
                WatchMessage::Fs(result) => self.triggering(result, file_name),
            };

            // Collapse a burst of notifications into one reload.
            let mut shutdown = false;
            while let Ok(pending) = receiver.try_recv() {
                match pending {
                    WatchMessage::Shutdown => {
                        shutdown = true;
                        break;
                    }
                    WatchMessage::Fs(result) => {
                        if let Some(event) = self.triggering(result, file_name) {
                            trigger = Some(event);
                        }
                    }
                }
            }

            if shutdown {
                break;
            }
            if let Some(event) = trigger {
                debug!(
                    target: CREDENTIALS_TARGET,
                    kind = ?event.kind,
                    path = %event.path.display(),
                    "credential file changed"
                );
                self.reload(Some(event.kind));
            }
        }
        debug!(target: CREDENTIALS_TARGET, "credential watcher thread exiting");
    }

    fn triggering(&self, result: notify::Result<Event>, file_name: &OsStr) -> Option<WatchEvent> {
        match result {
            Ok(event) => classify(&event, file_name),
            Err(error) => {
                warn!(
                    target: CREDENTIALS_TARGET,
                    path = %self.path.display(),
                    error = %error,
                    "filesystem watch reported an error"
                );
                None
            }
        }
    }
}

/// Reloads a credential file into a [`CredentialStore`] whenever it changes.
///
/// Reloads run one at a time on a dedicated thread. A missing file is skipped
/// without comment, and a file that fails to parse is reported through the
/// [`HealthReporter`] while the previously loaded credential stays in service.
pub struct CredentialWatcher {
    path: PathBuf,
    watcher: Option<RecommendedWatcher>,
    sender: Option<Sender<WatchMessage>>,
    worker: Option<JoinHandle<()>>,
}

impl CredentialWatcher {
    /// Starts watching `credential_path` and performs the initial load.
    ///
    /// The watch is registered before the initial load so a change landing
    /// between the two is not lost. When the file does not exist yet the
    /// store stays empty until it appears.
    pub fn start<L>(
        credential_path: &Path,
        store: Arc<CredentialStore<L::Credential>>,
        loader: L,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, WatchError>
    where
        L: CredentialLoader,
    {
        let path = credential_path.to_path_buf();
        let file_name = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| WatchError::InvalidPath { path: path.clone() })?;
        let directory = watched_directory(&path);

        let (sender, receiver) = mpsc::channel();
        let notifier = sender.clone();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            // The worker may already be gone during shutdown.
            let _ignored = notifier.send(WatchMessage::Fs(result));
        })
        .map_err(|source| WatchError::Watch {
            directory: directory.clone(),
            source,
        })?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                directory: directory.clone(),
                source,
            })?;

        let reloader = Reloader {
            path: path.clone(),
            loader,
            store,
            reporter,
        };
        reloader.reload(None);

        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || reloader.run(&file_name, &receiver))
            .map_err(|source| WatchError::Spawn { source })?;

        info!(
            target: CREDENTIALS_TARGET,
            path = %path.display(),
            directory = %directory.display(),
            "credential watcher started"
        );
        Ok(Self {
            path,
            watcher: Some(watcher),
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Path of the watched credential file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Returns `true` until [`stop`](Self::stop) has run.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Releases the filesystem watch and joins the reload thread.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        drop(self.watcher.take());
        if let Some(sender) = self.sender.take() {
            let _ignored = sender.send(WatchMessage::Shutdown);
        }
        if worker.join().is_err() {
            warn!(
                target: CREDENTIALS_TARGET,
                path = %self.path.display(),
                "credential watcher thread panicked"
            );
        }
        info!(
            target: CREDENTIALS_TARGET,
            path = %self.path.display(),
            "credential watcher stopped"
        );
    }
}

impl Drop for CredentialWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CredentialWatcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CredentialWatcher")
            .field("path", &self.path)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn watched_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
