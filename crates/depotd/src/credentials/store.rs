//! Atomically swappable holder for the active credential.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Holds the credential handed to TLS handshakes.
///
/// Readers clone an `Arc` under a read lock and release it immediately, so
/// [`get`](Self::get) never waits on a reload in progress for longer than the
/// pointer swap. Each [`set`](Self::set) installs a brand-new value; the
/// previous credential is dropped only after the swap, and any handshake still
/// holding it keeps it alive until that handshake finishes.
pub struct CredentialStore<C> {
    current: RwLock<Option<Arc<C>>>,
    generation: AtomicU64,
}

impl<C> CredentialStore<C> {
    /// Builds a store with no credential loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Builds a shareable empty store.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the current credential, or `None` when nothing has loaded yet.
    #[must_use]
    pub fn get(&self) -> Option<Arc<C>> {
        self.current.read().clone()
    }

    /// Replaces the current credential and returns the new generation.
    pub fn set(&self, credential: C) -> u64 {
        let replacement = Arc::new(credential);
        let (previous, generation) = {
            let mut current = self.current.write();
            let previous = current.replace(replacement);
            (previous, self.generation.fetch_add(1, Ordering::AcqRel) + 1)
        };
        drop(previous);
        generation
    }

    /// Returns `true` once any credential has been installed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Number of successful [`set`](Self::set) calls so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl<C> Default for CredentialStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for CredentialStore<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CredentialStore")
            .field("loaded", &self.is_loaded())
            .field("generation", &self.generation())
            .finish()
    }
}
