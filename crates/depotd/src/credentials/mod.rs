//! TLS credential loading, storage and hot reload.
//!
//! A [`CredentialWatcher`] keeps a [`CredentialStore`] in step with a file on
//! disk, and a [`CredentialSelector`] hands whatever the store holds to each
//! TLS handshake.

mod loader;
mod store;
mod tls;
mod watcher;

pub use loader::{
    Credential, CredentialLoadError, CredentialLoader, CredentialParseError, PemCredentialLoader,
};
pub use store::CredentialStore;
pub use tls::{CredentialSelector, TlsError, server_config};
pub use watcher::{CredentialWatcher, WatchError, WatchEvent, WatchEventKind, classify};
