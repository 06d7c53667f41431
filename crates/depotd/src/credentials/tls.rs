//! Certificate selection for TLS handshakes.

use std::sync::Arc;

use rustls::ServerConfig;
use rustls::crypto::CryptoProvider;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use thiserror::Error;
use tracing::trace;

use super::loader::Credential;
use super::store::CredentialStore;

const TLS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::tls");

/// Errors raised while assembling the TLS server configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    /// rustls rejected the protocol or provider setup.
    #[error("failed to build TLS server configuration: {source}")]
    Config {
        /// Error reported by rustls.
        #[source]
        source: rustls::Error,
    },
}

/// Hands the current credential to every handshake.
///
/// A single server identity is served for all host names, so the SNI hint
/// offered by the client is ignored.
#[derive(Debug, Clone)]
pub struct CredentialSelector<C = Credential> {
    store: Arc<CredentialStore<C>>,
}

impl<C> CredentialSelector<C> {
    /// Builds a selector reading from `store`.
    #[must_use]
    pub const fn new(store: Arc<CredentialStore<C>>) -> Self {
        Self { store }
    }

    /// Returns the current credential regardless of `server_name`.
    ///
    /// `None` means no credential has loaded yet; the handshake then fails.
    #[must_use]
    pub fn select(&self, server_name: Option<&str>) -> Option<Arc<C>> {
        let selected = self.store.get();
        trace!(
            target: TLS_TARGET,
            server_name,
            available = selected.is_some(),
            "selecting server credential"
        );
        selected
    }

    /// Store the selector reads from.
    #[must_use]
    pub const fn store(&self) -> &Arc<CredentialStore<C>> {
        &self.store
    }
}

impl ResolvesServerCert for CredentialSelector<Credential> {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        self.select(client_hello.server_name())
            .map(|credential| Arc::clone(credential.certified_key()))
    }
}

/// Builds a server configuration whose certificate comes from `selector`.
///
/// Client authentication is disabled and the provider's safe default protocol
/// versions apply.
pub fn server_config(
    selector: CredentialSelector,
    provider: Arc<CryptoProvider>,
) -> Result<Arc<ServerConfig>, TlsError> {
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|source| TlsError::Config { source })?
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(selector));
    Ok(Arc::new(config))
}
