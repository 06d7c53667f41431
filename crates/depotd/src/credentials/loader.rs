//! Loading credentials from disk.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::{self, PemObject};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised while loading a credential file.
#[derive(Debug, Error)]
pub enum CredentialLoadError {
    /// The file could not be read.
    #[error("failed to read credential '{}': {source}", path.display())]
    Read {
        /// Credential file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file was read but does not hold a usable credential.
    #[error("credential '{}' is malformed: {reason}", path.display())]
    Malformed {
        /// Credential file path.
        path: PathBuf,
        /// Why the content was rejected.
        reason: String,
    },
}

impl CredentialLoadError {
    /// Builds a [`CredentialLoadError::Malformed`] error.
    #[must_use]
    pub fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Path of the credential file that failed to load.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Malformed { path, .. } => path.as_path(),
        }
    }

    /// Returns `true` when the file did not exist at load time.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Reasons PEM content cannot become a [`Credential`].
#[derive(Debug, Error)]
pub enum CredentialParseError {
    /// A `CERTIFICATE` block could not be decoded.
    #[error("invalid certificate block: {source}")]
    Certificate {
        /// PEM decoding error.
        #[source]
        source: pem::Error,
    },
    /// The content holds no certificate at all.
    #[error("no certificate found")]
    NoCertificate,
    /// No private key block could be decoded.
    #[error("no usable private key: {source}")]
    PrivateKey {
        /// PEM decoding error.
        #[source]
        source: pem::Error,
    },
    /// The crypto provider cannot sign with the key.
    #[error("unsupported private key: {source}")]
    UnsupportedKey {
        /// Provider error.
        #[source]
        source: rustls::Error,
    },
    /// The key does not belong to the leaf certificate.
    #[error("private key does not match the leaf certificate: {source}")]
    KeyMismatch {
        /// Provider error.
        #[source]
        source: rustls::Error,
    },
}

/// Turns a file into a credential value.
///
/// Implementations must build a complete, independent value on every call;
/// the store swaps whole values and never patches a credential in place.
pub trait CredentialLoader: Send + Sync + 'static {
    /// Credential type produced by this loader.
    type Credential: Send + Sync + 'static;

    /// Reads and parses the credential stored at `path`.
    fn load(&self, path: &Path) -> Result<Self::Credential, CredentialLoadError>;
}

/// TLS server identity: certificate chain plus signing key.
#[derive(Clone)]
pub struct Credential {
    certified_key: Arc<CertifiedKey>,
    fingerprint: String,
}

impl Credential {
    /// Builds a credential from PEM text holding a chain and a private key.
    ///
    /// Every `CERTIFICATE` block joins the chain in file order, leaf first.
    /// The first private key block is used whatever its encoding (PKCS#8,
    /// PKCS#1 or SEC1), and its public half must match the leaf.
    pub fn from_pem(pem: &[u8], provider: &CryptoProvider) -> Result<Self, CredentialParseError> {
        let chain = CertificateDer::pem_slice_iter(pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| CredentialParseError::Certificate { source })?;
        let Some(leaf) = chain.first() else {
            return Err(CredentialParseError::NoCertificate);
        };
        let fingerprint = fingerprint(leaf.as_ref());

        let key = PrivateKeyDer::from_pem_slice(pem)
            .map_err(|source| CredentialParseError::PrivateKey { source })?;
        let signing_key = provider
            .key_provider
            .load_private_key(key)
            .map_err(|source| CredentialParseError::UnsupportedKey { source })?;

        let certified_key = CertifiedKey::new(chain, signing_key);
        certified_key
            .keys_match()
            .map_err(|source| CredentialParseError::KeyMismatch { source })?;

        Ok(Self {
            certified_key: Arc::new(certified_key),
            fingerprint,
        })
    }

    /// Chain and key in the form rustls hands to a handshake.
    #[must_use]
    pub const fn certified_key(&self) -> &Arc<CertifiedKey> {
        &self.certified_key
    }

    /// Lower-case hex SHA-256 of the leaf certificate.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        self.fingerprint.as_str()
    }

    /// Number of certificates in the chain.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.certified_key.cert.len()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credential")
            .field("fingerprint", &self.fingerprint)
            .field("chain_len", &self.chain_len())
            .finish_non_exhaustive()
    }
}

/// Loads [`Credential`]s from PEM files.
#[derive(Debug, Clone)]
pub struct PemCredentialLoader {
    provider: Arc<CryptoProvider>,
}

impl PemCredentialLoader {
    /// Builds a loader that parses keys with `provider`.
    #[must_use]
    pub const fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }

    /// Crypto provider used to load keys.
    #[must_use]
    pub const fn provider(&self) -> &Arc<CryptoProvider> {
        &self.provider
    }
}

impl Default for PemCredentialLoader {
    fn default() -> Self {
        Self::new(Arc::new(rustls::crypto::ring::default_provider()))
    }
}

impl CredentialLoader for PemCredentialLoader {
    type Credential = Credential;

    fn load(&self, path: &Path) -> Result<Credential, CredentialLoadError> {
        let pem = fs::read(path).map_err(|source| CredentialLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Credential::from_pem(&pem, &self.provider)
            .map_err(|error| CredentialLoadError::malformed(path, error.to_string()))
    }
}

/// Lower-case hex SHA-256 of `der`.
fn fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
