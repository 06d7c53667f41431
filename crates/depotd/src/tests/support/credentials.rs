//! Credential fixtures: generated certificates, a plain-text loader and a
//! polling helper for watcher tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{
    ClientConfig, ClientConnection, Connection, RootCertStore, ServerConfig, ServerConnection,
};
use sha2::{Digest, Sha256};

use crate::credentials::{CredentialLoadError, CredentialLoader};

/// Self-signed certificate and key in PEM form.
pub struct SelfSignedPem {
    der: Vec<u8>,
    certificate: String,
    key: String,
    fingerprint: String,
}

impl SelfSignedPem {
    /// Mints a fresh certificate for `host`.
    #[must_use]
    pub fn generate(host: &str) -> Self {
        let minted = rcgen::generate_simple_self_signed(vec![host.to_owned()])
            .expect("certificate generation failed");
        let der = minted.cert.der().to_vec();
        Self {
            fingerprint: fingerprint(&der),
            der,
            certificate: minted.cert.pem(),
            key: minted.key_pair.serialize_pem(),
        }
    }

    /// DER certificate, for use as a client trust anchor.
    #[must_use]
    pub fn certificate_der(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.der.clone())
    }

    /// Certificate block only.
    #[must_use]
    pub fn certificate(&self) -> &str {
        &self.certificate
    }

    /// This certificate paired with `other`'s private key.
    #[must_use]
    pub fn with_key_of(&self, other: &Self) -> String {
        format!("{}{}", self.certificate, other.key)
    }

    /// Certificate followed by its private key.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}{}", self.certificate, self.key)
    }

    /// Hex SHA-256 of the DER certificate.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Writes the combined PEM to `path` via a sibling and a rename.
    pub fn install(&self, path: &Path) {
        install(path, &self.combined());
    }
}

/// Replaces `path` atomically with `content`.
pub fn install(path: &Path, content: &str) {
    let staging = path.with_extension("staging");
    fs::write(&staging, content).expect("write staging file");
    fs::rename(&staging, path).expect("rename into place");
}

/// Hex SHA-256 of a DER certificate.
#[must_use]
pub fn fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Runs a TLS handshake in memory against `server` and returns the DER of
/// the certificate the server presented.
///
/// The client trusts only `trusted` and asks for `server_name`.
pub fn handshake(
    server: Arc<ServerConfig>,
    trusted: &SelfSignedPem,
    server_name: &str,
) -> Result<Vec<u8>, rustls::Error> {
    let mut roots = RootCertStore::empty();
    roots
        .add(trusted.certificate_der())
        .expect("certificate is a valid trust anchor");
    let client_config =
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();
    let name = ServerName::try_from(server_name.to_owned()).expect("valid server name");

    let mut client = Connection::from(ClientConnection::new(Arc::new(client_config), name)?);
    let mut server = Connection::from(ServerConnection::new(server)?);
    for _ in 0..16 {
        if !client.is_handshaking() && !server.is_handshaking() {
            let presented = client
                .peer_certificates()
                .and_then(|chain| chain.first())
                .expect("server presented a certificate");
            return Ok(presented.as_ref().to_vec());
        }
        transfer(&mut client, &mut server)?;
        transfer(&mut server, &mut client)?;
    }
    panic!("handshake did not complete");
}

fn transfer(from: &mut Connection, to: &mut Connection) -> Result<(), rustls::Error> {
    let mut buffer = Vec::new();
    while from.wants_write() {
        from.write_tls(&mut buffer).expect("write to memory buffer");
    }
    let mut pending = buffer.as_slice();
    while !pending.is_empty() {
        to.read_tls(&mut pending).expect("read from memory buffer");
        to.process_new_packets()?;
    }
    Ok(())
}

/// Loads the trimmed file text as the credential.
///
/// Empty files and files starting with `invalid` are malformed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

impl CredentialLoader for TextLoader {
    type Credential = String;

    fn load(&self, path: &Path) -> Result<String, CredentialLoadError> {
        let text = fs::read_to_string(path).map_err(|source| CredentialLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with("invalid") {
            return Err(CredentialLoadError::malformed(path, "unusable test credential"));
        }
        Ok(trimmed.to_owned())
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(20));
    }
}
