//! BDD test world: encapsulates loader, reporter, registry and service state
//! for step functions.

use std::cell::RefCell;
use std::sync::Arc;

use crate::bootstrap::{BootstrapError, ConfigLoader, Service, bootstrap_with};
use crate::builtin::builtin_registry;
use crate::capability::CapabilityKind;
use crate::providers::ProviderRegistry;

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::credentials::{SelfSignedPem, fingerprint, handshake, install};
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub loader: TestConfigLoader,
    failing_loader: bool,
    pub reporter: Arc<RecordingHealthReporter>,
    registry: ProviderRegistry,
    service: Option<Service>,
    bootstrap_error: Option<BootstrapError>,
    pub installed: Option<SelfSignedPem>,
}

impl TestWorld {
    /// Builds a world around the built-in providers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: TestConfigLoader::new(),
            failing_loader: false,
            reporter: Arc::new(RecordingHealthReporter::default()),
            registry: builtin_registry(),
            service: None,
            bootstrap_error: None,
            installed: None,
        }
    }

    /// Switches to a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.failing_loader = true;
    }

    /// Writes a fresh credential to the configured certificate location.
    pub fn install_credential(&mut self) {
        let pem = SelfSignedPem::generate("depot.test");
        pem.install(&self.loader.credential_path());
        self.installed = Some(pem);
    }

    /// Writes a new certificate paired with some other certificate's key.
    ///
    /// The previously installed credential stays the expected one.
    pub fn install_mismatched_credential(&mut self) {
        let certificate = SelfSignedPem::generate("depot.test");
        let stranger = SelfSignedPem::generate("depot.test");
        install(&self.loader.credential_path(), &certificate.with_key_of(&stranger));
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.service.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        let loader: &dyn ConfigLoader = if self.failing_loader {
            &FailingConfigLoader
        } else {
            &self.loader
        };
        match bootstrap_with(loader, self.reporter.clone(), &self.registry) {
            Ok(service) => self.service = Some(service),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns the bootstrap error, if any.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the bootstrapped service, if any.
    #[must_use]
    pub fn service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    /// Provider bound to `kind` by the last bootstrap.
    #[must_use]
    pub fn provider(&self, kind: CapabilityKind) -> Option<String> {
        self.service
            .as_ref()
            .and_then(|service| service.capabilities().provider(kind))
            .map(str::to_owned)
    }

    /// Fingerprint of the credential the TLS endpoint currently serves.
    #[must_use]
    pub fn served_fingerprint(&self) -> Option<String> {
        self.service
            .as_ref()
            .and_then(Service::tls)
            .and_then(|tls| tls.store().get())
            .map(|credential| credential.fingerprint().to_owned())
    }

    /// Fingerprint presented in a full handshake by a client that trusts the
    /// installed credential.
    pub fn handshake_fingerprint(&self) -> Result<String, String> {
        let trusted = self.installed.as_ref().ok_or("no credential installed")?;
        let tls = self
            .service
            .as_ref()
            .and_then(Service::tls)
            .ok_or("TLS endpoint missing")?;
        handshake(Arc::clone(tls.server_config()), trusted, "depot.test")
            .map(|presented| fingerprint(&presented))
            .map_err(|error| format!("handshake failed: {error}"))
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
