//! Structured health reporting for service lifecycle events.

use std::path::Path;
use std::sync::Arc;

use crate::bootstrap::BootstrapError;
use crate::capability::CapabilityKind;
use crate::credentials::CredentialLoadError;

use depot_config::Config;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once a capability has been bound to a provider.
    fn provider_resolved(&self, kind: CapabilityKind, provider: &str);

    /// Invoked after a credential file was loaded into the store.
    fn credential_loaded(&self, path: &Path, generation: u64);

    /// Invoked when a credential file exists but could not be loaded.
    fn credential_load_failed(&self, error: &CredentialLoadError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn provider_resolved(&self, kind: CapabilityKind, provider: &str) {
        (**self).provider_resolved(kind, provider);
    }

    fn credential_loaded(&self, path: &Path, generation: u64) {
        (**self).credential_loaded(path, generation);
    }

    fn credential_load_failed(&self, error: &CredentialLoadError) {
        (**self).credential_load_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting service bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            urls = config.urls(),
            tls = config.cert_location().is_some(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "service bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "service bootstrap failed"
        );
    }

    fn provider_resolved(&self, kind: CapabilityKind, provider: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "provider_resolved",
            capability = %kind,
            provider,
            "capability bound to provider"
        );
    }

    fn credential_loaded(&self, path: &Path, generation: u64) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "credential_loaded",
            path = %path.display(),
            generation,
            "TLS credential installed"
        );
    }

    fn credential_load_failed(&self, error: &CredentialLoadError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "credential_load_failed",
            path = %error.path().display(),
            error = %error,
            "TLS credential reload failed; keeping previous credential"
        );
    }
}
