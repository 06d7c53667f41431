//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::path::Path;
use std::sync::Mutex;

use depot_config::Config;

use crate::bootstrap::BootstrapError;
use crate::capability::CapabilityKind;
use crate::credentials::CredentialLoadError;
use crate::health::HealthReporter;

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// A capability was bound to the named provider.
    ProviderResolved {
        kind: CapabilityKind,
        provider: String,
    },
    /// A credential was installed with the given generation.
    CredentialLoaded { generation: u64 },
    /// A credential file could not be loaded.
    CredentialLoadFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Descriptions of every credential load failure so far.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HealthEvent::CredentialLoadFailed(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn provider_resolved(&self, kind: CapabilityKind, provider: &str) {
        self.record(HealthEvent::ProviderResolved {
            kind,
            provider: provider.to_owned(),
        });
    }

    fn credential_loaded(&self, _path: &Path, generation: u64) {
        self.record(HealthEvent::CredentialLoaded { generation });
    }

    fn credential_load_failed(&self, error: &CredentialLoadError) {
        self.record(HealthEvent::CredentialLoadFailed(error.to_string()));
    }
}
