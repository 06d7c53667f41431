//! Bootstrap core of the depot package-feed service.
//!
//! At startup the service binds each pluggable capability (package storage,
//! metadata database, search and search indexing) to exactly one provider.
//! Providers are registered in order in a [`ProviderRegistry`], each with an
//! activation predicate over the loaded [`depot_config::Config`]; the
//! [`ProviderResolver`] constructs the first provider whose predicate accepts
//! the configuration and reports a typed [`ResolveError`] when none does or
//! when construction fails.
//!
//! When a certificate location is configured, the service also keeps its TLS
//! identity current. A [`CredentialWatcher`] reloads the PEM file into a
//! [`CredentialStore`] whenever the file is created, rewritten or renamed into
//! place, and a [`CredentialSelector`] hands the current credential to every
//! handshake. Reload failures are reported through the [`HealthReporter`] and
//! never disturb the credential already in service.
//!
//! [`run_service`] ties the pieces together for the `depotd` binary.

mod bootstrap;
pub mod builtin;
mod capability;
pub mod credentials;
mod health;
mod process;
mod providers;
mod telemetry;

pub use bootstrap::{
    BootstrapError, Capabilities, ConfigLoader, Service, SystemConfigLoader, TlsEndpoint,
    bootstrap_with,
};
pub use capability::{
    Capability, CapabilityError, CapabilityKind, CapabilityKindParseError, PackageDatabase,
    SearchIndexer, SearchService, StorageService,
};
pub use credentials::{
    Credential, CredentialLoadError, CredentialLoader, CredentialParseError, CredentialSelector,
    CredentialStore, CredentialWatcher, PemCredentialLoader, TlsError, WatchError, WatchEvent,
    WatchEventKind,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_service,
    run_service_with,
};
pub use providers::{
    ProviderDescriptor, ProviderError, ProviderRegistry, ProviderResolver, ResolveError, Resolved,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
