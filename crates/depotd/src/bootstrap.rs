//! Service bootstrap orchestration.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8Path;
use ortho_config::OrthoError;
use rustls::ServerConfig;
use thiserror::Error;

use depot_config::Config;

use crate::capability::{
    CapabilityKind, PackageDatabase, SearchIndexer, SearchService, StorageService,
};
use crate::credentials::{
    self, Credential, CredentialSelector, CredentialStore, CredentialWatcher,
    PemCredentialLoader, TlsError, WatchError,
};
use crate::health::HealthReporter;
use crate::providers::{ProviderRegistry, ProviderResolver, ResolveError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the service configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A capability could not be bound to a provider.
    #[error("failed to resolve {} provider: {source}", source.kind())]
    Provider {
        /// Resolution failure, naming the capability.
        #[source]
        source: ResolveError,
    },
    /// The credential watcher could not start.
    #[error("failed to watch TLS credential: {source}")]
    Credentials {
        /// Underlying watch error.
        #[source]
        source: WatchError,
    },
    /// The TLS server configuration could not be built.
    #[error("failed to configure TLS: {source}")]
    Tls {
        /// Underlying TLS error.
        #[source]
        source: TlsError,
    },
}

impl From<ResolveError> for BootstrapError {
    fn from(source: ResolveError) -> Self {
        Self::Provider { source }
    }
}

/// One resolved instance of every capability.
pub struct Capabilities {
    storage: Arc<dyn StorageService>,
    database: Arc<dyn PackageDatabase>,
    search: Arc<dyn SearchService>,
    indexer: Arc<dyn SearchIndexer>,
    providers: BTreeMap<CapabilityKind, String>,
}

impl Capabilities {
    /// Resolves every capability in [`CapabilityKind::ALL`] order.
    ///
    /// Stops at the first failure; nothing resolved earlier is kept.
    pub fn resolve(
        resolver: ProviderResolver<'_>,
        config: &Config,
        reporter: &dyn HealthReporter,
    ) -> Result<Self, ResolveError> {
        let mut providers = BTreeMap::new();
        let mut record = |kind: CapabilityKind, provider: &str| {
            reporter.provider_resolved(kind, provider);
            providers.insert(kind, provider.to_owned());
        };

        let storage = resolver.resolve::<dyn StorageService>(config)?;
        record(CapabilityKind::Storage, storage.provider());
        let database = resolver.resolve::<dyn PackageDatabase>(config)?;
        record(CapabilityKind::Database, database.provider());
        let search = resolver.resolve::<dyn SearchService>(config)?;
        record(CapabilityKind::Search, search.provider());
        let indexer = resolver.resolve::<dyn SearchIndexer>(config)?;
        record(CapabilityKind::Indexer, indexer.provider());

        Ok(Self {
            storage: storage.into_instance(),
            database: database.into_instance(),
            search: search.into_instance(),
            indexer: indexer.into_instance(),
            providers,
        })
    }

    /// Package content storage.
    #[must_use]
    pub const fn storage(&self) -> &Arc<dyn StorageService> {
        &self.storage
    }

    /// Package metadata database.
    #[must_use]
    pub const fn database(&self) -> &Arc<dyn PackageDatabase> {
        &self.database
    }

    /// Search queries.
    #[must_use]
    pub const fn search(&self) -> &Arc<dyn SearchService> {
        &self.search
    }

    /// Search index maintenance.
    #[must_use]
    pub const fn indexer(&self) -> &Arc<dyn SearchIndexer> {
        &self.indexer
    }

    /// Name of the provider bound to `kind`.
    #[must_use]
    pub fn provider(&self, kind: CapabilityKind) -> Option<&str> {
        self.providers.get(&kind).map(String::as_str)
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Capabilities")
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

/// TLS state kept current by the credential watcher.
#[derive(Debug)]
pub struct TlsEndpoint {
    store: Arc<CredentialStore<Credential>>,
    watcher: CredentialWatcher,
    server_config: Arc<ServerConfig>,
}

impl TlsEndpoint {
    /// Loads the credential at `path`, starts watching it and builds the
    /// server configuration around the store.
    pub fn start(
        path: &Utf8Path,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, BootstrapError> {
        let loader = PemCredentialLoader::default();
        let provider = Arc::clone(loader.provider());
        let store = CredentialStore::shared();
        let watcher =
            CredentialWatcher::start(path.as_std_path(), Arc::clone(&store), loader, reporter)
                .map_err(|source| BootstrapError::Credentials { source })?;
        let server_config =
            credentials::server_config(CredentialSelector::new(Arc::clone(&store)), provider)
                .map_err(|source| BootstrapError::Tls { source })?;
        Ok(Self {
            store,
            watcher,
            server_config,
        })
    }

    /// Store read by every handshake.
    #[must_use]
    pub const fn store(&self) -> &Arc<CredentialStore<Credential>> {
        &self.store
    }

    /// Configuration to hand to the listener.
    #[must_use]
    pub const fn server_config(&self) -> &Arc<ServerConfig> {
        &self.server_config
    }

    /// Watcher keeping the store current.
    #[must_use]
    pub const fn watcher(&self) -> &CredentialWatcher {
        &self.watcher
    }

    /// Stops reloading. The last loaded credential stays in the store.
    pub fn stop(&mut self) {
        self.watcher.stop();
    }
}

/// Result of a successful bootstrap invocation.
#[derive(Debug)]
pub struct Service {
    config: Config,
    capabilities: Capabilities,
    tls: Option<TlsEndpoint>,
    telemetry: TelemetryHandle,
}

impl Service {
    /// Accessor for the configuration snapshot.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Resolved capability instances.
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// TLS state, present when a credential location is configured.
    #[must_use]
    pub const fn tls(&self) -> Option<&TlsEndpoint> {
        self.tls.as_ref()
    }

    /// Bind addresses passed through for the host layer.
    #[must_use]
    pub fn urls(&self) -> Option<&str> {
        self.config.urls()
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Stops background work owned by the service.
    pub fn shutdown(&mut self) {
        if let Some(tls) = self.tls.as_mut() {
            tls.stop();
        }
    }
}

/// Bootstraps the service using the supplied collaborators.
///
/// Loads configuration, installs telemetry, binds each capability to a
/// provider from `registry` and, when `cert_location` is set, starts the
/// credential watcher. Any failure is reported and returned before the
/// service is handed out.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    registry: &ProviderRegistry,
) -> Result<Service, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader, &reporter, registry) {
        Ok(service) => {
            reporter.bootstrap_succeeded(service.config());
            Ok(service)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(
    loader: &dyn ConfigLoader,
    reporter: &Arc<dyn HealthReporter>,
    registry: &ProviderRegistry,
) -> Result<Service, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let capabilities =
        Capabilities::resolve(ProviderResolver::new(registry), &config, reporter.as_ref())?;
    let tls = config
        .cert_location()
        .map(|path| TlsEndpoint::start(path, Arc::clone(reporter)))
        .transpose()?;

    Ok(Service {
        config,
        capabilities,
        tls,
        telemetry,
    })
}
