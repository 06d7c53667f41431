//! Registry of candidate providers for each capability.
//!
//! Providers are registered during setup in the order the service should
//! consider them. Each [`ProviderDescriptor`] pairs an activation predicate
//! with a factory; the [`ProviderResolver`] walks the ordered list and builds
//! the first provider whose predicate accepts the configuration.
//!
//! Registration needs `&mut ProviderRegistry`, so once the registry is shared
//! behind a reference or `Arc` it can no longer change. Resolution therefore
//! never races registration and needs no locking.

mod resolver;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use depot_config::Config;

use crate::capability::{
    Capability, CapabilityKind, PackageDatabase, SearchIndexer, SearchService, StorageService,
};

pub use resolver::{ProviderResolver, ResolveError, Resolved};

type Predicate = dyn Fn(&Config) -> bool + Send + Sync;
type Factory<C> = dyn Fn(&Config) -> Result<Arc<C>, ProviderError> + Send + Sync;

/// Failure reported by a provider factory.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ProviderError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// A candidate implementation of capability `C`.
pub struct ProviderDescriptor<C: ?Sized> {
    name: String,
    is_active: Box<Predicate>,
    construct: Box<Factory<C>>,
}

impl<C> ProviderDescriptor<C>
where
    C: Capability + ?Sized,
{
    /// Builds a descriptor from an activation predicate and a factory.
    ///
    /// The predicate runs for every registered provider on every resolution,
    /// so it must be cheap and free of side effects. The factory runs only for
    /// the selected provider and may perform I/O.
    #[must_use]
    pub fn new<P, F>(name: impl Into<String>, is_active: P, construct: F) -> Self
    where
        P: Fn(&Config) -> bool + Send + Sync + 'static,
        F: Fn(&Config) -> Result<Arc<C>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            is_active: Box::new(is_active),
            construct: Box::new(construct),
        }
    }

    /// Provider name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Capability this provider satisfies.
    #[must_use]
    pub const fn kind(&self) -> CapabilityKind {
        C::KIND
    }

    /// Evaluates the activation predicate.
    #[must_use]
    pub fn is_active(&self, config: &Config) -> bool {
        (self.is_active)(config)
    }

    /// Builds one instance of the capability.
    pub fn construct(&self, config: &Config) -> Result<Arc<C>, ProviderError> {
        (self.construct)(config)
    }
}

impl<C> fmt::Debug for ProviderDescriptor<C>
where
    C: Capability + ?Sized,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("kind", &C::KIND)
            .finish_non_exhaustive()
    }
}

/// Ordered provider descriptors, one list per capability kind.
#[derive(Default)]
pub struct ProviderRegistry {
    pub(crate) storage: Vec<ProviderDescriptor<dyn StorageService>>,
    pub(crate) database: Vec<ProviderDescriptor<dyn PackageDatabase>>,
    pub(crate) search: Vec<ProviderDescriptor<dyn SearchService>>,
    pub(crate) indexer: Vec<ProviderDescriptor<dyn SearchIndexer>>,
}

impl ProviderRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor to the list for its capability.
    pub fn register<C>(&mut self, descriptor: ProviderDescriptor<C>) -> &mut Self
    where
        C: Capability + ?Sized,
    {
        C::slot_mut(self).push(descriptor);
        self
    }

    /// Descriptors registered for capability `C`, in registration order.
    #[must_use]
    pub fn descriptors<C>(&self) -> &[ProviderDescriptor<C>]
    where
        C: Capability + ?Sized,
    {
        C::slot(self)
    }

    /// Names of the providers registered for `kind`, in registration order.
    #[must_use]
    pub fn provider_names(&self, kind: CapabilityKind) -> Vec<&str> {
        match kind {
            CapabilityKind::Storage => names(&self.storage),
            CapabilityKind::Database => names(&self.database),
            CapabilityKind::Search => names(&self.search),
            CapabilityKind::Indexer => names(&self.indexer),
        }
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = formatter.debug_map();
        for kind in CapabilityKind::ALL {
            map.entry(&kind, &self.provider_names(kind));
        }
        map.finish()
    }
}

fn names<C>(descriptors: &[ProviderDescriptor<C>]) -> Vec<&str>
where
    C: Capability + ?Sized,
{
    descriptors.iter().map(ProviderDescriptor::name).collect()
}
