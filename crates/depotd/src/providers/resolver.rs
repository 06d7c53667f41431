//! First-match provider resolution.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use depot_config::Config;

use super::{ProviderError, ProviderRegistry};
use crate::capability::{Capability, CapabilityKind};

const PROVIDERS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::providers");

/// Errors raised while resolving a capability to a provider.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No registered provider accepted the configuration.
    #[error(
        "no active {kind} provider: {candidates} registered provider(s) declined the configuration"
    )]
    NoActiveProvider {
        /// Capability that could not be resolved.
        kind: CapabilityKind,
        /// Number of registered providers that reported inactive.
        candidates: usize,
    },
    /// The selected provider's factory failed.
    #[error("{kind} provider '{provider}' failed to start: {source}")]
    ProviderConstructionFailed {
        /// Capability being resolved.
        kind: CapabilityKind,
        /// Name of the provider whose factory failed.
        provider: String,
        /// Error reported by the factory.
        #[source]
        source: ProviderError,
    },
}

impl ResolveError {
    /// Capability the error refers to.
    #[must_use]
    pub const fn kind(&self) -> CapabilityKind {
        match self {
            Self::NoActiveProvider { kind, .. } | Self::ProviderConstructionFailed { kind, .. } => {
                *kind
            }
        }
    }
}

/// Instance built by the selected provider.
pub struct Resolved<C: ?Sized> {
    provider: String,
    instance: Arc<C>,
}

impl<C: ?Sized> Resolved<C> {
    /// Name of the provider that built the instance.
    #[must_use]
    pub fn provider(&self) -> &str {
        self.provider.as_str()
    }

    /// The constructed capability.
    #[must_use]
    pub const fn instance(&self) -> &Arc<C> {
        &self.instance
    }

    /// Consumes the resolution, returning the constructed capability.
    #[must_use]
    pub fn into_instance(self) -> Arc<C> {
        self.instance
    }
}

impl<C: ?Sized> fmt::Debug for Resolved<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Resolved")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

/// Selects and constructs providers from a [`ProviderRegistry`].
///
/// The resolver keeps no state between calls: every successful
/// [`resolve`](Self::resolve) constructs a fresh instance. Callers that need a
/// singleton keep the returned `Arc`.
#[derive(Debug, Clone, Copy)]
pub struct ProviderResolver<'a> {
    registry: &'a ProviderRegistry,
}

impl<'a> ProviderResolver<'a> {
    /// Builds a resolver over a fully populated registry.
    #[must_use]
    pub const fn new(registry: &'a ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Resolves capability `C` against `config`.
    ///
    /// Predicates are evaluated in registration order and the first active
    /// provider is constructed. Later providers are neither consulted for
    /// construction nor checked for being active as well: when several
    /// providers accept the configuration, the earliest registration governs.
    pub fn resolve<C>(&self, config: &Config) -> Result<Resolved<C>, ResolveError>
    where
        C: Capability + ?Sized,
    {
        let descriptors = self.registry.descriptors::<C>();
        let Some(selected) = descriptors.iter().find(|descriptor| {
            let active = descriptor.is_active(config);
            debug!(
                target: PROVIDERS_TARGET,
                capability = %C::KIND,
                provider = descriptor.name(),
                active,
                "evaluated provider predicate"
            );
            active
        }) else {
            return Err(ResolveError::NoActiveProvider {
                kind: C::KIND,
                candidates: descriptors.len(),
            });
        };

        let instance =
            selected
                .construct(config)
                .map_err(|source| ResolveError::ProviderConstructionFailed {
                    kind: C::KIND,
                    provider: selected.name().to_owned(),
                    source,
                })?;
        info!(
            target: PROVIDERS_TARGET,
            capability = %C::KIND,
            provider = selected.name(),
            "provider selected"
        );
        Ok(Resolved {
            provider: selected.name().to_owned(),
            instance,
        })
    }
}
