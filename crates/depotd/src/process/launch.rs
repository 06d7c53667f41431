//! Supervises service launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::builtin::builtin_registry;
use crate::capability::CapabilityKind;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::providers::ProviderRegistry;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to run the service.
pub struct LaunchPlan<L, S> {
    /// Source of the configuration snapshot.
    pub loader: L,
    /// Receiver of lifecycle events.
    pub reporter: Arc<dyn HealthReporter>,
    /// Candidate providers for every capability.
    pub registry: ProviderRegistry,
    /// Blocks until the service should stop.
    pub shutdown: S,
}

/// Runs the service using the production collaborators.
pub fn run_service() -> Result<(), LaunchError> {
    run_service_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        registry: builtin_registry(),
        shutdown: SystemShutdownSignal::new(),
    })
}

/// Runs the service with injected collaborators.
///
/// Bootstraps, brings the database schema up to date, announces readiness
/// and then blocks on `shutdown`. The credential watcher, if any, is stopped
/// before returning.
pub fn run_service_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        registry,
        shutdown,
    } = plan;

    info!(target: PROCESS_TARGET, "starting service runtime");
    let mut service = bootstrap_with(&loader, reporter, &registry)?;

    let database = service.capabilities().database();
    database.migrate().map_err(|source| LaunchError::Migration {
        provider: service
            .capabilities()
            .provider(CapabilityKind::Database)
            .unwrap_or_default()
            .to_owned(),
        source,
    })?;

    info!(
        target: PROCESS_TARGET,
        urls = service.urls(),
        tls = service.tls().is_some(),
        "service ready"
    );
    let waited = shutdown.wait();
    service.shutdown();
    waited?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
