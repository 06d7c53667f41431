//! Test providers that record how bootstrap and launch use them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use depot_config::Config;

use crate::builtin::builtin_registry;
use crate::capability::{CapabilityError, PackageDatabase};
use crate::providers::{ProviderDescriptor, ProviderRegistry};

/// Database type selecting [`CountingDatabase`].
pub const COUNTING_DATABASE: &str = "Counting";

/// Database that counts migrations and can be told to fail them.
#[derive(Debug, Default)]
pub struct CountingDatabase {
    migrations: AtomicUsize,
    failing: bool,
}

impl CountingDatabase {
    /// Builds a database whose migrations always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            migrations: AtomicUsize::new(0),
            failing: true,
        }
    }

    /// Number of migration attempts.
    #[must_use]
    pub fn migrations(&self) -> usize {
        self.migrations.load(Ordering::SeqCst)
    }
}

impl PackageDatabase for CountingDatabase {
    fn migrate(&self) -> Result<(), CapabilityError> {
        self.migrations.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(CapabilityError::Unavailable {
                message: "schema locked".to_owned(),
            });
        }
        Ok(())
    }

    fn package_exists(&self, _id: &str, _version: &str) -> Result<bool, CapabilityError> {
        Ok(false)
    }
}

/// Built-in registry plus `database`, active for [`COUNTING_DATABASE`].
#[must_use]
pub fn registry_with_database(database: &Arc<CountingDatabase>) -> ProviderRegistry {
    let mut registry = builtin_registry();
    let shared = Arc::clone(database);
    registry.register(ProviderDescriptor::<dyn PackageDatabase>::new(
        COUNTING_DATABASE,
        |config: &Config| config.has_database_type(COUNTING_DATABASE),
        move |_config: &Config| {
            let instance: Arc<dyn PackageDatabase> = shared.clone();
            Ok(instance)
        },
    ));
    registry
}
