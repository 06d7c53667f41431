//! Providers shipped with the service binary.
//!
//! The filesystem storage provider is usable as-is. The `Null` database,
//! search and indexer providers let a default configuration boot without
//! external services; they accept every call and keep no state.

use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use depot_config::Config;

use crate::capability::{
    CapabilityError, PackageDatabase, SearchIndexer, SearchService, StorageService,
};
use crate::providers::{ProviderDescriptor, ProviderError, ProviderRegistry};

const BUILTIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::providers::builtin");

/// Name of the filesystem storage provider.
pub const FILESYSTEM_PROVIDER: &str = "FileSystem";
/// Name shared by the no-op database, search and indexer providers.
pub const NULL_PROVIDER: &str = "Null";

/// Stores package content beneath a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: Utf8PathBuf,
}

impl FileSystemStorage {
    /// Opens storage rooted at `root`, creating the directory when absent.
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self, CapabilityError> {
        let directory = root.into();
        fs::create_dir_all(&directory).map_err(|source| io_error(&directory, source))?;
        Ok(Self { root: directory })
    }

    /// Directory holding stored content.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        self.root.as_path()
    }

    fn locate(&self, key: &str) -> Result<Utf8PathBuf, CapabilityError> {
        let relative = Utf8Path::new(key);
        let contained = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Utf8Component::Normal(_)));
        if contained {
            Ok(self.root.join(relative))
        } else {
            Err(CapabilityError::InvalidPath {
                path: key.to_owned(),
            })
        }
    }
}

fn io_error(path: &Utf8Path, source: io::Error) -> CapabilityError {
    CapabilityError::Io {
        path: path.as_std_path().to_path_buf(),
        source,
    }
}

impl StorageService for FileSystemStorage {
    fn put(&self, path: &str, content: &[u8]) -> Result<(), CapabilityError> {
        let target = self.locate(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        fs::write(&target, content).map_err(|source| io_error(&target, source))
    }

    fn get(&self, path: &str) -> Result<Option<Vec<u8>>, CapabilityError> {
        let target = self.locate(path)?;
        match fs::read(&target) {
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error(&target, error)),
        }
    }

    fn delete(&self, path: &str) -> Result<(), CapabilityError> {
        let target = self.locate(path)?;
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(&target, error)),
        }
    }
}

/// Database that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDatabase;

impl PackageDatabase for NullDatabase {
    fn migrate(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn package_exists(&self, _id: &str, _version: &str) -> Result<bool, CapabilityError> {
        Ok(false)
    }
}

/// Search that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSearch;

impl SearchService for NullSearch {
    fn search(&self, _query: &str) -> Result<Vec<String>, CapabilityError> {
        Ok(Vec::new())
    }
}

impl SearchIndexer for NullSearch {
    fn index(&self, _package_id: &str) -> Result<(), CapabilityError> {
        Ok(())
    }
}

fn warn_null(capability: &str) {
    tracing::warn!(
        target: BUILTIN_TARGET,
        capability,
        "no {capability} backend configured; using the null provider"
    );
}

/// Registry holding the providers shipped with the binary.
///
/// Extra providers registered afterwards are consulted only when the built-in
/// ones decline the configuration.
#[must_use]
pub fn builtin_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry
        .register(ProviderDescriptor::<dyn StorageService>::new(
            FILESYSTEM_PROVIDER,
            |config: &Config| config.has_storage_type(FILESYSTEM_PROVIDER),
            |config: &Config| {
                let root = config.storage_path();
                let storage = FileSystemStorage::open(root).map_err(|error| {
                    ProviderError::with_source(
                        format!("cannot open storage root '{root}'"),
                        error,
                    )
                })?;
                let service: Arc<dyn StorageService> = Arc::new(storage);
                Ok(service)
            },
        ))
        .register(ProviderDescriptor::<dyn PackageDatabase>::new(
            NULL_PROVIDER,
            |config: &Config| config.has_database_type(NULL_PROVIDER),
            |_config: &Config| {
                warn_null("database");
                let database: Arc<dyn PackageDatabase> = Arc::new(NullDatabase);
                Ok(database)
            },
        ))
        .register(ProviderDescriptor::<dyn SearchService>::new(
            NULL_PROVIDER,
            |config: &Config| config.has_search_type(NULL_PROVIDER),
            |_config: &Config| {
                warn_null("search");
                let search: Arc<dyn SearchService> = Arc::new(NullSearch);
                Ok(search)
            },
        ))
        .register(ProviderDescriptor::<dyn SearchIndexer>::new(
            NULL_PROVIDER,
            |config: &Config| config.has_search_type(NULL_PROVIDER),
            |_config: &Config| {
                let indexer: Arc<dyn SearchIndexer> = Arc::new(NullSearch);
                Ok(indexer)
            },
        ));
    registry
}
