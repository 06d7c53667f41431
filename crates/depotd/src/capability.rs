//! Pluggable capabilities the service selects providers for.
//!
//! Each capability is an object-safe trait implemented by an external
//! backend. [`CapabilityKind`] names the capability at runtime, while the
//! [`Capability`] trait ties each trait object type to its kind and to its
//! ordered slot in the [`ProviderRegistry`](crate::ProviderRegistry).

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::providers::{ProviderDescriptor, ProviderRegistry};

/// Capabilities the service resolves a provider for at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKind {
    /// Package content storage.
    Storage,
    /// Package metadata database.
    Database,
    /// Search queries.
    Search,
    /// Search index maintenance.
    Indexer,
}

impl CapabilityKind {
    /// Every kind, in the order bootstrap resolves them.
    pub const ALL: [Self; 4] = [Self::Storage, Self::Database, Self::Search, Self::Indexer];

    /// Stable lower-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Database => "database",
            Self::Search => "search",
            Self::Indexer => "indexer",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when parsing a capability kind fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported capability kind: {0}")]
pub struct CapabilityKindParseError(String);

impl CapabilityKindParseError {
    /// Creates a parse error describing the unsupported value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the offending value that could not be parsed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for CapabilityKind {
    type Err = CapabilityKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "storage" => Ok(Self::Storage),
            "database" => Ok(Self::Database),
            "search" => Ok(Self::Search),
            "indexer" => Ok(Self::Indexer),
            other => Err(CapabilityKindParseError::new(other)),
        }
    }
}

/// Failures reported by capability implementations.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Filesystem access failed.
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A storage key tried to escape the storage root.
    #[error("invalid storage path '{path}'")]
    InvalidPath {
        /// Rejected key.
        path: String,
    },
    /// The backend could not serve the request.
    #[error("{message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

/// Stores package content addressed by relative paths.
pub trait StorageService: Send + Sync + fmt::Debug {
    /// Writes `content` at `path`, replacing any existing content.
    fn put(&self, path: &str, content: &[u8]) -> Result<(), CapabilityError>;

    /// Reads the content stored at `path`, or `None` when absent.
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>, CapabilityError>;

    /// Removes the content stored at `path`. Removing absent content succeeds.
    fn delete(&self, path: &str) -> Result<(), CapabilityError>;
}

/// Persists package metadata.
pub trait PackageDatabase: Send + Sync + fmt::Debug {
    /// Brings the schema up to date. Called once before serving traffic.
    fn migrate(&self) -> Result<(), CapabilityError>;

    /// Returns `true` when the package version is known.
    fn package_exists(&self, id: &str, version: &str) -> Result<bool, CapabilityError>;
}

/// Answers package search queries.
pub trait SearchService: Send + Sync + fmt::Debug {
    /// Returns identifiers of packages matching `query`.
    fn search(&self, query: &str) -> Result<Vec<String>, CapabilityError>;
}

/// Keeps the search index in step with newly published packages.
pub trait SearchIndexer: Send + Sync + fmt::Debug {
    /// Indexes the package with the supplied identifier.
    fn index(&self, package_id: &str) -> Result<(), CapabilityError>;
}

/// Links a capability trait object to its kind and registry slot.
///
/// Implemented for `dyn StorageService`, `dyn PackageDatabase`,
/// `dyn SearchService` and `dyn SearchIndexer`. The slot accessors let the
/// registry keep one ordered, strongly typed descriptor list per kind.
pub trait Capability: Send + Sync + 'static {
    /// Kind tag for this capability.
    const KIND: CapabilityKind;

    /// Ordered descriptors registered for this capability.
    fn slot(registry: &ProviderRegistry) -> &[ProviderDescriptor<Self>];

    /// Mutable access to the descriptor list, used during registration.
    fn slot_mut(registry: &mut ProviderRegistry) -> &mut Vec<ProviderDescriptor<Self>>;
}

impl Capability for dyn StorageService {
    const KIND: CapabilityKind = CapabilityKind::Storage;

    fn slot(registry: &ProviderRegistry) -> &[ProviderDescriptor<Self>] {
        &registry.storage
    }

    fn slot_mut(registry: &mut ProviderRegistry) -> &mut Vec<ProviderDescriptor<Self>> {
        &mut registry.storage
    }
}

impl Capability for dyn PackageDatabase {
    const KIND: CapabilityKind = CapabilityKind::Database;

    fn slot(registry: &ProviderRegistry) -> &[ProviderDescriptor<Self>] {
        &registry.database
    }

    fn slot_mut(registry: &mut ProviderRegistry) -> &mut Vec<ProviderDescriptor<Self>> {
        &mut registry.database
    }
}

impl Capability for dyn SearchService {
    const KIND: CapabilityKind = CapabilityKind::Search;

    fn slot(registry: &ProviderRegistry) -> &[ProviderDescriptor<Self>] {
        &registry.search
    }

    fn slot_mut(registry: &mut ProviderRegistry) -> &mut Vec<ProviderDescriptor<Self>> {
        &mut registry.search
    }
}

impl Capability for dyn SearchIndexer {
    const KIND: CapabilityKind = CapabilityKind::Indexer;

    fn slot(registry: &ProviderRegistry) -> &[ProviderDescriptor<Self>] {
        &registry.indexer
    }

    fn slot_mut(registry: &mut ProviderRegistry) -> &mut Vec<ProviderDescriptor<Self>> {
        &mut registry.indexer
    }
}
