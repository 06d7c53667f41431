//! Layered configuration shared by the depot service and its tests.
//!
//! [`Config`] merges, from lowest to highest precedence, built-in defaults, a
//! TOML file (`--config-path` or `DEPOT_CONFIG_PATH`, falling back to
//! `depot.toml` inside `DEPOT_CONFIG_ROOT`), `DEPOT_*` environment variables,
//! and command-line flags. The service captures the merged value once at
//! startup and treats it as an immutable snapshot from then on.
//!
//! The logging fields carry defaults into the merge itself so an empty
//! configuration still loads; the remaining fields are optional and their
//! accessors fall back to the values in [`defaults`].

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8Path;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub mod defaults;
mod logging;
mod root;

pub use defaults::{
    DEFAULT_DATABASE_TYPE, DEFAULT_LOG_FILTER, DEFAULT_SEARCH_TYPE, DEFAULT_STORAGE_PATH,
    DEFAULT_STORAGE_TYPE, default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use root::{
    CONFIG_FILE_NAME, CONFIG_PATH_ENV_VAR, CONFIG_PATH_FLAG, CONFIG_ROOT_ENV_VAR, ConfigRoot,
    apply_env_root,
};

/// Merged service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DEPOT")]
pub struct Config {
    /// Tracing filter expression, such as `info` or `depotd=debug`.
    #[ortho_config(default = default_log_filter_string())]
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Bind addresses handed to the host layer without interpretation.
    pub urls: Option<String>,
    /// Path to the PEM file holding the TLS certificate chain and key.
    pub cert_location: Option<String>,
    /// Name of the storage provider to activate.
    pub storage_type: Option<String>,
    /// Root directory for filesystem storage.
    pub storage_path: Option<String>,
    /// Name of the metadata database provider to activate.
    pub database_type: Option<String>,
    /// Name of the search provider to activate; also selects the indexer.
    pub search_type: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            urls: None,
            cert_location: None,
            storage_type: None,
            storage_path: None,
            database_type: None,
            search_type: None,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// `DEPOT_CONFIG_ROOT` is honoured before the layers are merged; see
    /// [`apply_env_root`].
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        let args: Vec<OsString> = std::env::args_os().collect();
        Self::load_from_iter(apply_env_root(args))
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the program name.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Bind addresses passed through to the host layer, if configured.
    #[must_use]
    pub fn urls(&self) -> Option<&str> {
        self.urls.as_deref().filter(|urls| !urls.trim().is_empty())
    }

    /// Credential file location; its presence enables hot-reloaded TLS.
    #[must_use]
    pub fn cert_location(&self) -> Option<&Utf8Path> {
        self.cert_location
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(Utf8Path::new)
    }

    /// Storage provider name.
    #[must_use]
    pub fn storage_type(&self) -> &str {
        self.storage_type.as_deref().unwrap_or(DEFAULT_STORAGE_TYPE)
    }

    /// Root directory for filesystem storage.
    #[must_use]
    pub fn storage_path(&self) -> &Utf8Path {
        Utf8Path::new(self.storage_path.as_deref().unwrap_or(DEFAULT_STORAGE_PATH))
    }

    /// Database provider name.
    #[must_use]
    pub fn database_type(&self) -> &str {
        self.database_type
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE_TYPE)
    }

    /// Search provider name.
    #[must_use]
    pub fn search_type(&self) -> &str {
        self.search_type.as_deref().unwrap_or(DEFAULT_SEARCH_TYPE)
    }

    /// Returns `true` when the storage type matches `name`, ignoring case.
    #[must_use]
    pub fn has_storage_type(&self, name: &str) -> bool {
        names_match(self.storage_type(), name)
    }

    /// Returns `true` when the database type matches `name`, ignoring case.
    #[must_use]
    pub fn has_database_type(&self, name: &str) -> bool {
        names_match(self.database_type(), name)
    }

    /// Returns `true` when the search type matches `name`, ignoring case.
    #[must_use]
    pub fn has_search_type(&self, name: &str) -> bool {
        names_match(self.search_type(), name)
    }
}

fn names_match(configured: &str, name: &str) -> bool {
    configured.trim().eq_ignore_ascii_case(name.trim())
}
