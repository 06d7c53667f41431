//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ortho_config::OrthoError;
use tempfile::TempDir;

use depot_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader that keeps storage and credentials under a temporary directory.
pub struct TestConfigLoader {
    dir: TempDir,
    config: Config,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        let config = Config {
            storage_path: Some(utf8(&dir.path().join("packages"))),
            ..Config::default()
        };
        Self { dir, config }
    }

    /// Scratch directory owned by the loader.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Location used when TLS is enabled.
    #[must_use]
    pub fn credential_path(&self) -> PathBuf {
        self.dir.path().join("tls.pem")
    }

    /// Points `cert_location` at [`credential_path`](Self::credential_path).
    pub fn enable_tls(&mut self) {
        self.config.cert_location = Some(utf8(&self.credential_path()));
    }

    /// Applies an arbitrary change to the served configuration.
    pub fn update(&mut self, change: impl FnOnce(&mut Config)) {
        change(&mut self.config);
    }
}

impl Default for TestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that runs the layered merge over a fixed argument list.
///
/// Only the storage path is supplied, so every other setting comes from the
/// built-in defaults.
pub struct ArgsConfigLoader {
    dir: TempDir,
    args: Vec<OsString>,
}

impl ArgsConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        let args = vec![
            OsString::from("depotd"),
            OsString::from("--storage-path"),
            dir.path().join("packages").into_os_string(),
        ];
        Self { dir, args }
    }

    /// Scratch directory owned by the loader.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for ArgsConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for ArgsConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter(self.args.clone())
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("depotd"),
            OsString::from("--log-format"),
            OsString::from("xml"),
        ];
        Config::load_from_iter(args)
    }
}

fn utf8(path: &Path) -> String {
    path.to_str()
        .expect("temporary path was not valid UTF-8")
        .to_owned()
}
