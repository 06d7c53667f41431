//! Resolves the configuration root directory.
//!
//! Operators can point the service at a directory holding its configuration
//! file through `DEPOT_CONFIG_ROOT`. The root only supplies a default file
//! location: an explicit `--config-path` flag or `DEPOT_CONFIG_PATH` variable
//! always wins, and a root without a `depot.toml` contributes nothing.

use std::env;
use std::ffi::{OsStr, OsString};

use camino::{Utf8Path, Utf8PathBuf};

/// Environment variable naming the configuration root directory.
pub const CONFIG_ROOT_ENV_VAR: &str = "DEPOT_CONFIG_ROOT";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV_VAR: &str = "DEPOT_CONFIG_PATH";

/// CLI flag naming an explicit configuration file.
pub const CONFIG_PATH_FLAG: &str = "--config-path";

/// File name looked up inside the configuration root.
pub const CONFIG_FILE_NAME: &str = "depot.toml";

const FALLBACK_PROGRAM_NAME: &str = "depotd";

/// Directory that holds the service configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRoot {
    dir: Utf8PathBuf,
}

impl ConfigRoot {
    /// Builds a root over the supplied directory.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reads the root from `DEPOT_CONFIG_ROOT`.
    ///
    /// Returns `None` when the variable is unset, empty, or not valid UTF-8.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let raw = env::var(CONFIG_ROOT_ENV_VAR).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self::new(trimmed))
    }

    /// Directory holding the configuration.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        self.dir.as_path()
    }

    /// Location of the configuration file inside the root.
    #[must_use]
    pub fn config_file(&self) -> Utf8PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Adds `--config-path <root>/depot.toml` to `args` when appropriate.
    ///
    /// The arguments are returned untouched when they already carry an
    /// explicit configuration path or when the root holds no configuration
    /// file. The flag is inserted directly after the program name so that the
    /// remaining arguments keep their positions.
    #[must_use]
    pub fn apply(&self, mut args: Vec<OsString>) -> Vec<OsString> {
        if has_config_path_flag(&args) {
            return args;
        }
        let file = self.config_file();
        if !file.is_file() {
            return args;
        }
        if args.is_empty() {
            args.push(OsString::from(FALLBACK_PROGRAM_NAME));
        }
        args.insert(1, OsString::from(file.as_str()));
        args.insert(1, OsString::from(CONFIG_PATH_FLAG));
        args
    }
}

/// Applies the root from the environment unless `DEPOT_CONFIG_PATH` is set.
#[must_use]
pub fn apply_env_root(args: Vec<OsString>) -> Vec<OsString> {
    if env::var_os(CONFIG_PATH_ENV_VAR).is_some() {
        return args;
    }
    match ConfigRoot::from_env() {
        Some(root) => root.apply(args),
        None => args,
    }
}

fn has_config_path_flag(args: &[OsString]) -> bool {
    args.iter().skip(1).any(|argument| is_config_path_flag(argument))
}

fn is_config_path_flag(argument: &OsStr) -> bool {
    let text = argument.to_string_lossy();
    text == CONFIG_PATH_FLAG
        || text
            .strip_prefix(CONFIG_PATH_FLAG)
            .is_some_and(|rest| rest.starts_with('='))
}
