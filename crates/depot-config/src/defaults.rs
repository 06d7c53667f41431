use crate::logging::LogFormat;

/// Default log filter expression used by the service.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Storage provider selected when the configuration names none.
pub const DEFAULT_STORAGE_TYPE: &str = "FileSystem";

/// Directory used by filesystem storage when no path is configured.
pub const DEFAULT_STORAGE_PATH: &str = "packages";

/// Database provider selected when the configuration names none.
pub const DEFAULT_DATABASE_TYPE: &str = "Null";

/// Search provider selected when the configuration names none.
pub const DEFAULT_SEARCH_TYPE: &str = "Null";

/// Default log filter expression used by the service.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value for the configuration merge.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the service.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
