//! Config module.
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_data_dir, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{LoadResult, create_template_config, load_config_from_xml_path, load_or_init};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DATUM_CONFIG";

/// Tenant used when neither the config file nor the command line names one.
pub const DEFAULT_TENANT: &str = "default";
