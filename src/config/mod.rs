#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{BundleArgs, Cli, Command, LogFormat, RunArgs};
pub use toml_config::{ConfigSource, SatLinkConfig};
