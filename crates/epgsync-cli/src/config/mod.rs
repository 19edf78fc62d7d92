//! Application configuration module.
//!
//! Manages the TOML config file holding fetch defaults, per-provider
//! overrides, and channel mappings.

#[allow(clippy::module_inception)]
mod config;
mod paths;

#[allow(clippy::module_name_repetitions)]
pub use config::{AppConfig, ChannelEntry, FetchConfig};
pub use paths::resolve_config_path;
