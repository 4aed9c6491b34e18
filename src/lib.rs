pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::LocalStorage;
pub use config::{ConfigSource, SatLinkConfig};
pub use core::{engine::LinkEngine, pipeline::SchedulePipeline};
pub use utils::error::{Result, SatLinkError};
