pub mod bundle;
pub mod engine;
pub mod integrity;
pub mod pipeline;
pub mod report_parser;
pub mod report_writer;
pub mod resolver;
pub mod schedule;

pub use crate::domain::model::{Resolution, RunSummary, ScheduleSet};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Resolver, Storage};
pub use crate::utils::error::Result;
