pub mod address;
pub mod apis;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod types;

pub use address::{decompose, AddressDecomposer, LocaleRegistry};
pub use error::{Result, ScraperError};
pub use pipeline::{FailurePolicy, Pipeline, PipelineRun};
pub use types::{Decomposition, FacilityRecord};
