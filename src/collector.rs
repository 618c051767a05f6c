//! Collector Layer
//!
//! Pluggable producers of survey metrics. Every collector receives a
//! [`MetricSender`] and emits zero or more metrics into it; the [`Registry`]
//! runs all registered collectors concurrently and fans their output into
//! one [`MetricSet`](crate::metric::MetricSet).
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for implementing metric producers
//! - [`Registry`]: Holds collectors and performs the concurrent gather pass
//! - [`BasicCollector`]: Built-in machine and OS facts
//! - [`ProgramCollector`]: Program name, version and installation guid
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use survey_client::{ConstMap, ProgramCollector, Registry, fields};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::with_defaults();
//! registry.register(ProgramCollector::new("demo", "1.0.0", None))?;
//! registry.register(ConstMap::new("usercnt_active", fields! { "type" => "int", "value" => 3 })?)?;
//!
//! let stats = registry.gather().await?;
//! println!("{}", serde_json::to_string_pretty(&stats)?);
//! # Ok(())
//! # }
//! ```

mod basic;
mod program;
#[cfg(feature = "prometheus")]
pub mod prometheus;
mod registry;
mod traits;

pub use basic::BasicCollector;
pub use program::{DEFAULT_PROGRAM_NAME, DEFAULT_PROGRAM_VERSION, ProgramCollector};
pub use registry::{MAX_GATHER_WORKERS, Registry, RegistryError};
pub use traits::{Collector, MetricSender};
