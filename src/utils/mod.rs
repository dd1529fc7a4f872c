//! Utilities Module
//!
//! HTTP transport, bucketed caching and logging shared by the pipeline.

mod cache;
mod http;
pub mod logging;

pub use cache::*;
pub use http::*;
