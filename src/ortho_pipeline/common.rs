//! Common utilities module
//!
//! This module contains shared utilities used across the projection pipeline.

pub mod error;

pub use error::{ErrorKind, PipelineError, Result};
