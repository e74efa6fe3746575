//! # Ragam Common Library
//!
//! Shared code for the ragam services:
//! - Common error type
//! - Configuration file discovery and layered setting resolution
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
