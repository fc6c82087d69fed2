//! # Krishi Common Library
//!
//! Shared code for the Krishi crop-disease services:
//! - Error and result types
//! - Bootstrap configuration loading (TOML + environment)
//! - Root folder resolution
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
