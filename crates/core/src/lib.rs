//! Core types and configuration for the quantline system.
//!
//! This crate provides shared types used across all other crates:
//! - Record and update types (raw rows, normalized instrument updates, time groups)
//! - Date handling and numeric coercion
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, DataConfig, FeatureConfig, FeatureParams};
pub use error::{Error, Result};
pub use types::*;
