//! Configuration module for archive conversion
//!
//! This module provides the `ConvertConfig` struct and its type-safe builder
//! for configuring a conversion run with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{Complete, ConvertConfigBuilder, WithOutputDir};
pub use types::ConvertConfig;
