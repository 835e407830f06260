//! Configuration module for the reconciler
//!
//! This module provides configuration management including:
//! - Path resolution for contacts, caches and outputs
//! - Run settings (registry retry policy, matching thresholds)

pub mod paths;
pub mod settings;

pub use paths::ReconPaths;
pub use settings::{
    CompanyNamePolicy, LinkingSettings, MatchingSettings, RegistryProvider, RegistrySettings,
    Settings,
};
