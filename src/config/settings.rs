//! Run settings for the reconciler
//!
//! Everything that used to be a hard-coded constant in the matching path
//! (retry counts, thresholds, the registry provider) lives here and is passed
//! into the engine explicitly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::ReconPaths;
use crate::error::ReconError;

/// Partial identifiers shorter than this can never match by suffix or substring
pub const MIN_PARTIAL_DIGITS_FLOOR: usize = 3;

/// Longest accepted backoff or inter-call delay, in seconds
pub const MAX_DELAY_SECONDS: f64 = 3600.0;

/// Which upstream company registry to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistryProvider {
    /// api.cnpja.com (requires an API key)
    #[default]
    Cnpja,
    /// brasilapi.com.br (public)
    BrasilApi,
}

/// How company payee names are compared against contact names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompanyNamePolicy {
    /// Same overlap rule as people (default)
    #[default]
    TokenOverlap,
    /// Names of two tokens or fewer must be a token subset of the other side
    ShortNameSubset,
}

/// Registry client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Upstream provider
    pub provider: RegistryProvider,
    /// Environment variable holding the provider API key
    pub api_key_env: String,
    /// Override for the provider base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Attempts per identifier before giving up
    pub max_retries: u32,
    /// Pause between attempts for the same identifier
    pub backoff_seconds: f64,
    /// Pause between distinct identifiers in a batch
    pub inter_call_delay_seconds: f64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            provider: RegistryProvider::default(),
            api_key_env: "CNPJA_API_KEY".to_string(),
            base_url: None,
            timeout_seconds: 10,
            max_retries: 3,
            backoff_seconds: 3.0,
            inter_call_delay_seconds: 2.0,
        }
    }
}

impl RegistrySettings {
    /// Backoff as a Duration
    pub fn backoff(&self) -> Duration {
        bounded_delay(self.backoff_seconds)
    }

    /// Inter-call delay as a Duration
    pub fn inter_call_delay(&self) -> Duration {
        bounded_delay(self.inter_call_delay_seconds)
    }
}

// NaN.max(0.0) is 0.0, so the result is always a valid Duration
fn bounded_delay(seconds: f64) -> Duration {
    Duration::from_secs_f64(seconds.max(0.0).min(MAX_DELAY_SECONDS))
}

fn check_delay(name: &str, seconds: f64) -> Result<(), ReconError> {
    if seconds.is_finite() && (0.0..=MAX_DELAY_SECONDS).contains(&seconds) {
        Ok(())
    } else {
        Err(ReconError::Config(format!(
            "registry.{} must be between 0 and {} seconds, got {}",
            name, MAX_DELAY_SECONDS, seconds
        )))
    }
}

/// Matching thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// Tokens of this length or shorter are discarded
    pub min_token_length: usize,
    /// Required token overlap for person names
    pub person_min_overlap: usize,
    /// Required token overlap for company names
    pub company_min_overlap: usize,
    /// Company comparison policy
    pub company_policy: CompanyNamePolicy,
    /// Partial identifiers shorter than this never match
    pub min_partial_digits: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            min_token_length: 2,
            person_min_overlap: 2,
            company_min_overlap: 2,
            company_policy: CompanyNamePolicy::default(),
            min_partial_digits: 4,
        }
    }
}

/// Link discovery and enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingSettings {
    /// Required token overlap for a candidate link
    pub min_tokens: usize,
    /// Create contacts for registry companies missing from the directory
    pub create_missing_companies: bool,
}

impl Default for LinkingSettings {
    fn default() -> Self {
        Self {
            min_tokens: 2,
            create_missing_companies: true,
        }
    }
}

/// User settings for the reconciler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub matching: MatchingSettings,

    #[serde(default)]
    pub linking: LinkingSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &ReconPaths) -> Result<Self, ReconError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| ReconError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                ReconError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &ReconPaths) -> Result<(), ReconError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ReconError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| ReconError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Reject settings that would make every lookup or match degenerate
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.registry.max_retries == 0 {
            return Err(ReconError::Config(
                "registry.max_retries must be at least 1".into(),
            ));
        }
        if self.matching.person_min_overlap == 0 || self.matching.company_min_overlap == 0 {
            return Err(ReconError::Config(
                "name overlap thresholds must be at least 1".into(),
            ));
        }
        if self.matching.min_partial_digits < MIN_PARTIAL_DIGITS_FLOOR {
            return Err(ReconError::Config(format!(
                "matching.min_partial_digits must be at least {}",
                MIN_PARTIAL_DIGITS_FLOOR
            )));
        }
        check_delay("backoff_seconds", self.registry.backoff_seconds)?;
        check_delay("inter_call_delay_seconds", self.registry.inter_call_delay_seconds)?;
        if self.linking.min_tokens == 0 {
            return Err(ReconError::Config("linking.min_tokens must be at least 1".into()));
        }
        Ok(())
    }
}
