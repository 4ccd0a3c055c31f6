//! Resolver configuration.
//!
//! ```toml
//! dry_run_timeout_ms = 250
//! namespace = "6c1ea9b0-4d2f-5e37-9a81-03c47f5db2e6"
//! divergence = "first_match"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::signature::DEFAULT_NAMESPACE;

/// What to do when candidates with the matched shape disagree about ancestry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergencePolicy {
	/// Keep the first match and log the divergence.
	#[default]
	FirstMatch,
	/// Fail the speculation with [`crate::ResolveError::Divergence`].
	Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
	/// Upper bound on how long a dry run waits for its render to settle.
	pub dry_run_timeout_ms: u64,
	/// Namespace of fallback signatures.
	pub namespace: Uuid,
	pub divergence: DivergencePolicy,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			dry_run_timeout_ms: 250,
			namespace: DEFAULT_NAMESPACE,
			divergence: DivergencePolicy::default(),
		}
	}
}

impl ResolverConfig {
	pub fn dry_run_timeout(&self) -> Duration {
		Duration::from_millis(self.dry_run_timeout_ms)
	}

	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	pub(crate) fn validate(&self) -> Result<(), ConfigError> {
		if self.dry_run_timeout_ms == 0 {
			return Err(ConfigError::InvalidValue {
				field: "dry_run_timeout_ms",
				reason: "must be greater than zero".to_string(),
			});
		}
		if self.namespace.is_nil() {
			return Err(ConfigError::InvalidValue {
				field: "namespace",
				reason: "nil UUID cannot namespace fallback signatures".to_string(),
			});
		}
		Ok(())
	}
}
