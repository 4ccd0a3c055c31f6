//! Error types for resolution and configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::ids::{ComponentKey, DeclarationId, InstanceId, ScopeId};

/// Errors surfaced to callers of the resolver.
///
/// Every variant is a caller contract violation or an explicit policy
/// rejection. Races (double release, stale epochs, late dry-run reports) are
/// absorbed silently and never reach this type.
#[derive(Debug, Error)]
pub enum ResolveError {
	/// An instance in an ancestor walk has no recorded declaration.
	#[error("instance {instance} has no recorded declaration id")]
	MissingDeclaration { instance: InstanceId },

	/// The host's parent links loop back onto an instance already walked.
	#[error("ancestor walk revisited instance {instance}")]
	AncestryCycle { instance: InstanceId },

	/// A provider walk referenced a component that was never declared.
	#[error("unknown component {key}")]
	UnknownComponent { key: ComponentKey },

	/// Candidates with the matched shape disagree about their ancestry.
	#[error("divergent candidate chains for {declaration}: {chains:?}")]
	Divergence { declaration: DeclarationId, chains: Vec<Vec<DeclarationId>> },

	#[error("scope {scope} is already open")]
	ScopeAlreadyOpen { scope: ScopeId },

	#[error("scope {scope} is not open")]
	UnknownScope { scope: ScopeId },

	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Errors loading resolver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A field parsed but holds an unusable value.
	#[error("invalid value for {field}: {reason}")]
	InvalidValue { field: &'static str, reason: String },
}

/// Failure reported by a render host.
///
/// Hosts return these from detached-root creation or rendering; the dry-run
/// controller contains them and never forwards them to the live tree.
#[derive(Debug, Clone, Error)]
#[error("render host failure: {message}")]
pub struct HostError {
	pub message: String,
}

impl HostError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
