//! Stable identity and provider resolution for re-rendered component trees.
//!
//! Every render re-creates component invocations. This crate gives each
//! invocation a logical identity that survives re-renders (per-frame ordinals
//! folded into cumulative [`Signature`]s), finds the live position a detached
//! speculative render corresponds to (the epoch-scoped [`ResolutionGate`] and
//! the [`dry_run`] controller), and orders the providers that apply to a
//! component ([`ComponentGraph::resolve`]).
//!
//! Everything is single-threaded. State lives in [`Scope`]s owned by the
//! caller; nothing is process-wide.

/// Ancestor walks over a host tree.
pub mod ancestry;
/// Candidate positions reported by speculative renders.
pub mod candidate;
/// Resolver configuration and TOML loading.
pub mod config;
/// Detached speculative renders.
pub mod dry_run;
/// Error types.
pub mod error;
/// Per-level state of a tree walk.
pub mod frame;
/// Epoch-scoped match gate.
pub mod gate;
/// Identifier types.
pub mod ids;
/// Keyed callback registration.
pub mod observer;
/// Provider entries and the component graph.
pub mod providers;
/// Scope-owned mapping tables.
pub mod registry;
/// Speculate-then-commit facade.
pub mod resolver;
/// Per-declaration ordinal allocation.
pub mod sequence;
/// Cumulative and fallback signatures.
pub mod signature;

pub use ancestry::{AncestorChain, HostTree, ParentRef, ancestor_chain};
pub use candidate::{CandidateHit, EdgeHint, HitKey, ReportedHit};
pub use config::{DivergencePolicy, ResolverConfig};
pub use dry_run::{
	AsyncGlobals, Confidence, DetachedRoot, DetachedRootOptions, DryRunContext, DryRunController, DryRunResult, NoAsyncGlobals,
	RenderHost, RenderRequest, Restore,
};
pub use error::{ConfigError, HostError, ResolveError, Result};
pub use frame::{DryRunMeta, NodePosition, ParentData, TreeFrame};
pub use gate::{Epoch, ResolutionGate};
pub use ids::{ClaimToken, ComponentKey, DeclarationId, InstanceId, ModuleId, Ordinal, ProviderId, ScopeId};
pub use lineage_worker::CompletionPath;
pub use observer::{Observers, SubscriptionId};
pub use providers::{ComponentGraph, ConfigFn, ModuleRef, ProviderEntry, ProviderKind, ResolvedProvider, upstream_modules};
pub use registry::{Registries, Scope, ScopeTable};
pub use resolver::{Resolution, Resolver, SpeculationRequest};
pub use sequence::{SequenceEntry, SequenceTable};
pub use signature::{FallbackSignature, Signature, children_sketch, extend, fallback_signature};
