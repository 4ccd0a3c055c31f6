//! Epoch-scoped matcher between live positions and dry-run candidates.
//!
//! # Role
//!
//! A speculative render runs asynchronously relative to the live tree, so a
//! new render may start another resolution attempt before the previous one
//! reports back. Each attempt gets an [`Epoch`]; only the current epoch of a
//! scope can be matched or ended.
//!
//! # Invariants
//!
//! - `begin` always supersedes whatever the scope held before.
//! - The first successful `mark`/`mark_fallback` in an epoch is sticky; every
//!   later attempt in that epoch is rejected.
//! - `end` with a stale epoch leaves the current state untouched.
//! - Epochs come from one gate-wide counter and are never reused.

use std::fmt;

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::ids::{DeclarationId, Ordinal, ScopeId};
use crate::signature::{self, FallbackSignature, Signature};

/// Generation of one resolution attempt within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(u64);

impl Epoch {
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for Epoch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone)]
struct GateState {
	epoch: Epoch,
	target: Signature,
	hit: bool,
	fallback_target: Option<FallbackSignature>,
}

/// Per-scope resolution state machine.
#[derive(Debug)]
pub struct ResolutionGate {
	namespace: Uuid,
	next_epoch: u64,
	scopes: FxHashMap<ScopeId, GateState>,
}

impl Default for ResolutionGate {
	fn default() -> Self {
		Self::new(signature::DEFAULT_NAMESPACE)
	}
}

impl ResolutionGate {
	/// Creates a gate computing fallback signatures in `namespace`.
	pub fn new(namespace: Uuid) -> Self {
		Self {
			namespace,
			next_epoch: 0,
			scopes: FxHashMap::default(),
		}
	}

	pub fn namespace(&self) -> &Uuid {
		&self.namespace
	}

	/// Starts a new attempt for `scope`, abandoning any previous one.
	pub fn begin(&mut self, scope: &ScopeId, target: Signature, fallback: Option<FallbackSignature>) -> Epoch {
		self.next_epoch += 1;
		let epoch = Epoch(self.next_epoch);
		let previous = self.scopes.insert(
			scope.clone(),
			GateState {
				epoch,
				target,
				hit: false,
				fallback_target: fallback,
			},
		);
		tracing::trace!(
			scope = %scope,
			epoch = epoch.get(),
			target = %target,
			superseded = previous.map(|state| state.epoch.get()),
			"gate.begin"
		);
		epoch
	}

	/// Matches `candidate` against the scope's target.
	pub fn mark(&mut self, scope: &ScopeId, candidate: Signature) -> bool {
		let Some(state) = self.scopes.get_mut(scope) else {
			return false;
		};
		if state.hit || candidate != state.target {
			return false;
		}
		state.hit = true;
		tracing::trace!(scope = %scope, epoch = state.epoch.get(), "gate.mark");
		true
	}

	/// Matches the fallback signature of `(declaration, ordinal, sketch)` against the scope's fallback target.
	pub fn mark_fallback(&mut self, scope: &ScopeId, declaration: &DeclarationId, ordinal: Ordinal, children_sketch: Signature) -> bool {
		let Some(state) = self.scopes.get_mut(scope) else {
			return false;
		};
		let Some(expected) = state.fallback_target else {
			return false;
		};
		if state.hit {
			return false;
		}
		if signature::fallback_signature(declaration, ordinal, children_sketch, &self.namespace) != expected {
			return false;
		}
		state.hit = true;
		tracing::trace!(scope = %scope, epoch = state.epoch.get(), "gate.mark_fallback");
		true
	}

	/// Attaches or replaces the fallback target of an active scope.
	pub fn set_fallback(&mut self, scope: &ScopeId, fallback: FallbackSignature) {
		if let Some(state) = self.scopes.get_mut(scope) {
			state.fallback_target = Some(fallback);
		}
	}

	/// Whether the scope already found its match and speculation can stop.
	pub fn should_prune(&self, scope: &ScopeId) -> bool {
		self.scopes.get(scope).is_some_and(|state| state.hit)
	}

	/// Clears the scope if `epoch` is still its current attempt.
	pub fn end(&mut self, scope: &ScopeId, epoch: Epoch) {
		match self.scopes.get(scope) {
			Some(state) if state.epoch == epoch => {
				self.scopes.remove(scope);
				tracing::trace!(scope = %scope, epoch = epoch.get(), "gate.end");
			}
			Some(state) => {
				tracing::trace!(scope = %scope, epoch = epoch.get(), current = state.epoch.get(), "gate.end.stale");
			}
			None => {}
		}
	}

	pub fn current_epoch(&self, scope: &ScopeId) -> Option<Epoch> {
		self.scopes.get(scope).map(|state| state.epoch)
	}

	pub fn is_active(&self, scope: &ScopeId) -> bool {
		self.scopes.contains_key(scope)
	}
}
