use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use lineage_worker::{Completion, CompletionPath};

use crate::ancestry::{ParentRef, ancestor_chain};
use crate::candidate::{CandidateHit, HitKey, ReportedHit};
use crate::error::{ResolveError, Result};
use crate::gate::{Epoch, ResolutionGate};
use crate::ids::{DeclarationId, InstanceId, Ordinal, ScopeId};
use crate::providers::ProviderEntry;
use crate::registry::Scope;
use crate::signature::{self, FallbackSignature, Signature};

/// Everything a dry run accumulates inside its isolated scope.
#[derive(Debug)]
pub(crate) struct DryRunState {
	pub(crate) scope: Scope,
	pub(crate) hits: Vec<ReportedHit>,
	pub(crate) matched: Option<usize>,
}

/// What the controller keeps after the isolated scope is disposed.
#[derive(Debug, Default)]
pub(crate) struct Collected {
	pub(crate) hits: Vec<ReportedHit>,
	pub(crate) matched: Option<ReportedHit>,
	pub(crate) providers: BTreeMap<DeclarationId, Vec<ProviderEntry>>,
}

impl DryRunState {
	pub(crate) fn new(scope: Scope) -> Self {
		Self {
			scope,
			hits: Vec::new(),
			matched: None,
		}
	}

	pub(crate) fn drain(&mut self) -> Collected {
		let hits = std::mem::take(&mut self.hits);
		let matched = self.matched.take().and_then(|index| hits.get(index).cloned());
		Collected {
			hits,
			matched,
			providers: self.scope.registries_mut().take_providers(),
		}
	}
}

/// Reporting handle given to the host for one detached render.
///
/// The handle holds only a weak reference to the isolated scope. Reports made
/// after the run completed, or after the scope was disposed, are dropped.
#[derive(Clone)]
pub struct DryRunContext {
	scope_id: ScopeId,
	epoch: Option<Epoch>,
	gate: Rc<RefCell<ResolutionGate>>,
	state: Weak<RefCell<DryRunState>>,
	completion: Completion,
}

impl std::fmt::Debug for DryRunContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DryRunContext")
			.field("scope_id", &self.scope_id)
			.field("epoch", &self.epoch)
			.field("completion", &self.completion.path())
			.finish_non_exhaustive()
	}
}

impl DryRunContext {
	pub(crate) fn new(
		scope_id: ScopeId,
		epoch: Option<Epoch>,
		gate: Rc<RefCell<ResolutionGate>>,
		state: Weak<RefCell<DryRunState>>,
		completion: Completion,
	) -> Self {
		Self {
			scope_id,
			epoch,
			gate,
			state,
			completion,
		}
	}

	/// Gate scope this dry run resolves for.
	pub fn scope_id(&self) -> &ScopeId {
		&self.scope_id
	}

	/// Id of the isolated scope, while it is still alive.
	pub fn isolated_scope_id(&self) -> Option<ScopeId> {
		self.state.upgrade().map(|state| state.borrow().scope.id().clone())
	}

	pub fn namespace(&self) -> uuid::Uuid {
		*self.gate.borrow().namespace()
	}

	fn accepting(&self) -> Option<Rc<RefCell<DryRunState>>> {
		if self.completion.is_complete() {
			tracing::trace!(scope = %self.scope_id, "dry_run.report.late");
			return None;
		}
		self.state.upgrade()
	}

	/// Whether the gate epoch this run was started under is still current.
	fn epoch_current(&self) -> bool {
		self.epoch.is_some() && self.gate.borrow().current_epoch(&self.scope_id) == self.epoch
	}

	/// Records a candidate and matches its signature against the gate.
	pub fn offer(&self, hit: CandidateHit, signature: Signature) -> bool {
		let Some(state) = self.accepting() else {
			return false;
		};
		let matched = self.epoch_current() && self.gate.borrow_mut().mark(&self.scope_id, signature);
		Self::record(&state, hit, HitKey::Signature(signature), matched);
		matched
	}

	/// Offers a registered instance, deriving its ancestry from the isolated scope.
	///
	/// Fails when the instance, or one of its ancestors, was never registered
	/// through [`Self::register_instance`]. Returns `Ok(false)` for late reports.
	pub fn offer_instance(&self, instance: &InstanceId, signature: Signature, children_sketch: Signature) -> Result<bool> {
		let Some(state) = self.accepting() else {
			return Ok(false);
		};
		let hit = {
			let state = state.borrow();
			let registries = state.scope.registries();
			let mut ancestry = ancestor_chain(registries, instance)?;
			let declaration_id = ancestry
				.declarations
				.pop()
				.ok_or_else(|| ResolveError::MissingDeclaration { instance: instance.clone() })?;
			CandidateHit {
				declaration_id,
				instance_id: Some(instance.clone()),
				children_sketch,
				depth: i32::try_from(ancestry.declarations.len()).unwrap_or(i32::MAX),
				chain: ancestry.declarations,
				has_descendent: registries.has_children(instance),
			}
		};
		Ok(self.offer(hit, signature))
	}

	/// Records a candidate and matches its fallback signature against the gate.
	pub fn offer_fallback(&self, hit: CandidateHit, ordinal: Ordinal) -> bool {
		let Some(state) = self.accepting() else {
			return false;
		};
		let matched = self.epoch_current()
			&& self
				.gate
				.borrow_mut()
				.mark_fallback(&self.scope_id, &hit.declaration_id, ordinal, hit.children_sketch);
		let key = HitKey::Fallback(signature::fallback_signature(&hit.declaration_id, ordinal, hit.children_sketch, &self.namespace()));
		Self::record(&state, hit, key, matched);
		matched
	}

	fn record(state: &Rc<RefCell<DryRunState>>, hit: CandidateHit, key: HitKey, matched: bool) {
		let mut state = state.borrow_mut();
		let index = state.hits.len();
		state.hits.push(ReportedHit { hit, key });
		if matched {
			state.matched = Some(index);
		}
	}

	/// Attaches the fallback target once enough of the subtree is known.
	pub fn set_fallback(&self, fallback: FallbackSignature) {
		if self.epoch_current() {
			self.gate.borrow_mut().set_fallback(&self.scope_id, fallback);
		}
	}

	/// Whether the host can stop evaluating further siblings.
	pub fn should_prune(&self) -> bool {
		if self.completion.is_complete() {
			return true;
		}
		match self.epoch {
			Some(_) => !self.epoch_current() || self.gate.borrow().should_prune(&self.scope_id),
			None => false,
		}
	}

	/// Registers an instance mounted by the detached render in the isolated scope.
	pub fn register_instance(&self, instance: InstanceId, declaration: DeclarationId, parent: ParentRef) {
		if let Some(state) = self.accepting() {
			state.borrow_mut().scope.registries_mut().register_instance(instance, declaration, parent);
		}
	}

	/// Records the providers the detached render resolved for `declaration`.
	pub fn record_providers(&self, declaration: DeclarationId, providers: Vec<ProviderEntry>) {
		if let Some(state) = self.accepting() {
			state.borrow_mut().scope.publish_providers(declaration, providers);
		}
	}

	/// Signals that the detached render committed. Returns `false` if the run had already completed.
	pub fn settled(&self) -> bool {
		self.completion.complete(CompletionPath::Settled)
	}
}
