//! Speculative resolution through a detached render.
//!
//! # Role
//!
//! Ancestry can depend on state only known after mount, so a static walk
//! cannot always see which providers apply. A dry run renders the target once,
//! off-screen and inside an isolated scope, and observes what it resolves
//! against before anything is committed to the live tree.
//!
//! # Invariants
//!
//! - Each run has its own scope and detached root; both are gone when the run
//!   returns.
//! - Async globals are restored exactly once on every exit path, including a
//!   render failure and the run's future being dropped.
//! - Host failures never escape: they are logged and reflected in the
//!   completion path of the result.
//! - The result always carries at least one candidate.

mod context;
mod host;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

pub use context::DryRunContext;
use context::DryRunState;
pub use host::{AsyncGlobals, DetachedRoot, DetachedRootOptions, NoAsyncGlobals, RenderHost, RenderRequest, Restore};
use lineage_worker::{Completion, CompletionPath, TaskClass, settle_or_deadline};

use crate::candidate::{CandidateHit, EdgeHint, HitKey, ReportedHit};
use crate::gate::{Epoch, ResolutionGate};
use crate::ids::{DeclarationId, ScopeId};
use crate::providers::ProviderEntry;
use crate::registry::Scope;

/// How far a dry run's result can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
	/// Timed out, failed, or fell back to the caller's edge hint.
	Low,
	/// The render settled and reported its own candidates.
	High,
}

/// Outcome of one dry run.
#[derive(Debug, Clone)]
pub struct DryRunResult {
	/// Providers discovered by the detached render, by declaration id.
	pub providers: BTreeMap<DeclarationId, Vec<ProviderEntry>>,
	/// Candidates in report order; never empty.
	pub hits: Vec<ReportedHit>,
	/// The candidate the gate accepted, if any.
	pub matched: Option<ReportedHit>,
	pub completion: CompletionPath,
	pub confidence: Confidence,
	/// Gate epoch the run was started under.
	pub epoch: Option<Epoch>,
	/// `true` when `hits` holds only the candidate synthesized from the edge hint.
	pub from_edge_hint: bool,
}

impl DryRunResult {
	pub fn matched_hit(&self) -> Option<&CandidateHit> {
		self.matched.as_ref().map(|reported| &reported.hit)
	}
}

/// Root and global suppression of one run, released exactly once.
struct Teardown<R: DetachedRoot> {
	root: Option<R>,
	restore: Option<Restore>,
}

impl<R: DetachedRoot> Teardown<R> {
	fn new(restore: Restore) -> Self {
		Self {
			root: None,
			restore: Some(restore),
		}
	}

	async fn run(&mut self) {
		if let Some(mut root) = self.root.take() {
			root.unmount().await;
		}
		if let Some(restore) = self.restore.take() {
			restore();
		}
	}
}

impl<R: DetachedRoot> Drop for Teardown<R> {
	fn drop(&mut self) {
		// Only reached with pending work when the run's future was dropped mid-wait.
		drop(self.root.take());
		if let Some(restore) = self.restore.take() {
			tracing::warn!("dry_run.teardown.abandoned");
			restore();
		}
	}
}

/// Runs detached renders against one host.
pub struct DryRunController<H: RenderHost, G: AsyncGlobals> {
	host: H,
	globals: G,
	gate: Rc<RefCell<ResolutionGate>>,
	timeout: Duration,
	runs: Cell<u64>,
}

impl<H: RenderHost, G: AsyncGlobals> std::fmt::Debug for DryRunController<H, G> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DryRunController")
			.field("timeout", &self.timeout)
			.field("runs", &self.runs.get())
			.finish_non_exhaustive()
	}
}

impl<H: RenderHost, G: AsyncGlobals> DryRunController<H, G> {
	pub fn new(host: H, globals: G, gate: Rc<RefCell<ResolutionGate>>, timeout: Duration) -> Self {
		Self {
			host,
			globals,
			gate,
			timeout,
			runs: Cell::new(0),
		}
	}

	pub fn gate(&self) -> &Rc<RefCell<ResolutionGate>> {
		&self.gate
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Renders `component` once, detached, and reports what it resolved.
	///
	/// Waits until the host signals settlement or the timeout elapses,
	/// whichever is first. Positions reported by the host are matched against
	/// the gate epoch that was current for `scope` when the run started.
	pub async fn run_dry_run(&self, scope: &ScopeId, component: DeclarationId, props: H::Props, edge_hint: EdgeHint) -> DryRunResult {
		let run = self.runs.get() + 1;
		self.runs.set(run);
		let isolated = scope.isolated(run);
		let epoch = self.gate.borrow().current_epoch(scope);
		let state = Rc::new(RefCell::new(DryRunState::new(Scope::new(isolated.clone()))));
		let completion = Completion::new();
		let ctx = DryRunContext::new(scope.clone(), epoch, Rc::clone(&self.gate), Rc::downgrade(&state), completion.clone());

		tracing::debug!(
			scope = %scope,
			isolated = %isolated,
			component = %component,
			epoch = epoch.map(Epoch::get),
			"dry_run.start"
		);

		let mut teardown = Teardown::new(self.globals.disable());
		match self.host.create_detached_root(&DetachedRootOptions { scope: isolated.clone() }) {
			Ok(mut root) => {
				let request = RenderRequest {
					component: component.clone(),
					props,
				};
				if let Err(err) = root.render(request, ctx) {
					tracing::warn!(scope = %scope, component = %component, error = %err, "dry_run.render_failed");
					completion.complete(CompletionPath::Failed);
				}
				teardown.root = Some(root);
			}
			Err(err) => {
				tracing::warn!(scope = %scope, component = %component, error = %err, "dry_run.root_failed");
				completion.complete(CompletionPath::Failed);
			}
		}

		let path = settle_or_deadline(&completion, self.timeout, TaskClass::Speculative).await;
		teardown.run().await;

		let collected = state.borrow_mut().drain();
		drop(state);

		let from_edge_hint = collected.hits.is_empty();
		let hits = if from_edge_hint {
			vec![ReportedHit {
				hit: CandidateHit::from(edge_hint),
				key: HitKey::EdgeHint,
			}]
		} else {
			collected.hits
		};
		let confidence = if path == CompletionPath::Settled && !from_edge_hint {
			Confidence::High
		} else {
			Confidence::Low
		};

		tracing::debug!(
			scope = %scope,
			isolated = %isolated,
			path = path.as_str(),
			hits = hits.len(),
			matched = collected.matched.is_some(),
			confidence = ?confidence,
			"dry_run.complete"
		);

		DryRunResult {
			providers: collected.providers,
			hits,
			matched: collected.matched,
			completion: path,
			confidence,
			epoch,
			from_edge_hint,
		}
	}
}
