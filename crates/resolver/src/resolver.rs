//! Speculate-then-commit entrypoint tying the engine together.
//!
//! A [`Resolver`] owns the gate, the dry-run controller, and the open scopes.
//! [`Resolver::speculate`] runs one gated dry run and checks its candidates
//! for divergence; [`Resolver::commit`] resolves the provider chain for the
//! chosen component and records it in a live scope.

use std::cell::RefCell;
use std::rc::Rc;

use crate::candidate::{CandidateHit, EdgeHint, ReportedHit};
use crate::config::{DivergencePolicy, ResolverConfig};
use crate::dry_run::{AsyncGlobals, Confidence, DryRunController, DryRunResult, RenderHost};
use crate::error::{ResolveError, Result};
use crate::gate::{Epoch, ResolutionGate};
use crate::ids::{ComponentKey, DeclarationId, InstanceId, ScopeId};
use crate::providers::{ComponentGraph, ProviderEntry, ResolvedProvider, upstream_modules};
use crate::registry::{Scope, ScopeTable};
use crate::signature::{FallbackSignature, Signature};

/// Input of one speculative resolution.
#[derive(Debug, Clone)]
pub struct SpeculationRequest<P> {
	/// Gate scope to resolve within.
	pub scope: ScopeId,
	pub component: DeclarationId,
	pub props: P,
	/// Cumulative signature of the live position being resolved.
	pub target: Signature,
	pub fallback: Option<FallbackSignature>,
	pub edge_hint: EdgeHint,
}

/// Outcome of [`Resolver::speculate`].
#[derive(Debug, Clone)]
pub struct Resolution {
	pub scope: ScopeId,
	pub epoch: Epoch,
	pub dry_run: DryRunResult,
	/// Chains of candidates reported under the matched identity but a different ancestry, in report order.
	pub divergent: Vec<Vec<DeclarationId>>,
}

impl Resolution {
	pub fn matched(&self) -> Option<&CandidateHit> {
		self.dry_run.matched_hit()
	}

	/// The candidate the resolution settles on: the gate match, else the first hit.
	pub fn chosen(&self) -> Option<&CandidateHit> {
		self.matched().or_else(|| self.dry_run.hits.first().map(|reported| &reported.hit))
	}

	pub fn confidence(&self) -> Confidence {
		self.dry_run.confidence
	}
}

/// Ends the epoch on drop, so an abandoned speculation never leaves the gate active.
struct EpochGuard {
	gate: Rc<RefCell<ResolutionGate>>,
	scope: ScopeId,
	epoch: Epoch,
}

impl Drop for EpochGuard {
	fn drop(&mut self) {
		self.gate.borrow_mut().end(&self.scope, self.epoch);
	}
}

fn divergent_chains(hits: &[ReportedHit], matched: &ReportedHit) -> Vec<Vec<DeclarationId>> {
	hits.iter()
		.filter(|reported| reported.diverges_from(matched))
		.map(|reported| reported.hit.chain.clone())
		.collect()
}

/// Identity and provider resolution over one render host.
pub struct Resolver<H: RenderHost, G: AsyncGlobals> {
	config: ResolverConfig,
	gate: Rc<RefCell<ResolutionGate>>,
	dry_runs: DryRunController<H, G>,
	scopes: ScopeTable,
}

impl<H: RenderHost, G: AsyncGlobals> std::fmt::Debug for Resolver<H, G> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Resolver")
			.field("config", &self.config)
			.field("scopes", &self.scopes.len())
			.finish_non_exhaustive()
	}
}

impl<H: RenderHost, G: AsyncGlobals> Resolver<H, G> {
	pub fn new(config: ResolverConfig, host: H, globals: G) -> Result<Self> {
		config.validate()?;
		let gate = Rc::new(RefCell::new(ResolutionGate::new(config.namespace)));
		let dry_runs = DryRunController::new(host, globals, Rc::clone(&gate), config.dry_run_timeout());
		Ok(Self {
			config,
			gate,
			dry_runs,
			scopes: ScopeTable::new(),
		})
	}

	pub fn config(&self) -> &ResolverConfig {
		&self.config
	}

	pub fn gate(&self) -> &Rc<RefCell<ResolutionGate>> {
		&self.gate
	}

	pub fn open_scope(&mut self, id: ScopeId) -> Result<&mut Scope> {
		self.scopes.open(id)
	}

	pub fn scope(&self, id: &ScopeId) -> Option<&Scope> {
		self.scopes.get(id)
	}

	pub fn scope_mut(&mut self, id: &ScopeId) -> Result<&mut Scope> {
		self.scopes.get_mut(id)
	}

	/// Drops a scope's tables and abandons any attempt in flight for it.
	pub fn dispose_scope(&mut self, id: &ScopeId) -> bool {
		let mut gate = self.gate.borrow_mut();
		if let Some(epoch) = gate.current_epoch(id) {
			gate.end(id, epoch);
		}
		drop(gate);
		self.scopes.dispose(id)
	}

	/// Opens an epoch, runs one dry run under it, and checks the candidates.
	///
	/// The epoch is ended on every exit path. Divergent candidates are
	/// handled according to [`ResolverConfig::divergence`].
	pub async fn speculate(&self, request: SpeculationRequest<H::Props>) -> Result<Resolution> {
		let SpeculationRequest {
			scope,
			component,
			props,
			target,
			fallback,
			edge_hint,
		} = request;

		let epoch = self.gate.borrow_mut().begin(&scope, target, fallback);
		let _guard = EpochGuard {
			gate: Rc::clone(&self.gate),
			scope: scope.clone(),
			epoch,
		};

		let dry_run = self.dry_runs.run_dry_run(&scope, component, props, edge_hint).await;

		let divergent = match &dry_run.matched {
			Some(matched) => {
				let chains = divergent_chains(&dry_run.hits, matched);
				if !chains.is_empty() {
					match self.config.divergence {
						DivergencePolicy::FirstMatch => {
							tracing::warn!(
								scope = %scope,
								declaration = %matched.hit.declaration_id,
								divergent = chains.len(),
								"resolver.divergence"
							);
						}
						DivergencePolicy::Reject => {
							let mut all = vec![matched.hit.chain.clone()];
							all.extend(chains);
							return Err(ResolveError::Divergence {
								declaration: matched.hit.declaration_id.clone(),
								chains: all,
							});
						}
					}
				}
				chains
			}
			None => Vec::new(),
		};

		tracing::debug!(
			scope = %scope,
			epoch = epoch.get(),
			matched = dry_run.matched.is_some(),
			confidence = ?dry_run.confidence,
			"resolver.speculate"
		);

		Ok(Resolution {
			scope,
			epoch,
			dry_run,
			divergent,
		})
	}

	/// Resolves `component`'s provider chain and records it for `instance` in `scope`.
	///
	/// Providers the dry run discovered for other declarations seed the scope
	/// when the run was confident and the scope has nothing for them yet.
	/// Subscribers of every published declaration are notified.
	pub fn commit(
		&mut self,
		scope: &ScopeId,
		instance: &InstanceId,
		resolution: &Resolution,
		graph: &ComponentGraph,
		component: ComponentKey,
		new_entry: &ProviderEntry,
	) -> Result<Vec<ResolvedProvider>> {
		let resolved = graph.resolve(component, new_entry)?;
		let declaration = graph.declaration(component).cloned().ok_or(ResolveError::UnknownComponent { key: component })?;
		let live = self.scopes.get_mut(scope)?;

		if resolution.confidence() == Confidence::High {
			for (discovered, entries) in &resolution.dry_run.providers {
				if *discovered != declaration && live.registries().providers_of(discovered).is_none() {
					live.publish_providers(discovered.clone(), entries.clone());
				}
			}
		}

		live.registries_mut().set_upstream_modules(instance.clone(), upstream_modules(&resolved));
		let notified = live.publish_providers(declaration.clone(), resolved.iter().map(|placed| placed.entry.clone()).collect());

		tracing::debug!(
			scope = %scope,
			instance = %instance,
			declaration = %declaration,
			providers = resolved.len(),
			notified,
			"resolver.commit"
		);
		Ok(resolved)
	}
}

#[cfg(test)]
mod tests;
