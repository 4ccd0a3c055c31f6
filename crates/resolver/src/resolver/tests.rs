use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use super::*;
use crate::dry_run::{DetachedRoot, DetachedRootOptions, DryRunContext, NoAsyncGlobals, RenderRequest};
use crate::error::HostError;
use crate::ids::ModuleId;
use crate::providers::{ConfigFn, ModuleRef};

/// Host whose detached render offers a fixed list of candidates and settles.
struct ScriptedHost {
	offers: Vec<(CandidateHit, Signature)>,
	discovered: Vec<(DeclarationId, ProviderEntry)>,
}

struct ScriptedRoot {
	offers: Vec<(CandidateHit, Signature)>,
	discovered: Vec<(DeclarationId, ProviderEntry)>,
}

impl RenderHost for ScriptedHost {
	type Props = Value;
	type Root = ScriptedRoot;

	fn create_detached_root(&self, _options: &DetachedRootOptions) -> std::result::Result<ScriptedRoot, HostError> {
		Ok(ScriptedRoot {
			offers: self.offers.clone(),
			discovered: self.discovered.clone(),
		})
	}
}

#[async_trait(?Send)]
impl DetachedRoot for ScriptedRoot {
	type Props = Value;

	fn render(&mut self, _request: RenderRequest<Value>, ctx: DryRunContext) -> std::result::Result<(), HostError> {
		for (hit, signature) in self.offers.drain(..) {
			ctx.offer(hit, signature);
		}
		for (declaration, entry) in self.discovered.drain(..) {
			ctx.record_providers(declaration, vec![entry]);
		}
		ctx.settled();
		Ok(())
	}

	async fn unmount(&mut self) {}
}

fn decl(id: &str) -> DeclarationId {
	DeclarationId::new(id)
}

fn hit(chain: &[&str]) -> CandidateHit {
	CandidateHit {
		declaration_id: decl("Button"),
		instance_id: None,
		children_sketch: Signature::SEED,
		chain: chain.iter().map(|c| decl(c)).collect(),
		has_descendent: false,
		depth: 2,
	}
}

fn request(target: Signature) -> SpeculationRequest<Value> {
	SpeculationRequest {
		scope: ScopeId::root(),
		component: decl("Button"),
		props: json!({}),
		target,
		fallback: None,
		edge_hint: EdgeHint {
			declaration_id: decl("Button"),
			instance_id: None,
			children_sketch: Signature::SEED,
			chain: vec![decl("App")],
			depth: 1,
		},
	}
}

fn resolver(policy: DivergencePolicy, offers: Vec<(CandidateHit, Signature)>) -> Resolver<ScriptedHost, NoAsyncGlobals> {
	let config = ResolverConfig {
		divergence: policy,
		..ResolverConfig::default()
	};
	let host = ScriptedHost {
		offers,
		discovered: Vec::new(),
	};
	Resolver::new(config, host, NoAsyncGlobals).expect("valid config")
}

#[tokio::test]
async fn speculation_matches_and_releases_epoch() {
	let target = Signature::from_raw(42);
	let resolver = resolver(
		DivergencePolicy::FirstMatch,
		vec![(hit(&["App", "Toolbar"]), Signature::from_raw(7)), (hit(&["App", "Panel"]), target)],
	);

	let resolution = resolver.speculate(request(target)).await.expect("speculates");
	assert_eq!(resolution.matched().map(|h| h.chain.clone()), Some(vec![decl("App"), decl("Panel")]));
	assert_eq!(resolution.chosen(), resolution.matched());
	assert_eq!(resolution.confidence(), Confidence::High);
	// The other instance sits at a different signature, so it is a separate position.
	assert!(resolution.divergent.is_empty());
	assert!(!resolver.gate().borrow().is_active(&ScopeId::root()));
}

#[tokio::test]
async fn reject_policy_allows_component_rendered_in_two_places() {
	let target = Signature::from_raw(42);
	let resolver = resolver(
		DivergencePolicy::Reject,
		vec![(hit(&["App", "Toolbar"]), Signature::from_raw(7)), (hit(&["App", "Panel"]), target)],
	);

	let resolution = resolver.speculate(request(target)).await.expect("one candidate matches");
	assert_eq!(resolution.matched().map(|h| h.chain.clone()), Some(vec![decl("App"), decl("Panel")]));
	assert!(resolution.divergent.is_empty());
}

#[tokio::test]
async fn first_match_policy_keeps_sticky_match() {
	let target = Signature::from_raw(1);
	let resolver = resolver(DivergencePolicy::FirstMatch, vec![(hit(&["App", "A"]), target), (hit(&["App", "B"]), target)]);

	let resolution = resolver.speculate(request(target)).await.expect("speculates");
	assert_eq!(resolution.matched().map(|h| h.chain.clone()), Some(vec![decl("App"), decl("A")]));
	assert_eq!(resolution.divergent.len(), 1);
	assert_eq!(resolution.dry_run.hits.len(), 2);
}

#[tokio::test]
async fn reject_policy_fails_on_divergence() {
	let target = Signature::from_raw(1);
	let resolver = resolver(DivergencePolicy::Reject, vec![(hit(&["App", "A"]), target), (hit(&["App", "B"]), target)]);

	let err = resolver.speculate(request(target)).await.expect_err("diverges");
	match err {
		ResolveError::Divergence { declaration, chains } => {
			assert_eq!(declaration, decl("Button"));
			assert_eq!(chains, vec![vec![decl("App"), decl("A")], vec![decl("App"), decl("B")]]);
		}
		other => panic!("unexpected error: {other}"),
	}
	assert!(!resolver.gate().borrow().is_active(&ScopeId::root()));
}

#[tokio::test]
async fn reject_policy_accepts_agreeing_candidates() {
	let target = Signature::from_raw(1);
	let mut other_shape = hit(&["App", "B"]);
	other_shape.children_sketch = Signature::from_raw(99);
	let resolver = resolver(DivergencePolicy::Reject, vec![(hit(&["App", "A"]), target), (other_shape, Signature::from_raw(2))]);

	let resolution = resolver.speculate(request(target)).await.expect("no divergence");
	assert!(resolution.divergent.is_empty());
}

#[tokio::test]
async fn unmatched_speculation_falls_back_to_first_hit() {
	let resolver = resolver(DivergencePolicy::Reject, Vec::new());
	let resolution = resolver.speculate(request(Signature::from_raw(5))).await.expect("speculates");

	assert!(resolution.matched().is_none());
	assert_eq!(resolution.chosen().map(|h| h.chain.clone()), Some(vec![decl("App")]));
	assert_eq!(resolution.confidence(), Confidence::Low);
	assert!(resolution.dry_run.from_edge_hint);
}

#[test]
fn invalid_config_is_rejected() {
	let config = ResolverConfig {
		dry_run_timeout_ms: 0,
		..ResolverConfig::default()
	};
	let host = ScriptedHost {
		offers: Vec::new(),
		discovered: Vec::new(),
	};
	let err = Resolver::new(config, host, NoAsyncGlobals).expect_err("zero timeout");
	assert!(matches!(err, ResolveError::Config(_)));
}

#[tokio::test]
async fn commit_publishes_providers_and_modules() {
	let target = Signature::from_raw(3);
	let mut resolver = resolver(DivergencePolicy::FirstMatch, vec![(hit(&["App"]), target)]);
	let live = ScopeId::root();
	let seen = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&seen);
	resolver
		.open_scope(live.clone())
		.expect("opens")
		.subscribe_providers(decl("Button"), move |entries| {
			sink.borrow_mut().extend(entries.iter().map(|e| e.id().to_string()));
		});

	let mut graph = ComponentGraph::new();
	let theme = graph.declare("ThemeRoot");
	let button = graph.declare("Button");
	graph.attach(theme, ProviderEntry::props("theme.defaults", ConfigFn::identity())).expect("attach");
	let module = ModuleRef {
		id: ModuleId::new("theme"),
		component: theme,
	};
	graph.attach(button, ProviderEntry::upstream("button.theme", module, ConfigFn::identity())).expect("attach");

	let resolution = resolver.speculate(request(target)).await.expect("speculates");
	let instance = InstanceId::new("button-1");
	let new_entry = ProviderEntry::props("button.props", ConfigFn::identity());
	let resolved = resolver.commit(&live, &instance, &resolution, &graph, button, &new_entry).expect("commits");

	assert_eq!(resolved.len(), 3);
	assert_eq!(*seen.borrow(), vec!["theme.defaults", "button.theme", "button.props"]);
	let registries = resolver.scope(&live).expect("open").registries();
	assert_eq!(registries.providers_of(&decl("Button")).map(<[_]>::len), Some(3));
	let modules: Vec<_> = registries.upstream_modules_of(&instance).expect("recorded").iter().cloned().collect();
	assert_eq!(modules, vec![ModuleId::new("theme")]);
}

#[tokio::test]
async fn confident_dry_run_seeds_discovered_providers() {
	let target = Signature::from_raw(3);
	let config = ResolverConfig::default();
	let host = ScriptedHost {
		offers: vec![(hit(&["App"]), target)],
		discovered: vec![(decl("Icon"), ProviderEntry::props("icon.size", ConfigFn::new(|_| json!({ "size": 16 }))))],
	};
	let mut resolver = Resolver::new(config, host, NoAsyncGlobals).expect("valid config");
	let live = ScopeId::new("live");
	resolver.open_scope(live.clone()).expect("opens");

	let mut graph = ComponentGraph::new();
	let button = graph.declare("Button");
	let resolution = resolver.speculate(request(target)).await.expect("speculates");
	let new_entry = ProviderEntry::props("button.props", ConfigFn::identity());
	resolver.commit(&live, &InstanceId::new("b"), &resolution, &graph, button, &new_entry).expect("commits");

	let registries = resolver.scope(&live).expect("open").registries();
	let icon = registries.providers_of(&decl("Icon")).expect("seeded");
	assert_eq!(icon[0].configure(&Value::Null), json!({ "size": 16 }));
}

#[tokio::test]
async fn commit_requires_open_scope() {
	let target = Signature::from_raw(3);
	let mut resolver = resolver(DivergencePolicy::FirstMatch, Vec::new());
	let mut graph = ComponentGraph::new();
	let x = graph.declare("X");
	let resolution = resolver.speculate(request(target)).await.expect("speculates");
	let entry = ProviderEntry::props("entryA", ConfigFn::identity());

	let err = resolver
		.commit(&ScopeId::new("closed"), &InstanceId::new("x"), &resolution, &graph, x, &entry)
		.expect_err("scope not open");
	assert!(matches!(err, ResolveError::UnknownScope { .. }));
}

#[test]
fn dispose_scope_ends_active_epoch() {
	let mut resolver = resolver(DivergencePolicy::FirstMatch, Vec::new());
	let live = ScopeId::new("live");
	resolver.open_scope(live.clone()).expect("opens");
	resolver.gate().borrow_mut().begin(&live, Signature::from_raw(1), None);

	assert!(resolver.dispose_scope(&live));
	assert!(!resolver.gate().borrow().is_active(&live));
	assert!(resolver.scope(&live).is_none());
}
