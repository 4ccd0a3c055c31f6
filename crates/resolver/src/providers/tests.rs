use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

fn placed(resolved: &[ResolvedProvider]) -> Vec<(String, usize, usize)> {
	resolved.iter().map(|p| (p.entry.id().to_string(), p.level, p.index)).collect()
}

fn module(id: &str, component: ComponentKey) -> ModuleRef {
	ModuleRef {
		id: ModuleId::new(id),
		component,
	}
}

fn props(id: &str) -> ProviderEntry {
	ProviderEntry::props(id, ConfigFn::identity())
}

#[test]
fn props_entry_on_bare_component() {
	let mut graph = ComponentGraph::new();
	let x = graph.declare("X");
	let resolved = graph.resolve(x, &props("entryA")).expect("resolves");
	assert_eq!(placed(&resolved), vec![("entryA".to_string(), 0, 0)]);
	assert_eq!(resolved[0].entry.kind(), ProviderKind::Props);
}

#[test]
fn upstream_level_precedes_origin_level() {
	let mut graph = ComponentGraph::new();
	let theme = graph.declare("ThemeRoot");
	let button = graph.declare("Button");
	graph.attach(theme, props("theme.defaults")).expect("attach");
	graph
		.attach(button, ProviderEntry::upstream("button.theme", module("theme", theme), ConfigFn::identity()))
		.expect("attach");

	let resolved = graph.resolve(button, &props("button.props")).expect("resolves");
	assert_eq!(
		placed(&resolved),
		vec![
			("theme.defaults".to_string(), 1, 0),
			("button.theme".to_string(), 0, 0),
			("button.props".to_string(), 0, 1),
		]
	);
}

#[test]
fn declaration_order_kept_within_level() {
	let mut graph = ComponentGraph::new();
	let store = graph.declare("Store");
	let list = graph.declare("List");
	graph.attach(store, props("store.a")).expect("attach");
	graph.attach(store, props("store.b")).expect("attach");
	graph.attach(list, props("list.a")).expect("attach");
	graph
		.attach(list, ProviderEntry::runtime("list.store", module("store", store), ConfigFn::identity()))
		.expect("attach");
	graph.attach(list, props("list.c")).expect("attach");

	let resolved = graph.resolve(list, &props("list.new")).expect("resolves");
	assert_eq!(
		placed(&resolved),
		vec![
			("store.a".to_string(), 1, 0),
			("store.b".to_string(), 1, 1),
			("list.a".to_string(), 0, 0),
			("list.store".to_string(), 0, 1),
			("list.c".to_string(), 0, 2),
			("list.new".to_string(), 0, 3),
		]
	);
}

#[test]
fn deeper_levels_come_first() {
	let mut graph = ComponentGraph::new();
	let root = graph.declare("Root");
	let mid = graph.declare("Mid");
	let leaf = graph.declare("Leaf");
	graph.attach(root, props("root.p")).expect("attach");
	graph
		.attach(mid, ProviderEntry::upstream("mid.root", module("root", root), ConfigFn::identity()))
		.expect("attach");
	graph
		.attach(leaf, ProviderEntry::upstream("leaf.mid", module("mid", mid), ConfigFn::identity()))
		.expect("attach");

	let resolved = graph.resolve(leaf, &props("leaf.new")).expect("resolves");
	assert_eq!(
		placed(&resolved),
		vec![
			("root.p".to_string(), 2, 0),
			("mid.root".to_string(), 1, 0),
			("leaf.mid".to_string(), 0, 0),
			("leaf.new".to_string(), 0, 1),
		]
	);
	assert_eq!(upstream_modules(&resolved), BTreeSet::from([ModuleId::new("mid"), ModuleId::new("root")]));
}

#[test]
fn cyclic_references_terminate() {
	let mut graph = ComponentGraph::new();
	let a = graph.declare("A");
	let b = graph.declare("B");
	graph
		.attach(a, ProviderEntry::upstream("a.b", module("mod-b", b), ConfigFn::identity()))
		.expect("attach");
	graph
		.attach(b, ProviderEntry::upstream("b.a", module("mod-a", a), ConfigFn::identity()))
		.expect("attach");

	let resolved = graph.resolve(a, &props("a.new")).expect("resolves");
	assert_eq!(
		placed(&resolved),
		vec![("b.a".to_string(), 1, 0), ("a.b".to_string(), 0, 0), ("a.new".to_string(), 0, 1)]
	);
}

#[test]
fn same_module_as_new_entry_does_not_recurse() {
	let mut graph = ComponentGraph::new();
	let shared = graph.declare("Shared");
	let host = graph.declare("Host");
	graph.attach(shared, props("shared.p")).expect("attach");
	graph
		.attach(host, ProviderEntry::runtime("host.shared", module("shared", shared), ConfigFn::identity()))
		.expect("attach");

	let new_entry = ProviderEntry::runtime("host.new", module("shared", shared), ConfigFn::identity());
	let resolved = graph.resolve(host, &new_entry).expect("resolves");
	assert_eq!(
		placed(&resolved),
		vec![("host.shared".to_string(), 0, 0), ("host.new".to_string(), 0, 1)]
	);
}

#[test]
fn new_entry_is_only_appended_at_origin() {
	let mut graph = ComponentGraph::new();
	let outer = graph.declare("Outer");
	let inner = graph.declare("Inner");
	graph
		.attach(inner, ProviderEntry::upstream("inner.outer", module("outer", outer), ConfigFn::identity()))
		.expect("attach");

	let resolved = graph.resolve(inner, &props("fresh")).expect("resolves");
	let fresh = resolved.iter().filter(|p| p.entry.id().as_str() == "fresh").count();
	assert_eq!(fresh, 1);
	assert_eq!(placed(&resolved), vec![("inner.outer".to_string(), 0, 0), ("fresh".to_string(), 0, 1)]);
}

#[test]
fn resolution_is_repeatable() {
	let mut graph = ComponentGraph::new();
	let a = graph.declare("A");
	let b = graph.declare("B");
	let c = graph.declare("C");
	graph.attach(b, props("b.p")).expect("attach");
	graph.attach(c, props("c.p")).expect("attach");
	graph
		.attach(a, ProviderEntry::upstream("a.b", module("b", b), ConfigFn::identity()))
		.expect("attach");
	graph
		.attach(a, ProviderEntry::runtime("a.c", module("c", c), ConfigFn::identity()))
		.expect("attach");

	let first = placed(&graph.resolve(a, &props("a.new")).expect("resolves"));
	let second = placed(&graph.resolve(a, &props("a.new")).expect("resolves"));
	assert_eq!(first, second);
	assert_eq!(first[0], ("b.p".to_string(), 1, 0));
	assert_eq!(first[1], ("c.p".to_string(), 1, 0));
}

#[test]
fn unknown_component_is_an_error() {
	let graph = ComponentGraph::new();
	let err = graph.resolve(ComponentKey(3), &props("x")).unwrap_err();
	assert!(matches!(err, ResolveError::UnknownComponent { key } if key == ComponentKey(3)));
}

#[test]
fn unknown_module_target_is_an_error() {
	let mut graph = ComponentGraph::new();
	let a = graph.declare("A");
	graph
		.attach(a, ProviderEntry::upstream("a.ghost", module("ghost", ComponentKey(42)), ConfigFn::identity()))
		.expect("attach");
	assert!(graph.resolve(a, &props("a.new")).is_err());
}

#[test]
fn declare_is_idempotent() {
	let mut graph = ComponentGraph::new();
	let first = graph.declare("A");
	let second = graph.declare("A");
	assert_eq!(first, second);
	assert_eq!(graph.len(), 1);
	assert_eq!(graph.key_of(&DeclarationId::new("A")), Some(first));
	assert_eq!(graph.declaration(first), Some(&DeclarationId::new("A")));
}

#[test]
fn config_fn_maps_props() {
	let entry = ProviderEntry::props(
		"size",
		ConfigFn::new(|props| json!({ "size": props.get("size").cloned().unwrap_or(Value::Null) })),
	);
	assert_eq!(entry.configure(&json!({ "size": 3, "other": true })), json!({ "size": 3 }));
}
