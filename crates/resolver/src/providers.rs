//! Static provider declarations and the provider-graph resolver.
//!
//! # Role
//!
//! Components declare provider entries statically. Runtime and upstream
//! entries reference a module, and through it another declared component
//! whose own providers apply further out. [`ComponentGraph::resolve`] walks
//! those references and produces the order in which providers are applied:
//! outermost level first, declaration order within a level.
//!
//! # Invariants
//!
//! - Components live in an arena addressed by [`ComponentKey`]; the walk's
//!   visited set holds keys, so cyclic references terminate.
//! - Props entries never cause recursion.
//! - Output order is a pure function of the declarations and the new entry.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

use crate::error::{ResolveError, Result};
use crate::ids::{ComponentKey, DeclarationId, ModuleId, ProviderId};

/// Maps a component's input props to a provider's configuration.
#[derive(Clone)]
pub struct ConfigFn(Arc<dyn Fn(&Value) -> Value + Send + Sync>);

impl ConfigFn {
	pub fn new(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
		Self(Arc::new(f))
	}

	/// Passes props through unchanged.
	pub fn identity() -> Self {
		Self::new(Value::clone)
	}

	pub fn call(&self, props: &Value) -> Value {
		(self.0)(props)
	}
}

impl fmt::Debug for ConfigFn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("ConfigFn(..)")
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
	Props,
	Runtime,
	Upstream,
}

/// Module a runtime or upstream entry draws from, and the component it points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRef {
	pub id: ModuleId,
	pub component: ComponentKey,
}

#[derive(Debug, Clone)]
enum ProviderSource {
	Props,
	Runtime(ModuleRef),
	Upstream(ModuleRef),
}

/// One declared dependency source. Immutable once built.
#[derive(Debug, Clone)]
pub struct ProviderEntry {
	id: ProviderId,
	source: ProviderSource,
	config: ConfigFn,
}

impl ProviderEntry {
	pub fn props(id: impl Into<ProviderId>, config: ConfigFn) -> Self {
		Self {
			id: id.into(),
			source: ProviderSource::Props,
			config,
		}
	}

	pub fn runtime(id: impl Into<ProviderId>, module: ModuleRef, config: ConfigFn) -> Self {
		Self {
			id: id.into(),
			source: ProviderSource::Runtime(module),
			config,
		}
	}

	pub fn upstream(id: impl Into<ProviderId>, module: ModuleRef, config: ConfigFn) -> Self {
		Self {
			id: id.into(),
			source: ProviderSource::Upstream(module),
			config,
		}
	}

	pub fn id(&self) -> &ProviderId {
		&self.id
	}

	pub fn kind(&self) -> ProviderKind {
		match self.source {
			ProviderSource::Props => ProviderKind::Props,
			ProviderSource::Runtime(_) => ProviderKind::Runtime,
			ProviderSource::Upstream(_) => ProviderKind::Upstream,
		}
	}

	pub fn module(&self) -> Option<&ModuleRef> {
		match &self.source {
			ProviderSource::Props => None,
			ProviderSource::Runtime(module) | ProviderSource::Upstream(module) => Some(module),
		}
	}

	pub fn configure(&self, props: &Value) -> Value {
		self.config.call(props)
	}
}

/// A provider entry placed by [`ComponentGraph::resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
	pub entry: ProviderEntry,
	/// Reference depth at which the entry was reached; the origin is level 0.
	pub level: usize,
	/// Position within its own component's entry list.
	pub index: usize,
}

/// Modules referenced by a resolved provider list.
pub fn upstream_modules(resolved: &[ResolvedProvider]) -> BTreeSet<ModuleId> {
	resolved.iter().filter_map(|placed| placed.entry.module()).map(|module| module.id.clone()).collect()
}

#[derive(Debug)]
struct ComponentNode {
	declaration: DeclarationId,
	providers: Vec<ProviderEntry>,
}

/// Arena of statically declared components and their provider entries.
#[derive(Debug, Default)]
pub struct ComponentGraph {
	nodes: Vec<ComponentNode>,
	by_declaration: FxHashMap<DeclarationId, ComponentKey>,
}

impl ComponentGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Declares a component, returning the existing key if it was declared before.
	pub fn declare(&mut self, declaration: impl Into<DeclarationId>) -> ComponentKey {
		let declaration = declaration.into();
		if let Some(key) = self.by_declaration.get(&declaration) {
			return *key;
		}
		let key = ComponentKey(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
		self.nodes.push(ComponentNode {
			declaration: declaration.clone(),
			providers: Vec::new(),
		});
		self.by_declaration.insert(declaration, key);
		key
	}

	/// Appends a provider entry to a declared component.
	pub fn attach(&mut self, component: ComponentKey, entry: ProviderEntry) -> Result<()> {
		let node = self.nodes.get_mut(component.index()).ok_or(ResolveError::UnknownComponent { key: component })?;
		node.providers.push(entry);
		Ok(())
	}

	pub fn key_of(&self, declaration: &DeclarationId) -> Option<ComponentKey> {
		self.by_declaration.get(declaration).copied()
	}

	pub fn declaration(&self, component: ComponentKey) -> Option<&DeclarationId> {
		self.nodes.get(component.index()).map(|node| &node.declaration)
	}

	pub fn providers(&self, component: ComponentKey) -> Option<&[ProviderEntry]> {
		self.nodes.get(component.index()).map(|node| node.providers.as_slice())
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Computes the ordered provider chain for `component` with `new_entry` appended at the origin.
	pub fn resolve(&self, component: ComponentKey, new_entry: &ProviderEntry) -> Result<Vec<ResolvedProvider>> {
		let mut visited = FxHashSet::default();
		visited.insert(component);
		let mut placed = Vec::new();
		self.walk(component, 0, Some(new_entry), new_entry, &mut visited, &mut placed)?;

		placed.sort_by(|a, b| b.level.cmp(&a.level).then(a.index.cmp(&b.index)));
		tracing::trace!(
			component = %component,
			entry = %new_entry.id(),
			providers = placed.len(),
			"providers.resolve"
		);
		Ok(placed)
	}

	fn walk(
		&self,
		component: ComponentKey,
		level: usize,
		appended: Option<&ProviderEntry>,
		new_entry: &ProviderEntry,
		visited: &mut FxHashSet<ComponentKey>,
		placed: &mut Vec<ResolvedProvider>,
	) -> Result<()> {
		let node = self.nodes.get(component.index()).ok_or(ResolveError::UnknownComponent { key: component })?;
		let origin_module = new_entry.module().map(|module| &module.id);

		for (index, entry) in node.providers.iter().chain(appended).enumerate() {
			placed.push(ResolvedProvider {
				entry: entry.clone(),
				level,
				index,
			});
			let Some(module) = entry.module() else {
				continue;
			};
			if origin_module == Some(&module.id) || !visited.insert(module.component) {
				continue;
			}
			self.walk(module.component, level + 1, None, new_entry, visited, placed)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests;
