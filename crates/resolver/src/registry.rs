//! Scope-owned mapping tables.
//!
//! # Role
//!
//! Every isolation boundary (the live tree, or one dry run) owns a [`Scope`]
//! holding its own [`Registries`]. Nothing here is process-wide: tables are
//! allocated when a scope opens and dropped together when it is disposed.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ancestry::{HostTree, ParentRef};
use crate::error::{ResolveError, Result};
use crate::ids::{DeclarationId, InstanceId, ModuleId, ScopeId};
use crate::observer::{Observers, SubscriptionId};
use crate::providers::ProviderEntry;

/// Declaration, instance, provider, and upstream-module tables of one scope.
#[derive(Debug, Default)]
pub struct Registries {
	instances_by_declaration: FxHashMap<DeclarationId, FxHashSet<InstanceId>>,
	declaration_by_instance: FxHashMap<InstanceId, DeclarationId>,
	parent_by_instance: FxHashMap<InstanceId, ParentRef>,
	providers_by_declaration: BTreeMap<DeclarationId, Vec<ProviderEntry>>,
	upstream_by_instance: FxHashMap<InstanceId, BTreeSet<ModuleId>>,
}

impl Registries {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records `instance` as an invocation of `declaration` under `parent`.
	///
	/// Re-registering moves the instance to the new declaration and parent.
	pub fn register_instance(&mut self, instance: InstanceId, declaration: DeclarationId, parent: ParentRef) {
		if let Some(previous) = self.declaration_by_instance.insert(instance.clone(), declaration.clone()) {
			self.detach_from(&previous, &instance);
		}
		self.instances_by_declaration.entry(declaration).or_default().insert(instance.clone());
		self.parent_by_instance.insert(instance, parent);
	}

	/// Forgets `instance`. Returns its declaration if it was registered.
	pub fn unregister_instance(&mut self, instance: &InstanceId) -> Option<DeclarationId> {
		let declaration = self.declaration_by_instance.remove(instance)?;
		self.detach_from(&declaration, instance);
		self.parent_by_instance.remove(instance);
		self.upstream_by_instance.remove(instance);
		Some(declaration)
	}

	fn detach_from(&mut self, declaration: &DeclarationId, instance: &InstanceId) {
		if let Some(instances) = self.instances_by_declaration.get_mut(declaration) {
			instances.remove(instance);
			if instances.is_empty() {
				self.instances_by_declaration.remove(declaration);
			}
		}
	}

	/// Instances of `declaration`, sorted for stable iteration.
	pub fn instances_of(&self, declaration: &DeclarationId) -> Vec<InstanceId> {
		let mut instances: Vec<_> = self
			.instances_by_declaration
			.get(declaration)
			.map(|set| set.iter().cloned().collect())
			.unwrap_or_default();
		instances.sort();
		instances
	}

	pub fn declaration_of(&self, instance: &InstanceId) -> Option<&DeclarationId> {
		self.declaration_by_instance.get(instance)
	}

	pub fn set_providers(&mut self, declaration: DeclarationId, providers: Vec<ProviderEntry>) {
		self.providers_by_declaration.insert(declaration, providers);
	}

	pub fn providers_of(&self, declaration: &DeclarationId) -> Option<&[ProviderEntry]> {
		self.providers_by_declaration.get(declaration).map(Vec::as_slice)
	}

	/// Provider map ordered by declaration id.
	pub fn providers(&self) -> &BTreeMap<DeclarationId, Vec<ProviderEntry>> {
		&self.providers_by_declaration
	}

	pub fn take_providers(&mut self) -> BTreeMap<DeclarationId, Vec<ProviderEntry>> {
		std::mem::take(&mut self.providers_by_declaration)
	}

	pub fn set_upstream_modules(&mut self, instance: InstanceId, modules: BTreeSet<ModuleId>) {
		self.upstream_by_instance.insert(instance, modules);
	}

	pub fn upstream_modules_of(&self, instance: &InstanceId) -> Option<&BTreeSet<ModuleId>> {
		self.upstream_by_instance.get(instance)
	}

	/// Whether any registered instance names `instance` as its parent.
	pub fn has_children(&self, instance: &InstanceId) -> bool {
		self.parent_by_instance.values().any(|parent| matches!(parent, ParentRef::Instance(id) if id == instance))
	}

	pub fn instance_count(&self) -> usize {
		self.declaration_by_instance.len()
	}
}

impl HostTree for Registries {
	fn parent(&self, instance: &InstanceId) -> ParentRef {
		self.parent_by_instance.get(instance).cloned().unwrap_or(ParentRef::Detached)
	}

	fn declaration_id(&self, instance: &InstanceId) -> Option<DeclarationId> {
		self.declaration_by_instance.get(instance).cloned()
	}
}

/// One isolation boundary: its id, its tables, and observers of its provider map.
#[derive(Debug)]
pub struct Scope {
	id: ScopeId,
	registries: Registries,
	provider_observers: Observers<DeclarationId, Vec<ProviderEntry>>,
}

impl Scope {
	pub fn new(id: ScopeId) -> Self {
		Self {
			id,
			registries: Registries::new(),
			provider_observers: Observers::new(),
		}
	}

	pub fn id(&self) -> &ScopeId {
		&self.id
	}

	pub fn registries(&self) -> &Registries {
		&self.registries
	}

	pub fn registries_mut(&mut self) -> &mut Registries {
		&mut self.registries
	}

	/// Records the providers applying to `declaration` and notifies its observers.
	pub fn publish_providers(&mut self, declaration: DeclarationId, providers: Vec<ProviderEntry>) -> usize {
		let notified = self.provider_observers.notify(&declaration, &providers);
		self.registries.set_providers(declaration, providers);
		notified
	}

	pub fn subscribe_providers(&mut self, declaration: DeclarationId, callback: impl FnMut(&Vec<ProviderEntry>) + 'static) -> SubscriptionId {
		self.provider_observers.subscribe(declaration, callback)
	}

	pub fn unsubscribe_providers(&mut self, declaration: &DeclarationId, id: SubscriptionId) -> bool {
		self.provider_observers.unsubscribe(declaration, id)
	}

	/// Consumes the scope, returning its tables. Observers are dropped.
	pub fn into_registries(self) -> Registries {
		self.registries
	}
}

/// Open scopes keyed by id.
#[derive(Debug, Default)]
pub struct ScopeTable {
	scopes: FxHashMap<ScopeId, Scope>,
}

impl ScopeTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Opens a scope with fresh tables.
	pub fn open(&mut self, id: ScopeId) -> Result<&mut Scope> {
		match self.scopes.entry(id) {
			Entry::Occupied(entry) => Err(ResolveError::ScopeAlreadyOpen { scope: entry.key().clone() }),
			Entry::Vacant(entry) => {
				tracing::debug!(scope = %entry.key(), "scope.open");
				let scope = Scope::new(entry.key().clone());
				Ok(entry.insert(scope))
			}
		}
	}

	pub fn get(&self, id: &ScopeId) -> Option<&Scope> {
		self.scopes.get(id)
	}

	pub fn get_mut(&mut self, id: &ScopeId) -> Result<&mut Scope> {
		self.scopes.get_mut(id).ok_or_else(|| ResolveError::UnknownScope { scope: id.clone() })
	}

	/// Drops a scope and all of its tables. Returns `false` if it was not open.
	pub fn dispose(&mut self, id: &ScopeId) -> bool {
		let disposed = self.scopes.remove(id).is_some();
		if disposed {
			tracing::debug!(scope = %id, "scope.dispose");
		}
		disposed
	}

	pub fn is_open(&self, id: &ScopeId) -> bool {
		self.scopes.contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}
}
