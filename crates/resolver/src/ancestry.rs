//! Ancestor walks over the host's live tree tracker.

use rustc_hash::FxHashSet;

use crate::error::{ResolveError, Result};
use crate::ids::{DeclarationId, InstanceId};

/// Parent link reported by the host for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
	Instance(InstanceId),
	/// The instance is a tree root (`__ROOT__`).
	Root,
	/// The host does not know the parent yet, e.g. it has not mounted.
	Detached,
}

/// Read access to the host's tree tracker. The engine never owns these tables.
pub trait HostTree {
	fn parent(&self, instance: &InstanceId) -> ParentRef;
	fn declaration_id(&self, instance: &InstanceId) -> Option<DeclarationId>;
}

/// Declaration chain from the root down to (and including) an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorChain {
	/// Declaration ids, root first.
	pub declarations: Vec<DeclarationId>,
	/// `false` when the walk stopped at a detached parent before reaching the root.
	pub complete: bool,
}

/// Walks parent links from `instance` up to the root.
///
/// An instance without a recorded declaration is a registration-ordering bug
/// in the caller and is reported, never skipped.
pub fn ancestor_chain(tree: &impl HostTree, instance: &InstanceId) -> Result<AncestorChain> {
	let mut declarations = Vec::new();
	let mut seen = FxHashSet::default();
	let mut cursor = instance.clone();

	let complete = loop {
		if !seen.insert(cursor.clone()) {
			return Err(ResolveError::AncestryCycle { instance: cursor });
		}
		let declaration = tree
			.declaration_id(&cursor)
			.ok_or_else(|| ResolveError::MissingDeclaration { instance: cursor.clone() })?;
		declarations.push(declaration);
		match tree.parent(&cursor) {
			ParentRef::Instance(parent) => cursor = parent,
			ParentRef::Root => break true,
			ParentRef::Detached => break false,
		}
	};

	declarations.reverse();
	Ok(AncestorChain { declarations, complete })
}
