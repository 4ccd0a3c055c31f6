//! Tree frames: one level of a live or speculative walk.
//!
//! A frame owns the sequence table for the children of one node and carries
//! enough of that node (its [`ParentData`]) to derive child signatures. Frames
//! are created by the walk that visits them and dropped with it.

use uuid::Uuid;

use crate::candidate::CandidateHit;
use crate::ids::{ClaimToken, DeclarationId, InstanceId, Ordinal};
use crate::sequence::SequenceTable;
use crate::signature::{self, FallbackSignature, Signature};

/// Terminal data of the node enclosing a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentData {
	pub declaration_id: Option<DeclarationId>,
	pub register_id: Option<InstanceId>,
	pub children_sketch: Signature,
	pub signature: Signature,
}

impl ParentData {
	/// Data standing in for the parent of the tree root.
	pub fn root() -> Self {
		Self {
			declaration_id: None,
			register_id: None,
			children_sketch: Signature::SEED,
			signature: Signature::SEED,
		}
	}
}

/// Marks a frame whose parent was itself produced by a speculative walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryRunMeta {
	/// The parent matched the gate target during its dry run.
	pub parent_resolved: bool,
}

/// Identity granted to one invocation inside a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePosition {
	pub declaration_id: DeclarationId,
	pub ordinal: Ordinal,
	pub signature: Signature,
	pub depth: i32,
}

impl NodePosition {
	pub fn fallback(&self, children_sketch: Signature, namespace: &Uuid) -> FallbackSignature {
		signature::fallback_signature(&self.declaration_id, self.ordinal, children_sketch, namespace)
	}

	/// Turns this position into the parent data of the frame below it.
	pub fn into_parent(self, register_id: Option<InstanceId>, children_sketch: Signature) -> ParentData {
		ParentData {
			declaration_id: Some(self.declaration_id),
			register_id,
			children_sketch,
			signature: self.signature,
		}
	}
}

#[derive(Debug, Clone)]
pub struct TreeFrame {
	parent: ParentData,
	depth: i32,
	/// Ancestor declaration ids, root first, ending with the parent's.
	chain: Vec<DeclarationId>,
	sequences: SequenceTable,
	dry_run: Option<DryRunMeta>,
}

impl TreeFrame {
	/// Frame whose children are the tree roots.
	pub fn root() -> Self {
		Self {
			parent: ParentData::root(),
			depth: -1,
			chain: Vec::new(),
			sequences: SequenceTable::new(),
			dry_run: None,
		}
	}

	pub fn parent(&self) -> &ParentData {
		&self.parent
	}

	pub fn depth(&self) -> i32 {
		self.depth
	}

	pub fn chain(&self) -> &[DeclarationId] {
		&self.chain
	}

	pub fn dry_run(&self) -> Option<DryRunMeta> {
		self.dry_run
	}

	pub fn sequences(&self) -> &SequenceTable {
		&self.sequences
	}

	/// Claims an ordinal for `token` and derives the child's signature.
	pub fn enter(&mut self, declaration: &DeclarationId, token: ClaimToken) -> NodePosition {
		let ordinal = self.sequences.claim(declaration, token);
		NodePosition {
			declaration_id: declaration.clone(),
			ordinal,
			signature: signature::extend(self.parent.signature, declaration, ordinal),
			depth: self.depth + 1,
		}
	}

	pub fn reserve(&mut self, declaration: &DeclarationId, token: ClaimToken) {
		self.sequences.reserve(declaration, token);
	}

	/// Releases the ordinal held by `token`, e.g. when the invocation unmounts.
	pub fn leave(&mut self, declaration: &DeclarationId, token: ClaimToken) -> Option<Ordinal> {
		self.sequences.release(declaration, token)
	}

	/// Opens the frame for the children of `node`.
	pub fn descend(&self, node: ParentData, dry_run: Option<DryRunMeta>) -> TreeFrame {
		let mut chain = self.chain.clone();
		chain.extend(node.declaration_id.iter().cloned());
		TreeFrame {
			parent: node,
			depth: self.depth + 1,
			chain,
			sequences: SequenceTable::new(),
			dry_run,
		}
	}

	/// Describes `position` (entered in this frame) as a dry-run candidate.
	pub fn candidate(&self, position: &NodePosition, instance_id: Option<InstanceId>, children_sketch: Signature, has_descendent: bool) -> CandidateHit {
		CandidateHit {
			declaration_id: position.declaration_id.clone(),
			instance_id,
			children_sketch,
			chain: self.chain.clone(),
			has_descendent,
			depth: position.depth,
		}
	}
}
