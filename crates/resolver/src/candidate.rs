use crate::ids::{DeclarationId, InstanceId};
use crate::signature::{FallbackSignature, Signature};

/// One position observed during a dry run that could be the sought identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateHit {
	pub declaration_id: DeclarationId,
	pub instance_id: Option<InstanceId>,
	pub children_sketch: Signature,
	/// Ancestor declaration ids, root first.
	pub chain: Vec<DeclarationId>,
	pub has_descendent: bool,
	pub depth: i32,
}

/// What a caller knows about the target's position before speculating.
///
/// Used to synthesize a candidate when the detached render reports nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeHint {
	pub declaration_id: DeclarationId,
	pub instance_id: Option<InstanceId>,
	pub children_sketch: Signature,
	pub chain: Vec<DeclarationId>,
	pub depth: i32,
}

impl From<EdgeHint> for CandidateHit {
	fn from(hint: EdgeHint) -> Self {
		Self {
			declaration_id: hint.declaration_id,
			instance_id: hint.instance_id,
			children_sketch: hint.children_sketch,
			chain: hint.chain,
			has_descendent: false,
			depth: hint.depth,
		}
	}
}

/// Identity a candidate was reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKey {
	/// Cumulative signature of the reported position.
	Signature(Signature),
	/// Fallback identity of `(declaration, ordinal, children sketch)`.
	Fallback(FallbackSignature),
	/// Synthesized from the caller's edge hint; never matched.
	EdgeHint,
}

/// A candidate together with the identity it was offered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedHit {
	pub hit: CandidateHit,
	pub key: HitKey,
}

impl ReportedHit {
	/// Whether `self` could have matched in place of `matched` but sits under a different ancestry.
	///
	/// Distinct positions of one declaration (different signatures or ordinals)
	/// never diverge from each other.
	pub fn diverges_from(&self, matched: &ReportedHit) -> bool {
		self.key != HitKey::EdgeHint
			&& self.key == matched.key
			&& self.hit.declaration_id == matched.hit.declaration_id
			&& self.hit.chain != matched.hit.chain
	}
}
