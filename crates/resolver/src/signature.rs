//! Cumulative tree-position signatures.
//!
//! A [`Signature`] folds the structural path from the root to a node
//! (declaration ids plus ordinals) through a 64-bit FNV-1a accumulator. It is
//! a positional identity, not a security property: collisions are possible in
//! the 64-bit space and accepted.
//!
//! When a node's subtree has not settled yet the positional chain cannot be
//! trusted, and callers fall back to a [`FallbackSignature`]: a version-5 UUID
//! over the node's local shape in a configurable namespace.

use std::fmt;

use uuid::Uuid;

use crate::ids::{DeclarationId, Ordinal};

pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const SIGNATURE_TAG: &[u8] = b"lineage:signature:v1";
const CHILD_SEPARATOR: u8 = 0x1f;

/// Default namespace for fallback signatures.
pub const DEFAULT_NAMESPACE: Uuid = Uuid::from_u128(0x6c1e_a9b0_4d2f_5e37_9a81_03c4_7f5d_b2e6);

const fn fold_bytes(mut acc: u64, bytes: &[u8]) -> u64 {
	let mut i = 0;
	while i < bytes.len() {
		acc ^= bytes[i] as u64;
		acc = acc.wrapping_mul(FNV_PRIME);
		i += 1;
	}
	acc
}

/// 64-bit cumulative signature of a tree position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(u64);

impl Signature {
	/// Seed every chain and sketch starts from.
	pub const SEED: Self = Self(fold_bytes(FNV_OFFSET_BASIS, SIGNATURE_TAG));

	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	pub const fn raw(self) -> u64 {
		self.0
	}

	#[must_use]
	pub const fn fold(self, bytes: &[u8]) -> Self {
		Self(fold_bytes(self.0, bytes))
	}
}

impl Default for Signature {
	fn default() -> Self {
		Self::SEED
	}
}

impl fmt::Debug for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Signature({:016x})", self.0)
	}
}

impl fmt::Display for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:016x}", self.0)
	}
}

/// Folds one `(declaration, ordinal)` step into `parent`.
///
/// The step is encoded as `"{len}:{declaration}#{ordinal};"`; the length
/// prefix keeps adjacent steps from aliasing when ids contain `#` or `;`.
pub fn extend(parent: Signature, declaration: &DeclarationId, ordinal: Ordinal) -> Signature {
	let step = format!("{}:{}#{};", declaration.as_str().len(), declaration, ordinal);
	parent.fold(step.as_bytes())
}

/// Sketch of a node's immediate children, in render order.
///
/// Ordinals are not part of the sketch; two nodes rendering the same child
/// declaration sequence share a sketch.
pub fn children_sketch<'a, I>(children: I) -> Signature
where
	I: IntoIterator<Item = &'a DeclarationId>,
{
	children
		.into_iter()
		.fold(Signature::SEED, |acc, child| acc.fold(child.as_str().as_bytes()).fold(&[CHILD_SEPARATOR]))
}

/// Namespaced deterministic identity used before a subtree has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FallbackSignature(Uuid);

impl FallbackSignature {
	pub const fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl fmt::Display for FallbackSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

/// Computes the version-5 fallback identity of a node from its local shape.
pub fn fallback_signature(declaration: &DeclarationId, ordinal: Ordinal, sketch: Signature, namespace: &Uuid) -> FallbackSignature {
	let name = format!("{declaration}\u{1f}{ordinal}\u{1f}{sketch}");
	FallbackSignature(Uuid::new_v5(namespace, name.as_bytes()))
}
