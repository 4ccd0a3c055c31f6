//! Per-frame ordinal allocation for repeated invocations of one declaration.
//!
//! # Invariants
//!
//! - An ordinal is never held by two live claims of the same entry.
//! - A released ordinal is handed out again before any fresh one is minted,
//!   smallest first, so identical structures produce identical ordinals.
//! - Releasing a token with no active claim changes nothing.

use rustc_hash::FxHashMap;

use crate::ids::{ClaimToken, DeclarationId, Ordinal};

/// Ordinal bookkeeping for one declaration within one frame.
#[derive(Debug, Default, Clone)]
pub struct SequenceEntry {
	in_use: usize,
	next_salt: Ordinal,
	/// Released ordinals, sorted descending so `pop` yields the smallest.
	free: Vec<Ordinal>,
	claims: FxHashMap<ClaimToken, Option<Ordinal>>,
}

impl SequenceEntry {
	/// Returns the ordinal granted to `token`, granting one if needed.
	pub fn claim(&mut self, token: ClaimToken) -> Ordinal {
		if let Some(Some(ordinal)) = self.claims.get(&token) {
			return *ordinal;
		}
		let ordinal = match self.free.pop() {
			Some(recycled) => recycled,
			None => {
				let minted = self.next_salt;
				self.next_salt += 1;
				minted
			}
		};
		self.claims.insert(token, Some(ordinal));
		self.in_use += 1;
		ordinal
	}

	/// Records `token` as known but not yet granted an ordinal.
	pub fn reserve(&mut self, token: ClaimToken) {
		self.claims.entry(token).or_insert(None);
	}

	/// Releases `token`'s claim. Returns the freed ordinal, if one was held.
	pub fn release(&mut self, token: ClaimToken) -> Option<Ordinal> {
		let ordinal = self.claims.remove(&token).flatten()?;
		self.in_use -= 1;
		let at = self.free.partition_point(|&held| held > ordinal);
		self.free.insert(at, ordinal);
		Some(ordinal)
	}

	pub fn ordinal_of(&self, token: ClaimToken) -> Option<Ordinal> {
		self.claims.get(&token).copied().flatten()
	}

	/// Whether `token` holds a claim here, granted or reserved.
	pub fn is_known(&self, token: ClaimToken) -> bool {
		self.claims.contains_key(&token)
	}

	pub fn is_reserved(&self, token: ClaimToken) -> bool {
		matches!(self.claims.get(&token), Some(None))
	}

	pub fn in_use(&self) -> usize {
		self.in_use
	}

	pub fn next_salt(&self) -> Ordinal {
		self.next_salt
	}

	/// Released ordinals in the order they will be reused.
	pub fn free(&self) -> impl Iterator<Item = Ordinal> + '_ {
		self.free.iter().rev().copied()
	}
}

/// All sequence entries of one tree frame, keyed by declaration id.
#[derive(Debug, Default, Clone)]
pub struct SequenceTable {
	entries: FxHashMap<DeclarationId, SequenceEntry>,
}

impl SequenceTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn claim(&mut self, declaration: &DeclarationId, token: ClaimToken) -> Ordinal {
		self.entries.entry(declaration.clone()).or_default().claim(token)
	}

	pub fn reserve(&mut self, declaration: &DeclarationId, token: ClaimToken) {
		self.entries.entry(declaration.clone()).or_default().reserve(token);
	}

	pub fn release(&mut self, declaration: &DeclarationId, token: ClaimToken) -> Option<Ordinal> {
		match self.entries.get_mut(declaration) {
			Some(entry) if entry.is_known(token) => entry.release(token),
			_ => {
				tracing::trace!(declaration = %declaration, token = token.0, "sequence.release.unknown");
				None
			}
		}
	}

	pub fn ordinal_of(&self, declaration: &DeclarationId, token: ClaimToken) -> Option<Ordinal> {
		self.entries.get(declaration).and_then(|entry| entry.ordinal_of(token))
	}

	pub fn in_use(&self, declaration: &DeclarationId) -> usize {
		self.entries.get(declaration).map_or(0, SequenceEntry::in_use)
	}

	pub fn entry(&self, declaration: &DeclarationId) -> Option<&SequenceEntry> {
		self.entries.get(declaration)
	}
}
