//! Identifier newtypes shared across the engine.

use std::fmt;
use std::sync::Arc;

macro_rules! string_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
		pub struct $name(Arc<str>);

		impl $name {
			pub fn new(id: impl AsRef<str>) -> Self {
				Self(Arc::from(id.as_ref()))
			}

			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl fmt::Debug for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}({:?})", stringify!($name), &*self.0)
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl From<&str> for $name {
			fn from(id: &str) -> Self {
				Self::new(id)
			}
		}

		impl From<String> for $name {
			fn from(id: String) -> Self {
				Self(Arc::from(id))
			}
		}
	};
}

string_id!(
	/// Identifier of a component's static definition, shared by all its instances.
	DeclarationId
);
string_id!(
	/// Identifier of one concrete invocation (tree position) of a declaration.
	InstanceId
);
string_id!(
	/// Opaque isolation-boundary token. Compared by equality only.
	ScopeId
);
string_id!(
	/// Identifier of a module a runtime or upstream provider draws from.
	ModuleId
);
string_id!(
	/// Identifier of one declared provider entry.
	ProviderId
);

/// Sentinel naming the parent of the tree root.
pub const ROOT: &str = "__ROOT__";

impl ScopeId {
	/// The scope of the live tree root.
	pub fn root() -> Self {
		Self::new(ROOT)
	}

	pub fn is_root(&self) -> bool {
		self.as_str() == ROOT
	}

	/// Derives the id of an isolated dry-run scope nested under `self`.
	pub fn isolated(&self, run: u64) -> Self {
		Self::from(format!("{}#dry-run-{run}", self.as_str()))
	}
}

/// Per-render token identifying one invocation's claim on an ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClaimToken(pub u64);

/// Dense ordinal distinguishing repeated invocations at one tree position.
pub type Ordinal = u32;

/// Arena key of a declared component in a [`crate::providers::ComponentGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey(pub(crate) u32);

impl ComponentKey {
	pub const fn index(self) -> usize {
		self.0 as usize
	}
}

impl fmt::Display for ComponentKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "component#{}", self.0)
	}
}
