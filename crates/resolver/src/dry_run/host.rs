use async_trait::async_trait;

use super::DryRunContext;
use crate::error::HostError;
use crate::ids::{DeclarationId, ScopeId};

/// Options handed to the host when a detached root is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedRootOptions {
	/// Isolated scope the detached render belongs to.
	pub scope: ScopeId,
}

/// The component invocation a detached root renders once.
#[derive(Debug, Clone)]
pub struct RenderRequest<P> {
	pub component: DeclarationId,
	pub props: P,
}

/// Off-screen render target owned by one dry run.
#[async_trait(?Send)]
pub trait DetachedRoot {
	type Props;

	/// Starts one render pass. The host reports positions, providers, and
	/// settlement through `ctx`, synchronously or later.
	fn render(&mut self, request: RenderRequest<Self::Props>, ctx: DryRunContext) -> Result<(), HostError>;

	/// Releases the render target. Must tolerate repeated calls.
	async fn unmount(&mut self);
}

/// Factory for detached roots.
pub trait RenderHost {
	type Props;
	type Root: DetachedRoot<Props = Self::Props>;

	fn create_detached_root(&self, options: &DetachedRootOptions) -> Result<Self::Root, HostError>;
}

/// Undoes one [`AsyncGlobals::disable`]. Called exactly once.
pub type Restore = Box<dyn FnOnce()>;

/// Suppression of ambient timers and async side effects during a detached render.
pub trait AsyncGlobals {
	fn disable(&self) -> Restore;
}

/// Host without ambient async globals to suppress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAsyncGlobals;

impl AsyncGlobals for NoAsyncGlobals {
	fn disable(&self) -> Restore {
		Box::new(|| {})
	}
}
