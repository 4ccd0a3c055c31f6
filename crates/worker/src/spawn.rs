use std::future::Future;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::JoinHandle;

use crate::TaskClass;

/// Spawns an async task on the runtime the caller is running in.
///
/// Speculative resolution always runs inside the host's runtime, so there is no
/// fallback runtime: calling this outside of one is reported to the caller.
pub fn spawn<F>(class: TaskClass, fut: F) -> Result<JoinHandle<F::Output>, TryCurrentError>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	let handle = Handle::try_current()?;
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	Ok(handle.spawn(fut))
}
