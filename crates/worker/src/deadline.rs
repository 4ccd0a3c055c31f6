use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::completion::{Completion, CompletionPath};
use crate::{TaskClass, spawn};

/// Waits for `completion` to be recorded or for `deadline` to elapse.
///
/// The deadline is a cancellable timer task racing the settle notification;
/// both write the same latch, so exactly one path is recorded no matter which
/// arm fires first. The timer is cancelled once the race is decided, and also
/// when the returned future is dropped mid-wait. `owner` names the work being
/// waited on in trace output.
pub async fn settle_or_deadline(completion: &Completion, deadline: Duration, owner: TaskClass) -> CompletionPath {
	if let Some(path) = completion.path() {
		return path;
	}

	let cancel = CancellationToken::new();
	let _cancel_on_drop = cancel.clone().drop_guard();
	let timer = {
		let completion = completion.clone();
		let cancel = cancel.clone();
		spawn(TaskClass::Timer, async move {
			tokio::select! {
				() = cancel.cancelled() => {}
				() = tokio::time::sleep(deadline) => {
					completion.complete(CompletionPath::TimedOut);
				}
			}
		})
	};

	let path = match timer {
		Ok(_) => completion.wait().await,
		Err(err) => {
			tracing::debug!(owner = owner.as_str(), error = %err, "worker.deadline.inline");
			tokio::select! {
				path = completion.wait() => path,
				() = tokio::time::sleep(deadline) => {
					completion.complete(CompletionPath::TimedOut);
					completion.path().unwrap_or(CompletionPath::TimedOut)
				}
			}
		}
	};
	cancel.cancel();
	tracing::trace!(owner = owner.as_str(), path = path.as_str(), "worker.deadline");
	path
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn deadline_fires_when_nothing_settles() {
		let latch = Completion::new();
		let path = settle_or_deadline(&latch, Duration::from_millis(50), TaskClass::Speculative).await;
		assert_eq!(path, CompletionPath::TimedOut);
		assert!(!latch.complete(CompletionPath::Settled));
	}

	#[tokio::test(start_paused = true)]
	async fn settle_beats_deadline() {
		let latch = Completion::new();
		let writer = latch.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(5)).await;
			writer.complete(CompletionPath::Settled);
		});
		let path = settle_or_deadline(&latch, Duration::from_secs(10), TaskClass::Speculative).await;
		assert_eq!(path, CompletionPath::Settled);

		// The cancelled timer must not overwrite the decided path.
		tokio::time::sleep(Duration::from_secs(20)).await;
		assert_eq!(latch.path(), Some(CompletionPath::Settled));
	}

	#[tokio::test]
	async fn already_complete_returns_immediately() {
		let latch = Completion::new();
		latch.complete(CompletionPath::Failed);
		let path = settle_or_deadline(&latch, Duration::from_secs(60), TaskClass::Speculative).await;
		assert_eq!(path, CompletionPath::Failed);
	}
}
