use tokio::sync::watch;

/// Which arm of a settle-or-deadline race finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionPath {
	/// The watched work reported that it settled.
	Settled,
	/// The deadline elapsed before the work settled.
	TimedOut,
	/// The watched work failed before settling.
	Failed,
}

impl CompletionPath {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Settled => "settled",
			Self::TimedOut => "timed_out",
			Self::Failed => "failed",
		}
	}
}

/// Single-assignment completion latch.
///
/// Any number of clones may call [`Completion::complete`]; exactly one call
/// records its path and every later call is rejected. Waiters observe the
/// recorded path even if they start waiting after it was set.
#[derive(Debug, Clone)]
pub struct Completion {
	tx: watch::Sender<Option<CompletionPath>>,
}

impl Default for Completion {
	fn default() -> Self {
		Self::new()
	}
}

impl Completion {
	/// Creates an open latch.
	pub fn new() -> Self {
		let (tx, _rx) = watch::channel(None);
		Self { tx }
	}

	/// Records `path` if the latch is still open. Returns `true` for the winner.
	pub fn complete(&self, path: CompletionPath) -> bool {
		let won = self.tx.send_if_modified(|slot| {
			if slot.is_some() {
				return false;
			}
			*slot = Some(path);
			true
		});
		if won {
			tracing::trace!(path = path.as_str(), "worker.completion");
		}
		won
	}

	/// Returns the recorded path, if any.
	pub fn path(&self) -> Option<CompletionPath> {
		*self.tx.borrow()
	}

	pub fn is_complete(&self) -> bool {
		self.path().is_some()
	}

	/// Waits until a path has been recorded.
	pub async fn wait(&self) -> CompletionPath {
		let mut rx = self.tx.subscribe();
		loop {
			if let Some(path) = *rx.borrow_and_update() {
				return path;
			}
			// The sender lives in `self`, so the channel cannot close while we wait.
			if rx.changed().await.is_err() {
				return CompletionPath::Failed;
			}
		}
	}
}
