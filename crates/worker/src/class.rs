/// Execution classes used to tag spawned work in trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work belonging to a detached speculative render.
	Speculative,
	/// Deadline timers racing a settle notification.
	Timer,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Speculative => "speculative",
			Self::Timer => "timer",
		}
	}
}
