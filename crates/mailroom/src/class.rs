use serde::Deserialize;

/// Execution classes that decide where drain tasks run.
///
/// Drains run user handlers synchronously. Only handlers that never block may
/// use [`TaskClass::Interactive`]; a blocked async worker stalls timers and
/// async sends of every actor on the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
	/// Short, non-blocking handlers run directly on the async worker threads.
	Interactive,
	/// Ordinary handlers run on the runtime's blocking pool.
	#[default]
	Background,
	/// Handlers that may block for long stretches get a dedicated thread per drain.
	Blocking,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::Blocking => "blocking",
		}
	}
}
