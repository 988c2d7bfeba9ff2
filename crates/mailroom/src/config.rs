use serde::Deserialize;

use crate::TaskClass;

/// Declarative settings for [`Context::from_config`](crate::Context::from_config).
///
/// Every field has a default, so an empty TOML table is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
	/// Worker threads of the runtime the context owns.
	pub worker_threads: usize,
	/// Name given to the worker threads.
	pub thread_name: String,
	/// Class drain tasks are submitted under.
	pub class: TaskClass,
	/// Enables `wait_for_inactivity`.
	pub track_inactivity: bool,
}

impl Default for ContextConfig {
	fn default() -> Self {
		Self {
			worker_threads: 2,
			thread_name: "mailroom-worker".to_string(),
			class: TaskClass::Background,
			track_inactivity: false,
		}
	}
}

impl ContextConfig {
	/// Sets the worker thread count.
	#[must_use]
	pub fn worker_threads(mut self, threads: usize) -> Self {
		self.worker_threads = threads;
		self
	}

	/// Enables inactivity tracking.
	#[must_use]
	pub fn track_inactivity(mut self) -> Self {
		self.track_inactivity = true;
		self
	}
}
