//! Worker substrates that drain tasks are submitted to.
//!
//! The runtime never spawns threads of its own for actor work: every drain
//! task goes through an [`Executor`]. [`TokioExecutor`] is the production
//! substrate; [`ManualExecutor`] and [`InlineExecutor`] exist so tests can
//! control exactly when a drain runs.

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::TaskClass;

const BLOCKING_THREAD_NAME: &str = "mailroom-blocking";

/// A unit of work submitted to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Task submission facility used by a [`Context`](crate::Context).
pub trait Executor: Send + Sync + 'static {
	/// Runs `task` at some point, on some thread.
	fn execute(&self, task: Task);
}

impl<F> Executor for F
where
	F: Fn(Task) + Send + Sync + 'static,
{
	fn execute(&self, task: Task) {
		self(task)
	}
}

/// Returns the current tokio runtime handle, falling back to a lazily built
/// process-global runtime when called outside of one.
pub(crate) fn runtime_handle() -> std::io::Result<Handle> {
	if let Ok(handle) = Handle::try_current() {
		return Ok(handle);
	}

	static GLOBAL_RT: OnceLock<Runtime> = OnceLock::new();
	if let Some(runtime) = GLOBAL_RT.get() {
		return Ok(runtime.handle().clone());
	}
	let runtime = Builder::new_multi_thread()
		.enable_all()
		.worker_threads(2)
		.thread_name("mailroom-global")
		.build()?;
	Ok(GLOBAL_RT.get_or_init(|| runtime).handle().clone())
}

/// Executor backed by a tokio runtime.
///
/// Drain tasks run synchronous handlers, so only [`TaskClass::Interactive`]
/// puts them on the async worker threads that also drive timers and
/// `send_async` continuations. [`TaskClass::Background`] uses the blocking
/// pool and [`TaskClass::Blocking`] gets a dedicated thread per drain.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
	handle: Handle,
	class: TaskClass,
}

impl TokioExecutor {
	/// Creates an executor submitting to `handle`.
	pub fn new(handle: Handle, class: TaskClass) -> Self {
		Self { handle, class }
	}

	/// Creates an executor on the current runtime, or the global fallback runtime.
	pub fn current(class: TaskClass) -> std::io::Result<Self> {
		Ok(Self::new(runtime_handle()?, class))
	}

	/// Runs `task` on a dedicated thread with the runtime entered.
	///
	/// Falls back to the blocking pool if the OS refuses a new thread, so a
	/// submitted drain is never lost.
	fn spawn_thread(&self, task: Task) {
		let slot = Arc::new(Mutex::new(Some(task)));
		let thread_slot = Arc::clone(&slot);
		let handle = self.handle.clone();
		let spawned = std::thread::Builder::new().name(BLOCKING_THREAD_NAME.to_string()).spawn(move || {
			let _runtime = handle.enter();
			let task = thread_slot.lock().take();
			if let Some(task) = task {
				task();
			}
		});
		if let Err(err) = spawned {
			tracing::warn!(error = %err, "executor.thread_spawn_failed");
			let task = slot.lock().take();
			if let Some(task) = task {
				self.handle.spawn_blocking(task);
			}
		}
	}
}

impl Executor for TokioExecutor {
	fn execute(&self, task: Task) {
		tracing::trace!(worker_class = self.class.as_str(), "executor.submit");
		match self.class {
			TaskClass::Interactive => {
				self.handle.spawn(async move { task() });
			}
			TaskClass::Background => {
				self.handle.spawn_blocking(task);
			}
			TaskClass::Blocking => self.spawn_thread(task),
		}
	}
}

/// Deterministic executor: tasks run only when the owner asks for them.
///
/// Clones share one queue, so a test can hand one clone to the context and
/// keep another to step the work.
#[derive(Clone, Default)]
pub struct ManualExecutor {
	queue: Arc<Mutex<VecDeque<Task>>>,
}

impl ManualExecutor {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of submitted tasks that have not run yet.
	pub fn pending(&self) -> usize {
		self.queue.lock().len()
	}

	/// Runs the oldest pending task on the calling thread.
	///
	/// Returns `false` when nothing was pending.
	pub fn run_next(&self) -> bool {
		// The lock must be released before the task runs; it may submit more work.
		let task = self.queue.lock().pop_front();
		match task {
			Some(task) => {
				task();
				true
			}
			None => false,
		}
	}

	/// Runs tasks until the queue is empty, including ones submitted meanwhile.
	pub fn run_pending(&self) -> usize {
		let mut ran = 0;
		while self.run_next() {
			ran += 1;
		}
		ran
	}
}

impl std::fmt::Debug for ManualExecutor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ManualExecutor").field("pending", &self.pending()).finish()
	}
}

impl Executor for ManualExecutor {
	fn execute(&self, task: Task) {
		self.queue.lock().push_back(task);
	}
}

/// Executor that runs every task immediately on the submitting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
	fn execute(&self, task: Task) {
		task();
	}
}
