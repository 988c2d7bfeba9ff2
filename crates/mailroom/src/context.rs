//! Shared runtime facility for a group of actors.
//!
//! A [`Context`] bundles the worker substrate drain tasks run on, the failure
//! reporter, a timer for delayed sends and, when enabled, the in-flight
//! counter behind [`Context::wait_for_inactivity`]. It is passed explicitly to
//! every actor constructor and is cheap to clone.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::activity::{ActivityGuard, ActivityTracker};
use crate::error::{ContextError, Failure};
use crate::executor::{Executor, TokioExecutor, runtime_handle};
use crate::mailbox::ActorRef;
use crate::timer::Timer;
use crate::{ContextConfig, TaskClass};

/// Callback receiving every failure absorbed by the runtime.
pub type FailureReporter = Arc<dyn Fn(&Failure) + Send + Sync>;

fn log_failure(failure: &Failure) {
	tracing::error!(actor = failure.actor(), error = %failure, "actor.failure");
}

/// Runtime owned by a context built from config.
///
/// The last context clone may be dropped on one of the runtime's own workers,
/// where a blocking runtime drop would panic.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
	fn drop(&mut self) {
		if let Some(runtime) = self.0.take() {
			runtime.shutdown_background();
		}
	}
}

struct ContextInner {
	executor: Arc<dyn Executor>,
	reporter: FailureReporter,
	timer: Timer,
	activity: Option<Arc<ActivityTracker>>,
	closed: AtomicBool,
	_runtime: OwnedRuntime,
}

/// Shared worker substrate, failure reporter and timer for a group of actors.
#[derive(Clone)]
pub struct Context {
	inner: Arc<ContextInner>,
}

impl std::fmt::Debug for Context {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Context")
			.field("closed", &self.is_closed())
			.field("in_flight", &self.in_flight())
			.finish_non_exhaustive()
	}
}

impl Context {
	/// Starts building a context.
	pub fn builder() -> ContextBuilder {
		ContextBuilder::default()
	}

	/// Creates a context submitting drain tasks to `executor`.
	///
	/// Timers run on the current tokio runtime, or on a process-global one.
	pub fn new(executor: impl Executor) -> Result<Self, ContextError> {
		Self::builder().executor(executor).build()
	}

	/// Creates a context that owns a dedicated multi-thread runtime.
	pub fn from_config(config: &ContextConfig) -> Result<Self, ContextError> {
		if config.worker_threads == 0 {
			return Err(ContextError::InvalidConfig("worker_threads must be > 0".to_string()));
		}
		let runtime = Builder::new_multi_thread()
			.enable_all()
			.worker_threads(config.worker_threads)
			.thread_name(config.thread_name.clone())
			.build()?;

		let mut builder = Self::builder().tokio(runtime.handle().clone(), config.class);
		if config.track_inactivity {
			builder = builder.track_inactivity();
		}
		builder.owned_runtime = Some(runtime);
		builder.build()
	}

	/// Hands `failure` to the configured reporter.
	///
	/// A panicking reporter is contained here so it cannot take a drain down with it.
	pub fn report_failure(&self, failure: &Failure) {
		let reporter = &self.inner.reporter;
		if catch_unwind(AssertUnwindSafe(|| reporter(failure))).is_err() {
			tracing::error!(actor = failure.actor(), "actor.failure.reporter_panicked");
		}
	}

	/// Sends `msg` to `target` once `delay` has elapsed.
	///
	/// Delivery is an ordinary send at fire time. A zero delay fires as soon as
	/// the timer gets to it. Scheduled sends cannot be cancelled, and the
	/// pending send keeps `target` alive until it fires.
	pub fn schedule<M>(&self, target: &ActorRef<M>, msg: M, delay: Duration)
	where
		M: Send + 'static,
	{
		if self.is_closed() {
			tracing::debug!(actor = %target.name(), "timer.schedule.rejected_closed");
			return;
		}
		tracing::debug!(actor = %target.name(), delay_ms = delay.as_millis() as u64, "timer.schedule");
		let target = target.clone();
		self.inner.timer.schedule(delay, self.activity_guard(), move || {
			if target.send(msg).is_err() {
				tracing::debug!(actor = %target.name(), "timer.fire.closed");
			}
		});
	}

	/// Blocks until no drain task, timer or async send is in flight.
	///
	/// Must not be called from a thread of the runtime the actors run on.
	pub fn wait_for_inactivity(&self) -> Result<(), ContextError> {
		self.tracker()?.wait();
		Ok(())
	}

	/// Like [`Self::wait_for_inactivity`], giving up after `timeout`.
	///
	/// Returns `Ok(false)` if work was still in flight at the deadline.
	pub fn wait_for_inactivity_timeout(&self, timeout: Duration) -> Result<bool, ContextError> {
		Ok(self.tracker()?.wait_timeout(timeout))
	}

	/// Units of work currently in flight, if inactivity tracking is enabled.
	pub fn in_flight(&self) -> Option<usize> {
		self.inner.activity.as_ref().map(|tracker| tracker.in_flight())
	}

	/// Tears the context down.
	///
	/// Pending scheduled sends are discarded, new ones are ignored, and sends
	/// fail with [`SendError::Closed`](crate::SendError::Closed). Drains
	/// already running finish their cycle.
	pub fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		self.inner.timer.shutdown();
		tracing::debug!(in_flight = ?self.in_flight(), "context.shutdown");
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::Acquire)
	}

	/// Runtime that timers and `send_async` continuations run on.
	pub fn runtime(&self) -> &Handle {
		self.inner.timer.handle()
	}

	pub(crate) fn executor(&self) -> &dyn Executor {
		self.inner.executor.as_ref()
	}

	pub(crate) fn activity_guard(&self) -> ActivityGuard {
		ActivityGuard::acquire(self.inner.activity.as_ref())
	}

	fn tracker(&self) -> Result<&ActivityTracker, ContextError> {
		self.inner.activity.as_deref().ok_or(ContextError::InactivityNotTracked)
	}
}

/// Builder for [`Context`].
#[derive(Default)]
pub struct ContextBuilder {
	executor: Option<Arc<dyn Executor>>,
	runtime: Option<Handle>,
	reporter: Option<FailureReporter>,
	track_inactivity: bool,
	owned_runtime: Option<Runtime>,
}

impl ContextBuilder {
	/// Sets the worker substrate. Required.
	#[must_use]
	pub fn executor(mut self, executor: impl Executor) -> Self {
		self.executor = Some(Arc::new(executor));
		self
	}

	/// Runs drain tasks, timers and async sends on `handle`.
	#[must_use]
	pub fn tokio(mut self, handle: Handle, class: TaskClass) -> Self {
		self.executor = Some(Arc::new(TokioExecutor::new(handle.clone(), class)));
		self.runtime = Some(handle);
		self
	}

	/// Runs timers and async sends on `handle`.
	#[must_use]
	pub fn runtime(mut self, handle: Handle) -> Self {
		self.runtime = Some(handle);
		self
	}

	/// Replaces the default logging reporter.
	#[must_use]
	pub fn reporter(mut self, reporter: impl Fn(&Failure) + Send + Sync + 'static) -> Self {
		self.reporter = Some(Arc::new(reporter));
		self
	}

	/// Enables [`Context::wait_for_inactivity`].
	#[must_use]
	pub fn track_inactivity(mut self) -> Self {
		self.track_inactivity = true;
		self
	}

	pub fn build(self) -> Result<Context, ContextError> {
		let executor = self.executor.ok_or(ContextError::MissingExecutor)?;
		let runtime = match self.runtime {
			Some(handle) => handle,
			None => runtime_handle()?,
		};
		Ok(Context {
			inner: Arc::new(ContextInner {
				executor,
				reporter: self.reporter.unwrap_or_else(|| Arc::new(log_failure) as FailureReporter),
				timer: Timer::new(runtime),
				activity: self.track_inactivity.then(|| Arc::new(ActivityTracker::new())),
				closed: AtomicBool::new(false),
				_runtime: OwnedRuntime(self.owned_runtime),
			}),
		})
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;
	use crate::{ActorContext, InlineExecutor, ManualExecutor, SendError};

	#[test]
	fn build_without_executor_fails() {
		let err = Context::builder().build().expect_err("executor is required");
		assert!(matches!(err, ContextError::MissingExecutor));
	}

	#[test]
	fn zero_worker_threads_is_rejected() {
		let err = Context::from_config(&ContextConfig::default().worker_threads(0)).expect_err("invalid config");
		assert!(matches!(err, ContextError::InvalidConfig(_)));
	}

	#[test]
	fn waiting_requires_tracking() {
		let ctx = Context::new(InlineExecutor).expect("context");
		assert!(matches!(ctx.wait_for_inactivity(), Err(ContextError::InactivityNotTracked)));
		assert_eq!(ctx.in_flight(), None);
	}

	#[test]
	fn panicking_reporter_is_contained() {
		let ctx = Context::builder()
			.executor(InlineExecutor)
			.reporter(|_| panic!("reporter down"))
			.build()
			.expect("context");
		ctx.report_failure(&Failure::Panicked {
			actor: "probe".into(),
			message: "boom".to_string(),
		});
	}

	#[test]
	fn from_config_runs_actors_on_owned_runtime() {
		let ctx = Context::from_config(&ContextConfig::default().track_inactivity()).expect("context");
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let actor = ctx.simple_actor("owned", move |msg: u32, _cx: &ActorContext<u32>| -> anyhow::Result<()> {
			sink.lock().push(msg);
			Ok(())
		});
		for i in 0..10 {
			actor.send(i).expect("open");
		}
		ctx.wait_for_inactivity().expect("tracked");
		assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
	}

	#[test]
	fn schedule_counts_as_in_flight_until_absorbed() {
		let executor = ManualExecutor::new();
		let ctx = Context::builder()
			.executor(executor.clone())
			.track_inactivity()
			.build()
			.expect("context");
		let actor = ctx.simple_actor("scheduled", |_: (), _cx: &ActorContext<()>| -> anyhow::Result<()> { Ok(()) });

		ctx.schedule(&actor, (), Duration::from_millis(10));
		assert_eq!(ctx.in_flight(), Some(1));

		// Once the timer fires the send submits a drain, which holds its own unit.
		let deadline = std::time::Instant::now() + Duration::from_secs(5);
		while executor.pending() == 0 && std::time::Instant::now() < deadline {
			std::thread::sleep(Duration::from_millis(1));
		}
		assert_eq!(executor.pending(), 1);
		assert!(!ctx.wait_for_inactivity_timeout(Duration::from_millis(20)).expect("tracked"));
		executor.run_pending();
		assert!(ctx.wait_for_inactivity_timeout(Duration::from_secs(5)).expect("tracked"));
	}

	#[test]
	fn blocked_handler_does_not_delay_timers() {
		let ctx = Context::from_config(&ContextConfig::default().worker_threads(1).track_inactivity()).expect("context");
		let hog = ctx.simple_actor("hog", |_: (), _cx: &ActorContext<()>| -> anyhow::Result<()> {
			std::thread::sleep(Duration::from_millis(800));
			Ok(())
		});
		let (tx, rx) = std::sync::mpsc::channel();
		let tick = ctx.simple_actor("tick", move |at: std::time::Instant, _cx: &ActorContext<std::time::Instant>| -> anyhow::Result<()> {
			let _ = tx.send(at.elapsed());
			Ok(())
		});

		ctx.schedule(&tick, std::time::Instant::now(), Duration::from_millis(20));
		hog.send(()).expect("open");

		let delivered = rx.recv_timeout(Duration::from_secs(5)).expect("timer delivered");
		assert!(delivered < Duration::from_millis(400), "timer waited on the hog: {delivered:?}");
		ctx.wait_for_inactivity().expect("tracked");
	}

	#[test]
	fn zero_delay_schedule_delivers_promptly() {
		let ctx = Context::from_config(&ContextConfig::default().track_inactivity()).expect("context");
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let actor = ctx.simple_actor("now", move |msg: u32, _cx: &ActorContext<u32>| -> anyhow::Result<()> {
			sink.lock().push(msg);
			Ok(())
		});

		ctx.schedule(&actor, 7, Duration::ZERO);
		assert!(ctx.wait_for_inactivity_timeout(Duration::from_secs(5)).expect("tracked"));
		assert_eq!(*seen.lock(), vec![7]);
	}

	#[test]
	fn messages_queued_before_shutdown_are_still_processed() {
		let executor = ManualExecutor::new();
		let ctx = Context::new(executor.clone()).expect("context");
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let actor = ctx.simple_actor("draining", move |msg: u32, cx: &ActorContext<u32>| -> anyhow::Result<()> {
			if msg == 1 {
				cx.context().shutdown();
				let rejected = cx.myself().send(99).expect_err("closed mid-drain");
				assert_eq!(rejected.into_inner(), 99);
			}
			sink.lock().push(msg);
			Ok(())
		});

		for msg in 1..=3 {
			actor.send(msg).expect("open");
		}
		assert_eq!(executor.run_pending(), 1);
		assert_eq!(*seen.lock(), vec![1, 2, 3]);
		assert!(matches!(actor.send(4), Err(SendError::Closed(4))));
	}

	#[test]
	fn shutdown_is_idempotent_and_closes() {
		let ctx = Context::new(InlineExecutor).expect("context");
		assert!(!ctx.is_closed());
		ctx.shutdown();
		ctx.shutdown();
		assert!(ctx.is_closed());
	}
}
