use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// In-flight work counter backing `Context::wait_for_inactivity`.
///
/// Every submitted drain, pending timer and outstanding async send holds one
/// unit. A unit is only released after any follow-up work it triggered has
/// acquired its own, so the count reaching zero means the whole graph of
/// actors is quiet.
#[derive(Debug, Default)]
pub(crate) struct ActivityTracker {
	in_flight: Mutex<usize>,
	idle: Condvar,
}

impl ActivityTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn begin(&self) {
		*self.in_flight.lock() += 1;
	}

	pub fn end(&self) {
		let mut in_flight = self.in_flight.lock();
		debug_assert!(*in_flight > 0, "activity released more often than acquired");
		*in_flight = in_flight.saturating_sub(1);
		if *in_flight == 0 {
			self.idle.notify_all();
		}
	}

	pub fn in_flight(&self) -> usize {
		*self.in_flight.lock()
	}

	pub fn wait(&self) {
		let mut in_flight = self.in_flight.lock();
		while *in_flight > 0 {
			self.idle.wait(&mut in_flight);
		}
	}

	/// Returns `false` if work was still in flight when `timeout` elapsed.
	pub fn wait_timeout(&self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		let mut in_flight = self.in_flight.lock();
		while *in_flight > 0 {
			if self.idle.wait_until(&mut in_flight, deadline).timed_out() {
				return *in_flight == 0;
			}
		}
		true
	}
}

/// Releases one unit of activity when dropped.
///
/// Keeps the counter balanced when the guarded work is dropped without
/// running, e.g. a timer discarded by shutdown or a task dropped by a
/// runtime that is going away.
pub(crate) struct ActivityGuard {
	tracker: Option<std::sync::Arc<ActivityTracker>>,
}

impl ActivityGuard {
	pub fn acquire(tracker: Option<&std::sync::Arc<ActivityTracker>>) -> Self {
		if let Some(tracker) = tracker {
			tracker.begin();
		}
		Self {
			tracker: tracker.cloned(),
		}
	}
}

impl Drop for ActivityGuard {
	fn drop(&mut self) {
		if let Some(tracker) = self.tracker.take() {
			tracker.end();
		}
	}
}
