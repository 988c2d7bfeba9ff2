use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::activity::ActivityGuard;

/// One-shot delayed callbacks on a tokio runtime.
///
/// Each scheduled callback is a task sleeping on the runtime's timer wheel.
/// Cancelling the shared token discards every callback that has not fired.
#[derive(Debug)]
pub(crate) struct Timer {
	handle: Handle,
	cancel: CancellationToken,
}

impl Timer {
	pub fn new(handle: Handle) -> Self {
		Self {
			handle,
			cancel: CancellationToken::new(),
		}
	}

	pub fn handle(&self) -> &Handle {
		&self.handle
	}

	/// Runs `fire` no earlier than `delay` from now.
	///
	/// `guard` is held until `fire` has returned or the callback was discarded.
	pub fn schedule<F>(&self, delay: Duration, guard: ActivityGuard, fire: F)
	where
		F: FnOnce() + Send + 'static,
	{
		if self.cancel.is_cancelled() {
			return;
		}
		let cancel = self.cancel.clone();
		self.handle.spawn(async move {
			let _guard = guard;
			tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					tracing::trace!("timer.discarded");
				}
				_ = tokio::time::sleep(delay) => fire(),
			}
		});
	}

	/// Discards pending callbacks and refuses new ones.
	pub fn shutdown(&self) {
		self.cancel.cancel();
	}
}
