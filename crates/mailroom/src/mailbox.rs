//! Mailbox engine shared by every actor variant.
//!
//! Each actor owns a queue and a busy flag behind one lock. A send appends
//! and, if the flag was clear, sets it and submits a drain task. The drain
//! task takes units of work until the queue is empty; emptiness is observed
//! and the flag cleared under the same lock, so a message appended
//! concurrently either lands before the check (and is drained) or sees the
//! flag clear (and submits a fresh drain). No wakeup is lost and at most one
//! drain per actor runs at a time.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::context::Context;
use crate::error::{Failure, SendError};

/// Processing strategy plugged into the mailbox engine.
///
/// `take` decides what one unit of work is, `process` performs it. Both are
/// only called from the actor's single active drain.
pub(crate) trait Processor<M>: Send + 'static {
	type Unit;

	/// Removes the next unit from `queue`, or `None` when there is no work.
	fn take(&self, queue: &mut VecDeque<M>) -> Option<Self::Unit>;

	fn process(&mut self, unit: Self::Unit, cx: &ActorContext<M>) -> anyhow::Result<()>;
}

/// Type-erased view of an actor cell.
trait Mailbox<M>: Send + Sync {
	fn name(&self) -> &Arc<str>;
	fn context(&self) -> &Context;
	fn enqueue(&self, msg: M) -> Result<(), SendError<M>>;
	fn queued(&self) -> usize;
}

struct MailboxState<M> {
	queue: VecDeque<M>,
	busy: bool,
}

struct ActorCell<M, P> {
	name: Arc<str>,
	context: Context,
	state: Mutex<MailboxState<M>>,
	processor: Mutex<P>,
	myself: Weak<Self>,
}

impl<M, P> ActorCell<M, P>
where
	M: Send + 'static,
	P: Processor<M>,
{
	fn submit_drain(&self) {
		let Some(cell) = self.myself.upgrade() else {
			return;
		};
		let guard = self.context.activity_guard();
		tracing::trace!(actor = %self.name, "mailbox.drain.submit");
		self.context.executor().execute(Box::new(move || {
			Self::drain(cell);
			drop(guard);
		}));
	}

	fn drain(cell: Arc<Self>) {
		let cx = ActorContext {
			context: cell.context.clone(),
			myself: ActorRef { cell: cell.clone() },
		};
		let mut processor = cell.processor.lock();
		let mut units = 0usize;
		loop {
			let unit = {
				let mut state = cell.state.lock();
				match processor.take(&mut state.queue) {
					Some(unit) => unit,
					None => {
						state.busy = false;
						break;
					}
				}
			};
			units += 1;

			let outcome = catch_unwind(AssertUnwindSafe(|| processor.process(unit, &cx)));
			let failure = match outcome {
				Ok(Ok(())) => continue,
				Ok(Err(source)) => Failure::Processing {
					actor: Arc::clone(&cell.name),
					source,
				},
				Err(payload) => Failure::Panicked {
					actor: Arc::clone(&cell.name),
					message: panic_message(payload.as_ref()),
				},
			};
			cell.context.report_failure(&failure);
		}
		tracing::trace!(actor = %cell.name, units, "mailbox.drain.idle");
	}
}

impl<M, P> Mailbox<M> for ActorCell<M, P>
where
	M: Send + 'static,
	P: Processor<M>,
{
	fn name(&self) -> &Arc<str> {
		&self.name
	}

	fn context(&self) -> &Context {
		&self.context
	}

	fn enqueue(&self, msg: M) -> Result<(), SendError<M>> {
		if self.context.is_closed() {
			return Err(SendError::Closed(msg));
		}
		let was_busy = {
			let mut state = self.state.lock();
			state.queue.push_back(msg);
			std::mem::replace(&mut state.busy, true)
		};
		if !was_busy {
			self.submit_drain();
		}
		Ok(())
	}

	fn queued(&self) -> usize {
		self.state.lock().queue.len()
	}
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"non-string panic payload".to_string()
	}
}

/// Handle to an actor. Cloning it is cheap; the actor lives while any handle does.
pub struct ActorRef<M> {
	cell: Arc<dyn Mailbox<M>>,
}

impl<M> Clone for ActorRef<M> {
	fn clone(&self) -> Self {
		Self {
			cell: Arc::clone(&self.cell),
		}
	}
}

impl<M> std::fmt::Debug for ActorRef<M> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActorRef").field("name", self.cell.name()).finish_non_exhaustive()
	}
}

impl<M> ActorRef<M>
where
	M: Send + 'static,
{
	pub(crate) fn spawn<P>(context: &Context, name: impl Into<Arc<str>>, processor: P) -> Self
	where
		P: Processor<M>,
	{
		let name = name.into();
		tracing::debug!(actor = %name, "actor.spawn");
		let cell: Arc<ActorCell<M, P>> = Arc::new_cyclic(|myself| ActorCell {
			name,
			context: context.clone(),
			state: Mutex::new(MailboxState {
				queue: VecDeque::new(),
				busy: false,
			}),
			processor: Mutex::new(processor),
			myself: myself.clone(),
		});
		Self { cell }
	}

	/// Appends `msg` to the mailbox and makes sure a drain will see it.
	///
	/// Never blocks and never fails for capacity. The only error is
	/// [`SendError::Closed`] after the context was shut down.
	pub fn send(&self, msg: M) -> Result<(), SendError<M>> {
		self.cell.enqueue(msg)
	}

	/// Sends the value `fut` resolves to.
	///
	/// The future runs on the context's runtime; the caller is never blocked.
	/// An `Err` (or a panic) is handed to the failure reporter and nothing is
	/// delivered.
	pub fn send_async<F, E>(&self, fut: F)
	where
		F: Future<Output = Result<M, E>> + Send + 'static,
		E: Into<anyhow::Error> + Send + 'static,
	{
		let context = self.cell.context().clone();
		if context.is_closed() {
			tracing::debug!(actor = %self.name(), "actor.send_async.rejected_closed");
			return;
		}
		let guard = context.activity_guard();
		let target = self.clone();
		let runtime = context.runtime().clone();
		let resolving = runtime.spawn(fut);
		runtime.spawn(async move {
			let _guard = guard;
			let source = match resolving.await {
				Ok(Ok(msg)) => {
					if target.send(msg).is_err() {
						tracing::debug!(actor = %target.name(), "actor.send_async.closed");
					}
					return;
				}
				Ok(Err(err)) => err.into(),
				Err(err) if err.is_panic() => anyhow::anyhow!("future panicked: {}", panic_message(err.into_panic().as_ref())),
				Err(err) => anyhow::anyhow!("future did not complete: {err}"),
			};
			context.report_failure(&Failure::AsyncCompletion {
				actor: Arc::clone(target.cell.name()),
				source,
			});
		});
	}

	pub fn name(&self) -> &str {
		self.cell.name()
	}

	/// Context the actor was built on.
	pub fn context(&self) -> &Context {
		self.cell.context()
	}

	/// Messages waiting in the mailbox, not counting a unit being processed.
	pub fn queued(&self) -> usize {
		self.cell.queued()
	}
}

/// What a processing callback gets besides the message.
pub struct ActorContext<M> {
	context: Context,
	myself: ActorRef<M>,
}

impl<M> ActorContext<M>
where
	M: Send + 'static,
{
	pub fn context(&self) -> &Context {
		&self.context
	}

	/// Handle to the actor being drained.
	pub fn myself(&self) -> &ActorRef<M> {
		&self.myself
	}

	pub fn name(&self) -> &str {
		self.myself.name()
	}

	/// Schedules `msg` to this actor after `delay`.
	pub fn schedule_self(&self, msg: M, delay: Duration) {
		self.context.schedule(&self.myself, msg, delay);
	}
}
