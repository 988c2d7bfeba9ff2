use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::context::Context;
use crate::mailbox::{ActorContext, ActorRef, Processor};

/// Per-batch processing callback of a batch actor.
pub trait BatchHandler<M>: Send + 'static {
	fn run_batch(&mut self, batch: Vec<M>, cx: &ActorContext<M>) -> anyhow::Result<()>;
}

impl<M, F> BatchHandler<M> for F
where
	F: FnMut(Vec<M>, &ActorContext<M>) -> anyhow::Result<()> + Send + 'static,
{
	fn run_batch(&mut self, batch: Vec<M>, cx: &ActorContext<M>) -> anyhow::Result<()> {
		self(batch, cx)
	}
}

/// Snapshots the queue at the start of each unit.
///
/// Messages that arrive while `run_batch` executes are left for the next
/// unit. With `max_batch` set, only the oldest `max_batch` messages are taken.
struct Batched<H> {
	handler: H,
	max_batch: Option<NonZeroUsize>,
}

impl<M, H> Processor<M> for Batched<H>
where
	M: Send + 'static,
	H: BatchHandler<M>,
{
	type Unit = Vec<M>;

	fn take(&self, queue: &mut VecDeque<M>) -> Option<Vec<M>> {
		if queue.is_empty() {
			return None;
		}
		let len = match self.max_batch {
			Some(max) => queue.len().min(max.get()),
			None => queue.len(),
		};
		Some(queue.drain(..len).collect())
	}

	fn process(&mut self, batch: Vec<M>, cx: &ActorContext<M>) -> anyhow::Result<()> {
		tracing::trace!(actor = cx.name(), size = batch.len(), "batch.run");
		self.handler.run_batch(batch, cx)
	}
}

impl Context {
	/// Builds an actor that handles everything queued since its last batch in one call.
	pub fn batch_actor<M, H>(&self, name: impl Into<Arc<str>>, handler: H) -> ActorRef<M>
	where
		M: Send + 'static,
		H: BatchHandler<M>,
	{
		ActorRef::spawn(self, name, Batched { handler, max_batch: None })
	}

	/// Like [`Self::batch_actor`], but no batch holds more than `max_batch` messages.
	pub fn batch_actor_with_limit<M, H>(&self, name: impl Into<Arc<str>>, max_batch: NonZeroUsize, handler: H) -> ActorRef<M>
	where
		M: Send + 'static,
		H: BatchHandler<M>,
	{
		ActorRef::spawn(
			self,
			name,
			Batched {
				handler,
				max_batch: Some(max_batch),
			},
		)
	}
}
