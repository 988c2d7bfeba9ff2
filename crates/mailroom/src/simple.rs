use std::collections::VecDeque;
use std::sync::Arc;

use crate::context::Context;
use crate::mailbox::{ActorContext, ActorRef, Processor};

/// Per-message processing callback of a simple actor.
pub trait Handler<M>: Send + 'static {
	fn run(&mut self, msg: M, cx: &ActorContext<M>) -> anyhow::Result<()>;
}

impl<M, F> Handler<M> for F
where
	F: FnMut(M, &ActorContext<M>) -> anyhow::Result<()> + Send + 'static,
{
	fn run(&mut self, msg: M, cx: &ActorContext<M>) -> anyhow::Result<()> {
		self(msg, cx)
	}
}

struct Simple<H> {
	handler: H,
}

impl<M, H> Processor<M> for Simple<H>
where
	M: Send + 'static,
	H: Handler<M>,
{
	type Unit = M;

	fn take(&self, queue: &mut VecDeque<M>) -> Option<M> {
		queue.pop_front()
	}

	fn process(&mut self, msg: M, cx: &ActorContext<M>) -> anyhow::Result<()> {
		self.handler.run(msg, cx)
	}
}

impl Context {
	/// Builds an actor that handles its messages one at a time, in arrival order.
	pub fn simple_actor<M, H>(&self, name: impl Into<Arc<str>>, handler: H) -> ActorRef<M>
	where
		M: Send + 'static,
		H: Handler<M>,
	{
		ActorRef::spawn(self, name, Simple { handler })
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;
	use crate::{InlineExecutor, ManualExecutor};

	struct Recorder {
		seen: Arc<Mutex<Vec<String>>>,
	}

	impl Handler<String> for Recorder {
		fn run(&mut self, msg: String, cx: &ActorContext<String>) -> anyhow::Result<()> {
			self.seen.lock().push(format!("{}:{msg}", cx.name()));
			Ok(())
		}
	}

	#[test]
	fn struct_handlers_receive_messages_in_order() {
		let ctx = Context::new(InlineExecutor).expect("context");
		let seen = Arc::new(Mutex::new(Vec::new()));
		let actor = ctx.simple_actor(
			"recorder",
			Recorder {
				seen: Arc::clone(&seen),
			},
		);

		actor.send("a".to_string()).expect("open");
		actor.send("b".to_string()).expect("open");
		assert_eq!(*seen.lock(), vec!["recorder:a".to_string(), "recorder:b".to_string()]);
	}

	#[test]
	fn one_drain_handles_everything_queued() {
		let executor = ManualExecutor::new();
		let ctx = Context::new(executor.clone()).expect("context");
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let actor = ctx.simple_actor("queued", move |msg: u8, _cx: &ActorContext<u8>| -> anyhow::Result<()> {
			sink.lock().push(msg);
			Ok(())
		});

		for i in 0..4 {
			actor.send(i).expect("open");
		}
		assert_eq!(executor.pending(), 1, "only the first send submits a drain");
		assert_eq!(actor.queued(), 4);

		assert_eq!(executor.run_pending(), 1);
		assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);
		assert_eq!(actor.queued(), 0);
	}
}
