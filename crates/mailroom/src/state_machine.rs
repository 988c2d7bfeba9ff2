//! Actors whose behavior is the current [`State`].
//!
//! A state is an immutable value: handling a message produces the next state,
//! which replaces the current one wholesale. A failed transition (an `Err` or
//! a panic) leaves the actor in the state it had before the message.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::context::Context;
use crate::mailbox::{ActorContext, ActorRef, Processor};

/// One state of a state-machine actor.
pub trait State<M>: Send + 'static {
	/// Consumes `msg` and returns the state that handles the next message.
	fn transition(&self, msg: M, cx: &ActorContext<M>) -> anyhow::Result<Box<dyn State<M>>>;

	/// Label used in transition logs.
	fn name(&self) -> &str {
		std::any::type_name::<Self>()
	}
}

struct StateMachine<M> {
	current: Box<dyn State<M>>,
}

impl<M> Processor<M> for StateMachine<M>
where
	M: Send + 'static,
{
	type Unit = M;

	fn take(&self, queue: &mut VecDeque<M>) -> Option<M> {
		queue.pop_front()
	}

	fn process(&mut self, msg: M, cx: &ActorContext<M>) -> anyhow::Result<()> {
		let next = self.current.transition(msg, cx)?;
		tracing::debug!(actor = cx.name(), from = self.current.name(), to = next.name(), "state_machine.transition");
		self.current = next;
		Ok(())
	}
}

impl Context {
	/// Builds an actor that dispatches every message to its current state.
	pub fn state_machine_actor<M, S>(&self, name: impl Into<Arc<str>>, initial: S) -> ActorRef<M>
	where
		M: Send + 'static,
		S: State<M>,
	{
		ActorRef::spawn(
			self,
			name,
			StateMachine {
				current: Box::new(initial),
			},
		)
	}
}
