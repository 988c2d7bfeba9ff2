//! Error types.
//!
//! [`Failure`] is what reaches the failure reporter; it is never returned to a
//! sender. [`ContextError`] is the only error that fails loudly, at
//! construction. [`SendError`] exists for sends after `Context::shutdown`.

use std::sync::Arc;

use thiserror::Error;

/// A failure absorbed by the runtime and handed to the failure reporter.
#[derive(Debug, Error)]
pub enum Failure {
	/// A handler, batch handler or state transition returned an error.
	#[error("actor `{actor}` failed to process a message: {source:#}")]
	Processing {
		actor: Arc<str>,
		#[source]
		source: anyhow::Error,
	},

	/// A handler, batch handler or state transition panicked.
	#[error("actor `{actor}` panicked while processing a message: {message}")]
	Panicked { actor: Arc<str>, message: String },

	/// The future passed to `send_async` resolved to an error or panicked.
	#[error("async message for actor `{actor}` did not resolve: {source:#}")]
	AsyncCompletion {
		actor: Arc<str>,
		#[source]
		source: anyhow::Error,
	},
}

impl Failure {
	/// Name of the actor the failure belongs to.
	pub fn actor(&self) -> &str {
		match self {
			Self::Processing { actor, .. } | Self::Panicked { actor, .. } | Self::AsyncCompletion { actor, .. } => actor,
		}
	}
}

/// Errors raised while building a [`Context`](crate::Context).
#[derive(Debug, Error)]
pub enum ContextError {
	/// No worker substrate was supplied.
	#[error("context requires an executor")]
	MissingExecutor,

	/// A configuration value cannot be honored.
	#[error("invalid context configuration: {0}")]
	InvalidConfig(String),

	/// The tokio runtime backing timers or workers could not be built.
	#[error("failed to start runtime: {0}")]
	Runtime(#[from] std::io::Error),

	/// Inactivity tracking was requested on a context built without it.
	#[error("context was built without inactivity tracking")]
	InactivityNotTracked,
}

/// Error returned by `ActorRef::send` once the context has been shut down.
///
/// Carries the rejected message back to the caller.
#[derive(PartialEq, Eq)]
pub enum SendError<M> {
	Closed(M),
}

impl<M> SendError<M> {
	/// Recovers the message that could not be delivered.
	pub fn into_inner(self) -> M {
		match self {
			Self::Closed(msg) => msg,
		}
	}
}

impl<M> std::fmt::Debug for SendError<M> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Closed(_) => f.write_str("Closed(..)"),
		}
	}
}

impl<M> std::fmt::Display for SendError<M> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Closed(_) => write!(f, "actor context is closed"),
		}
	}
}

impl<M> std::error::Error for SendError<M> {}
