//! Lightweight message-driven actors on a shared worker pool.
//!
//! Every actor owns an unbounded mailbox and a busy flag. Sending appends to
//! the mailbox and, when the actor is idle, submits one drain task to the
//! [`Context`]'s [`Executor`]; at most one drain per actor runs at a time, so
//! actor state needs no locking of its own. Three processing disciplines are
//! built on that engine:
//!
//! * [`Context::simple_actor`]: one [`Handler::run`] call per message.
//! * [`Context::batch_actor`]: one [`BatchHandler::run_batch`] call per
//!   snapshot of everything queued when the drain took its unit.
//! * [`Context::state_machine_actor`]: each message is handled by the current
//!   [`State`], whose transition yields the next one.
//!
//! Processing errors and panics never reach the sender; they go to the
//! context's failure reporter and the actor carries on with its next message.
//!
//! ```ignore
//! let ctx = Context::builder().tokio(handle, TaskClass::Background).build()?;
//! let printer = ctx.simple_actor("printer", |line: String, _cx: &ActorContext<String>| -> anyhow::Result<()> {
//!     println!("{line}");
//!     Ok(())
//! });
//! printer.send("hello".to_string())?;
//! ctx.schedule(&printer, "later".to_string(), Duration::from_millis(50));
//! ```

mod activity;
mod batch;
mod class;
mod config;
mod context;
mod error;
mod executor;
mod mailbox;
mod simple;
mod state_machine;
mod timer;

pub use batch::BatchHandler;
pub use class::TaskClass;
pub use config::ContextConfig;
pub use context::{Context, ContextBuilder, FailureReporter};
pub use error::{ContextError, Failure, SendError};
pub use executor::{Executor, InlineExecutor, ManualExecutor, Task, TokioExecutor};
pub use mailbox::{ActorContext, ActorRef};
pub use simple::Handler;
pub use state_machine::State;
