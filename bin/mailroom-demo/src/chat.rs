//! Debounced chat relay: lines typed in quick succession are joined into one
//! outgoing message once the sender has been quiet for the debounce delay.

use std::time::Duration;

use mailroom::{ActorContext, ActorRef, State};

pub enum ChatMsg {
	Line(String),
	Flush,
}

pub struct Idle {
	pub out: ActorRef<String>,
	pub delay: Duration,
}

struct Buffering {
	out: ActorRef<String>,
	delay: Duration,
	lines: Vec<String>,
}

impl State<ChatMsg> for Idle {
	fn transition(&self, msg: ChatMsg, cx: &ActorContext<ChatMsg>) -> anyhow::Result<Box<dyn State<ChatMsg>>> {
		match msg {
			ChatMsg::Line(line) => {
				cx.schedule_self(ChatMsg::Flush, self.delay);
				Ok(Box::new(Buffering {
					out: self.out.clone(),
					delay: self.delay,
					lines: vec![line],
				}))
			}
			ChatMsg::Flush => Ok(Box::new(Idle {
				out: self.out.clone(),
				delay: self.delay,
			})),
		}
	}

	fn name(&self) -> &str {
		"idle"
	}
}

impl State<ChatMsg> for Buffering {
	fn transition(&self, msg: ChatMsg, _cx: &ActorContext<ChatMsg>) -> anyhow::Result<Box<dyn State<ChatMsg>>> {
		match msg {
			ChatMsg::Line(line) => {
				let mut lines = self.lines.clone();
				lines.push(line);
				Ok(Box::new(Buffering {
					out: self.out.clone(),
					delay: self.delay,
					lines,
				}))
			}
			ChatMsg::Flush => {
				if self.out.send(self.lines.join(" ")).is_err() {
					anyhow::bail!("relay output closed with {} buffered lines", self.lines.len());
				}
				Ok(Box::new(Idle {
					out: self.out.clone(),
					delay: self.delay,
				}))
			}
		}
	}

	fn name(&self) -> &str {
		"buffering"
	}
}
