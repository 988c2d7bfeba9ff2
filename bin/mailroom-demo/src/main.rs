//! Reads lines from stdin and pushes them through a small actor graph:
//! a debouncing chat relay, a printer and a batching word counter.

mod chat;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use mailroom::{ActorContext, Context, ContextConfig};

use crate::chat::{ChatMsg, Idle};

#[derive(Debug, Parser)]
#[command(name = "mailroom-demo", about = "Debounce stdin lines through mailroom actors")]
struct Cli {
	/// TOML file with context settings.
	#[arg(long)]
	config: Option<PathBuf>,

	/// Quiet period before buffered lines are flushed.
	#[arg(long, default_value_t = 300)]
	debounce_ms: u64,

	/// Enable debug logging.
	#[arg(short, long)]
	verbose: bool,
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "mailroom=debug,info" } else { "info" }));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ContextConfig> {
	let Some(path) = path else {
		return Ok(ContextConfig::default());
	};
	let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let config = load_config(cli.config.as_ref())?.track_inactivity();
	let ctx = Context::from_config(&config)?;
	tracing::info!(workers = config.worker_threads, class = ?config.class, "demo.start");

	let words = Arc::new(AtomicUsize::new(0));
	let counted = Arc::clone(&words);
	let counter = ctx.batch_actor("word-counter", move |batch: Vec<String>, _cx: &ActorContext<String>| -> anyhow::Result<()> {
		let n: usize = batch.iter().map(|text| text.split_whitespace().count()).sum();
		counted.fetch_add(n, Ordering::Relaxed);
		tracing::debug!(messages = batch.len(), words = n, "demo.count");
		Ok(())
	});

	let printer = ctx.simple_actor("printer", move |text: String, _cx: &ActorContext<String>| -> anyhow::Result<()> {
		println!("> {text}");
		let _ = counter.send(text);
		Ok(())
	});

	let relay = ctx.state_machine_actor(
		"chat-relay",
		Idle {
			out: printer,
			delay: Duration::from_millis(cli.debounce_ms),
		},
	);

	for line in std::io::stdin().lock().lines() {
		let line = line.context("reading stdin")?;
		if line.trim().is_empty() {
			continue;
		}
		relay.send(ChatMsg::Line(line))?;
	}

	ctx.wait_for_inactivity()?;
	tracing::info!(words = words.load(Ordering::Relaxed), "demo.done");
	ctx.shutdown();
	Ok(())
}
