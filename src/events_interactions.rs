//! Block-event recording and the read-side views over the event log.

use clap::{Args, Subcommand};
use color_eyre::eyre::Result;
use lockout::{BlockAttempt, RuleId, Target};

use crate::config::LiveSettings;

#[derive(Args, Clone, Debug)]
pub struct EventsArgs {
	#[command(subcommand)]
	command: EventsCommands,
}

#[derive(Clone, Debug, Subcommand)]
enum EventsCommands {
	/// Record a block attempt reported by an enforcement daemon
	Record {
		rule_id: RuleId,
		target: String,
		/// The user got past the block
		#[arg(long)]
		bypassed: bool,
	},
	/// Recent events, newest last
	List {
		#[arg(long)]
		limit: Option<usize>,
	},
	/// Recomputed statistics for one rule
	Stats { rule_id: RuleId },
	/// Log a wish to get past a rule. Grants nothing by itself.
	Bypass {
		rule_id: RuleId,
		#[arg(long)]
		code: Option<String>,
		#[arg(long)]
		reason: Option<String>,
	},
	/// Every bypass request logged so far
	Bypasses,
}

pub fn main(settings: &LiveSettings, args: EventsArgs) -> Result<()> {
	let engine = crate::open_engine(settings)?;
	match args.command {
		EventsCommands::Record { rule_id, target, bypassed } => {
			let event = engine.record_block_attempt(BlockAttempt {
				rule_id,
				target: Target::parse(&target)?,
				blocked_at: None,
				was_bypassed: bypassed,
			})?;
			println!("recorded {}: {}{}", event.id, event.target, if event.was_bypassed { " (bypassed)" } else { "" });
		}
		EventsCommands::List { limit } => {
			let limit = match limit {
				Some(n) => n,
				None => settings.config()?.events_shown(),
			};
			let events = engine.recent_events(limit);
			if events.is_empty() {
				println!("no events");
				return Ok(());
			}
			for event in events {
				println!("{}  {}  {} {}{}", event.id, event.blocked_at, event.rule_id, event.target, if event.was_bypassed { "  (bypassed)" } else { "" });
			}
		}
		EventsCommands::Stats { rule_id } => {
			let stats = engine.rule_stats(&rule_id)?;
			println!("rule: {}", stats.rule_id);
			println!("total blocks: {}", stats.total_blocks);
			println!("bypasses: {}", stats.bypasses);
			match stats.last_triggered {
				Some(at) => println!("last triggered: {at}"),
				None => println!("last triggered: never"),
			}
			println!("avg blocks/day: {:.2}", stats.avg_blocks_per_day);
		}
		EventsCommands::Bypass { rule_id, code, reason } => {
			let request = engine.request_bypass(&rule_id, code, reason)?;
			println!("bypass request for {} logged at {}", request.rule_id, request.requested_at);
		}
		EventsCommands::Bypasses => {
			let requests = engine.bypass_requests();
			if requests.is_empty() {
				println!("no bypass requests");
				return Ok(());
			}
			for request in requests {
				let reason = request.reason.as_deref().unwrap_or("-");
				println!("{}  {}  {reason}", request.requested_at, request.rule_id);
			}
		}
	}
	Ok(())
}
