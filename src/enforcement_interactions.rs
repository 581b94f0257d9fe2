//! Focus sessions and the enforcement locks (strict mode, nuclear option).
//!
//! `session` owns the file-backed registry; `strict`/`nuclear` drive the
//! engine's lock state machine. Ending a session tells the engine, so a strict
//! lock armed on that session becomes disarmable.

use clap::{Args, Subcommand};
use color_eyre::eyre::{Result, bail};
use lockout::{SessionContext, SessionId};

use crate::config::LiveSettings;

#[derive(Args, Clone, Debug)]
pub struct SessionArgs {
	#[command(subcommand)]
	command: SessionCommands,
}

#[derive(Clone, Debug, Subcommand)]
enum SessionCommands {
	/// Start a focus session under the given name
	Start { id: String },
	/// End the running session
	End,
	/// Show the running session, if any
	Status,
}

pub fn session(settings: &LiveSettings, args: SessionArgs) -> Result<()> {
	let registry = crate::session_registry(settings)?;
	match args.command {
		SessionCommands::Start { id } => {
			let id = SessionId::new(&id)?;
			if let Some(running) = registry.active_session()? {
				bail!("session '{running}' is already running; end it first");
			}
			registry.start(&id)?;
			println!("session '{id}' started");
		}
		SessionCommands::End => {
			let Some(ended) = registry.end()? else {
				println!("no session running");
				return Ok(());
			};
			println!("session '{ended}' ended");
			let engine = crate::open_engine(settings)?;
			if engine.notify_session_ended(&ended)? {
				println!("strict mode can now be disabled");
			}
		}
		SessionCommands::Status => match registry.active_session()? {
			Some(id) => println!("session '{id}' is running"),
			None => println!("no session running"),
		},
	}
	Ok(())
}

#[derive(Args, Clone, Debug)]
pub struct StrictArgs {
	#[command(subcommand)]
	command: StrictCommands,
}

#[derive(Clone, Debug, Subcommand)]
enum StrictCommands {
	/// Lock rule weakening to the running focus session
	On,
	/// Lift strict mode (only after its session ended)
	Off,
	Status,
}

pub fn strict(settings: &LiveSettings, args: StrictArgs) -> Result<()> {
	let engine = crate::open_engine(settings)?;
	match args.command {
		StrictCommands::On => {
			let Some(id) = crate::session_registry(settings)?.active_session()? else {
				bail!("strict mode needs a running focus session; start one with `lockout session start <id>`");
			};
			let status = engine.enable_strict_mode(id)?;
			println!("strict mode on (session '{}')", status.session_id.as_ref().map(SessionId::as_str).unwrap_or_default());
		}
		StrictCommands::Off => {
			engine.disable_strict_mode()?;
			println!("strict mode off");
		}
		StrictCommands::Status => {
			let status = engine.strict_mode_status();
			if !status.active {
				println!("strict mode off");
				return Ok(());
			}
			let session = status.session_id.as_ref().map(SessionId::as_str).unwrap_or_default();
			match status.can_disable {
				Some(true) => println!("strict mode on (session '{session}' ended, can be disabled)"),
				_ => println!("strict mode on (locked to session '{session}')"),
			}
		}
	}
	Ok(())
}

#[derive(Args, Clone, Debug)]
pub struct NuclearArgs {
	#[command(subcommand)]
	command: NuclearCommands,
}

#[derive(Clone, Debug, Subcommand)]
enum NuclearCommands {
	/// Lock everything for a fixed number of minutes. There is no way out
	/// before the timer runs down.
	Activate { minutes: u32 },
	Status,
}

pub fn nuclear(settings: &LiveSettings, args: NuclearArgs) -> Result<()> {
	let engine = crate::open_engine(settings)?;
	match args.command {
		NuclearCommands::Activate { minutes } => {
			let status = engine.activate_nuclear_option(minutes)?;
			match status.ends_at {
				Some(ends_at) => println!("nuclear lock active for {minutes}m, until {ends_at}"),
				None => println!("nuclear lock active for {minutes}m"),
			}
		}
		NuclearCommands::Status => {
			let status = engine.nuclear_status();
			match (status.active, status.ends_at, status.remaining_minutes) {
				(true, Some(ends_at), Some(remaining)) => println!("nuclear lock active: {remaining}m remaining (until {ends_at})"),
				_ => println!("nuclear lock off"),
			}
		}
	}
	Ok(())
}
