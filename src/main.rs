mod config;
mod doctor;
mod enforcement_interactions;
mod events_interactions;
mod rules_interactions;
mod session_file;
mod shell_init;
mod watch;

use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use lockout::{BlockEngine, EnginePaths};

use crate::{
	config::{AppConfig, LiveSettings, SettingsFlags},
	session_file::FileSessionContext,
};

#[derive(Parser)]
#[command(author, version = concat!(clap::crate_version!(), " (", env!("GIT_HASH"), ")"), about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
	#[command(flatten)]
	flags: SettingsFlags,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Manage blocking rules
	Rule(rules_interactions::RuleArgs),
	/// Whether blocking applies to a target right now
	Check(rules_interactions::CheckArgs),
	/// Resolved list of currently blocked targets
	Targets,
	/// Master switch for the whole engine
	Toggle(rules_interactions::ToggleArgs),
	/// Inspect target categories
	Category(rules_interactions::CategoryArgs),
	/// Focus-session registry
	Session(enforcement_interactions::SessionArgs),
	/// Strict mode, locked to the running focus session
	Strict(enforcement_interactions::StrictArgs),
	/// Time-boxed full lock with no disable
	Nuclear(enforcement_interactions::NuclearArgs),
	/// Probe the OS capabilities enforcement depends on
	Doctor(doctor::DoctorArgs),
	/// Record and inspect block events
	Events(events_interactions::EventsArgs),
	/// Run the expiry/transition watcher
	Watch(watch::WatchArgs),
	/// Print aliases and completions for your shell
	ShellInit(shell_init::ShellInitArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	init_tracing();

	let cli = Cli::parse();
	let settings = LiveSettings::new(cli.flags, Duration::from_secs(1))?;

	match cli.command {
		Commands::Rule(args) => rules_interactions::main(&settings, args),
		Commands::Check(args) => rules_interactions::check(&settings, args),
		Commands::Targets => rules_interactions::targets(&settings),
		Commands::Toggle(args) => rules_interactions::toggle(&settings, args),
		Commands::Category(args) => rules_interactions::category(args),
		Commands::Session(args) => enforcement_interactions::session(&settings, args),
		Commands::Strict(args) => enforcement_interactions::strict(&settings, args),
		Commands::Nuclear(args) => enforcement_interactions::nuclear(&settings, args),
		Commands::Doctor(args) => doctor::main(&settings, args).await,
		Commands::Events(args) => events_interactions::main(&settings, args),
		Commands::Watch(args) => watch::main(&settings, args).await,
		Commands::ShellInit(args) => {
			shell_init::output((*settings.config()?).clone(), args);
			Ok(())
		}
	}
}

fn init_tracing() {
	let directives = std::env::var("RUST_LOG").ok().or_else(|| option_env!("LOG_DIRECTIVES").map(str::to_owned)).unwrap_or_else(|| "info".to_owned());
	tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(directives)).with_writer(std::io::stderr).init();
}

/// One engine per invocation, rooted in the configured data dir.
pub fn open_engine(settings: &LiveSettings) -> Result<BlockEngine> {
	let config = settings.config()?;
	let registry = FileSessionContext::new(session_file_path(&config));
	Ok(BlockEngine::open(EnginePaths::under(&config.engine_dir()), Arc::new(registry), config.tz()?)?)
}

pub fn session_registry(settings: &LiveSettings) -> Result<FileSessionContext> {
	let config = settings.config()?;
	Ok(FileSessionContext::new(session_file_path(&config)))
}

fn session_file_path(config: &AppConfig) -> std::path::PathBuf {
	config.engine_dir().join(session_file::SESSION_FILENAME)
}
