//! Rule management commands: add/remove/list, the live blocklist queries, the
//! master switch and category inspection.

use clap::{Args, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, bail};
use lockout::{CategoryId, CronExpression, NewRule, RuleFilter, RuleId, RuleKind, RuleTarget, Schedule, ScheduleKind, Strictness, Target, categories, clock};

use crate::config::LiveSettings;

#[derive(Args, Clone, Debug)]
pub struct RuleArgs {
	#[command(subcommand)]
	command: RuleCommands,
}

#[derive(Clone, Debug, Subcommand)]
enum RuleCommands {
	/// Add a blocking rule
	#[command(subcommand)]
	Add(AddTarget),
	/// Remove a rule permanently
	Rm { id: RuleId },
	/// Re-enable a disabled rule
	Enable { id: RuleId },
	/// Disable a rule without deleting it
	Disable { id: RuleId },
	/// Change how strictly a rule is enforced
	Strictness { id: RuleId, level: Strictness },
	/// List rules
	List(ListArgs),
}

#[derive(Clone, Debug, Subcommand)]
enum AddTarget {
	/// Block a website, given a bare domain or a URL
	Website {
		domain: String,
		#[command(flatten)]
		opts: AddOpts,
	},
	/// Block an application by name
	App {
		name: String,
		#[command(flatten)]
		opts: AddOpts,
	},
	/// Block a whole category of targets
	Category {
		id: String,
		#[command(flatten)]
		opts: AddOpts,
	},
}

#[derive(Args, Clone, Debug)]
struct AddOpts {
	/// How strictly a downstream enforcer should treat the rule.
	/// Falls back to `rules.default_strictness` from the config.
	#[arg(long, value_enum)]
	strictness: Option<Strictness>,
	/// `always`, `focus`, or `cron "<five-field expr>"`
	#[arg(long, num_args = 1..=2, default_values_t = [String::from("always")])]
	schedule: Vec<String>,
}

#[derive(Args, Clone, Debug)]
struct ListArgs {
	/// Only rules of this kind
	#[arg(long, value_enum)]
	kind: Option<RuleKind>,
	/// Only rules with this schedule kind
	#[arg(long, value_enum)]
	schedule: Option<ScheduleKind>,
	/// Skip disabled rules
	#[arg(long)]
	enabled_only: bool,
}

pub fn main(settings: &LiveSettings, args: RuleArgs) -> Result<()> {
	let engine = crate::open_engine(settings)?;
	match args.command {
		RuleCommands::Add(add) => {
			let (target, opts) = match add {
				AddTarget::Website { domain, opts } => (RuleTarget::Website(domain.parse()?), opts),
				AddTarget::App { name, opts } => (RuleTarget::App(name.parse()?), opts),
				AddTarget::Category { id, opts } => (RuleTarget::Category(id.parse()?), opts),
			};
			let strictness = match opts.strictness {
				Some(s) => s,
				None => settings.config()?.default_strictness(),
			};
			let rule = engine.create_rule(NewRule {
				target,
				strictness,
				schedule: parse_schedule(&opts.schedule)?,
			})?;
			println!("added {}: {} ({}, {})", rule.id, rule.target, rule.strictness, rule.schedule);
		}
		RuleCommands::Rm { id } => {
			let rule = engine.remove_rule(&id)?;
			println!("removed {}: {}", rule.id, rule.target);
		}
		RuleCommands::Enable { id } => {
			let rule = engine.set_enabled(&id, true)?;
			println!("enabled {}: {}", rule.id, rule.target);
		}
		RuleCommands::Disable { id } => {
			let rule = engine.set_enabled(&id, false)?;
			println!("disabled {}: {}", rule.id, rule.target);
		}
		RuleCommands::Strictness { id, level } => {
			let rule = engine.set_strictness(&id, level)?;
			println!("{} is now {}", rule.id, rule.strictness);
		}
		RuleCommands::List(list) => {
			let rules = engine.list_rules(&RuleFilter {
				kind: list.kind,
				schedule: list.schedule,
				enabled_only: list.enabled_only,
			});
			if rules.is_empty() {
				println!("no rules");
				return Ok(());
			}
			for rule in rules {
				let mark = if rule.enabled { "x" } else { " " };
				println!("{} [{mark}] {:<6} {}  ({})", rule.id, rule.strictness.to_string(), rule.target, rule.schedule);
			}
		}
	}
	Ok(())
}

fn parse_schedule(tokens: &[String]) -> Result<Schedule> {
	match tokens {
		[kind] if kind == "always" => Ok(Schedule::Always),
		[kind] if kind == "focus" => Ok(Schedule::FocusOnly),
		[kind, expr] if kind == "cron" => Ok(Schedule::Scheduled(CronExpression::parse(expr)?)),
		_ => bail!("--schedule takes `always`, `focus`, or `cron \"<expr>\"`"),
	}
}

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
	/// Domain or app name
	target: String,
}

pub fn check(settings: &LiveSettings, args: CheckArgs) -> Result<()> {
	let engine = crate::open_engine(settings)?;
	let target = Target::parse(&args.target)?;
	if engine.is_blocking_active_for(&target, clock::now())? {
		println!("BLOCKED {target}");
	} else {
		println!("allowed {target}");
	}
	Ok(())
}

pub fn targets(settings: &LiveSettings) -> Result<()> {
	let engine = crate::open_engine(settings)?;
	for target in engine.active_targets(clock::now())? {
		println!("{target}");
	}
	Ok(())
}

#[derive(Args, Clone, Debug)]
pub struct ToggleArgs {
	/// Omit to print the current state
	#[arg(value_enum)]
	state: Option<ToggleState>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ToggleState {
	On,
	Off,
}

pub fn toggle(settings: &LiveSettings, args: ToggleArgs) -> Result<()> {
	let engine = crate::open_engine(settings)?;
	let enabled = match args.state {
		Some(state) => engine.set_blocking_enabled(matches!(state, ToggleState::On))?,
		None => engine.blocking_enabled(),
	};
	println!("blocking is {}", if enabled { "on" } else { "off" });
	Ok(())
}

#[derive(Args, Clone, Debug)]
pub struct CategoryArgs {
	#[command(subcommand)]
	command: CategoryCommands,
}

#[derive(Clone, Debug, Subcommand)]
enum CategoryCommands {
	/// Known category ids
	List,
	/// Concrete targets the given categories cover
	Expand {
		#[arg(required = true)]
		ids: Vec<String>,
	},
}

pub fn category(args: CategoryArgs) -> Result<()> {
	match args.command {
		CategoryCommands::List =>
			for id in categories::all_ids() {
				println!("{id}");
			},
		CategoryCommands::Expand { ids } => {
			let ids = ids.iter().map(|id| id.parse::<CategoryId>()).collect::<Result<Vec<_>, _>>()?;
			for target in categories::expand_categories(&ids) {
				println!("{target}");
			}
		}
	}
	Ok(())
}
