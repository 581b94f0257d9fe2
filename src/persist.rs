//! Durable state: the rule set, the enforcement lock and the master toggle,
//! saved as one pretty-printed JSON document.
//!
//! Loading is tolerant: a rule whose target no longer validates is dropped
//! with a warning, and a rule whose cron no longer parses is kept but
//! permanently inactive. The lock value is restored verbatim; expiry is the
//! engine's first-query fold, never the loader's.

use std::path::Path;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
	error::BlockError,
	lockdown::EnforcementLock,
	rules::{AppName, BlockRule, CategoryId, Domain, RuleId, RuleKind, RuleTarget, Schedule, Strictness},
	schedule::CronExpression,
};

/// Everything the engine persists besides the append-only logs.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSnapshot {
	pub blocking_enabled: bool,
	pub lock: EnforcementLock,
	pub rules: Vec<BlockRule>,
}

impl Default for StateSnapshot {
	fn default() -> Self {
		Self { blocking_enabled: true, lock: EnforcementLock::Unlocked, rules: Vec::new() }
	}
}

#[derive(Serialize, Deserialize)]
struct StateFile {
	blocking_enabled: bool,
	lock: EnforcementLock,
	rules: Vec<RuleRow>,
}

#[derive(Serialize, Deserialize)]
struct RuleRow {
	id: String,
	kind: RuleKind,
	target: String,
	enabled: bool,
	strictness: Strictness,
	created_at: Timestamp,
	schedule: ScheduleRow,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ScheduleRow {
	Always,
	FocusOnly,
	Cron { expression: String },
}

pub fn load_state(path: &Path) -> Result<StateSnapshot, BlockError> {
	if !path.exists() {
		return Ok(StateSnapshot::default());
	}
	let content = std::fs::read_to_string(path)?;
	let file: StateFile = serde_json::from_str(&content).map_err(|e| BlockError::System(format!("state file {} is unreadable: {e}", path.display())))?;

	let mut rules = Vec::with_capacity(file.rules.len());
	for row in file.rules {
		match revive_rule(row) {
			Ok(rule) => rules.push(rule),
			Err((id, e)) => tracing::warn!("dropping persisted rule {id}: {e}"),
		}
	}
	Ok(StateSnapshot { blocking_enabled: file.blocking_enabled, lock: file.lock, rules })
}

pub fn save_state(path: &Path, snapshot: &StateSnapshot) -> Result<(), BlockError> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	let file = StateFile {
		blocking_enabled: snapshot.blocking_enabled,
		lock: snapshot.lock.clone(),
		rules: snapshot.rules.iter().map(store_rule).collect(),
	};
	let json = serde_json::to_string_pretty(&file)?;
	std::fs::write(path, json)?;
	Ok(())
}

fn store_rule(rule: &BlockRule) -> RuleRow {
	RuleRow {
		id: rule.id.to_string(),
		kind: rule.kind(),
		target: rule.target.as_str().to_string(),
		enabled: rule.enabled,
		strictness: rule.strictness,
		created_at: rule.created_at,
		schedule: match &rule.schedule {
			Schedule::Always => ScheduleRow::Always,
			Schedule::FocusOnly => ScheduleRow::FocusOnly,
			Schedule::Scheduled(cron) => ScheduleRow::Cron { expression: cron.raw().to_string() },
		},
	}
}

fn revive_rule(row: RuleRow) -> Result<BlockRule, (String, BlockError)> {
	let fail = |e: BlockError| (row.id.clone(), e);
	let id = RuleId::new(&row.id).map_err(fail)?;
	let target = match row.kind {
		RuleKind::Website => RuleTarget::Website(Domain::new(&row.target).map_err(fail)?),
		RuleKind::App => RuleTarget::App(AppName::new(&row.target).map_err(fail)?),
		RuleKind::Category => RuleTarget::Category(CategoryId::new(&row.target).map_err(fail)?),
	};
	let schedule = match row.schedule {
		ScheduleRow::Always => Schedule::Always,
		ScheduleRow::FocusOnly => Schedule::FocusOnly,
		ScheduleRow::Cron { expression } => match CronExpression::parse(&expression) {
			Ok(cron) => Schedule::Scheduled(cron),
			Err(e) => {
				tracing::warn!("rule {id}: cron '{expression}' no longer parses, treating as never active: {e}");
				Schedule::Scheduled(CronExpression::never_matching(&expression))
			}
		},
	};
	Ok(BlockRule {
		id,
		enabled: row.enabled,
		strictness: row.strictness,
		created_at: row.created_at,
		target,
		schedule,
	})
}
