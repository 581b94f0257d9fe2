//! Append-only block-event log and recomputed per-rule statistics.
//!
//! Events are JSONL on disk, one object per line, loaded whole at open.
//! Nothing here mutates past lines; stats are derived on demand rather than
//! maintained as counters.

use std::{
	fs::OpenOptions,
	io::Write as _,
	path::{Path, PathBuf},
};

use jiff::Timestamp;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
	error::BlockError,
	rules::{BlockRule, RuleId, Target},
};

/// What an enforcement daemon reports when it blocked (or failed to block)
/// something.
#[derive(Clone, Debug)]
pub struct BlockAttempt {
	pub rule_id: RuleId,
	pub target: Target,
	/// When the block happened; defaults to the record time.
	pub blocked_at: Option<Timestamp>,
	pub was_bypassed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockEvent {
	pub id: String,
	pub rule_id: RuleId,
	pub blocked_at: Timestamp,
	pub target: Target,
	pub was_bypassed: bool,
	pub created_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RuleStats {
	pub rule_id: RuleId,
	pub total_blocks: u64,
	pub bypasses: u64,
	pub last_triggered: Option<Timestamp>,
	pub avg_blocks_per_day: f64,
}

/// A logged wish to get past a rule. Recording one grants nothing; code
/// issuance and validation belong to an outer collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BypassRequest {
	pub rule_id: RuleId,
	pub requested_at: Timestamp,
	pub bypass_code: Option<String>,
	pub reason: Option<String>,
}

pub struct EventLog {
	path: PathBuf,
	events: Vec<BlockEvent>,
	next_seq: u64,
}

impl EventLog {
	/// Loads the existing log, skipping lines that no longer parse (each is
	/// reported, none aborts the load). A missing file is an empty log.
	pub fn open(path: PathBuf) -> Result<Self, BlockError> {
		let events: Vec<BlockEvent> = read_jsonl(&path)?;
		let next_seq = events.iter().filter_map(|e| e.id.strip_prefix("ev-")?.parse::<u64>().ok()).max().unwrap_or(0) + 1;
		Ok(Self { path, events, next_seq })
	}

	pub fn record(&mut self, attempt: BlockAttempt, now: Timestamp) -> Result<BlockEvent, BlockError> {
		let event = BlockEvent {
			id: format!("ev-{}", self.next_seq),
			rule_id: attempt.rule_id,
			blocked_at: attempt.blocked_at.unwrap_or(now),
			target: attempt.target,
			was_bypassed: attempt.was_bypassed,
			created_at: now,
		};
		append_jsonl(&self.path, &event)?;
		self.next_seq += 1;
		self.events.push(event.clone());
		Ok(event)
	}

	pub fn events_for<'a>(&'a self, rule_id: &'a RuleId) -> impl Iterator<Item = &'a BlockEvent> {
		self.events.iter().filter(move |e| &e.rule_id == rule_id)
	}

	pub fn all(&self) -> &[BlockEvent] {
		&self.events
	}

	/// Recomputes the stats for one rule from the full log.
	pub fn stats_for(&self, rule: &BlockRule, now: Timestamp) -> RuleStats {
		let mut total_blocks = 0u64;
		let mut bypasses = 0u64;
		let mut last_triggered: Option<Timestamp> = None;
		for event in self.events_for(&rule.id) {
			total_blocks += 1;
			if event.was_bypassed {
				bypasses += 1;
			}
			if last_triggered.is_none_or(|t| event.blocked_at > t) {
				last_triggered = Some(event.blocked_at);
			}
		}
		let days = ((now.as_second() - rule.created_at.as_second()) / 86_400).max(1);
		RuleStats {
			rule_id: rule.id.clone(),
			total_blocks,
			bypasses,
			last_triggered,
			avg_blocks_per_day: total_blocks as f64 / days as f64,
		}
	}
}

pub struct BypassLog {
	path: PathBuf,
	requests: Vec<BypassRequest>,
}

impl BypassLog {
	pub fn open(path: PathBuf) -> Result<Self, BlockError> {
		let requests = read_jsonl(&path)?;
		Ok(Self { path, requests })
	}

	pub fn record(&mut self, request: BypassRequest) -> Result<(), BlockError> {
		append_jsonl(&self.path, &request)?;
		self.requests.push(request);
		Ok(())
	}

	pub fn all(&self) -> &[BypassRequest] {
		&self.requests
	}
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, BlockError> {
	if !path.exists() {
		return Ok(Vec::new());
	}
	let content = std::fs::read_to_string(path)?;
	let mut out = Vec::new();
	for (lineno, line) in content.lines().enumerate() {
		if line.trim().is_empty() {
			continue;
		}
		match serde_json::from_str(line) {
			Ok(item) => out.push(item),
			Err(e) => tracing::warn!("skipping unreadable line {} of {}: {e}", lineno + 1, path.display()),
		}
	}
	Ok(out)
}

fn append_jsonl<T: Serialize>(path: &Path, item: &T) -> Result<(), BlockError> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	let mut file = OpenOptions::new().create(true).append(true).open(path)?;
	let line = serde_json::to_string(item)?;
	writeln!(file, "{line}")?;
	Ok(())
}
