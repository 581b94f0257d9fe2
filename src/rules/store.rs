//! In-memory rule set with uniqueness on (kind, target).
//!
//! Pure CRUD; lock-gate decisions happen in the engine before any mutator
//! here is called. Listing returns snapshots, never live views.

use std::collections::BTreeMap;

use jiff::Timestamp;

use crate::{
	error::BlockError,
	rules::types::{BlockRule, NewRule, RuleId, RuleKind, ScheduleKind, Strictness},
};

#[derive(Clone, Debug, Default)]
pub struct RuleStore {
	rules: BTreeMap<RuleId, BlockRule>,
}

#[derive(Clone, Debug, Default)]
pub struct RuleFilter {
	pub kind: Option<RuleKind>,
	pub schedule: Option<ScheduleKind>,
	pub enabled_only: bool,
}

impl RuleStore {
	pub fn from_rules(rules: Vec<BlockRule>) -> Self {
		Self {
			rules: rules.into_iter().map(|r| (r.id.clone(), r)).collect(),
		}
	}

	pub fn create(&mut self, new: NewRule, now: Timestamp) -> Result<BlockRule, BlockError> {
		if let Some(existing) = self.rules.values().find(|r| r.kind() == new.target.kind() && r.target.as_str() == new.target.as_str()) {
			return Err(BlockError::AlreadyExists {
				kind: new.target.kind().to_string(),
				target: new.target.as_str().to_string(),
				existing_id: existing.id.to_string(),
			});
		}
		let id = RuleId::generate(new.target.kind(), new.target.as_str(), now);
		let rule = BlockRule {
			id: id.clone(),
			enabled: true,
			strictness: new.strictness,
			created_at: now,
			target: new.target,
			schedule: new.schedule,
		};
		self.rules.insert(id, rule.clone());
		Ok(rule)
	}

	pub fn remove(&mut self, id: &RuleId) -> Result<BlockRule, BlockError> {
		self.rules.remove(id).ok_or_else(|| BlockError::NotFound(id.to_string()))
	}

	pub fn set_enabled(&mut self, id: &RuleId, enabled: bool) -> Result<BlockRule, BlockError> {
		let rule = self.rules.get_mut(id).ok_or_else(|| BlockError::NotFound(id.to_string()))?;
		rule.enabled = enabled;
		Ok(rule.clone())
	}

	pub fn set_strictness(&mut self, id: &RuleId, strictness: Strictness) -> Result<BlockRule, BlockError> {
		let rule = self.rules.get_mut(id).ok_or_else(|| BlockError::NotFound(id.to_string()))?;
		rule.strictness = strictness;
		Ok(rule.clone())
	}

	pub fn get(&self, id: &RuleId) -> Result<&BlockRule, BlockError> {
		self.rules.get(id).ok_or_else(|| BlockError::NotFound(id.to_string()))
	}

	/// Snapshot of the matching rules, ordered by creation time.
	pub fn list(&self, filter: &RuleFilter) -> Vec<BlockRule> {
		let mut out: Vec<BlockRule> = self
			.rules
			.values()
			.filter(|r| filter.kind.is_none_or(|k| r.kind() == k))
			.filter(|r| filter.schedule.is_none_or(|s| r.schedule.kind() == s))
			.filter(|r| !filter.enabled_only || r.enabled)
			.cloned()
			.collect();
		out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
		out
	}

	pub fn iter(&self) -> impl Iterator<Item = &BlockRule> {
		self.rules.values()
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}
}
