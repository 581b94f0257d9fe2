//! The engine: owns the rule set, the enforcement lock and the logs behind
//! one mutex, and runs every mutation through the weakening gate.
//!
//! Check-then-act sequences hold the lock for their whole span, so two racing
//! nuclear activations cannot both win; the loser sees the new state and gets
//! the matching error. Queries fold lock expiry in memory but never write;
//! mutations fold, act, then save.

use std::{
	collections::BTreeSet,
	path::{Path, PathBuf},
	sync::{Arc, Mutex},
};

use jiff::{Timestamp, tz::TimeZone};
use tracing::instrument;

use crate::{
	clock,
	error::BlockError,
	events::{BlockAttempt, BlockEvent, BypassLog, BypassRequest, EventLog, RuleStats},
	lockdown::{EnforcementLock, NuclearStatus, StrictModeStatus},
	persist::{self, StateSnapshot},
	rules::{BlockRule, NewRule, RuleFilter, RuleId, RuleStore, Strictness, Target},
	schedule,
	session::{SessionContext, SessionId},
};

/// Where the engine keeps its files.
#[derive(Clone, Debug)]
pub struct EnginePaths {
	pub state: PathBuf,
	pub events: PathBuf,
	pub bypass: PathBuf,
}

impl EnginePaths {
	pub fn under(dir: &Path) -> Self {
		Self {
			state: dir.join("state.json"),
			events: dir.join("events.jsonl"),
			bypass: dir.join("bypass.jsonl"),
		}
	}
}

struct EngineState {
	store: RuleStore,
	lock: EnforcementLock,
	blocking_enabled: bool,
	events: EventLog,
	bypass: BypassLog,
}

pub struct BlockEngine {
	state: Mutex<EngineState>,
	session_ctx: Arc<dyn SessionContext>,
	tz: TimeZone,
	paths: EnginePaths,
}

impl std::fmt::Debug for BlockEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BlockEngine").field("tz", &self.tz).field("paths", &self.paths).finish_non_exhaustive()
	}
}

impl BlockEngine {
	pub fn open(paths: EnginePaths, session_ctx: Arc<dyn SessionContext>, tz: TimeZone) -> Result<Self, BlockError> {
		let snapshot = persist::load_state(&paths.state)?;
		let state = EngineState {
			store: RuleStore::from_rules(snapshot.rules),
			lock: snapshot.lock,
			blocking_enabled: snapshot.blocking_enabled,
			events: EventLog::open(paths.events.clone())?,
			bypass: BypassLog::open(paths.bypass.clone())?,
		};
		Ok(Self { state: Mutex::new(state), session_ctx, tz, paths })
	}

	// ---- rules ----

	#[instrument(skip(self, new))]
	pub fn create_rule(&self, new: NewRule) -> Result<BlockRule, BlockError> {
		let mut st = self.state.lock().unwrap();
		let now = clock::now();
		fold_lock(&mut st, now);
		// adding a rule strengthens enforcement, allowed under any lock
		let rule = st.store.create(new, now)?;
		self.save(&st)?;
		tracing::info!("created rule {} for {}", rule.id, rule.target);
		Ok(rule)
	}

	#[instrument(skip(self))]
	pub fn remove_rule(&self, id: &RuleId) -> Result<BlockRule, BlockError> {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, clock::now());
		// removal weakens enforcement no matter which rule it names, so the
		// gate is consulted before the store is even asked
		st.lock.ensure_weakening_allowed(&format!("remove rule {id}"))?;
		let removed = st.store.remove(id)?;
		self.save(&st)?;
		tracing::info!("removed rule {id}");
		Ok(removed)
	}

	#[instrument(skip(self))]
	pub fn set_enabled(&self, id: &RuleId, enabled: bool) -> Result<BlockRule, BlockError> {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, clock::now());
		if !enabled {
			st.lock.ensure_weakening_allowed(&format!("disable rule {id}"))?;
		}
		let rule = st.store.set_enabled(id, enabled)?;
		self.save(&st)?;
		Ok(rule)
	}

	#[instrument(skip(self))]
	pub fn set_strictness(&self, id: &RuleId, strictness: Strictness) -> Result<BlockRule, BlockError> {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, clock::now());
		let current = st.store.get(id)?.strictness;
		if strictness < current {
			st.lock.ensure_weakening_allowed(&format!("lower strictness of rule {id}"))?;
		}
		let rule = st.store.set_strictness(id, strictness)?;
		self.save(&st)?;
		Ok(rule)
	}

	pub fn get_rule(&self, id: &RuleId) -> Result<BlockRule, BlockError> {
		let st = self.state.lock().unwrap();
		st.store.get(id).cloned()
	}

	/// Snapshot list; later mutations are not reflected in the result.
	pub fn list_rules(&self, filter: &RuleFilter) -> Vec<BlockRule> {
		self.state.lock().unwrap().store.list(filter)
	}

	// ---- blocking queries ----

	/// Whether any enabled, currently-active rule covers the target. The
	/// master toggle short-circuits everything.
	pub fn is_blocking_active_for(&self, target: &Target, now: Timestamp) -> Result<bool, BlockError> {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, now);
		if !st.blocking_enabled {
			return Ok(false);
		}
		let has_session = self.session_ctx.active_session()?.is_some();
		for rule in st.store.iter().filter(|r| r.enabled) {
			if schedule::is_active(&rule.schedule, now, has_session, &self.tz) && rule.resolved_targets().contains(target) {
				return Ok(true);
			}
		}
		Ok(false)
	}

	/// Every target an enforcement daemon should be blocking right now,
	/// deduplicated across rules and expanded categories.
	pub fn active_targets(&self, now: Timestamp) -> Result<BTreeSet<Target>, BlockError> {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, now);
		if !st.blocking_enabled {
			return Ok(BTreeSet::new());
		}
		let has_session = self.session_ctx.active_session()?.is_some();
		let mut out = BTreeSet::new();
		for rule in st.store.iter().filter(|r| r.enabled) {
			if schedule::is_active(&rule.schedule, now, has_session, &self.tz) {
				out.extend(rule.resolved_targets());
			}
		}
		Ok(out)
	}

	// ---- master toggle ----

	#[instrument(skip(self))]
	pub fn set_blocking_enabled(&self, enabled: bool) -> Result<bool, BlockError> {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, clock::now());
		if !enabled {
			st.lock.ensure_weakening_allowed("turn blocking off")?;
		}
		st.blocking_enabled = enabled;
		self.save(&st)?;
		tracing::info!("blocking turned {}", if enabled { "on" } else { "off" });
		Ok(enabled)
	}

	pub fn blocking_enabled(&self) -> bool {
		self.state.lock().unwrap().blocking_enabled
	}

	// ---- enforcement lock ----

	#[instrument(skip(self))]
	pub fn enable_strict_mode(&self, session_id: SessionId) -> Result<StrictModeStatus, BlockError> {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, clock::now());
		let session_is_active = self.session_ctx.active_session()?.as_ref() == Some(&session_id);
		st.lock = st.lock.enable_strict(session_id, session_is_active)?;
		self.save(&st)?;
		tracing::info!("strict mode enabled: {}", st.lock);
		Ok(st.lock.strict_status())
	}

	#[instrument(skip(self))]
	pub fn notify_session_ended(&self, session_id: &SessionId) -> Result<bool, BlockError> {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, clock::now());
		let changed = st.lock.notify_session_ended(session_id);
		if changed {
			self.save(&st)?;
			tracing::info!("session {session_id} ended, strict mode can now be disabled");
		}
		Ok(changed)
	}

	#[instrument(skip(self))]
	pub fn disable_strict_mode(&self) -> Result<(), BlockError> {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, clock::now());
		st.lock = st.lock.disable_strict()?;
		self.save(&st)?;
		tracing::info!("strict mode disabled");
		Ok(())
	}

	pub fn strict_mode_status(&self) -> StrictModeStatus {
		self.folded_lock().strict_status()
	}

	#[instrument(skip(self))]
	pub fn activate_nuclear_option(&self, duration_minutes: u32) -> Result<NuclearStatus, BlockError> {
		let mut st = self.state.lock().unwrap();
		let now = clock::now();
		fold_lock(&mut st, now);
		st.lock = st.lock.activate_nuclear(now, duration_minutes)?;
		self.save(&st)?;
		tracing::info!("nuclear option active: {}", st.lock);
		Ok(st.lock.nuclear_status(now))
	}

	pub fn nuclear_status(&self) -> NuclearStatus {
		let now = clock::now();
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, now);
		st.lock.nuclear_status(now)
	}

	/// Current lock with expiry folded in.
	pub fn lock_state(&self) -> EnforcementLock {
		self.folded_lock()
	}

	/// Periodic-tick entry point: folds expiry and persists the unlock if one
	/// happened. Correctness never depends on this being called.
	pub fn evaluate_expiry(&self) -> Result<bool, BlockError> {
		let mut st = self.state.lock().unwrap();
		let changed = fold_lock(&mut st, clock::now());
		if changed {
			self.save(&st)?;
		}
		Ok(changed)
	}

	// ---- events ----

	#[instrument(skip(self, attempt))]
	pub fn record_block_attempt(&self, attempt: BlockAttempt) -> Result<BlockEvent, BlockError> {
		let mut st = self.state.lock().unwrap();
		st.store.get(&attempt.rule_id)?;
		let event = st.events.record(attempt, clock::now())?;
		tracing::debug!("recorded {} against rule {}", event.id, event.rule_id);
		Ok(event)
	}

	pub fn rule_stats(&self, id: &RuleId) -> Result<RuleStats, BlockError> {
		let st = self.state.lock().unwrap();
		let rule = st.store.get(id)?;
		Ok(st.events.stats_for(rule, clock::now()))
	}

	/// The most recent events, newest last.
	pub fn recent_events(&self, limit: usize) -> Vec<BlockEvent> {
		let st = self.state.lock().unwrap();
		let all = st.events.all();
		all[all.len().saturating_sub(limit)..].to_vec()
	}

	#[instrument(skip(self, bypass_code, reason))]
	pub fn request_bypass(&self, rule_id: &RuleId, bypass_code: Option<String>, reason: Option<String>) -> Result<BypassRequest, BlockError> {
		let mut st = self.state.lock().unwrap();
		st.store.get(rule_id)?;
		let request = BypassRequest {
			rule_id: rule_id.clone(),
			requested_at: clock::now(),
			bypass_code,
			reason,
		};
		st.bypass.record(request.clone())?;
		Ok(request)
	}

	pub fn bypass_requests(&self) -> Vec<BypassRequest> {
		self.state.lock().unwrap().bypass.all().to_vec()
	}

	// ---- internals ----

	fn folded_lock(&self) -> EnforcementLock {
		let mut st = self.state.lock().unwrap();
		fold_lock(&mut st, clock::now());
		st.lock.clone()
	}

	fn save(&self, st: &EngineState) -> Result<(), BlockError> {
		let snapshot = StateSnapshot {
			blocking_enabled: st.blocking_enabled,
			lock: st.lock.clone(),
			rules: st.store.iter().cloned().collect(),
		};
		persist::save_state(&self.paths.state, &snapshot)
	}
}

/// In-memory expiry fold; persisting the unlock is the caller's decision.
fn fold_lock(st: &mut EngineState, now: Timestamp) -> bool {
	let folded = st.lock.clone().after_expiry(now);
	if folded == st.lock {
		return false;
	}
	tracing::info!("nuclear lock expired, state is now unlocked");
	st.lock = folded;
	true
}
