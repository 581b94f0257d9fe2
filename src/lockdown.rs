//! The enforcement lock: a small state machine deciding whether weakening
//! mutations are allowed.
//!
//! Transitions are pure; nothing here reads the clock or touches storage.
//! Nuclear expiry is a fold over (stored end, caller-supplied now), so the
//! same persisted state always resolves to the same answer, with or without
//! a background tick.

use jiff::{Span, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{error::BlockError, session::SessionId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EnforcementLock {
	Unlocked,
	StrictMode { session_id: SessionId, can_disable: bool },
	Nuclear { started_at: Timestamp, ends_at: Timestamp, duration_minutes: u32 },
}

impl EnforcementLock {
	/// Expiry fold: an elapsed nuclear lock is unlocked, everything else is
	/// unchanged. Every read and mutation folds before looking at the state.
	pub fn after_expiry(self, now: Timestamp) -> Self {
		match self {
			EnforcementLock::Nuclear { ends_at, .. } if now >= ends_at => EnforcementLock::Unlocked,
			other => other,
		}
	}

	/// Legal only from `Unlocked` with a currently-active session.
	pub fn enable_strict(&self, session_id: SessionId, session_is_active: bool) -> Result<Self, BlockError> {
		if !matches!(self, EnforcementLock::Unlocked) {
			return Err(BlockError::precondition(format!("strict mode requires unlocked state, currently {self}")));
		}
		if !session_is_active {
			return Err(BlockError::precondition(format!("session '{session_id}' is not active")));
		}
		Ok(EnforcementLock::StrictMode { session_id, can_disable: false })
	}

	/// Arms `can_disable` if the named session owns the current strict mode.
	/// Never unlocks by itself. Returns whether anything changed.
	pub fn notify_session_ended(&mut self, ended: &SessionId) -> bool {
		match self {
			EnforcementLock::StrictMode { session_id, can_disable } if session_id == ended && !*can_disable => {
				*can_disable = true;
				true
			}
			_ => false,
		}
	}

	/// Legal only from `StrictMode { can_disable: true }`.
	pub fn disable_strict(&self) -> Result<Self, BlockError> {
		match self {
			EnforcementLock::StrictMode { can_disable: true, .. } => Ok(EnforcementLock::Unlocked),
			other => Err(BlockError::PermissionDenied {
				lock: other.to_string(),
				action: "disable strict mode".to_string(),
			}),
		}
	}

	/// Legal only from `Unlocked`, with a positive duration. There is no
	/// disable transition; the only way out is expiry.
	pub fn activate_nuclear(&self, now: Timestamp, duration_minutes: u32) -> Result<Self, BlockError> {
		if duration_minutes == 0 {
			return Err(BlockError::validation("nuclear duration must be a positive number of minutes"));
		}
		if !matches!(self, EnforcementLock::Unlocked) {
			return Err(BlockError::precondition(format!("nuclear option requires unlocked state, currently {self}")));
		}
		let ends_at = now.checked_add(Span::new().minutes(i64::from(duration_minutes))).map_err(|e| BlockError::validation(format!("nuclear duration out of range: {e}")))?;
		Ok(EnforcementLock::Nuclear { started_at: now, ends_at, duration_minutes })
	}

	/// Whether the lock currently refuses weakening mutations. Callers fold
	/// expiry first, so an elapsed nuclear lock never reaches this check.
	pub fn forbids_weakening(&self) -> bool {
		match self {
			EnforcementLock::Unlocked => false,
			EnforcementLock::StrictMode { can_disable, .. } => !can_disable,
			EnforcementLock::Nuclear { .. } => true,
		}
	}

	/// Gate for weakening mutations: disabling or removing a rule, lowering
	/// strictness, toggling blocking off.
	pub fn ensure_weakening_allowed(&self, action: &str) -> Result<(), BlockError> {
		if self.forbids_weakening() {
			return Err(BlockError::PermissionDenied { lock: self.to_string(), action: action.to_string() });
		}
		Ok(())
	}

	pub fn strict_status(&self) -> StrictModeStatus {
		match self {
			EnforcementLock::StrictMode { session_id, can_disable } => StrictModeStatus {
				active: true,
				session_id: Some(session_id.clone()),
				can_disable: Some(*can_disable),
			},
			_ => StrictModeStatus { active: false, session_id: None, can_disable: None },
		}
	}

	pub fn nuclear_status(&self, now: Timestamp) -> NuclearStatus {
		match self {
			EnforcementLock::Nuclear { ends_at, .. } => {
				let remaining_secs = (ends_at.as_second() - now.as_second()).max(0);
				NuclearStatus {
					active: true,
					ends_at: Some(*ends_at),
					remaining_minutes: Some(remaining_secs.div_ceil(60)),
				}
			}
			_ => NuclearStatus { active: false, ends_at: None, remaining_minutes: None },
		}
	}
}

impl std::fmt::Display for EnforcementLock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			EnforcementLock::Unlocked => write!(f, "unlocked"),
			EnforcementLock::StrictMode { session_id, can_disable: false } => write!(f, "strict mode (session {session_id})"),
			EnforcementLock::StrictMode { session_id, can_disable: true } => write!(f, "strict mode (session {session_id}, disarmable)"),
			EnforcementLock::Nuclear { ends_at, .. } => write!(f, "nuclear lock (until {ends_at})"),
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct StrictModeStatus {
	pub active: bool,
	pub session_id: Option<SessionId>,
	pub can_disable: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NuclearStatus {
	pub active: bool,
	pub ends_at: Option<Timestamp>,
	pub remaining_minutes: Option<i64>,
}
