//! Session context seam.
//!
//! Focus sessions are owned by an external collaborator; the engine only ever
//! asks "which session is active right now". Implementations must answer from
//! current state, not a cache.

use std::{fmt, sync::Mutex};

use serde::{Deserialize, Serialize};

use crate::error::BlockError;

/// Opaque session identifier, non-empty after trimming.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
	pub fn new(raw: &str) -> Result<Self, BlockError> {
		let trimmed = raw.trim();
		if trimmed.is_empty() {
			return Err(BlockError::validation("session id is empty"));
		}
		Ok(Self(trimmed.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for SessionId {
	type Err = BlockError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl TryFrom<String> for SessionId {
	type Error = BlockError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		Self::new(&s)
	}
}

impl From<SessionId> for String {
	fn from(id: SessionId) -> String {
		id.0
	}
}

/// Where the engine learns about focus sessions.
pub trait SessionContext: Send + Sync {
	/// The currently active session, if any.
	fn active_session(&self) -> Result<Option<SessionId>, BlockError>;
}

/// In-memory session context with a settable active session. Used by tests
/// and by callers that track sessions themselves.
#[derive(Default)]
pub struct StaticSessionContext {
	active: Mutex<Option<SessionId>>,
}

impl StaticSessionContext {
	pub fn new(active: Option<SessionId>) -> Self {
		Self { active: Mutex::new(active) }
	}

	pub fn set_active(&self, session: Option<SessionId>) {
		*self.active.lock().unwrap() = session;
	}
}

impl SessionContext for StaticSessionContext {
	fn active_session(&self) -> Result<Option<SessionId>, BlockError> {
		Ok(self.active.lock().unwrap().clone())
	}
}
