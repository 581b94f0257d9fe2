//! Error taxonomy for the blocking engine.
//!
//! Every fallible engine operation returns a `BlockError`. The first five
//! variants are caller-recoverable and must be surfaced, never swallowed;
//! `System` wraps storage failures. `PermissionDenied` is a safety guarantee,
//! not a fault: it means a lock refused a weakening mutation.

use derive_more::derive::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlockError {
	/// Malformed target, cron expression, duration or platform name.
	#[error("validation failed: {0}")]
	Validation(String),

	/// Rule id not present in the store.
	#[error("no rule with id '{0}'")]
	NotFound(String),

	/// A rule with the same (kind, target) pair already exists.
	#[error("a {kind} rule for '{target}' already exists ({existing_id})")]
	AlreadyExists { kind: String, target: String, existing_id: String },

	/// The current enforcement lock refuses this weakening mutation.
	#[error("{lock} refuses to {action}")]
	PermissionDenied { lock: String, action: String },

	/// The operation's preconditions do not hold (e.g. strict mode with no
	/// active focus session).
	#[error("precondition failed: {0}")]
	PreconditionFailed(String),

	/// Storage or probe failure.
	#[error("system error: {0}")]
	System(String),
}

impl BlockError {
	pub fn validation(msg: impl Into<String>) -> Self {
		Self::Validation(msg.into())
	}

	pub fn precondition(msg: impl Into<String>) -> Self {
		Self::PreconditionFailed(msg.into())
	}

	/// Stable tag for the taxonomy bucket this error falls into.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Validation(_) => ErrorKind::Validation,
			Self::NotFound(_) => ErrorKind::NotFound,
			Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
			Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
			Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
			Self::System(_) => ErrorKind::SystemError,
		}
	}
}

/// Taxonomy bucket, for callers that branch on error class rather than
/// message.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorKind {
	#[display("validation")]
	Validation,
	#[display("not_found")]
	NotFound,
	#[display("already_exists")]
	AlreadyExists,
	#[display("permission_denied")]
	PermissionDenied,
	#[display("precondition_failed")]
	PreconditionFailed,
	#[display("system_error")]
	SystemError,
}

impl From<std::io::Error> for BlockError {
	fn from(e: std::io::Error) -> Self {
		Self::System(e.to_string())
	}
}

impl From<serde_json::Error> for BlockError {
	fn from(e: serde_json::Error) -> Self {
		Self::System(e.to_string())
	}
}
