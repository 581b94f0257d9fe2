//! File-backed session registry.
//!
//! One line holding the current session id; a missing or empty file means no
//! session is running. The `session` subcommand writes it, the engine reads it
//! through the `SessionContext` trait.

use std::path::PathBuf;

use lockout::{BlockError, SessionContext, SessionId};

pub static SESSION_FILENAME: &str = "session.txt";

pub struct FileSessionContext {
	path: PathBuf,
}

impl FileSessionContext {
	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}

	pub fn start(&self, id: &SessionId) -> Result<(), BlockError> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&self.path, format!("{id}\n"))?;
		Ok(())
	}

	/// Clears the registry, returning the session that was running.
	pub fn end(&self) -> Result<Option<SessionId>, BlockError> {
		let current = self.active_session()?;
		if current.is_some() {
			std::fs::write(&self.path, "")?;
		}
		Ok(current)
	}
}

impl SessionContext for FileSessionContext {
	fn active_session(&self) -> Result<Option<SessionId>, BlockError> {
		match std::fs::read_to_string(&self.path) {
			Ok(content) => {
				let trimmed = content.trim();
				if trimmed.is_empty() { Ok(None) } else { Ok(Some(SessionId::new(trimmed)?)) }
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}
}
