//! Shared test infrastructure: a tempdir-rooted engine with a controllable
//! session context, reopenable over the same directory like a fresh process.

use std::sync::Arc;

use lockout::{BlockEngine, EnginePaths, NewRule, RuleTarget, Schedule, SessionId, StaticSessionContext, Strictness};

pub struct TestEngine {
	pub engine: BlockEngine,
	pub session: Arc<StaticSessionContext>,
	pub dir: tempfile::TempDir,
}

impl TestEngine {
	pub fn new() -> Self {
		Self::in_dir(tempfile::tempdir().unwrap())
	}

	pub fn in_dir(dir: tempfile::TempDir) -> Self {
		let session = Arc::new(StaticSessionContext::default());
		let engine = BlockEngine::open(EnginePaths::under(dir.path()), session.clone(), jiff::tz::TimeZone::UTC).unwrap();
		Self { engine, session, dir }
	}

	/// A fresh engine over the same directory, the way a new process would see it.
	pub fn reopen(self) -> Self {
		let TestEngine { engine, session, dir } = self;
		drop(engine);
		drop(session);
		Self::in_dir(dir)
	}

	pub fn state_path(&self) -> std::path::PathBuf {
		self.dir.path().join("state.json")
	}

	pub fn start_session(&self, id: &str) -> SessionId {
		let id = SessionId::new(id).unwrap();
		self.session.set_active(Some(id.clone()));
		id
	}

	/// Ends the session both in the context and towards the engine.
	/// Returns whether the notification armed a strict-mode disarm.
	pub fn end_session(&self, id: &SessionId) -> bool {
		self.session.set_active(None);
		self.engine.notify_session_ended(id).unwrap()
	}
}

pub fn website(domain: &str) -> NewRule {
	NewRule {
		target: RuleTarget::Website(domain.parse().unwrap()),
		strictness: Strictness::Medium,
		schedule: Schedule::Always,
	}
}

pub fn app(name: &str) -> NewRule {
	NewRule {
		target: RuleTarget::App(name.parse().unwrap()),
		strictness: Strictness::Medium,
		schedule: Schedule::Always,
	}
}

pub fn category(id: &str) -> NewRule {
	NewRule {
		target: RuleTarget::Category(id.parse().unwrap()),
		strictness: Strictness::Medium,
		schedule: Schedule::Always,
	}
}
