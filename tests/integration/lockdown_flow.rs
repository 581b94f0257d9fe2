//! Strict mode and nuclear option, end to end: arming, the weakening gate,
//! session-bound disarm, and expiry of a persisted nuclear lock.

use lockout::{EnforcementLock, ErrorKind, Strictness};
use rstest::{fixture, rstest};

use crate::common::{TestEngine, app, website};

#[test]
fn test_strict_mode_gates_weakening_until_the_session_ends() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("facebook.com")).unwrap();
	let extra = t.engine.create_rule(website("twitter.com")).unwrap();

	let session = t.start_session("deep-work");
	t.engine.enable_strict_mode(session.clone()).unwrap();

	// every weakening mutation is refused while the session runs
	assert_eq!(t.engine.remove_rule(&rule.id).unwrap_err().kind(), ErrorKind::PermissionDenied);
	assert_eq!(t.engine.set_enabled(&rule.id, false).unwrap_err().kind(), ErrorKind::PermissionDenied);
	assert_eq!(t.engine.set_strictness(&rule.id, Strictness::Soft).unwrap_err().kind(), ErrorKind::PermissionDenied);
	assert_eq!(t.engine.set_blocking_enabled(false).unwrap_err().kind(), ErrorKind::PermissionDenied);
	assert_eq!(t.engine.disable_strict_mode().unwrap_err().kind(), ErrorKind::PermissionDenied);

	// strengthening stays open
	t.engine.set_strictness(&rule.id, Strictness::Hard).unwrap();
	t.engine.create_rule(app("Steam")).unwrap();

	assert!(t.end_session(&session));
	let status = t.engine.strict_mode_status();
	assert_eq!(status.can_disable, Some(true));

	t.engine.disable_strict_mode().unwrap();
	t.engine.remove_rule(&extra.id).unwrap();
}

#[test]
fn test_strict_mode_requires_the_named_session_to_be_running() {
	let t = TestEngine::new();

	// no session at all
	let idle = lockout::SessionId::new("not-running").unwrap();
	let err = t.engine.enable_strict_mode(idle).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::PreconditionFailed);

	// a different session is running
	t.start_session("other");
	let stranger = lockout::SessionId::new("not-running").unwrap();
	let err = t.engine.enable_strict_mode(stranger).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
}

#[test]
fn test_ending_an_unrelated_session_leaves_strict_mode_armed() {
	let t = TestEngine::new();
	let session = t.start_session("focus");
	t.engine.enable_strict_mode(session).unwrap();

	let other = lockout::SessionId::new("other").unwrap();
	assert!(!t.engine.notify_session_ended(&other).unwrap());
	assert_eq!(t.engine.disable_strict_mode().unwrap_err().kind(), ErrorKind::PermissionDenied);
}

#[test]
fn test_strict_mode_survives_a_restart() {
	let t = TestEngine::new();
	let session = t.start_session("focus");
	t.engine.enable_strict_mode(session.clone()).unwrap();

	let t = t.reopen();
	let status = t.engine.strict_mode_status();
	assert_eq!(status.session_id, Some(session.clone()));
	assert_eq!(status.can_disable, Some(false));
	assert_eq!(t.engine.disable_strict_mode().unwrap_err().kind(), ErrorKind::PermissionDenied);

	// the session-ended notification still counts after the restart
	assert!(t.engine.notify_session_ended(&session).unwrap());
	t.engine.disable_strict_mode().unwrap();
	assert_eq!(t.engine.lock_state(), EnforcementLock::Unlocked);
}

#[test]
fn test_nuclear_option_refuses_all_weakening_for_its_duration() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("reddit.com")).unwrap();

	let status = t.engine.activate_nuclear_option(60).unwrap();
	assert!(status.active);
	let remaining = status.remaining_minutes.unwrap();
	assert!((59..=60).contains(&remaining), "unexpected remaining: {remaining}");

	assert_eq!(t.engine.remove_rule(&rule.id).unwrap_err().kind(), ErrorKind::PermissionDenied);
	assert_eq!(t.engine.set_enabled(&rule.id, false).unwrap_err().kind(), ErrorKind::PermissionDenied);
	assert_eq!(t.engine.set_blocking_enabled(false).unwrap_err().kind(), ErrorKind::PermissionDenied);

	// stacking a second lock on top is refused, as is strict mode
	assert_eq!(t.engine.activate_nuclear_option(30).unwrap_err().kind(), ErrorKind::PreconditionFailed);
	let session = t.start_session("focus");
	assert_eq!(t.engine.enable_strict_mode(session).unwrap_err().kind(), ErrorKind::PreconditionFailed);

	// strengthening still works
	t.engine.create_rule(app("Steam")).unwrap();
	t.engine.set_strictness(&rule.id, Strictness::Hard).unwrap();
}

#[test]
fn test_nuclear_option_rejects_a_zero_duration() {
	let t = TestEngine::new();
	let err = t.engine.activate_nuclear_option(0).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Validation);
	assert_eq!(t.engine.lock_state(), EnforcementLock::Unlocked);
}

/// State written by an older run whose nuclear window has long passed.
#[fixture]
fn expired_nuclear_state() -> &'static str {
	r#"{
  "blocking_enabled": true,
  "lock": {
    "state": "nuclear",
    "started_at": "2020-01-01T00:00:00Z",
    "ends_at": "2020-01-01T00:30:00Z",
    "duration_minutes": 30
  },
  "rules": [
    {
      "id": "r-1a2b3c4d5e6f",
      "kind": "website",
      "target": "news.ycombinator.com",
      "enabled": true,
      "strictness": "medium",
      "created_at": "2020-01-01T00:00:00Z",
      "schedule": { "type": "always" }
    }
  ]
}"#
}

#[rstest]
fn test_expired_nuclear_lock_folds_to_unlocked_on_first_read(expired_nuclear_state: &str) {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("state.json"), expired_nuclear_state).unwrap();

	let t = TestEngine::in_dir(dir);
	// reads fold in memory without rewriting the file
	assert_eq!(t.engine.lock_state(), EnforcementLock::Unlocked);
	assert!(std::fs::read_to_string(t.state_path()).unwrap().contains("nuclear"));

	// an expired lock no longer gates anything
	let rule_id = lockout::RuleId::new("r-1a2b3c4d5e6f").unwrap();
	t.engine.remove_rule(&rule_id).unwrap();
}

#[rstest]
fn test_evaluate_expiry_persists_the_unlock(expired_nuclear_state: &str) {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("state.json"), expired_nuclear_state).unwrap();

	let t = TestEngine::in_dir(dir);
	assert!(t.engine.evaluate_expiry().unwrap());
	assert!(std::fs::read_to_string(t.state_path()).unwrap().contains("unlocked"));

	// nothing left to expire on the next tick
	assert!(!t.engine.evaluate_expiry().unwrap());
}

#[test]
fn test_denial_names_the_lock_and_the_refused_action() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("instagram.com")).unwrap();
	let session = t.start_session("deep-work");
	t.engine.enable_strict_mode(session).unwrap();

	let msg = t.engine.remove_rule(&rule.id).unwrap_err().to_string();
	assert!(msg.contains("strict mode (session deep-work)"), "message was: {msg}");
	assert!(msg.contains(&format!("remove rule {}", rule.id)), "message was: {msg}");
}
