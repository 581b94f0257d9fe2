//! Schedule evaluation through the engine: cron windows, focus-bound rules,
//! and the never-matching fallback for persisted cron rows that stopped
//! parsing.
//!
//! Wall-clock sensitive expressions stay out of here; these tests only use
//! crons that match every minute or no minute at all.

use lockout::{CronExpression, NewRule, Schedule, Target, clock};

use crate::common::{TestEngine, website};

fn scheduled(domain: &str, expression: &str) -> NewRule {
	NewRule {
		schedule: Schedule::Scheduled(CronExpression::parse(expression).unwrap()),
		..website(domain)
	}
}

#[test]
fn test_cron_matching_every_minute_blocks_now() {
	let t = TestEngine::new();
	t.engine.create_rule(scheduled("reddit.com", "* * * * *")).unwrap();

	let target = Target::parse("reddit.com").unwrap();
	assert!(t.engine.is_blocking_active_for(&target, clock::now()).unwrap());
	assert!(t.engine.active_targets(clock::now()).unwrap().contains(&target));
}

#[test]
fn test_cron_that_never_fires_blocks_nothing() {
	let t = TestEngine::new();
	// February 31st does not exist in any year
	t.engine.create_rule(scheduled("reddit.com", "0 0 31 2 *")).unwrap();

	let target = Target::parse("reddit.com").unwrap();
	assert!(!t.engine.is_blocking_active_for(&target, clock::now()).unwrap());
	assert!(t.engine.active_targets(clock::now()).unwrap().is_empty());
}

#[test]
fn test_focus_only_rules_follow_the_session_context() {
	let t = TestEngine::new();
	t.engine.create_rule(NewRule { schedule: Schedule::FocusOnly, ..website("twitter.com") }).unwrap();

	let target = Target::parse("twitter.com").unwrap();
	assert!(!t.engine.is_blocking_active_for(&target, clock::now()).unwrap());

	let session = t.start_session("writing");
	assert!(t.engine.is_blocking_active_for(&target, clock::now()).unwrap());

	t.end_session(&session);
	assert!(!t.engine.is_blocking_active_for(&target, clock::now()).unwrap());
}

#[test]
fn test_always_rules_ignore_sessions_entirely() {
	let t = TestEngine::new();
	t.engine.create_rule(website("facebook.com")).unwrap();

	let target = Target::parse("facebook.com").unwrap();
	assert!(t.engine.is_blocking_active_for(&target, clock::now()).unwrap());
	t.start_session("anything");
	assert!(t.engine.is_blocking_active_for(&target, clock::now()).unwrap());
}

/// A row whose cron field was written by hand (or by a future version) and
/// no longer parses.
static BROKEN_CRON_STATE: &str = r#"{
  "blocking_enabled": true,
  "lock": { "state": "unlocked" },
  "rules": [
    {
      "id": "r-0123456789ab",
      "kind": "website",
      "target": "reddit.com",
      "enabled": true,
      "strictness": "hard",
      "created_at": "2020-01-01T00:00:00Z",
      "schedule": { "type": "cron", "expression": "every full moon" }
    }
  ]
}"#;

#[test]
fn test_unparseable_persisted_cron_loads_but_never_fires() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("state.json"), BROKEN_CRON_STATE).unwrap();

	let t = TestEngine::in_dir(dir);
	let id = lockout::RuleId::new("r-0123456789ab").unwrap();
	let rule = t.engine.get_rule(&id).unwrap();
	assert!(rule.enabled);

	let target = Target::parse("reddit.com").unwrap();
	assert!(!t.engine.is_blocking_active_for(&target, clock::now()).unwrap());

	// the raw expression survives the next save untouched
	t.engine.create_rule(website("lobste.rs")).unwrap();
	assert!(std::fs::read_to_string(t.state_path()).unwrap().contains("every full moon"));
}
