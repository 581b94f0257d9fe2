//! The block-event recorder: append-only log, derived stats, id continuity
//! across restarts, and bypass-request bookkeeping.

use jiff::Timestamp;
use lockout::{BlockAttempt, ErrorKind, RuleId, Target};

use crate::common::{TestEngine, website};

fn attempt(rule_id: &RuleId, target: &str, blocked_at: Option<&str>, was_bypassed: bool) -> BlockAttempt {
	BlockAttempt {
		rule_id: rule_id.clone(),
		target: Target::parse(target).unwrap(),
		blocked_at: blocked_at.map(|s| s.parse::<Timestamp>().unwrap()),
		was_bypassed,
	}
}

#[test]
fn test_recorded_events_feed_rule_stats() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("facebook.com")).unwrap();

	// recorded out of order on purpose: last_triggered is the latest block,
	// not the latest record
	t.engine.record_block_attempt(attempt(&rule.id, "facebook.com", Some("2026-01-01T12:00:00Z"), false)).unwrap();
	t.engine.record_block_attempt(attempt(&rule.id, "facebook.com", Some("2026-01-02T09:00:00Z"), true)).unwrap();
	t.engine.record_block_attempt(attempt(&rule.id, "facebook.com", Some("2026-01-01T08:00:00Z"), false)).unwrap();

	let stats = t.engine.rule_stats(&rule.id).unwrap();
	assert_eq!(stats.total_blocks, 3);
	assert_eq!(stats.bypasses, 1);
	assert_eq!(stats.last_triggered, Some("2026-01-02T09:00:00Z".parse().unwrap()));
	// the rule was created moments ago, so the window clamps to one day
	assert_eq!(stats.avg_blocks_per_day, 3.0);
}

#[test]
fn test_recording_against_an_unknown_rule_is_refused() {
	let t = TestEngine::new();
	let ghost = RuleId::new("r-000000000000").unwrap();
	let err = t.engine.record_block_attempt(attempt(&ghost, "facebook.com", None, false)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_event_ids_continue_across_restart() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("reddit.com")).unwrap();
	let first = t.engine.record_block_attempt(attempt(&rule.id, "reddit.com", None, false)).unwrap();
	let second = t.engine.record_block_attempt(attempt(&rule.id, "reddit.com", None, false)).unwrap();
	assert_eq!(first.id, "ev-1");
	assert_eq!(second.id, "ev-2");

	let t = t.reopen();
	let third = t.engine.record_block_attempt(attempt(&rule.id, "reddit.com", None, false)).unwrap();
	assert_eq!(third.id, "ev-3");
	assert_eq!(t.engine.recent_events(10).len(), 3);
}

#[test]
fn test_recent_events_returns_the_newest_and_honors_the_limit() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("twitter.com")).unwrap();
	for _ in 0..5 {
		t.engine.record_block_attempt(attempt(&rule.id, "twitter.com", None, false)).unwrap();
	}

	let tail = t.engine.recent_events(2);
	assert_eq!(tail.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), ["ev-4", "ev-5"]);
	assert_eq!(t.engine.recent_events(100).len(), 5);
}

#[test]
fn test_corrupt_log_lines_are_skipped_without_losing_the_rest() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("reddit.com")).unwrap();
	t.engine.record_block_attempt(attempt(&rule.id, "reddit.com", None, false)).unwrap();

	let log = t.dir.path().join("events.jsonl");
	let mut content = std::fs::read_to_string(&log).unwrap();
	content.push_str("{ truncated by a crash\n");
	std::fs::write(&log, content).unwrap();

	let t = t.reopen();
	assert_eq!(t.engine.recent_events(10).len(), 1);
	// the sequence picks up after the surviving events
	let next = t.engine.record_block_attempt(attempt(&rule.id, "reddit.com", None, false)).unwrap();
	assert_eq!(next.id, "ev-2");
}

#[test]
fn test_bypass_requests_are_durable_and_validate_the_rule() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("instagram.com")).unwrap();

	let request = t.engine.request_bypass(&rule.id, Some("A1B2C3".to_string()), Some("urgent 2fa".to_string())).unwrap();
	assert_eq!(request.rule_id, rule.id);
	assert_eq!(request.bypass_code.as_deref(), Some("A1B2C3"));

	let t = t.reopen();
	let requests = t.engine.bypass_requests();
	assert_eq!(requests, vec![request]);

	let ghost = RuleId::new("r-000000000000").unwrap();
	assert_eq!(t.engine.request_bypass(&ghost, None, None).unwrap_err().kind(), ErrorKind::NotFound);
}
