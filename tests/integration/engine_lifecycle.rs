//! Rule CRUD and state durability, driven through the public engine API only.

use std::sync::Arc;

use lockout::{BlockEngine, EnginePaths, ErrorKind, RuleFilter, RuleId, RuleKind, StaticSessionContext, Strictness, Target, clock};

use crate::common::{TestEngine, app, category, website};

#[test]
fn test_rules_survive_reopen() {
	let t = TestEngine::new();
	let created = t.engine.create_rule(website("facebook.com")).unwrap();
	t.engine.create_rule(app("Steam")).unwrap();

	let t = t.reopen();
	let rules = t.engine.list_rules(&RuleFilter::default());
	assert_eq!(rules.len(), 2);
	let revived = t.engine.get_rule(&created.id).unwrap();
	assert_eq!(revived, created);
}

#[test]
fn test_duplicate_target_is_rejected_even_after_reopen() {
	let t = TestEngine::new();
	t.engine.create_rule(website("twitter.com")).unwrap();

	let t = t.reopen();
	let err = t.engine.create_rule(website("twitter.com")).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::AlreadyExists);

	// Same name under a different kind is a different rule.
	t.engine.create_rule(app("twitter.com")).unwrap();
}

#[test]
fn test_list_filters_by_kind_and_enabled() {
	let t = TestEngine::new();
	let site = t.engine.create_rule(website("reddit.com")).unwrap();
	t.engine.create_rule(app("Discord")).unwrap();
	t.engine.create_rule(category("video")).unwrap();

	t.engine.set_enabled(&site.id, false).unwrap();

	let websites = t.engine.list_rules(&RuleFilter { kind: Some(RuleKind::Website), ..Default::default() });
	assert_eq!(websites.len(), 1);

	let enabled = t.engine.list_rules(&RuleFilter { enabled_only: true, ..Default::default() });
	assert_eq!(enabled.len(), 2);
	assert!(enabled.iter().all(|r| r.id != site.id));
}

#[test]
fn test_strictness_change_is_persisted() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("news.ycombinator.com")).unwrap();
	assert_eq!(rule.strictness, Strictness::Medium);

	t.engine.set_strictness(&rule.id, Strictness::Hard).unwrap();

	let t = t.reopen();
	assert_eq!(t.engine.get_rule(&rule.id).unwrap().strictness, Strictness::Hard);
}

#[test]
fn test_removal_deletes_durably() {
	let t = TestEngine::new();
	let rule = t.engine.create_rule(website("instagram.com")).unwrap();
	let removed = t.engine.remove_rule(&rule.id).unwrap();
	assert_eq!(removed.id, rule.id);

	let t = t.reopen();
	assert_eq!(t.engine.get_rule(&rule.id).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_unknown_rule_id_is_not_found() {
	let t = TestEngine::new();
	let ghost = RuleId::new("r-000000000000").unwrap();
	assert_eq!(t.engine.get_rule(&ghost).unwrap_err().kind(), ErrorKind::NotFound);
	assert_eq!(t.engine.remove_rule(&ghost).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_master_toggle_silences_all_targets() {
	let t = TestEngine::new();
	t.engine.create_rule(website("tiktok.com")).unwrap();
	let target = Target::parse("tiktok.com").unwrap();

	assert!(t.engine.is_blocking_active_for(&target, clock::now()).unwrap());

	assert!(!t.engine.set_blocking_enabled(false).unwrap());
	assert!(!t.engine.is_blocking_active_for(&target, clock::now()).unwrap());
	assert!(t.engine.active_targets(clock::now()).unwrap().is_empty());

	// And the switch is durable.
	let t = t.reopen();
	assert!(!t.engine.blocking_enabled());
}

#[test]
fn test_category_rule_expands_to_concrete_targets() {
	let t = TestEngine::new();
	t.engine.create_rule(category("social_media")).unwrap();

	let targets = t.engine.active_targets(clock::now()).unwrap();
	assert_eq!(targets.len(), 5);
	for domain in ["facebook.com", "twitter.com", "instagram.com", "tiktok.com", "linkedin.com"] {
		assert!(t.engine.is_blocking_active_for(&Target::parse(domain).unwrap(), clock::now()).unwrap(), "{domain} should be blocked");
	}
}

#[test]
fn test_corrupt_state_file_fails_open_with_system_error() {
	let t = TestEngine::new();
	t.engine.create_rule(website("epicgames.com")).unwrap();
	let state_path = t.state_path();
	let TestEngine { engine, session: _, dir } = t;
	drop(engine);

	std::fs::write(&state_path, "{ definitely not json").unwrap();
	let err = BlockEngine::open(EnginePaths::under(dir.path()), Arc::new(StaticSessionContext::default()), jiff::tz::TimeZone::UTC).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SystemError);
}
