//! Blocking rules.
//!
//! The rule model (validated identifier newtypes plus the closed
//! website/app/category union) and the in-memory store that owns it.

mod store;
pub use store::{RuleFilter, RuleStore};

mod types;
pub use types::{AppName, BlockRule, CategoryId, Domain, NewRule, RuleId, RuleKind, RuleTarget, Schedule, ScheduleKind, Strictness, Target};
