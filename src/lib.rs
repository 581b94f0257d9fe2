//! Core policy engine for distraction blocking.
//!
//! Rules describe what gets blocked and when; the enforcement lock decides
//! whether blocking may be weakened at all; capability probes report whether
//! the host environment can enforce any of it. Applying blocks at the OS
//! level (hosts file edits, process kills) is a separate collaborator driven
//! through [`BlockEngine`].

#![feature(int_roundings)]

pub mod categories;
pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod lockdown;
pub mod permissions;
pub mod persist;
pub mod rules;
pub mod schedule;
pub mod session;

// Re-export the engine-facing types at the crate root for convenience
pub use engine::{BlockEngine, EnginePaths};
pub use error::{BlockError, ErrorKind};
pub use events::{BlockAttempt, BlockEvent, BypassRequest, RuleStats};
pub use lockdown::{EnforcementLock, NuclearStatus, StrictModeStatus};
pub use permissions::{OverallStatus, PermissionInstructions, PermissionStatus};
pub use rules::{AppName, BlockRule, CategoryId, Domain, NewRule, RuleFilter, RuleId, RuleKind, RuleTarget, Schedule, ScheduleKind, Strictness, Target};
pub use schedule::{CronError, CronExpression};
pub use session::{SessionContext, SessionId, StaticSessionContext};
