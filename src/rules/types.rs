//! Rule data model: branded identifier newtypes and the closed rule union.
//!
//! Every identifier is validated once at the boundary; internal code only
//! ever sees the wrapper. A `Scheduled` rule carries its parsed cron
//! expression by construction, so a schedule without one is unrepresentable.

use std::{fmt, hash::Hasher as _, sync::LazyLock};

use clap::ValueEnum;
use jiff::Timestamp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{categories, error::BlockError, schedule::cron::CronExpression};

/// Rule identifier: `r-` followed by 12 lowercase hex digits.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuleId(String);

impl RuleId {
	/// Derive a fresh id from the rule's identity at creation time.
	pub(crate) fn generate(kind: RuleKind, target: &str, created_at: Timestamp) -> Self {
		let mut hasher = std::hash::DefaultHasher::new();
		hasher.write(kind.as_str().as_bytes());
		hasher.write(target.as_bytes());
		hasher.write_i128(created_at.as_nanosecond());
		let digest = format!("{:016x}", hasher.finish());
		Self(format!("r-{}", &digest[..12]))
	}

	pub fn new(raw: &str) -> Result<Self, BlockError> {
		let raw = raw.trim();
		let valid = raw.strip_prefix("r-").is_some_and(|hex| hex.len() == 12 && hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
		if !valid {
			return Err(BlockError::validation(format!("'{raw}' is not a rule id (expected r-<12 hex digits>)")));
		}
		Ok(Self(raw.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for RuleId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for RuleId {
	type Err = BlockError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl TryFrom<String> for RuleId {
	type Error = BlockError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		Self::new(&s)
	}
}

impl From<RuleId> for String {
	fn from(id: RuleId) -> String {
		id.0
	}
}

/// One label: LDH, no leading/trailing hyphen, 1-63 chars.
static DOMAIN_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap());

/// A blockable domain name, lowercased and validated against a DNS-label
/// grammar. Accepts either a bare domain or a full URL (host extracted).
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
	pub fn new(raw: &str) -> Result<Self, BlockError> {
		let raw = raw.trim();

		// Full URLs are a common paste; take their host part.
		let candidate = if raw.contains("://") {
			let url = Url::parse(raw).map_err(|e| BlockError::validation(format!("'{raw}' is not a valid URL: {e}")))?;
			match url.host_str() {
				Some(host) => host.to_string(),
				None => return Err(BlockError::validation(format!("'{raw}' has no host"))),
			}
		} else {
			raw.to_string()
		};

		let normalized = candidate.trim_end_matches('.').to_ascii_lowercase();
		if normalized.is_empty() || normalized.len() > 253 {
			return Err(BlockError::validation(format!("'{raw}' is not a valid domain")));
		}
		let labels: Vec<&str> = normalized.split('.').collect();
		if labels.len() < 2 || labels.iter().any(|l| !DOMAIN_LABEL.is_match(l)) {
			return Err(BlockError::validation(format!("'{raw}' is not a valid domain")));
		}
		Ok(Self(normalized))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Domain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for Domain {
	type Err = BlockError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl TryFrom<String> for Domain {
	type Error = BlockError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		Self::new(&s)
	}
}

impl From<Domain> for String {
	fn from(d: Domain) -> String {
		d.0
	}
}

/// An application name, as the process/bundle is known to the enforcer.
/// Non-empty after trimming, at most 128 chars, no path separators.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppName(String);

impl AppName {
	pub fn new(raw: &str) -> Result<Self, BlockError> {
		let trimmed = raw.trim();
		if trimmed.is_empty() {
			return Err(BlockError::validation("app name is empty"));
		}
		if trimmed.len() > 128 {
			return Err(BlockError::validation(format!("app name '{trimmed}' exceeds 128 chars")));
		}
		if trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains('\0') {
			return Err(BlockError::validation(format!("app name '{trimmed}' contains a path separator")));
		}
		Ok(Self(trimmed.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for AppName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for AppName {
	type Err = BlockError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl TryFrom<String> for AppName {
	type Error = BlockError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		Self::new(&s)
	}
}

impl From<AppName> for String {
	fn from(a: AppName) -> String {
		a.0
	}
}

/// A category identifier, validated against the static category table.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryId(String);

impl CategoryId {
	pub fn new(raw: &str) -> Result<Self, BlockError> {
		let normalized = raw.trim().to_ascii_lowercase();
		if !categories::is_known(&normalized) {
			return Err(BlockError::validation(format!("unknown category '{raw}' (see `category list`)")));
		}
		Ok(Self(normalized))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for CategoryId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for CategoryId {
	type Err = BlockError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl TryFrom<String> for CategoryId {
	type Error = BlockError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		Self::new(&s)
	}
}

impl From<CategoryId> for String {
	fn from(c: CategoryId) -> String {
		c.0
	}
}

/// Relative severity a downstream enforcer may use to pick its response.
/// Ordered: raising strictness is a strengthening mutation, lowering it a
/// weakening one.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
	Soft,
	#[default]
	Medium,
	Hard,
}

impl fmt::Display for Strictness {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Strictness::Soft => write!(f, "soft"),
			Strictness::Medium => write!(f, "medium"),
			Strictness::Hard => write!(f, "hard"),
		}
	}
}

/// Discriminant of the rule union, used for uniqueness and filtering.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
	Website,
	App,
	Category,
}

impl RuleKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			RuleKind::Website => "website",
			RuleKind::App => "app",
			RuleKind::Category => "category",
		}
	}
}

impl fmt::Display for RuleKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// What a rule points at. Closed union: every call site matches all three.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum RuleTarget {
	Website(Domain),
	App(AppName),
	Category(CategoryId),
}

impl RuleTarget {
	pub fn kind(&self) -> RuleKind {
		match self {
			RuleTarget::Website(_) => RuleKind::Website,
			RuleTarget::App(_) => RuleKind::App,
			RuleTarget::Category(_) => RuleKind::Category,
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			RuleTarget::Website(d) => d.as_str(),
			RuleTarget::App(a) => a.as_str(),
			RuleTarget::Category(c) => c.as_str(),
		}
	}
}

impl fmt::Display for RuleTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.kind(), self.as_str())
	}
}

/// A concrete blockable thing after category expansion.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
	Domain(Domain),
	App(AppName),
}

impl Target {
	/// Best-effort parse of caller input: a valid domain is a domain,
	/// anything else is treated as an app name.
	pub fn parse(raw: &str) -> Result<Self, BlockError> {
		if let Ok(domain) = Domain::new(raw) {
			return Ok(Target::Domain(domain));
		}
		AppName::new(raw).map(Target::App)
	}

	pub fn as_str(&self) -> &str {
		match self {
			Target::Domain(d) => d.as_str(),
			Target::App(a) => a.as_str(),
		}
	}
}

impl fmt::Display for Target {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// When a rule applies.
#[derive(Clone, Debug, PartialEq)]
pub enum Schedule {
	/// Blocked around the clock.
	Always,
	/// Blocked only while a focus session is running.
	FocusOnly,
	/// Blocked whenever the cron expression matches the current minute.
	Scheduled(CronExpression),
}

impl Schedule {
	pub fn kind(&self) -> ScheduleKind {
		match self {
			Schedule::Always => ScheduleKind::Always,
			Schedule::FocusOnly => ScheduleKind::FocusOnly,
			Schedule::Scheduled(_) => ScheduleKind::Scheduled,
		}
	}
}

impl fmt::Display for Schedule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Schedule::Always => write!(f, "always"),
			Schedule::FocusOnly => write!(f, "focus-only"),
			Schedule::Scheduled(cron) => write!(f, "cron '{}'", cron.raw()),
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
	Always,
	FocusOnly,
	Scheduled,
}

///// A blocking rule: target plus the conditions under which it is enforced.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockRule {
	pub id: RuleId,
	pub enabled: bool,
	pub strictness: Strictness,
	pub created_at: Timestamp,
	pub target: RuleTarget,
	pub schedule: Schedule,
}

impl BlockRule {
	pub fn kind(&self) -> RuleKind {
		self.target.kind()
	}

	/// The concrete targets this rule covers, with categories expanded.
	pub fn resolved_targets(&self) -> std::collections::BTreeSet<Target> {
		match &self.target {
			RuleTarget::Website(domain) => std::iter::once(Target::Domain(domain.clone())).collect(),
			RuleTarget::App(app) => std::iter::once(Target::App(app.clone())).collect(),
			RuleTarget::Category(id) => categories::targets_of(id),
		}
	}
}

/// What a caller supplies to create a rule; id and timestamps are the
/// store's business.
#[derive(Clone, Debug)]
pub struct NewRule {
	pub target: RuleTarget,
	pub strictness: Strictness,
	pub schedule: Schedule,
}
