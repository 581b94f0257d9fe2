//! Five-field cron expressions: parsing with span diagnostics, and
//! per-minute matching against a civil datetime.
//!
//! Grammar per field: `*`, single values, ranges (`a-b`), lists (`,`) and
//! steps (`/n`), with 3-letter names for months and weekdays and `7` accepted
//! as Sunday. Day-of-month and day-of-week are OR-combined when both are
//! restricted, as conventional cron does.

use jiff::civil::DateTime;
use miette::{Diagnostic, NamedSource, SourceSpan};

/// Error type for cron parsing.
/// Points at the offending field of the expression.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum CronError {
	#[error("expected 5 cron fields, found {found}")]
	#[diagnostic(code(lockout::cron::field_count), help("fields are: minute hour day-of-month month day-of-week"))]
	WrongFieldCount {
		#[source_code]
		src: NamedSource<String>,
		#[label("whole expression")]
		span: SourceSpan,
		found: usize,
	},

	#[error("invalid {field} field")]
	#[diagnostic(code(lockout::cron::invalid_field), help("each field is `*`, a value, a range `a-b` or a list, optionally with a `/step`"))]
	InvalidField {
		#[source_code]
		src: NamedSource<String>,
		#[label("{detail}")]
		span: SourceSpan,
		field: &'static str,
		detail: String,
	},
}

/// Membership bitset over a cron field's value range (all ranges fit in 64).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct FieldSet {
	bits: u64,
}

impl FieldSet {
	fn insert(&mut self, value: u8) {
		self.bits |= 1 << value;
	}

	fn contains(self, value: u8) -> bool {
		self.bits >> value & 1 == 1
	}
}

struct FieldSpec {
	name: &'static str,
	min: u8,
	max: u8,
	/// 3-letter names accepted in place of numbers; index i means `min + i`.
	aliases: &'static [&'static str],
	/// Sunday is both 0 and 7.
	fold_seven: bool,
}

static FIELDS: [FieldSpec; 5] = [
	FieldSpec { name: "minute", min: 0, max: 59, aliases: &[], fold_seven: false },
	FieldSpec { name: "hour", min: 0, max: 23, aliases: &[], fold_seven: false },
	FieldSpec { name: "day-of-month", min: 1, max: 31, aliases: &[], fold_seven: false },
	FieldSpec {
		name: "month",
		min: 1,
		max: 12,
		aliases: &["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"],
		fold_seven: false,
	},
	FieldSpec {
		name: "day-of-week",
		min: 0,
		max: 7,
		aliases: &["sun", "mon", "tue", "wed", "thu", "fri", "sat"],
		fold_seven: true,
	},
];

#[derive(Clone, Debug, Eq, PartialEq)]
struct Fields {
	minute: FieldSet,
	hour: FieldSet,
	day_of_month: FieldSet,
	month: FieldSet,
	day_of_week: FieldSet,
	/// A field is restricted unless its text starts with `*`.
	dom_restricted: bool,
	dow_restricted: bool,
}

/// A parsed cron expression, or a permanently-inactive placeholder for a
/// persisted expression that no longer parses.
#[derive(Clone, Debug, PartialEq)]
pub struct CronExpression {
	raw: String,
	fields: Option<Fields>,
}

impl CronExpression {
	pub fn parse(raw: &str) -> Result<Self, CronError> {
		let src = || NamedSource::new("cron", raw.to_string());
		let tokens = split_fields(raw);
		if tokens.len() != 5 {
			return Err(CronError::WrongFieldCount {
				src: src(),
				span: (0, raw.len()).into(),
				found: tokens.len(),
			});
		}

		let mut sets = [FieldSet::default(); 5];
		for (i, spec) in FIELDS.iter().enumerate() {
			let (offset, text) = tokens[i];
			sets[i] = parse_field(spec, text).map_err(|detail| CronError::InvalidField {
				src: src(),
				span: (offset, text.len()).into(),
				field: spec.name,
				detail,
			})?;
		}

		Ok(Self {
			raw: raw.to_string(),
			fields: Some(Fields {
				minute: sets[0],
				hour: sets[1],
				day_of_month: sets[2],
				month: sets[3],
				day_of_week: sets[4],
				dom_restricted: !tokens[2].1.starts_with('*'),
				dow_restricted: !tokens[4].1.starts_with('*'),
			}),
		})
	}

	/// A placeholder for persisted state whose expression no longer parses:
	/// keeps the raw text for display, matches nothing.
	pub(crate) fn never_matching(raw: &str) -> Self {
		Self { raw: raw.to_string(), fields: None }
	}

	pub fn is_valid(&self) -> bool {
		self.fields.is_some()
	}

	pub fn raw(&self) -> &str {
		&self.raw
	}

	/// Whether the expression matches the given civil minute.
	pub fn matches(&self, dt: DateTime) -> bool {
		let Some(f) = &self.fields else { return false };
		if !f.minute.contains(dt.minute() as u8) || !f.hour.contains(dt.hour() as u8) || !f.month.contains(dt.month() as u8) {
			return false;
		}
		let dom_ok = f.day_of_month.contains(dt.day() as u8);
		let dow_ok = f.day_of_week.contains(dt.weekday().to_sunday_zero_offset() as u8);
		if f.dom_restricted && f.dow_restricted { dom_ok || dow_ok } else { dom_ok && dow_ok }
	}
}

impl std::str::FromStr for CronExpression {
	type Err = CronError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// Whitespace-split with byte offsets, for error spans.
fn split_fields(raw: &str) -> Vec<(usize, &str)> {
	let mut out = Vec::new();
	let mut rest = raw;
	let mut base = 0;
	loop {
		let trimmed = rest.trim_start();
		base += rest.len() - trimmed.len();
		if trimmed.is_empty() {
			break;
		}
		let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
		out.push((base, &trimmed[..end]));
		base += end;
		rest = &trimmed[end..];
	}
	out
}

fn parse_field(spec: &FieldSpec, text: &str) -> Result<FieldSet, String> {
	let mut set = FieldSet::default();
	for item in text.split(',') {
		if item.is_empty() {
			return Err("empty list item".to_string());
		}
		let (range_part, step) = match item.split_once('/') {
			Some((range, step_str)) => {
				let step: u8 = step_str.parse().map_err(|_| format!("step '{step_str}' is not a number"))?;
				if step == 0 {
					return Err("step must be at least 1".to_string());
				}
				(range, step)
			}
			None => (item, 1),
		};

		// `*` for day-of-week covers 0-6; an explicit 7 still folds to Sunday.
		let star_max = if spec.fold_seven { 6 } else { spec.max };
		let (start, end) = if range_part == "*" {
			(spec.min, star_max)
		} else if let Some((a, b)) = range_part.split_once('-') {
			(parse_value(spec, a)?, parse_value(spec, b)?)
		} else {
			let v = parse_value(spec, range_part)?;
			// a bare value with a step means "from v to the top"
			if step > 1 { (v, star_max) } else { (v, v) }
		};
		if start > end {
			return Err(format!("range start {start} is greater than end {end}"));
		}

		let mut v = start;
		while v <= end {
			set.insert(if spec.fold_seven && v == 7 { 0 } else { v });
			v = match v.checked_add(step) {
				Some(next) => next,
				None => break,
			};
		}
	}
	Ok(set)
}

fn parse_value(spec: &FieldSpec, text: &str) -> Result<u8, String> {
	if !spec.aliases.is_empty() {
		let lowered = text.to_ascii_lowercase();
		if let Some(idx) = spec.aliases.iter().position(|a| *a == lowered) {
			return Ok(spec.min + idx as u8);
		}
	}
	let v: u8 = text.parse().map_err(|_| {
		if spec.aliases.is_empty() {
			format!("'{text}' is not a number")
		} else {
			format!("'{text}' is not a number or 3-letter name")
		}
	})?;
	if v < spec.min || v > spec.max {
		return Err(format!("{v} is out of range {}-{}", spec.min, spec.max));
	}
	Ok(v)
}
