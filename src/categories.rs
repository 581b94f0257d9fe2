//! Static category table and its expansion into concrete targets.
//!
//! The table is fixed data; anything user-editable belongs in a wrapper, not
//! here. Unknown ids are rejected at [`CategoryId`] construction.

use std::collections::BTreeSet;

use crate::rules::{CategoryId, Target};

mod _static {
	/// category id -> blockable targets. Bare names are app names, dotted
	/// names are domains (see `Target::parse`).
	pub static CATEGORIES: &[(&str, &[&str])] = &[
		("social_media", &["facebook.com", "twitter.com", "instagram.com", "tiktok.com", "linkedin.com"]),
		("video", &["youtube.com", "netflix.com", "twitch.tv", "hulu.com"]),
		("news", &["news.ycombinator.com", "reddit.com", "cnn.com", "bbc.com"]),
		("gaming", &["store.steampowered.com", "epicgames.com", "steam", "Epic Games Launcher"]),
	];
}

pub fn is_known(id: &str) -> bool {
	_static::CATEGORIES.iter().any(|(name, _)| *name == id)
}

/// All category ids, for listings and completions.
pub fn all_ids() -> impl Iterator<Item = &'static str> {
	_static::CATEGORIES.iter().map(|(name, _)| *name)
}

/// Targets of a single category. The id was validated against the table at
/// construction, so the lookup cannot miss.
pub fn targets_of(id: &CategoryId) -> BTreeSet<Target> {
	let (_, entries) = _static::CATEGORIES.iter().find(|(name, _)| *name == id.as_str()).expect("CategoryId is table-validated");
	entries.iter().map(|raw| Target::parse(raw).expect("category table entries are well-formed")).collect()
}

/// Union of the targets of every given category, deduplicated. Order and
/// duplicates in the input make no difference.
pub fn expand_categories(ids: &[CategoryId]) -> BTreeSet<Target> {
	let mut out = BTreeSet::new();
	for id in ids {
		out.extend(targets_of(id));
	}
	out
}
