//! Process clock.
//!
//! Effectful engine entry points read time from here instead of calling
//! `Timestamp::now()` directly, so unit tests can freeze the clock per
//! thread. Pure decision logic still takes `now` as an explicit parameter.

use jiff::Timestamp;

#[cfg(test)]
thread_local! {
	static FROZEN: std::cell::Cell<Option<Timestamp>> = const { std::cell::Cell::new(None) };
}

/// Current time, unless the calling thread froze it.
pub fn now() -> Timestamp {
	#[cfg(test)]
	if let Some(ts) = FROZEN.with(|c| c.get()) {
		return ts;
	}
	Timestamp::now()
}

/// Freeze `now()` for the calling thread. Tests only.
#[cfg(test)]
pub fn freeze(ts: Timestamp) {
	FROZEN.with(|c| c.set(Some(ts)));
}

/// Undo `freeze`. Tests only.
#[cfg(test)]
pub fn unfreeze() {
	FROZEN.with(|c| c.set(None));
}
