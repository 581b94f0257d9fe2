//! Expiry/transition watcher.
//!
//! Once per tick it folds nuclear expiry and logs blocklist transitions as
//! schedules open and close. Purely push-style convenience for enforcement
//! daemons tailing the log; correctness never depends on this loop running,
//! since every engine call folds expiry on its own.

use clap::Args;
use color_eyre::eyre::Result;
use lockout::clock;

use crate::config::LiveSettings;

#[derive(Args, Clone, Debug)]
pub struct WatchArgs {
	/// Seconds between ticks; overrides the config value
	#[arg(long)]
	interval_secs: Option<u64>,
}

pub async fn main(settings: &LiveSettings, args: WatchArgs) -> Result<()> {
	let engine = crate::open_engine(settings)?;
	let mut previous = engine.active_targets(clock::now())?;

	tracing::info!("starting watch daemon, {} targets currently blocked", previous.len());

	loop {
		let interval = match args.interval_secs {
			Some(secs) => std::time::Duration::from_secs(secs),
			None => settings.config()?.watch_interval(),
		};
		tokio::time::sleep(interval).await;

		if let Err(e) = engine.evaluate_expiry() {
			tracing::error!("expiry evaluation failed: {e}");
			continue;
		}

		let current = match engine.active_targets(clock::now()) {
			Ok(targets) => targets,
			Err(e) => {
				tracing::error!("blocklist resolution failed: {e}");
				continue;
			}
		};

		for target in current.difference(&previous) {
			tracing::info!("now blocking {target}");
		}
		for target in previous.difference(&current) {
			tracing::info!("no longer blocking {target}");
		}
		previous = current;
	}
}
