//! Configuration loading with live reload.
//!
//! `LiveSettings` wraps the parsed config file and re-reads it when the file
//! changes on disk, so long-running commands (`watch`) pick up edits without a
//! restart. Stat calls are debounced to once per interval.

use std::{
	path::{Path, PathBuf},
	sync::{Arc, Mutex},
	time::{Duration, Instant, SystemTime},
};

use clap::Args;
use color_eyre::eyre::{Result, WrapErr, bail};
use lockout::Strictness;
use serde::Deserialize;
use smart_default::SmartDefault;
use v_utils::io::ExpandedPath;

#[derive(Args, Clone, Debug, Default)]
pub struct SettingsFlags {
	/// Path to the config file. Defaults to $XDG_CONFIG_HOME/lockout.toml.
	#[arg(long)]
	pub config: Option<ExpandedPath>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	/// Directory holding engine state and event logs. Defaults to the XDG state dir.
	pub data_dir: Option<ExpandedPath>,
	/// IANA timezone for schedule evaluation, e.g. "Europe/Berlin". Defaults to the system zone.
	pub timezone: Option<String>,
	pub rules: Option<RulesConfig>,
	pub watch: Option<WatchConfig>,
	pub doctor: Option<DoctorConfig>,
	pub events: Option<EventsConfig>,
}

#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct RulesConfig {
	/// Strictness assigned to new rules when `--strictness` is not given.
	#[default(Strictness::Medium)]
	pub default_strictness: Strictness,
}

#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct WatchConfig {
	#[default(60)]
	pub interval_secs: u64,
}

#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct DoctorConfig {
	#[default(5)]
	pub probe_timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct EventsConfig {
	/// How many events `events list` shows by default.
	#[default(20)]
	pub shown: usize,
}

impl AppConfig {
	pub fn engine_dir(&self) -> PathBuf {
		match &self.data_dir {
			Some(p) => p.0.clone(),
			None => v_utils::xdg_state_dir!("engine"),
		}
	}

	pub fn tz(&self) -> Result<jiff::tz::TimeZone> {
		match self.timezone.as_deref() {
			Some(name) => jiff::tz::TimeZone::get(name).wrap_err_with(|| format!("unknown timezone {name:?} in config")),
			None => Ok(jiff::tz::TimeZone::system()),
		}
	}

	pub fn default_strictness(&self) -> Strictness {
		self.rules.clone().unwrap_or_default().default_strictness
	}

	pub fn watch_interval(&self) -> Duration {
		Duration::from_secs(self.watch.clone().unwrap_or_default().interval_secs)
	}

	pub fn probe_timeout(&self) -> Duration {
		Duration::from_secs(self.doctor.clone().unwrap_or_default().probe_timeout_secs)
	}

	pub fn events_shown(&self) -> usize {
		self.events.clone().unwrap_or_default().shown
	}
}

#[derive(Debug)]
pub struct LiveSettings {
	path: PathBuf,
	debounce: Duration,
	cached: Mutex<Cached>,
}

#[derive(Debug)]
struct Cached {
	config: Arc<AppConfig>,
	mtime: Option<SystemTime>,
	checked_at: Instant,
}

impl LiveSettings {
	pub fn new(flags: SettingsFlags, debounce: Duration) -> Result<Self> {
		let path = match flags.config {
			Some(p) => {
				if !p.0.exists() {
					bail!("config file {} does not exist", p.0.display());
				}
				p.0
			}
			None => default_config_path(),
		};
		let config = load(&path)?;
		Ok(Self {
			path: path.clone(),
			debounce,
			cached: Mutex::new(Cached {
				config: Arc::new(config),
				mtime: mtime_of(&path),
				checked_at: Instant::now(),
			}),
		})
	}

	/// Current config, re-read from disk when the file changed since the last check.
	pub fn config(&self) -> Result<Arc<AppConfig>> {
		let mut cached = self.cached.lock().unwrap();
		if cached.checked_at.elapsed() >= self.debounce {
			cached.checked_at = Instant::now();
			let mtime = mtime_of(&self.path);
			if mtime != cached.mtime {
				cached.config = Arc::new(load(&self.path)?);
				cached.mtime = mtime;
			}
		}
		Ok(Arc::clone(&cached.config))
	}
}

/// Missing file is fine (all fields default); a file that exists but fails to parse is not.
fn load(path: &Path) -> Result<AppConfig> {
	let mut builder = config::Config::builder();
	if path.exists() {
		builder = builder.add_source(config::File::from(path));
	}
	builder
		.add_source(config::Environment::with_prefix("LOCKOUT").separator("__"))
		.build()
		.wrap_err_with(|| format!("failed to read config at {}", path.display()))?
		.try_deserialize::<AppConfig>()
		.wrap_err_with(|| format!("config at {} is not valid", path.display()))
}

fn mtime_of(path: &Path) -> Option<SystemTime> {
	std::fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

fn default_config_path() -> PathBuf {
	match std::env::var_os("XDG_CONFIG_HOME") {
		Some(dir) => PathBuf::from(dir).join("lockout.toml"),
		None => match std::env::var_os("HOME") {
			Some(home) => PathBuf::from(home).join(".config").join("lockout.toml"),
			None => PathBuf::from("lockout.toml"),
		},
	}
}
