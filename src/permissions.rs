//! Capability probes: whether this environment can actually enforce blocks.
//!
//! Three independent probes (hosts-file writability, process enumeration,
//! process termination), each bounded by a timeout; a hung probe counts as a
//! failed one. Probes are read-only from the caller's point of view: the
//! hosts check opens for append and creates a throwaway sibling file, it
//! never alters content.

use std::{fs::OpenOptions, path::Path, process::Command, time::Duration};

use derive_more::derive::Display;
use serde::Serialize;

use crate::error::BlockError;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
	#[display("fully_functional")]
	FullyFunctional,
	#[display("degraded")]
	Degraded,
	#[display("non_functional")]
	NonFunctional,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PermissionStatus {
	pub hosts_file_writable: bool,
	pub hosts_file_error: Option<String>,
	pub process_monitoring_available: bool,
	pub process_monitoring_error: Option<String>,
	pub process_termination_available: bool,
	pub process_termination_error: Option<String>,
	pub overall_status: OverallStatus,
	pub recommendations: Vec<String>,
	pub platform: String,
}

/// Runs all three probes concurrently, each under its own timeout.
pub async fn check_permissions(timeout: Duration) -> PermissionStatus {
	let (hosts, monitoring, termination) = tokio::join!(
		bounded(timeout, probe_hosts_writable),
		bounded(timeout, probe_process_monitoring),
		bounded(timeout, probe_process_termination),
	);
	combine(hosts, monitoring, termination, std::env::consts::OS.to_string())
}

async fn bounded(limit: Duration, probe: fn() -> Result<(), String>) -> Result<(), String> {
	match tokio::time::timeout(limit, tokio::task::spawn_blocking(probe)).await {
		Ok(Ok(outcome)) => outcome,
		Ok(Err(join_err)) => Err(format!("probe crashed: {join_err}")),
		Err(_) => Err(format!("probe timed out after {}s", limit.as_secs())),
	}
}

fn hosts_path() -> &'static Path {
	if cfg!(windows) { Path::new(r"C:\Windows\System32\drivers\etc\hosts") } else { Path::new("/etc/hosts") }
}

/// Append-open proves write permission on the file itself; the temp file
/// proves we could stage a replacement next to it. Both leave no trace.
fn probe_hosts_writable() -> Result<(), String> {
	let path = hosts_path();
	OpenOptions::new().append(true).open(path).map_err(|e| format!("cannot open {} for writing: {e}", path.display()))?;
	let parent = path.parent().ok_or_else(|| format!("{} has no parent directory", path.display()))?;
	tempfile::NamedTempFile::new_in(parent).map_err(|e| format!("cannot create files in {}: {e}", parent.display()))?;
	Ok(())
}

fn probe_process_monitoring() -> Result<(), String> {
	let result = if cfg!(windows) { Command::new("tasklist").output() } else { Command::new("ps").arg("-e").output() };
	let output = result.map_err(|e| format!("cannot run a process listing: {e}"))?;
	if !output.status.success() {
		return Err(format!("process listing exited with {}", output.status));
	}
	if output.stdout.is_empty() {
		return Err("process listing produced no output".to_string());
	}
	Ok(())
}

/// Spawns a throwaway long-running child and kills it.
fn probe_process_termination() -> Result<(), String> {
	let spawned = if cfg!(windows) {
		Command::new("ping").args(["-n", "30", "127.0.0.1"]).stdout(std::process::Stdio::null()).spawn()
	} else {
		Command::new("sleep").arg("30").spawn()
	};
	let mut child = spawned.map_err(|e| format!("cannot spawn a test process: {e}"))?;
	let killed = child.kill().map_err(|e| format!("cannot terminate a process we spawned: {e}"));
	let _ = child.wait(); // reap either way
	killed
}

fn combine(hosts: Result<(), String>, monitoring: Result<(), String>, termination: Result<(), String>, platform: String) -> PermissionStatus {
	let ok_count = [&hosts, &monitoring, &termination].iter().filter(|r| r.is_ok()).count();
	let overall_status = match ok_count {
		3 => OverallStatus::FullyFunctional,
		0 => OverallStatus::NonFunctional,
		_ => OverallStatus::Degraded,
	};

	let mut recommendations = Vec::new();
	if hosts.is_err() {
		recommendations.push(format!("grant write access to {} (see `doctor --instructions`)", hosts_path().display()));
	}
	if monitoring.is_err() {
		recommendations.push("make a process-listing tool (ps or tasklist) available on PATH".to_string());
	}
	if termination.is_err() {
		recommendations.push("run with privileges that allow terminating processes".to_string());
	}

	PermissionStatus {
		hosts_file_writable: hosts.is_ok(),
		hosts_file_error: hosts.err(),
		process_monitoring_available: monitoring.is_ok(),
		process_monitoring_error: monitoring.err(),
		process_termination_available: termination.is_ok(),
		process_termination_error: termination.err(),
		overall_status,
		recommendations,
		platform,
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RemediationMethod {
	pub name: String,
	pub steps: Vec<String>,
	pub permanent: bool,
	pub grants: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PermissionInstructions {
	pub platform: String,
	pub primary: RemediationMethod,
	pub alternatives: Vec<RemediationMethod>,
}

fn method(name: &str, steps: &[&str], permanent: bool, grants: &[&str]) -> RemediationMethod {
	RemediationMethod {
		name: name.to_string(),
		steps: steps.iter().map(|s| s.to_string()).collect(),
		permanent,
		grants: grants.iter().map(|s| s.to_string()).collect(),
	}
}

/// Remediation catalog per platform. An empty string means the running one.
pub fn permission_instructions(platform: &str) -> Result<PermissionInstructions, BlockError> {
	let resolved = if platform.is_empty() { std::env::consts::OS } else { platform };
	let (primary, alternatives) = match resolved {
		"linux" => (
			method(
				"run with sudo",
				&["invoke the enforcement daemon as `sudo lockout watch`", "keep your user session unprivileged; only the daemon needs root"],
				false,
				&["hosts_file_write", "process_termination"],
			),
			vec![
				method(
					"dedicated hosts group",
					&[
						"create a group: `sudo groupadd hostsctl`",
						"hand the file over: `sudo chgrp hostsctl /etc/hosts && sudo chmod g+w /etc/hosts`",
						"join it: `sudo usermod -aG hostsctl $USER`, then log out and back in",
					],
					true,
					&["hosts_file_write"],
				),
				method(
					"systemd service",
					&["install a unit running `lockout watch` as root", "enable it: `sudo systemctl enable --now lockout.service`"],
					true,
					&["hosts_file_write", "process_monitoring", "process_termination"],
				),
			],
		),
		"macos" => (
			method(
				"full disk access",
				&[
					"open System Settings > Privacy & Security > Full Disk Access",
					"add the lockout binary (or your terminal) to the list",
					"restart the enforcement daemon",
				],
				true,
				&["hosts_file_write"],
			),
			vec![method("run with sudo", &["invoke the enforcement daemon as `sudo lockout watch`"], false, &[
				"hosts_file_write",
				"process_termination",
			])],
		),
		"windows" => (
			method(
				"run as administrator",
				&["right-click the terminal and choose \"Run as administrator\"", "start `lockout watch` from that shell"],
				false,
				&["hosts_file_write", "process_termination"],
			),
			vec![method(
				"elevated scheduled task",
				&[
					"open Task Scheduler and create a task running `lockout watch` at logon",
					"tick \"Run with highest privileges\"",
				],
				true,
				&["hosts_file_write", "process_monitoring", "process_termination"],
			)],
		),
		other => return Err(BlockError::validation(format!("unknown platform '{other}' (expected macos, windows or linux)"))),
	};
	Ok(PermissionInstructions { platform: resolved.to_string(), primary, alternatives })
}
