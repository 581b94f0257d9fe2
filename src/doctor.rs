//! Capability probes: whether this host can actually enforce blocks, and how
//! to fix it when it cannot.

use clap::Args;
use color_eyre::eyre::Result;
use lockout::permissions::{self, PermissionInstructions, PermissionStatus, RemediationMethod};

use crate::config::LiveSettings;

#[derive(Args, Clone, Debug)]
pub struct DoctorArgs {
	/// Print remediation instructions instead of probing
	#[arg(long)]
	instructions: bool,
	/// Platform to describe (linux/macos/windows); defaults to the running one
	#[arg(long, default_value = "")]
	platform: String,
}

pub async fn main(settings: &LiveSettings, args: DoctorArgs) -> Result<()> {
	if args.instructions {
		render_instructions(&permissions::permission_instructions(&args.platform)?);
		return Ok(());
	}
	let status = permissions::check_permissions(settings.config()?.probe_timeout()).await;
	render_status(&status);
	Ok(())
}

fn render_status(status: &PermissionStatus) {
	println!("platform: {}", status.platform);
	render_probe("hosts file writable", status.hosts_file_writable, status.hosts_file_error.as_deref());
	render_probe("process monitoring", status.process_monitoring_available, status.process_monitoring_error.as_deref());
	render_probe("process termination", status.process_termination_available, status.process_termination_error.as_deref());
	println!("overall: {}", status.overall_status);
	if !status.recommendations.is_empty() {
		println!("recommendations:");
		for recommendation in &status.recommendations {
			println!("  - {recommendation}");
		}
	}
}

fn render_probe(name: &str, ok: bool, error: Option<&str>) {
	match error {
		Some(e) if !ok => println!("{name}: no ({e})"),
		_ => println!("{name}: {}", if ok { "yes" } else { "no" }),
	}
}

fn render_instructions(instructions: &PermissionInstructions) {
	println!("platform: {}", instructions.platform);
	render_method("primary", &instructions.primary);
	for alternative in &instructions.alternatives {
		render_method("alternative", alternative);
	}
}

fn render_method(heading: &str, method: &RemediationMethod) {
	println!("{heading}: {}{}", method.name, if method.permanent { " (permanent)" } else { "" });
	for (i, step) in method.steps.iter().enumerate() {
		println!("  {}. {step}", i + 1);
	}
	if !method.grants.is_empty() {
		println!("  grants: {}", method.grants.join(", "));
	}
}
