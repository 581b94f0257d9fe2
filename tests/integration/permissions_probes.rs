//! Capability probes against whatever host runs the suite. Nothing here
//! assumes a privileged or unprivileged environment; the assertions hold
//! either way.

use std::time::Duration;

use lockout::{ErrorKind, OverallStatus, permissions};

#[tokio::test]
async fn test_probe_results_are_internally_consistent() {
	let status = permissions::check_permissions(Duration::from_secs(5)).await;

	assert_eq!(status.platform, std::env::consts::OS);

	// each failing probe carries its error text, each passing one none
	let pairs = [
		(status.hosts_file_writable, &status.hosts_file_error),
		(status.process_monitoring_available, &status.process_monitoring_error),
		(status.process_termination_available, &status.process_termination_error),
	];
	for (available, error) in &pairs {
		assert_eq!(*available, error.is_none());
	}

	let failing = pairs.iter().filter(|(available, _)| !available).count();
	assert_eq!(status.recommendations.len(), failing);
	let expected = match failing {
		0 => OverallStatus::FullyFunctional,
		3 => OverallStatus::NonFunctional,
		_ => OverallStatus::Degraded,
	};
	assert_eq!(status.overall_status, expected);
}

#[test]
fn test_every_platform_documents_a_permanent_remediation() {
	for platform in ["linux", "macos", "windows"] {
		let instructions = permissions::permission_instructions(platform).unwrap();
		let methods: Vec<_> = std::iter::once(&instructions.primary).chain(&instructions.alternatives).collect();
		assert!(methods.iter().any(|m| m.permanent), "{platform} offers no permanent fix");
		// hosts-file write is the one capability nothing works without
		for m in &methods {
			assert!(m.grants.iter().any(|g| g == "hosts_file_write"), "{platform}: method '{}' grants no hosts access", m.name);
		}
	}
}

#[test]
fn test_macos_catalog_shape() {
	let instructions = permissions::permission_instructions("macos").unwrap();
	insta::assert_snapshot!(serde_json::to_string_pretty(&instructions).unwrap(), @r#"
	{
	  "platform": "macos",
	  "primary": {
	    "name": "full disk access",
	    "steps": [
	      "open System Settings > Privacy & Security > Full Disk Access",
	      "add the lockout binary (or your terminal) to the list",
	      "restart the enforcement daemon"
	    ],
	    "permanent": true,
	    "grants": [
	      "hosts_file_write"
	    ]
	  },
	  "alternatives": [
	    {
	      "name": "run with sudo",
	      "steps": [
	        "invoke the enforcement daemon as `sudo lockout watch`"
	      ],
	      "permanent": false,
	      "grants": [
	        "hosts_file_write",
	        "process_termination"
	      ]
	    }
	  ]
	}
	"#);
}

#[test]
fn test_platform_autodetect_and_rejection() {
	let auto = permissions::permission_instructions("").unwrap();
	assert_eq!(auto.platform, std::env::consts::OS);

	let err = permissions::permission_instructions("templeos").unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Validation);
}
