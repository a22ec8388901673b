//! Computes tissue sums for one voxel, then exits.
//!
//! Usage: `mrs-seghelper <request.json>`.
//! The result is written to the path named in the request.
//! Exits with status 1 on any error.

use mrs_segment::{read_json, window_sums, write_json, SegmentationRequest};
use mrs_util::{load_env, logging::LoggingPreset};
use serde::Deserialize;
use std::{path::PathBuf, process::exit};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Shares the main program's environment
#[derive(Debug, Deserialize)]
struct HelperConfig {
	#[serde(default)]
	mrs_loglevel: LoggingPreset,
}

fn main() {
	let config = match load_env::<HelperConfig>() {
		Ok(x) => x.into_config(),
		Err(_) => HelperConfig {
			mrs_loglevel: LoggingPreset::Default,
		},
	};

	// stdout belongs to the parent process
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from(config.mrs_loglevel.get_config()))
		.without_time()
		.with_ansi(false)
		.with_writer(std::io::stderr)
		.init();

	let request_path = match std::env::args_os().nth(1) {
		Some(x) => PathBuf::from(x),
		None => {
			error!(message = "Usage: mrs-seghelper <request.json>");
			exit(1);
		}
	};

	let request: SegmentationRequest = match read_json(&request_path) {
		Ok(x) => x,
		Err(error) => {
			error!(message = "Could not read request", ?request_path, ?error);
			exit(1);
		}
	};
	debug!(message = "Read request", ?request);

	let sums = match window_sums(&request) {
		Ok(x) => x,
		Err(error) => {
			error!(message = "Could not compute tissue sums", ?error);
			exit(1);
		}
	};

	if let Err(error) = write_json(&request.result, &sums) {
		error!(message = "Could not write result", result = ?request.result, ?error);
		exit(1);
	}

	info!(message = "Wrote tissue sums", ?sums);
}
