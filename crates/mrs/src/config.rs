use mrs_engine::settings::EngineSettings;
use mrs_util::logging::LoggingPreset;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Note that the field of this struct are not capitalized.
/// Envy is case-insensitive, and expects Rust fields to be snake_case.
#[derive(Debug, Deserialize)]
pub struct MrsConfig {
	/// The logging level to run with
	#[serde(default)]
	pub mrs_loglevel: LoggingPreset,

	/// Holds the LCModel binary, default control files and `basis/`
	#[serde(default = "MrsConfig::default_lcmodel_dir")]
	pub mrs_lcmodel_dir: PathBuf,

	/// New run folders are created here
	#[serde(default = "MrsConfig::default_output_dir")]
	pub mrs_output_dir: PathBuf,

	/// Plugin node descriptors are read from here
	#[serde(default = "MrsConfig::default_plugin_dir")]
	pub mrs_plugin_dir: PathBuf,

	/// The segmentation helper program
	#[serde(default = "MrsConfig::default_seghelper_path")]
	pub mrs_seghelper_path: PathBuf,

	/// Kill a voxel's fit after this many seconds.
	/// Unset waits forever.
	#[serde(default)]
	pub mrs_fit_timeout_secs: Option<u64>,

	/// Write every step's signals as RAW files
	#[serde(default)]
	pub mrs_save_step_data: bool,

	/// Concentration maps leave out voxels whose CRLB (%SD) is above this
	#[serde(default)]
	pub mrs_map_max_crlb: Option<f64>,
}

impl MrsConfig {
	fn default_lcmodel_dir() -> PathBuf {
		"lcmodel".into()
	}

	fn default_output_dir() -> PathBuf {
		"output".into()
	}

	fn default_plugin_dir() -> PathBuf {
		"nodes".into()
	}

	fn default_seghelper_path() -> PathBuf {
		"mrs-seghelper".into()
	}

	pub fn engine_settings(&self) -> EngineSettings {
		EngineSettings {
			lcmodel_dir: self.mrs_lcmodel_dir.clone(),
			output_dir: self.mrs_output_dir.clone(),
			seghelper: self.mrs_seghelper_path.clone(),
			fit_timeout: self.mrs_fit_timeout_secs.map(Duration::from_secs),
			save_step_data: self.mrs_save_step_data,
			map_max_crlb: self.mrs_map_max_crlb,
		}
	}
}
