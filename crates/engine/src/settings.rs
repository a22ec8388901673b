use std::{path::PathBuf, time::Duration};

/// Engine settings that hold for every run
#[derive(Debug, Clone)]
pub struct EngineSettings {
	/// Holds the LCModel binary (or its archive),
	/// default control files and `basis/`
	pub lcmodel_dir: PathBuf,

	/// New run folders are created here
	pub output_dir: PathBuf,

	/// The segmentation helper program
	pub seghelper: PathBuf,

	/// Kill a voxel's fit after this long. `None` waits forever.
	pub fit_timeout: Option<Duration>,

	/// Write every step's signals as RAW files
	pub save_step_data: bool,

	/// Concentration maps leave out voxels whose CRLB (%SD) is above this
	pub map_max_crlb: Option<f64>,
}

impl Default for EngineSettings {
	fn default() -> Self {
		Self {
			lcmodel_dir: "lcmodel".into(),
			output_dir: "output".into(),
			seghelper: "mrs-seghelper".into(),
			fit_timeout: None,
			save_step_data: false,
			map_max_crlb: None,
		}
	}
}

/// Answers that last for a whole session
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionPreferences {
	/// Set when a batch subject declines manual adjustment.
	/// Later subjects are not asked again.
	pub skip_manual_adjustment: bool,
}
