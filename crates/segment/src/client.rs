use std::{
	path::{Path, PathBuf},
	process::Command,
};
use tracing::{debug, error, info, warn};

use crate::{
	read_json, write_json, SegmentationError, SegmentationFiles, SegmentationRequest,
	TissueFractions, TissueSums,
};

pub const REQUEST_FILE: &str = "segmentation_request.json";
pub const RESULT_FILE: &str = "segmentation_result.json";

/// Runs the segmentation helper binary.
///
/// The helper gets one argument, the path of a [`SegmentationRequest`].
/// It writes [`TissueSums`] to the request's `result` path.
#[derive(Debug, Clone)]
pub struct SegmentationHelper {
	program: PathBuf,
}

impl SegmentationHelper {
	pub fn new(program: PathBuf) -> Self {
		Self { program }
	}

	pub fn program(&self) -> &Path {
		&self.program
	}

	/// Compute tissue sums in a child process, using `workdir` for transfer files
	pub fn run(
		&self,
		workdir: &Path,
		files: &SegmentationFiles,
		centre: [f64; 3],
		transform: [[f64; 4]; 4],
	) -> Result<TissueSums, SegmentationError> {
		for path in files.iter() {
			if !path.is_file() {
				return Err(SegmentationError::MissingFile {
					path: path.to_owned(),
				});
			}
		}

		std::fs::create_dir_all(workdir)?;
		let request_path = workdir.join(REQUEST_FILE);
		let result_path = workdir.join(RESULT_FILE);
		if result_path.exists() {
			std::fs::remove_file(&result_path)?;
		}

		write_json(
			&request_path,
			&SegmentationRequest {
				files: files.clone(),
				centre,
				transform,
				result: result_path.clone(),
			},
		)?;

		debug!(message = "Starting segmentation helper", program = ?self.program, ?request_path);
		let output = Command::new(&self.program)
			.arg(&request_path)
			.output()
			.map_err(|error| SegmentationError::Spawn {
				program: self.program.clone(),
				error,
			})?;

		if !output.status.success() {
			return Err(SegmentationError::HelperFailed {
				status: output.status.to_string(),
				output: format!(
					"{}{}",
					String::from_utf8_lossy(&output.stdout),
					String::from_utf8_lossy(&output.stderr)
				),
			});
		}

		if !result_path.is_file() {
			return Err(SegmentationError::NoResult { path: result_path });
		}

		return read_json(&result_path);
	}

	/// Tissue-corrected water concentration for one voxel.
	///
	/// Never fails: any problem is logged and gives `None`,
	/// which means "fit without a water concentration".
	pub fn water_concentration(
		&self,
		workdir: &Path,
		files: &SegmentationFiles,
		centre: Option<[f64; 3]>,
		transform: Option<[[f64; 4]; 4]>,
	) -> Option<f64> {
		let (centre, transform) = match (centre, transform) {
			(Some(c), Some(t)) => (c, t),
			_ => {
				error!(
					message = "Cannot use segmentation",
					error = %SegmentationError::NoVoxelGeometry
				);
				return None;
			}
		};

		let sums = match self.run(workdir, files, centre, transform) {
			Ok(x) => x,
			Err(error) => {
				error!(message = "Segmentation failed, ignoring water concentration", ?error);
				return None;
			}
		};

		let fractions = match TissueFractions::from_sums(&sums) {
			Some(x) => x,
			None => {
				warn!(message = "Segmentation sums to zero, ignoring water concentration");
				return None;
			}
		};

		let wconc = fractions.water_concentration();
		info!(
			message = "Computed tissue fractions",
			wm = fractions.wm,
			gm = fractions.gm,
			csf = fractions.csf,
			?wconc
		);
		return wconc;
	}
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;

	fn script(dir: &Path, body: &str) -> SegmentationHelper {
		use std::os::unix::fs::PermissionsExt;
		let path = dir.join("helper.sh");
		std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
		std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700)).unwrap();
		SegmentationHelper::new(path)
	}

	fn files(dir: &Path) -> SegmentationFiles {
		for f in ["wm.nii", "gm.nii", "csf.nii"] {
			std::fs::write(dir.join(f), "").unwrap();
		}
		SegmentationFiles {
			wm: dir.join("wm.nii"),
			gm: dir.join("gm.nii"),
			csf: dir.join("csf.nii"),
		}
	}

	const IDENTITY: [[f64; 4]; 4] = [
		[1.0, 0.0, 0.0, 0.0],
		[0.0, 1.0, 0.0, 0.0],
		[0.0, 0.0, 1.0, 0.0],
		[0.0, 0.0, 0.0, 1.0],
	];

	#[test]
	fn round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let helper = script(
			dir.path(),
			r#"printf '{"wm": 2, "gm": 1, "csf": 1}' > "$(dirname "$1")/segmentation_result.json""#,
		);
		let work = dir.path().join("work");

		let sums = helper
			.run(&work, &files(dir.path()), [0.0; 3], IDENTITY)
			.unwrap();
		assert_eq!(
			sums,
			TissueSums {
				wm: 2.0,
				gm: 1.0,
				csf: 1.0
			}
		);

		let request: SegmentationRequest = read_json(&work.join(REQUEST_FILE)).unwrap();
		assert_eq!(request.result, work.join(RESULT_FILE));

		let wconc = helper
			.water_concentration(&work, &files(dir.path()), Some([0.0; 3]), Some(IDENTITY))
			.unwrap();
		assert!(wconc > 0.0);
	}

	#[test]
	fn helper_fails() {
		let dir = tempfile::tempdir().unwrap();
		let helper = script(dir.path(), "echo broken; exit 2");
		let res = helper.run(&dir.path().join("w"), &files(dir.path()), [0.0; 3], IDENTITY);
		assert!(matches!(res, Err(SegmentationError::HelperFailed { .. })));

		// Degrades instead of failing
		assert!(helper
			.water_concentration(
				&dir.path().join("w"),
				&files(dir.path()),
				Some([0.0; 3]),
				Some(IDENTITY)
			)
			.is_none());
	}

	#[test]
	fn no_result() {
		let dir = tempfile::tempdir().unwrap();
		let helper = script(dir.path(), "true");
		let res = helper.run(&dir.path().join("w"), &files(dir.path()), [0.0; 3], IDENTITY);
		assert!(matches!(res, Err(SegmentationError::NoResult { .. })));
	}

	#[test]
	fn missing_inputs() {
		let dir = tempfile::tempdir().unwrap();
		let helper = script(dir.path(), "true");
		let f = SegmentationFiles {
			wm: dir.path().join("nope.nii"),
			gm: dir.path().join("nope.nii"),
			csf: dir.path().join("nope.nii"),
		};
		let res = helper.run(dir.path(), &f, [0.0; 3], IDENTITY);
		assert!(matches!(res, Err(SegmentationError::MissingFile { .. })));
	}
}
