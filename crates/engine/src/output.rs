//! The layout of a run's output folder

use mrs_data::file_extension;
use mrs_lcmodel::{orchestrator::enumerate_jobs, raw::write_raw};
use std::{
	ffi::OsString,
	path::{Path, PathBuf},
};
use tracing::debug;

use crate::history::Snapshot;

pub const HEADER_FILE: &str = "header.csv";
pub const PIPELINE_FILE: &str = "pipeline.pipe";
pub const ADJUSTMENT_FILE: &str = "manual_adjustment.txt";
pub const RESULTS_FILE: &str = "results.csv";
pub const MAPS_DIR: &str = "maps";
pub const LCMODEL_DIR: &str = "lcmodel";
pub const WORK_DIR: &str = "temp";

/// `path`'s file name without its extension.
/// `.nii.gz` counts as one extension.
pub fn file_stem(path: &Path) -> String {
	let name = match path.file_name().and_then(|x| x.to_str()) {
		Some(x) => x,
		None => return "data".into(),
	};

	return match file_extension(path) {
		Some(ext) if name.len() > ext.len() => name
			.get(..name.len() - ext.len() - 1)
			.unwrap_or(name)
			.into(),
		_ => name.into(),
	};
}

/// The folder name for a run started at `timestamp` on `first_file`
pub fn run_folder_name(timestamp: &str, first_file: &Path) -> String {
	return format!("{timestamp}_{}", file_stem(first_file));
}

/// `base` if it does not exist, otherwise the first free `base (i)`
pub fn unique_dir(base: PathBuf) -> PathBuf {
	if !base.exists() {
		return base;
	}

	let mut i = 1usize;
	loop {
		let mut name = OsString::from(base.as_os_str());
		name.push(format!(" ({i})"));
		let candidate = PathBuf::from(name);
		if !candidate.exists() {
			return candidate;
		}
		i += 1;
	}
}

/// Write the signals of one step as RAW files into
/// `<output>/<step><node_type>/data/`
pub fn export_step(
	output: &Path,
	step: usize,
	node_type: &str,
	snapshot: &Snapshot,
) -> std::io::Result<PathBuf> {
	let dir = output.join(format!("{step}{node_type}")).join("data");
	std::fs::create_dir_all(&dir)?;

	let info = &snapshot.main.info;
	let sequence = info.sequence.map(|s| s.name());

	for (i, job) in enumerate_jobs(&snapshot.main, None).iter().enumerate() {
		write_raw(&dir.join(format!("metab_{i}.RAW")), &job.fid, info, sequence)?;
	}

	if let Some(water) = snapshot.water.as_ref().and_then(|w| w.mean_fid()) {
		write_raw(&dir.join("wref.RAW"), &water, info, sequence)?;
	}

	debug!(message = "Exported step data", step, node_type, ?dir);
	return Ok(dir);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::{info, svs};
	use mrs_data::HeaderTable;
	use std::sync::Arc;

	#[test]
	fn stems() {
		assert_eq!(file_stem(Path::new("a/svs.json")), "svs");
		assert_eq!(file_stem(Path::new("a/seg.nii.gz")), "seg");
		assert_eq!(file_stem(Path::new("a/noext")), "noext");
		assert_eq!(
			run_folder_name("20240307_090501", Path::new("x/meas.dat")),
			"20240307_090501_meas"
		);
	}

	#[test]
	fn unique() {
		let dir = tempfile::tempdir().unwrap();
		let base = dir.path().join("run");
		assert_eq!(unique_dir(base.clone()), base);

		std::fs::create_dir_all(&base).unwrap();
		let second = unique_dir(base.clone());
		assert_eq!(second, dir.path().join("run (1)"));

		std::fs::create_dir_all(&second).unwrap();
		assert_eq!(unique_dir(base), dir.path().join("run (2)"));
	}

	#[test]
	fn export() {
		let dir = tempfile::tempdir().unwrap();
		let snapshot = Snapshot {
			main: Arc::new(svs(info(), 2, 1.0)),
			water: Some(Arc::new(svs(info(), 1, 10.0))),
			header: Arc::new(HeaderTable::new()),
			labels: None,
		};

		let out = export_step(dir.path(), 2, "PhaseCorrection", &snapshot).unwrap();
		assert_eq!(out, dir.path().join("2PhaseCorrection").join("data"));
		assert!(out.join("metab_0.RAW").is_file());
		assert!(out.join("wref.RAW").is_file());
	}
}
