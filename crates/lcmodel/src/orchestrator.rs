//! Runs one fit per voxel and collects the results.
//!
//! Jobs run one after another. Each job gets a private directory
//! under the work directory. Its outputs are moved into
//! `<output>/<label>/` once the fit succeeds, so the output folder
//! never holds partial results. A failed job is logged and skipped;
//! it never stops the jobs after it.

use mrs_data::{Acquisition, AcquisitionInfo, Dataset, Fid};
use std::{
	path::{Path, PathBuf},
	sync::Arc,
};
use tracing::{debug, error, info, warn};

use crate::{
	control::ControlParams,
	coord::CoordResult,
	raw::write_raw,
	runner::{FitError, FitRunner},
};

/// Control keys we always set ourselves
pub const RESERVED_KEYS: &[&str] = &[
	"FILRAW", "FILBAS", "FILPRI", "FILTAB", "FILPS", "FILCOO", "FILCOR", "FILCSV", "FILH2O",
	"NUNFIL", "DELTAT", "ECHOT", "HZPPPM",
];

/// Files a successful fit must produce
pub const EXPECTED_OUTPUTS: &[&str] = &["table", "ps", "coord", "csv"];

/// The label used for the first single-voxel job
pub const SVS_LABEL: &str = "lcm";

/// One voxel to fit
#[derive(Debug, Clone)]
pub struct FitJob {
	pub label: String,
	pub fid: Fid,
}

/// Split a processed dataset into fitting jobs.
///
/// Single-voxel data gives one job per acquisition, labelled by `labels`
/// if given and by index otherwise. Grid data gives one job per cell
/// of the first grid, labelled `i_j_k` (1-based, x fastest).
pub fn enumerate_jobs(data: &Dataset, labels: Option<&[String]>) -> Vec<FitJob> {
	let mut jobs = Vec::new();

	if data.is_single_voxel() {
		for (i, a) in data.acquisitions.iter().enumerate() {
			let fid = match Fid::mean(a.fids()) {
				Some(x) => x,
				None => {
					warn!(message = "Skipping acquisition with unequal channels", index = i);
					continue;
				}
			};

			let label = labels
				.and_then(|l| l.get(i))
				.cloned()
				.unwrap_or_else(|| i.to_string());

			jobs.push(FitJob {
				label: if label == "0" { SVS_LABEL.into() } else { label },
				fid,
			});
		}
		return jobs;
	}

	let mut grids = data.acquisitions.iter().filter_map(|a| match a {
		Acquisition::Grid { dims, voxels } => Some((dims, voxels)),
		Acquisition::SingleVoxel { .. } => None,
	});

	if let Some((dims, voxels)) = grids.next() {
		for (i, j, k) in dims.cells() {
			let fid = match dims.index(i, j, k).and_then(|x| voxels.get(x)) {
				Some(x) => x.clone(),
				None => continue,
			};

			jobs.push(FitJob {
				label: format!("{}_{}_{}", i + 1, j + 1, k + 1),
				fid,
			});
		}
	}

	if grids.next().is_some() {
		warn!(message = "Dataset has more than one grid, fitting only the first");
	}

	return jobs;
}

/// Settings shared by every job in one run
#[derive(Debug, Clone)]
pub struct FitSettings {
	pub info: Arc<AcquisitionInfo>,
	pub sequence: Option<String>,
	pub basis: PathBuf,

	/// User control parameters, merged into every job's control file
	pub control: ControlParams,

	/// Water reference spectrum. Also used for `DOWS`.
	pub water: Option<Fid>,

	/// Let LCModel do water scaling
	pub dows: bool,

	/// Tissue-corrected water concentration
	pub wconc: Option<f64>,
}

/// Build the control parameters for one job
pub fn job_control(job: &FitJob, settings: &FitSettings) -> ControlParams {
	let label = job.label.as_str();
	let info = &settings.info;
	let mut p = ControlParams::new();

	p.insert("KEY", 123456789i64);
	p.insert("FILRAW", format!("./{label}.RAW"));
	p.insert("FILBAS", settings.basis.to_string_lossy().into_owned());
	p.insert("FILPRI", format!("./{label}.print"));
	p.insert("FILTAB", format!("./{label}.table"));
	p.insert("FILPS", format!("./{label}.ps"));
	p.insert("FILCOO", format!("./{label}.coord"));
	p.insert("FILCOR", format!("./{label}.coraw"));
	p.insert("FILCSV", format!("./{label}.csv"));
	p.insert("NUNFIL", job.fid.len() as i64);
	p.insert("DELTAT", info.dwell);
	p.insert("ECHOT", info.te);
	p.insert("HZPPPM", info.f0);
	p.insert("LCOORD", 9i64);
	p.insert("LCSV", 11i64);
	p.insert("LTABLE", 7i64);

	for (k, v) in settings.control.iter() {
		if !RESERVED_KEYS.contains(&k) {
			p.insert(k, v.clone());
		}
	}

	if settings.water.is_some() {
		p.insert("FILH2O", format!("./{label}.H2O"));
		p.insert("DOWS", settings.dows);
		if let Some(wconc) = settings.wconc {
			p.insert("WCONC", wconc);
		}
	} else {
		p.insert("DOWS", false);
		p.insert("DOECC", false);
		p.remove("WCONC");
	}

	return p;
}

/// A job that produced results
#[derive(Debug, Clone)]
pub struct JobResult {
	pub label: String,

	/// Where this job's outputs were moved
	pub dir: PathBuf,

	/// `None` if the coord file could not be read
	pub coord: Option<CoordResult>,
}

#[derive(Debug)]
pub struct JobFailure {
	pub label: String,
	pub error: FitError,
}

#[derive(Debug, Default)]
pub struct FitReport {
	pub completed: Vec<JobResult>,
	pub failed: Vec<JobFailure>,
}

impl FitReport {
	pub fn is_success(&self) -> bool {
		self.failed.is_empty()
	}
}

pub struct Orchestrator<'a> {
	runner: &'a dyn FitRunner,

	/// Scratch space. Cleared when a run ends.
	workdir: PathBuf,

	/// Job outputs go into subdirectories of this one
	output: PathBuf,
}

impl<'a> Orchestrator<'a> {
	pub fn new(runner: &'a dyn FitRunner, workdir: PathBuf, output: PathBuf) -> Self {
		Self {
			runner,
			workdir,
			output,
		}
	}

	/// Run every job.
	/// Only errors that affect all jobs are returned as `Err`.
	pub fn run(&self, jobs: &[FitJob], settings: &FitSettings) -> Result<FitReport, FitError> {
		if self.workdir.exists() {
			std::fs::remove_dir_all(&self.workdir)?;
		}
		std::fs::create_dir_all(&self.workdir)?;
		let _workdir = RemoveOnDrop {
			path: &self.workdir,
		};

		if self.output.exists() {
			std::fs::remove_dir_all(&self.output)?;
		}
		std::fs::create_dir_all(&self.output)?;

		// The fit runs elsewhere, relative paths would break
		let mut settings = settings.clone();
		if let Ok(basis) = std::fs::canonicalize(&settings.basis) {
			settings.basis = basis;
		}

		info!(
			message = "Fitting voxels",
			jobs = jobs.len(),
			basis = ?settings.basis,
			water = settings.water.is_some(),
			wconc = ?settings.wconc,
		);

		let mut report = FitReport::default();
		for job in jobs {
			match self.run_job(job, &settings) {
				Ok(result) => report.completed.push(result),
				Err(error) => {
					error!(message = "Fit failed", label = job.label.as_str(), ?error);
					report.failed.push(JobFailure {
						label: job.label.clone(),
						error,
					});
				}
			}
		}

		info!(
			message = "Fitting complete",
			completed = report.completed.len(),
			failed = report.failed.len()
		);

		return Ok(report);
	}

	fn run_job(&self, job: &FitJob, settings: &FitSettings) -> Result<JobResult, FitError> {
		let label = job.label.as_str();
		let dir = self.workdir.join(label);
		std::fs::create_dir_all(&dir)?;

		let control = format!("{label}.CONTROL");
		let write = |file: &str, r: std::io::Result<()>| {
			r.map_err(|error| FitError::Write {
				file: file.to_owned(),
				error,
			})
		};

		let params = job_control(job, settings);
		write(&control, params.write(&dir.join(&control)))?;

		let seq = settings.sequence.as_deref();
		let raw = format!("{label}.RAW");
		write(&raw, write_raw(&dir.join(&raw), &job.fid, &settings.info, seq))?;

		if let Some(water) = &settings.water {
			let h2o = format!("{label}.H2O");
			write(&h2o, write_raw(&dir.join(&h2o), water, &settings.info, seq))?;
		}

		info!(message = "Running LCModel", label);
		let stdout = self.runner.run(&dir, Path::new(&control))?;
		let stdout = stdout
			.lines()
			.filter(|l| !l.trim().is_empty())
			.collect::<Vec<_>>()
			.join("\n");
		debug!(message = "LCModel output", label, %stdout);

		let missing = EXPECTED_OUTPUTS
			.iter()
			.map(|ext| format!("{label}.{ext}"))
			.filter(|f| !dir.join(f).is_file())
			.collect::<Vec<_>>();
		if !missing.is_empty() {
			return Err(FitError::MissingOutputs { files: missing });
		}

		let dest = self.output.join(label);
		if dest.exists() {
			std::fs::remove_dir_all(&dest)?;
		}
		move_dir_contents(&dir, &dest)?;

		let coord = match CoordResult::read(&dest.join(format!("{label}.coord"))) {
			Ok(x) => Some(x),
			Err(error) => {
				warn!(message = "Could not read coord file", label, ?error);
				None
			}
		};

		return Ok(JobResult {
			label: label.to_owned(),
			dir: dest,
			coord,
		});
	}
}

/// Move every file in `from` into `to`, creating `to`.
/// Removes a scratch directory when dropped,
/// including on early returns and panics
struct RemoveOnDrop<'a> {
	path: &'a Path,
}

impl Drop for RemoveOnDrop<'_> {
	fn drop(&mut self) {
		if let Err(error) = std::fs::remove_dir_all(self.path) {
			warn!(message = "Could not clean up work directory", workdir = ?self.path, ?error);
		}
	}
}

fn move_dir_contents(from: &Path, to: &Path) -> std::io::Result<()> {
	std::fs::create_dir_all(to)?;

	for entry in std::fs::read_dir(from)? {
		let entry = entry?;
		let target = to.join(entry.file_name());

		// `rename` fails across filesystems
		if std::fs::rename(entry.path(), &target).is_err() {
			std::fs::copy(entry.path(), &target)?;
			std::fs::remove_file(entry.path())?;
		}
	}

	return Ok(());
}
