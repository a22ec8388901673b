//! Running one pipeline over every subject of a study.
//!
//! A study folder looks like this:
//! ```text
//! study/
//!     custom.BASIS                (optional, used for every subject)
//!     custom.CONTROL              (optional, used for every subject)
//!     Participant1/
//!         metabolite_files/
//!         water_reference/
//!         tissue_segmentation_files/
//!     Participant2/
//!         ...
//! ```

use mrs_data::{file_extension, SUPPORTED_EXTENSIONS};
use mrs_pipeline::graph::PipelineGraph;
use mrs_util::timestamp::folder_timestamp;
use std::{
	fs::OpenOptions,
	path::{Path, PathBuf},
	sync::atomic::{AtomicBool, Ordering},
};
use tracing::{error, info, warn};

use crate::{
	context::{DriveMode, RunContext, RunInputs},
	engine::Engine,
	errors::{BatchError, RunError},
	output::unique_dir,
};

pub const SUBJECT_PREFIX: &str = "Participant";
pub const METABOLITE_DIR: &str = "metabolite_files";
pub const WATER_DIR: &str = "water_reference";
pub const SEGMENTATION_DIR: &str = "tissue_segmentation_files";

/// Create an empty study folder with `participants` subject folders.
/// Existing files are left alone.
pub fn create_batch(study: &Path, participants: usize) -> Result<Vec<PathBuf>, BatchError> {
	let mut subjects = Vec::new();

	for i in 1..=participants {
		let dir = study.join(format!("{SUBJECT_PREFIX}{i}"));
		for sub in [WATER_DIR, SEGMENTATION_DIR, METABOLITE_DIR] {
			std::fs::create_dir_all(dir.join(sub))?;
		}
		subjects.push(dir);
	}

	for name in ["custom.BASIS", "custom.CONTROL"] {
		OpenOptions::new()
			.create(true)
			.append(true)
			.open(study.join(name))?;
	}

	info!(message = "Created batch folders", ?study, participants);
	return Ok(subjects);
}

/// Files directly inside `dir` that pass `filter`, sorted.
/// A missing `dir` has no files.
fn list_files(dir: &Path, filter: impl Fn(&Path) -> bool) -> std::io::Result<Vec<PathBuf>> {
	if !dir.is_dir() {
		return Ok(Vec::new());
	}

	let mut files = Vec::new();
	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && filter(&path) {
			files.push(path);
		}
	}
	files.sort();
	return Ok(files);
}

/// The first non-empty file in `study` with extension `ext` (any case), by name
pub fn study_file(study: &Path, ext: &str) -> std::io::Result<Option<PathBuf>> {
	let candidates = list_files(study, |p| {
		file_extension(p).is_some_and(|e| e.eq_ignore_ascii_case(ext))
	})?;

	for path in candidates {
		if std::fs::metadata(&path)?.len() > 0 {
			return Ok(Some(path));
		}
		warn!(message = "Ignoring empty study file", ?path);
	}
	return Ok(None);
}

/// One subject folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
	pub name: String,
	pub dir: PathBuf,
}

impl Subject {
	/// The inputs in this subject's folder
	pub fn inputs(&self) -> std::io::Result<RunInputs> {
		let supported = |p: &Path| {
			file_extension(p).is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
		};

		return Ok(RunInputs {
			files: list_files(&self.dir.join(METABOLITE_DIR), supported)?,
			water: list_files(&self.dir.join(WATER_DIR), supported)?,
			segmentation: list_files(&self.dir.join(SEGMENTATION_DIR), |_| true)?,
			..Default::default()
		});
	}
}

/// Sort `Participant2` before `Participant10`
fn subject_order(name: &str) -> (String, u64) {
	let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
	let (stem, number) = name.split_at(name.len() - digits);
	return (stem.to_lowercase(), number.parse().unwrap_or(0));
}

/// Every subject folder in `study`
pub fn find_subjects(study: &Path) -> Result<Vec<Subject>, BatchError> {
	if !study.is_dir() {
		return Err(BatchError::NotADirectory {
			study: study.to_owned(),
		});
	}

	let prefix = SUBJECT_PREFIX.to_lowercase();
	let mut subjects = Vec::new();
	for entry in std::fs::read_dir(study)? {
		let dir = entry?.path();
		let name = match dir.file_name().and_then(|x| x.to_str()) {
			Some(x) => x.to_owned(),
			None => continue,
		};

		if dir.is_dir() && name.to_lowercase().starts_with(&prefix) {
			subjects.push(Subject { name, dir });
		}
	}

	subjects.sort_by_cached_key(|s| subject_order(&s.name));
	return Ok(subjects);
}

#[derive(Debug, Default)]
pub struct BatchReport {
	/// All subject results are in here
	pub output: PathBuf,

	pub completed: Vec<String>,

	/// Subjects with no input files
	pub skipped: Vec<String>,

	pub failed: Vec<(String, RunError)>,
}

/// Run `graph` on every subject in `study`.
///
/// A subject that fails is logged and skipped. Cancelling stops the whole batch.
/// `progress` is called before each subject with its index, the subject count and its name.
pub fn run_batch(
	engine: &mut Engine,
	graph: &PipelineGraph,
	study: &Path,
	cancel: &AtomicBool,
	mut progress: impl FnMut(usize, usize, &str),
) -> Result<BatchReport, BatchError> {
	let subjects = find_subjects(study)?;
	if subjects.is_empty() {
		return Err(BatchError::NoSubjects {
			study: study.to_owned(),
		});
	}

	let chain = graph.linearize()?;
	let basis = study_file(study, "basis")?;
	let control = study_file(study, "control")?;
	if let Some(basis) = &basis {
		info!(message = "Using study basis set for every subject", ?basis);
	}
	if let Some(control) = &control {
		info!(message = "Using study control file for every subject", ?control);
	}

	let output = unique_dir(study.join(format!("{}_output", folder_timestamp())));
	std::fs::create_dir_all(&output)?;
	info!(
		message = "Starting batch",
		subjects = subjects.len(),
		steps = chain.len(),
		?output
	);

	let mut ctx = RunContext::from_chain(
		chain,
		graph.serialize(None),
		RunInputs::default(),
		DriveMode::Batch,
	);

	let mut report = BatchReport {
		output: output.clone(),
		..Default::default()
	};

	for (i, subject) in subjects.iter().enumerate() {
		if cancel.load(Ordering::SeqCst) {
			info!(message = "Batch cancelled", next = subject.name.as_str());
			return Err(BatchError::Cancelled);
		}
		progress(i, subjects.len(), &subject.name);

		let mut inputs = subject.inputs()?;
		if inputs.files.is_empty() && inputs.water.is_empty() {
			warn!(
				message = "No input files, skipping subject",
				subject = subject.name.as_str()
			);
			report.skipped.push(subject.name.clone());
			continue;
		}

		inputs.basis = basis.clone();
		inputs.control = control.clone();
		inputs.output_dir = Some(output.join(&subject.name));

		ctx.reset();
		ctx.inputs = inputs;

		match engine.run_continuous(&mut ctx, cancel) {
			Ok(()) => {
				info!(message = "Subject complete", subject = subject.name.as_str());
				report.completed.push(subject.name.clone());
			}

			Err(error) if error.is_cancel() => {
				info!(message = "Batch cancelled", subject = subject.name.as_str());
				return Err(BatchError::Cancelled);
			}

			Err(error) => {
				error!(
					message = "Subject failed, skipping",
					subject = subject.name.as_str(),
					dir = ?subject.dir,
					?error
				);
				report.failed.push((subject.name.clone(), error));
			}
		}
	}

	info!(
		message = "Batch complete",
		completed = report.completed.len(),
		skipped = report.skipped.len(),
		failed = report.failed.len(),
		?output
	);
	return Ok(report);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		output::{HEADER_FILE, LCMODEL_DIR},
		testutil::{graph, info, svs, write_dataset, header, Scratch, Scripted},
	};
	use std::sync::Arc;

	#[test]
	fn scaffold() {
		let dir = tempfile::tempdir().unwrap();
		let study = dir.path().join("study");
		let made = create_batch(&study, 3).unwrap();
		assert_eq!(made.len(), 3);

		for sub in [WATER_DIR, SEGMENTATION_DIR, METABOLITE_DIR] {
			assert!(study.join("Participant2").join(sub).is_dir());
		}
		assert!(study.join("custom.BASIS").is_file());

		// Empty study files are not used
		assert_eq!(study_file(&study, "basis").unwrap(), None);
		std::fs::write(study.join("custom.BASIS"), "basis").unwrap();
		assert_eq!(
			study_file(&study, "basis").unwrap(),
			Some(study.join("custom.BASIS"))
		);

		// Scaffolding again keeps what is there
		create_batch(&study, 1).unwrap();
		assert_eq!(std::fs::read_to_string(study.join("custom.BASIS")).unwrap(), "basis");
	}

	#[test]
	fn subject_discovery() {
		let dir = tempfile::tempdir().unwrap();
		for name in ["Participant10", "participant2", "Participant1", "other"] {
			std::fs::create_dir_all(dir.path().join(name)).unwrap();
		}
		std::fs::write(dir.path().join("Participant3"), "").unwrap();

		let names = find_subjects(dir.path())
			.unwrap()
			.into_iter()
			.map(|s| s.name)
			.collect::<Vec<_>>();
		assert_eq!(names, vec!["Participant1", "participant2", "Participant10"]);

		assert!(matches!(
			find_subjects(&dir.path().join("missing")),
			Err(BatchError::NotADirectory { .. })
		));
	}

	#[test]
	fn subject_inputs() {
		let dir = tempfile::tempdir().unwrap();
		let subject = &create_batch(dir.path(), 1).unwrap()[0];
		let metab = subject.join(METABOLITE_DIR);
		std::fs::write(metab.join("b.json"), "").unwrap();
		std::fs::write(metab.join("a.rda"), "").unwrap();
		std::fs::write(metab.join("notes.txt"), "").unwrap();
		std::fs::write(metab.join("c.IMA"), "").unwrap();
		std::fs::write(metab.join("d.Dcm"), "").unwrap();
		std::fs::write(subject.join(SEGMENTATION_DIR).join("c1_gm.nii"), "").unwrap();

		let inputs = Subject {
			name: "Participant1".into(),
			dir: subject.clone(),
		}
		.inputs()
		.unwrap();
		assert_eq!(
			inputs.files,
			vec![
				metab.join("a.rda"),
				metab.join("b.json"),
				metab.join("c.IMA"),
				metab.join("d.Dcm"),
			]
		);
		assert!(inputs.water.is_empty());
		assert_eq!(inputs.segmentation.len(), 1);
	}

	#[test]
	fn empty_subject_is_skipped() {
		let s = Scratch::new();
		let study = s.path().join("study");
		let subjects = create_batch(&study, 3).unwrap();
		for i in [0, 2] {
			write_dataset(
				&subjects[i].join(METABOLITE_DIR).join("svs.json"),
				&svs(info(), 2, 1.0),
				Some(&header()),
			);
		}
		std::fs::write(study.join("custom.BASIS"), "basis").unwrap();
		std::fs::write(study.join("custom.CONTROL"), " $LCMODL\n NSIMUL = 0\n $END\n").unwrap();

		let interactor = Arc::new(Scripted::default());
		let mut engine = s.engine(interactor.clone());
		let mut seen = Vec::new();
		let report = run_batch(
			&mut engine,
			&graph(&["PhaseCorrection"]),
			&study,
			&AtomicBool::new(false),
			|i, n, name| seen.push((i, n, name.to_owned())),
		)
		.unwrap();

		assert_eq!(report.completed, vec!["Participant1", "Participant3"]);
		assert_eq!(report.skipped, vec!["Participant2"]);
		assert!(report.failed.is_empty());
		assert_eq!(seen.len(), 3);
		assert_eq!(seen[2], (2, 3, "Participant3".to_owned()));

		let outputs = std::fs::read_dir(&report.output).unwrap().count();
		assert_eq!(outputs, 2);
		for name in ["Participant1", "Participant3"] {
			let out = report.output.join(name);
			assert!(out.join(HEADER_FILE).is_file());
			assert!(out.join(LCMODEL_DIR).join("lcm").join("lcm.coord").is_file());
		}

		// Declined once, not asked again
		assert_eq!(interactor.asked(), vec!["OfferManualAdjustment"]);
		assert!(engine.session().skip_manual_adjustment);
		assert!(s.runner.control("lcm").unwrap().contains("custom.BASIS"));
	}

	#[test]
	fn failed_subject_is_isolated() {
		let s = Scratch::new();
		let study = s.path().join("study");
		let subjects = create_batch(&study, 2).unwrap();
		write_dataset(
			&subjects[0].join(METABOLITE_DIR).join("svs.json"),
			&svs(info(), 1, 1.0),
			None,
		);
		write_dataset(
			&subjects[1].join(METABOLITE_DIR).join("svs.json"),
			&svs(info(), 1, 1.0),
			Some(&header()),
		);

		let mut engine = s.engine(Arc::new(Scripted::default()));
		let report = run_batch(
			&mut engine,
			&graph(&[]),
			&study,
			&AtomicBool::new(false),
			|_, _, _| {},
		)
		.unwrap();

		assert_eq!(report.completed, vec!["Participant2"]);
		assert_eq!(report.failed.len(), 1);
		assert!(matches!(report.failed[0].1, RunError::NoHeader { .. }));
	}

	#[test]
	fn cancelled_batch() {
		let s = Scratch::new();
		let study = s.path().join("study");
		create_batch(&study, 2).unwrap();
		let mut engine = s.engine(Arc::new(Scripted::default()));

		assert!(matches!(
			run_batch(
				&mut engine,
				&graph(&[]),
				&study,
				&AtomicBool::new(true),
				|_, _, _| {}
			),
			Err(BatchError::Cancelled)
		));

		let empty = s.path().join("empty");
		std::fs::create_dir_all(&empty).unwrap();
		assert!(matches!(
			run_batch(
				&mut engine,
				&graph(&[]),
				&empty,
				&AtomicBool::new(false),
				|_, _, _| {}
			),
			Err(BatchError::NoSubjects { .. })
		));
	}
}
