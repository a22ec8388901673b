use mrs_data::{
	Acquisition, AcquisitionInfo, Complex, Dataset, Fid, GridDims, HeaderTable, ManualAdjustment,
	Nucleus,
};
use mrs_lcmodel::{
	orchestrator::EXPECTED_OUTPUTS,
	runner::{FitError, FitRunner},
};
use mrs_pipeline::{
	base::{
		InputSocket, InteractionRequest, InteractionResponse, Interactor, NodeRegistry,
		OutputSocket, DEFAULT_INPUT, DEFAULT_OUTPUT, INPUT_NODE_TYPE,
	},
	graph::PipelineGraph,
};
use std::{
	collections::BTreeSet,
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc, Mutex,
	},
};
use tempfile::TempDir;

use crate::{engine::Engine, settings::EngineSettings};
use mrs_data::LoaderSet;

pub const COORD: &str = " 3 lines in following concentration table = NCONC+1
    Conc.  %SD /Cr+PCr  Metabolite
  8.381E+00    3%   1.000 Cr+PCr
  1.040E+01    4%   1.241 NAA
  1 lines in following misc. output table
  FWHM = 0.046 ppm    S/N =   26
";

pub fn info() -> AcquisitionInfo {
	AcquisitionInfo {
		f0: 123.2,
		te: 30.0,
		tr: Some(2000.0),
		dwell: 0.0005,
		nucleus: Nucleus::proton(),
		sequence: None,
		transform: None,
		centre: None,
		voxel_volume: None,
	}
}

pub fn fid(amplitude: f64, phase: f64) -> Fid {
	Fid::new(
		(0..64)
			.map(|i| Complex::from_polar(amplitude * (-(i as f64) / 10.0).exp(), phase))
			.collect(),
	)
}

/// One single-voxel acquisition with `channels` channels
pub fn svs(info: AcquisitionInfo, channels: usize, amplitude: f64) -> Dataset {
	Dataset::new(
		Arc::new(info),
		vec![Acquisition::SingleVoxel {
			channels: (0..channels)
				.map(|c| fid(amplitude, 0.3 * c as f64))
				.collect(),
		}],
	)
}

pub fn grid(info: AcquisitionInfo, dims: GridDims) -> Dataset {
	Dataset::new(
		Arc::new(info),
		vec![Acquisition::Grid {
			dims,
			voxels: (0..dims.len()).map(|i| fid(1.0 + i as f64, 0.0)).collect(),
		}],
	)
}

pub fn header() -> HeaderTable {
	let mut h = HeaderTable::new();
	h.insert("SequenceString", "svs_se_PRESS");
	h.insert("TE", "30");
	h
}

/// Write `data` in the json dataset format
pub fn write_dataset(path: &Path, data: &Dataset, header: Option<&HeaderTable>) {
	let json = serde_json::json!({
		"header": header,
		"info": &*data.info,
		"acquisitions": &data.acquisitions,
	});
	std::fs::create_dir_all(path.parent().unwrap()).unwrap();
	std::fs::write(path, serde_json::to_string(&json).unwrap()).unwrap();
}

/// Writes the expected outputs, except for labels in `fail`
#[derive(Default)]
pub struct FakeRunner {
	pub fail: BTreeSet<String>,

	/// Label and control file text of every call
	pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeRunner {
	pub fn labels(&self) -> Vec<String> {
		self.calls
			.lock()
			.unwrap()
			.iter()
			.map(|(l, _)| l.clone())
			.collect()
	}

	pub fn control(&self, label: &str) -> Option<String> {
		self.calls
			.lock()
			.unwrap()
			.iter()
			.find(|(l, _)| l == label)
			.map(|(_, c)| c.clone())
	}
}

impl FitRunner for FakeRunner {
	fn run(&self, workdir: &Path, control: &Path) -> Result<String, FitError> {
		let label = control.file_stem().unwrap().to_str().unwrap().to_owned();
		let text = std::fs::read_to_string(workdir.join(control)).unwrap();
		self.calls.lock().unwrap().push((label.clone(), text));

		if self.fail.contains(&label) {
			return Err(FitError::Failed {
				status: "exit status: 1".into(),
				stderr: "forced".into(),
			});
		}

		for ext in EXPECTED_OUTPUTS {
			let body = if *ext == "coord" { COORD } else { "" };
			std::fs::write(workdir.join(format!("{label}.{ext}")), body).unwrap();
		}
		Ok("done\n".into())
	}
}

/// Answers like a user would, and remembers what it was asked
pub struct Scripted {
	pub adjustment: Option<ManualAdjustment>,

	/// Answer to `ConfirmBasisSet`
	pub confirm_basis: InteractionResponse,

	/// Answer to `SelectBasisSet`
	pub select_basis: Option<PathBuf>,

	/// Set when a node asks for properties
	pub cancel_on_properties: Option<Arc<AtomicBool>>,

	pub asked: Mutex<Vec<&'static str>>,
}

impl Default for Scripted {
	fn default() -> Self {
		Self {
			adjustment: None,
			confirm_basis: InteractionResponse::Yes,
			select_basis: None,
			cancel_on_properties: None,
			asked: Mutex::new(Vec::new()),
		}
	}
}

impl Scripted {
	pub fn asked(&self) -> Vec<&'static str> {
		self.asked.lock().unwrap().clone()
	}
}

impl Interactor for Scripted {
	fn request(&self, request: InteractionRequest) -> InteractionResponse {
		self.asked.lock().unwrap().push(request.kind());
		match request {
			InteractionRequest::ConfirmBasisSet { .. } => self.confirm_basis.clone(),
			InteractionRequest::SelectBasisSet { .. } => {
				InteractionResponse::Path(self.select_basis.clone())
			}
			InteractionRequest::OfferManualAdjustment { .. } => {
				InteractionResponse::Adjustment(self.adjustment)
			}
			InteractionRequest::Confirm { .. } => InteractionResponse::Yes,
			InteractionRequest::Properties { .. } => {
				if let Some(flag) = &self.cancel_on_properties {
					flag.store(true, Ordering::SeqCst);
				}
				InteractionResponse::Properties(None)
			}
		}
	}
}

pub fn registry() -> Arc<NodeRegistry> {
	let mut r = NodeRegistry::new();
	mrs_nodes::register(&mut r).unwrap();
	Arc::new(r)
}

/// input -> steps[0] -> steps[1] -> ...
/// Node `i` gets id `n{i}`.
pub fn graph(steps: &[&str]) -> PipelineGraph {
	let mut g = PipelineGraph::new(registry());
	g.add_node(INPUT_NODE_TYPE, "input", [0.0, 0.0]).unwrap();
	let mut prev = "input".to_owned();
	for (i, t) in steps.iter().enumerate() {
		let id = format!("n{i}");
		g.add_node(t, &id, [i as f64, 0.0]).unwrap();
		g.connect(
			OutputSocket::new(&prev, DEFAULT_OUTPUT),
			InputSocket::new(&id, DEFAULT_INPUT),
		)
		.unwrap();
		prev = id;
	}
	g
}

/// A scratch lcmodel folder with a default basis set and control file,
/// and an empty output folder
pub struct Scratch {
	pub dir: TempDir,
	pub runner: Arc<FakeRunner>,
}

impl Scratch {
	pub fn new() -> Self {
		let dir = tempfile::tempdir().unwrap();
		let lcmodel = dir.path().join("lcmodel");
		std::fs::create_dir_all(lcmodel.join("basis")).unwrap();
		std::fs::write(lcmodel.join("basis").join("3T_PRESS_TE30ms.BASIS"), "basis").unwrap();
		std::fs::write(
			lcmodel.join("default.CONTROL"),
			" $LCMODL\n NSIMUL = 0\n DOECC = T\n $END\n",
		)
		.unwrap();
		std::fs::create_dir_all(dir.path().join("output")).unwrap();

		Self {
			dir,
			runner: Arc::new(FakeRunner::default()),
		}
	}

	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	pub fn settings(&self) -> EngineSettings {
		EngineSettings {
			lcmodel_dir: self.path().join("lcmodel"),
			output_dir: self.path().join("output"),
			seghelper: self.path().join("no-such-helper"),
			fit_timeout: None,
			save_step_data: false,
			map_max_crlb: None,
		}
	}

	pub fn engine(&self, interactor: Arc<dyn Interactor>) -> Engine {
		self.engine_with(self.settings(), interactor)
	}

	pub fn engine_with(&self, settings: EngineSettings, interactor: Arc<dyn Interactor>) -> Engine {
		Engine::new(registry(), Arc::new(LoaderSet::new()), settings, interactor)
			.with_runner(self.runner.clone())
	}

	/// Write a dataset with a header into `<scratch>/<name>`
	pub fn input(&self, name: &str, data: &Dataset) -> PathBuf {
		let p = self.path().join(name);
		write_dataset(&p, data, Some(&header()));
		p
	}
}
