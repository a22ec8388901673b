use mrs_data::{file_extension, Dataset, Sequence};
use mrs_pipeline::{
	base::{NodeCategory, NodeId, StepContext, StepInput, ThisNodeInfo},
	helpers::NodeProperties,
};
use mrs_util::timestamp::folder_timestamp;
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use tracing::{debug, info, warn};

use super::Engine;
use crate::{
	context::RunContext,
	errors::RunError,
	history::Snapshot,
	output::{run_folder_name, unique_dir, HEADER_FILE},
};

/// The node id used for coil combination the engine adds by itself
const AUTO_COIL_COMBINATION: &str = "auto-coil-combination";

impl Engine {
	/// Load the run's inputs and commit snapshot 0
	pub(super) fn load(&self, ctx: &mut RunContext) -> Result<(), RunError> {
		let files = ctx
			.inputs
			.files
			.iter()
			.filter(|p| {
				let coord = file_extension(p).is_some_and(|e| e == "coord");
				if coord {
					debug!(message = "Skipping fit result file", path = ?p);
				}
				!coord
			})
			.collect::<Vec<_>>();

		if files.is_empty() {
			return Err(RunError::NoInputFiles);
		}

		// Unreadable files are skipped. The first readable file sets the
		// acquisition parameters; the first one with a header sets the header.
		let mut loaded_from: Option<&PathBuf> = None;
		let mut info = None;
		let mut header = None;
		let mut acquisitions = Vec::new();
		let mut last_error = None;

		for path in &files {
			let more = match self.loaders.load(path) {
				Ok(x) => x,
				Err(error) => {
					warn!(message = "Could not load input file, skipping it", ?path, ?error);
					last_error = Some(error);
					continue;
				}
			};

			match &info {
				None => {
					info = Some((*more.data.info).clone());
					loaded_from = Some(*path);
				}
				Some(x) if *x != *more.data.info => warn!(
					message = "Input files have different acquisition parameters, using the first file's",
					?path
				),
				Some(_) => {}
			}

			if header.is_none() {
				header = more.header;
			}
			acquisitions.extend(more.data.acquisitions);
		}

		let (mut info, loaded_from) = match (info, loaded_from, last_error) {
			(Some(i), Some(p), _) => (i, p),
			(_, _, Some(error)) => return Err(RunError::Load(error)),
			_ => return Err(RunError::NoInputFiles),
		};

		let header = header.ok_or_else(|| RunError::NoHeader {
			path: loaded_from.clone(),
		})?;

		if !info.nucleus.is_known() {
			return Err(RunError::UnknownNucleus {
				nucleus: info.nucleus.to_string(),
			});
		}

		if info.sequence.is_none() {
			info.sequence = Sequence::detect(&header);
			match info.sequence {
				Some(s) => info!(message = "Detected sequence", sequence = s.name()),
				None => warn!(message = "Sequence not found in header"),
			}
		}

		let info = Arc::new(info);
		let mut main = Arc::new(Dataset::new(info.clone(), acquisitions));
		let mut water = self.load_water(ctx);

		let first_is_coil_combination = ctx
			.chain
			.first()
			.is_some_and(|n| n.category == NodeCategory::CoilCombination);
		if main.is_multichannel() && !first_is_coil_combination {
			(main, water) = self.combine_coils(ctx, main, water)?;
		}

		let dir = match &ctx.inputs.output_dir {
			Some(x) => x.clone(),
			None => self
				.settings
				.output_dir
				.join(run_folder_name(&folder_timestamp(), loaded_from)),
		};
		let dir = unique_dir(dir);
		std::fs::create_dir_all(&dir)?;
		header.write_csv(&dir.join(HEADER_FILE))?;

		info!(
			message = "Loaded input",
			files = files.len(),
			acquisitions = main.acquisitions.len(),
			water = water.is_some(),
			nucleus = %info.nucleus,
			output = ?dir,
		);

		let snapshot = Snapshot {
			main,
			water,
			header: Arc::new(header),
			labels: None,
		};

		ctx.output_dir = Some(dir);
		if !ctx.history.commit(0, snapshot) {
			return Err(RunError::HistoryOutOfOrder { index: 0 });
		}

		return Ok(());
	}

	/// Load the first water reference file.
	/// A water reference is optional, so failures only warn.
	fn load_water(&self, ctx: &RunContext) -> Option<Arc<Dataset>> {
		let path: &PathBuf = match ctx.inputs.water.first() {
			Some(x) => x,
			None => {
				warn!(message = "No water reference given");
				return None;
			}
		};

		if ctx.inputs.water.len() > 1 {
			warn!(
				message = "Only one water reference is supported, using the first",
				?path,
				given = ctx.inputs.water.len()
			);
		}

		match self.loaders.load(path) {
			Ok(x) => return Some(Arc::new(x.data)),
			Err(error) => {
				warn!(message = "Could not load water reference", ?path, ?error);
				return None;
			}
		}
	}

	/// Run the default coil combination node on multi-channel input
	fn combine_coils(
		&self,
		ctx: &RunContext,
		main: Arc<Dataset>,
		water: Option<Arc<Dataset>>,
	) -> Result<(Arc<Dataset>, Option<Arc<Dataset>>), RunError> {
		let node_type = self
			.registry
			.first_of_category(NodeCategory::CoilCombination)
			.ok_or(RunError::NoCoilCombination)?;

		warn!(
			message = "Multi-channel data needs coil combination, adding it automatically",
			node_type,
			first_step = ?ctx.chain.first().map(|n| n.node_type.as_str())
		);

		let unknown = || RunError::UnknownNodeType {
			node_type: node_type.into(),
		};
		let properties = self
			.registry
			.descriptor(node_type)
			.ok_or_else(unknown)?
			.properties
			.iter()
			.map(|(k, v)| (k.clone(), v.default.clone()))
			.collect::<BTreeMap<_, _>>();
		let mut node = self.registry.init_node(node_type).ok_or_else(unknown)?;

		let id = NodeId::new(AUTO_COIL_COMBINATION);
		let step_ctx = StepContext {
			node: ThisNodeInfo {
				id: id.clone(),
				node_type: node_type.into(),
				step: 0,
			},
			interactor: &*self.interactor,
		};

		let out = node
			.run(
				&step_ctx,
				NodeProperties::from(properties),
				StepInput {
					data: main,
					wref: water.clone(),
				},
			)
			.map_err(|error| RunError::Step {
				step: 0,
				node_id: id,
				error,
			})?;

		return Ok((Arc::new(out.data), out.wref.map(Arc::new).or(water)));
	}
}
