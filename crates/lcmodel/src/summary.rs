//! Tables and maps built from fit results

use itertools::Itertools;
use mrs_data::csv_field;
use std::{
	fs::File,
	io::{BufWriter, Write},
	path::{Path, PathBuf},
};

use crate::orchestrator::JobResult;

/// Write every concentration of every job as one csv table
pub fn write_results_csv(path: &Path, results: &[JobResult]) -> std::io::Result<()> {
	let mut f = BufWriter::new(File::create(path)?);
	writeln!(f, "Label,Metabolite,Conc,SD,Ratio")?;

	for r in results {
		let coord = match &r.coord {
			Some(x) => x,
			None => continue,
		};

		for c in &coord.concentrations {
			let row = [
				csv_field(&r.label),
				csv_field(&c.metabolite),
				c.conc.to_string(),
				c.sd.to_string(),
				c.ratio.to_string(),
			];
			writeln!(f, "{}", row.iter().join(","))?;
		}
	}

	f.flush()?;
	return Ok(());
}

/// Parse a grid label like `2_1_3` into zero-based indices
pub fn parse_grid_label(label: &str) -> Option<(usize, usize, usize)> {
	let (i, j, k) = label
		.split('_')
		.map(|x| x.parse::<usize>().ok().filter(|x| *x > 0))
		.collect_tuple()?;
	return Some((i? - 1, j? - 1, k? - 1));
}

#[derive(Debug, Clone)]
pub struct MapOptions {
	/// Mask voxels whose CRLB (%SD) is above this
	pub max_crlb: Option<f64>,

	/// Divide by this metabolite's concentration
	pub reference: Option<String>,

	pub scaling: f64,
}

impl Default for MapOptions {
	fn default() -> Self {
		Self {
			max_crlb: None,
			reference: None,
			scaling: 1.0,
		}
	}
}

/// One metabolite's concentration over a voxel grid.
/// Masked or missing voxels are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationMap {
	pub dims: (usize, usize, usize),
	values: Vec<Option<f64>>,
}

impl ConcentrationMap {
	/// Build a map from grid results.
	/// Returns `None` if no result has a grid label.
	pub fn build(results: &[JobResult], metabolite: &str, options: &MapOptions) -> Option<Self> {
		let cells = results
			.iter()
			.filter_map(|r| Some((parse_grid_label(&r.label)?, r)))
			.collect::<Vec<_>>();

		let dims = cells.iter().fold((0, 0, 0), |(x, y, z), ((i, j, k), _)| {
			(x.max(i + 1), y.max(j + 1), z.max(k + 1))
		});
		if cells.is_empty() {
			return None;
		}

		let mut values = vec![None; dims.0 * dims.1 * dims.2];
		for ((i, j, k), r) in cells {
			let coord = match &r.coord {
				Some(x) => x,
				None => continue,
			};

			let value = coord.get(metabolite).and_then(|c| {
				if options.max_crlb.is_some_and(|m| c.sd > m) {
					return None;
				}

				let mut v = c.conc * options.scaling;
				if let Some(reference) = &options.reference {
					let r = coord.get(reference)?;
					if r.conc == 0.0 || options.max_crlb.is_some_and(|m| r.sd > m) {
						return None;
					}
					v /= r.conc;
				}
				Some(v)
			});

			values[i + dims.0 * (j + dims.1 * k)] = value;
		}

		return Some(Self { dims, values });
	}

	/// The value at zero-based `(i, j, k)`
	pub fn get(&self, i: usize, j: usize, k: usize) -> Option<f64> {
		let (x, y, z) = self.dims;
		if i >= x || j >= y || k >= z {
			return None;
		}
		return self.values[i + x * (j + y * k)];
	}

	/// Write this map as `X,Y,Z,Conc` rows, one-based, x fastest.
	/// Masked voxels have an empty `Conc`.
	pub fn write_csv(&self, path: &Path) -> std::io::Result<()> {
		let (x, y, z) = self.dims;
		let mut f = BufWriter::new(File::create(path)?);
		writeln!(f, "X,Y,Z,Conc")?;

		for k in 0..z {
			for j in 0..y {
				for i in 0..x {
					let value = self.get(i, j, k).map(|v| v.to_string()).unwrap_or_default();
					writeln!(f, "{},{},{},{value}", i + 1, j + 1, k + 1)?;
				}
			}
		}

		f.flush()?;
		return Ok(());
	}
}

/// Every metabolite in `results`, in the order they first appear
pub fn metabolites(results: &[JobResult]) -> Vec<String> {
	return results
		.iter()
		.filter_map(|r| r.coord.as_ref())
		.flat_map(|c| c.concentrations.iter().map(|x| x.metabolite.clone()))
		.unique()
		.collect();
}

/// `Cr+PCr` stays as is, path separators and spaces do not
fn map_file_name(metabolite: &str) -> String {
	let name: String = metabolite
		.chars()
		.map(|c| match c {
			'a'..='z' | 'A'..='Z' | '0'..='9' | '+' | '-' | '.' | '_' => c,
			_ => '_',
		})
		.collect();
	return format!("{name}.csv");
}

/// Write one map per metabolite into `dir`.
/// Does nothing for results without grid labels.
pub fn write_maps(
	dir: &Path,
	results: &[JobResult],
	options: &MapOptions,
) -> std::io::Result<Vec<PathBuf>> {
	let mut written = Vec::new();
	for metabolite in metabolites(results) {
		let map = match ConcentrationMap::build(results, &metabolite, options) {
			Some(x) => x,
			None => return Ok(written),
		};

		std::fs::create_dir_all(dir)?;
		let path = dir.join(map_file_name(&metabolite));
		map.write_csv(&path)?;
		written.push(path);
	}

	return Ok(written);
}
