use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{AcquisitionInfo, Complex};

/// One free induction decay: a complex time-domain signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
pub struct Fid(Vec<Complex>);

impl From<Vec<[f64; 2]>> for Fid {
	fn from(value: Vec<[f64; 2]>) -> Self {
		Self(value.into_iter().map(|[re, im]| Complex::new(re, im)).collect())
	}
}

impl From<Fid> for Vec<[f64; 2]> {
	fn from(value: Fid) -> Self {
		value.0.into_iter().map(|c| [c.re, c.im]).collect()
	}
}

impl From<Vec<Complex>> for Fid {
	fn from(value: Vec<Complex>) -> Self {
		Self(value)
	}
}

impl Fid {
	pub fn new(samples: Vec<Complex>) -> Self {
		Self(samples)
	}

	pub fn samples(&self) -> &[Complex] {
		&self.0
	}

	pub fn into_samples(self) -> Vec<Complex> {
		self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// The element-wise mean of `fids`.
	/// Returns `None` if `fids` is empty or lengths differ.
	#[allow(single_use_lifetimes)] // elided form is rejected by E0658
	pub fn mean<'a>(fids: impl IntoIterator<Item = &'a Fid>) -> Option<Fid> {
		let mut acc: Option<Vec<Complex>> = None;
		let mut n = 0usize;
		for f in fids {
			match &mut acc {
				None => acc = Some(f.0.clone()),
				Some(a) => {
					if a.len() != f.len() {
						return None;
					}
					for (x, y) in a.iter_mut().zip(f.0.iter()) {
						*x += y;
					}
				}
			}
			n += 1;
		}

		let mut acc = acc?;
		let scale = 1.0 / n as f64;
		for x in acc.iter_mut() {
			*x *= scale;
		}
		return Some(Fid(acc));
	}
}

/// Dimensions of a spectroscopic imaging grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDims {
	pub x: usize,
	pub y: usize,
	pub z: usize,
}

impl GridDims {
	pub fn len(&self) -> usize {
		self.x * self.y * self.z
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Flat index of cell `(i, j, k)`. `x` varies fastest.
	pub fn index(&self, i: usize, j: usize, k: usize) -> Option<usize> {
		if i >= self.x || j >= self.y || k >= self.z {
			return None;
		}
		return Some(i + self.x * (j + self.y * k));
	}

	/// All cells, in storage order
	pub fn cells(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
		(0..self.z).flat_map(move |k| {
			(0..self.y).flat_map(move |j| (0..self.x).map(move |i| (i, j, k)))
		})
	}
}

/// One acquired signal block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Acquisition {
	/// A single voxel, possibly with one signal per receive channel
	SingleVoxel { channels: Vec<Fid> },

	/// A spectroscopic imaging grid with one (coil-combined) signal per cell
	Grid { dims: GridDims, voxels: Vec<Fid> },
}

impl Acquisition {
	pub fn single(fid: Fid) -> Self {
		Self::SingleVoxel {
			channels: vec![fid],
		}
	}

	pub fn is_multichannel(&self) -> bool {
		match self {
			Self::SingleVoxel { channels } => channels.len() > 1,
			Self::Grid { .. } => false,
		}
	}

	pub fn fids(&self) -> &[Fid] {
		match self {
			Self::SingleVoxel { channels } => channels,
			Self::Grid { voxels, .. } => voxels,
		}
	}

	/// Apply `f` to every signal, keeping the layout
	pub fn map_fids(&self, mut f: impl FnMut(&Fid) -> Fid) -> Self {
		match self {
			Self::SingleVoxel { channels } => Self::SingleVoxel {
				channels: channels.iter().map(&mut f).collect(),
			},
			Self::Grid { dims, voxels } => Self::Grid {
				dims: *dims,
				voxels: voxels.iter().map(&mut f).collect(),
			},
		}
	}
}

/// A set of acquisitions sharing acquisition parameters.
///
/// Datasets are immutable. Steps build new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
	pub info: Arc<AcquisitionInfo>,
	pub acquisitions: Vec<Acquisition>,
}

impl Dataset {
	pub fn new(info: Arc<AcquisitionInfo>, acquisitions: Vec<Acquisition>) -> Self {
		Self { info, acquisitions }
	}

	/// A new dataset with the same parameters as this one
	pub fn with_acquisitions(&self, acquisitions: Vec<Acquisition>) -> Self {
		Self {
			info: self.info.clone(),
			acquisitions,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.acquisitions.is_empty()
	}

	pub fn is_multichannel(&self) -> bool {
		self.acquisitions.iter().any(|a| a.is_multichannel())
	}

	/// True if every acquisition is single-voxel
	pub fn is_single_voxel(&self) -> bool {
		self.acquisitions
			.iter()
			.all(|a| matches!(a, Acquisition::SingleVoxel { .. }))
	}

	pub fn map_fids(&self, mut f: impl FnMut(&Fid) -> Fid) -> Self {
		self.with_acquisitions(self.acquisitions.iter().map(|a| a.map_fids(&mut f)).collect())
	}

	/// All signals, flattened
	pub fn iter_fids(&self) -> impl Iterator<Item = &Fid> {
		self.acquisitions.iter().flat_map(|a| a.fids().iter())
	}

	/// Mean of every signal in this dataset
	pub fn mean_fid(&self) -> Option<Fid> {
		Fid::mean(self.iter_fids())
	}
}
