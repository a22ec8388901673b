use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{HeaderTable, Nucleus};

/// Acquisition sequences we know how to name basis sets for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sequence {
	#[serde(rename = "PRESS")]
	Press,
	#[serde(rename = "STEAM")]
	Steam,
	#[serde(rename = "sSPECIAL")]
	SemiLaser,
	#[serde(rename = "MEGA")]
	Mega,
}

impl Sequence {
	/// Substrings that identify each sequence in a scanner's sequence string
	const PATTERNS: &'static [(Sequence, &'static [&'static str])] = &[
		(Self::Press, &["PRESS", "press"]),
		(Self::Steam, &["STEAM", "steam"]),
		(Self::SemiLaser, &["sSPECIAL", "sspecial", "sS"]),
		(Self::Mega, &["MEGA", "mega"]),
	];

	/// Find a sequence in the given header.
	/// The first entry of [`Sequence::PATTERNS`] that matches wins.
	pub fn detect(header: &HeaderTable) -> Option<Self> {
		let seqstr = ["SequenceString", "Sequence"]
			.iter()
			.find_map(|k| header.get(k))?;

		return Self::PATTERNS
			.iter()
			.find(|(_, pats)| pats.iter().any(|p| seqstr.contains(p)))
			.map(|(s, _)| *s);
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Press => "PRESS",
			Self::Steam => "STEAM",
			Self::SemiLaser => "sSPECIAL",
			Self::Mega => "MEGA",
		}
	}
}

impl Display for Sequence {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name())
	}
}

/// Acquisition parameters shared by every signal in a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcquisitionInfo {
	/// Reference frequency, in MHz
	pub f0: f64,

	/// Echo time, in ms
	pub te: f64,

	/// Repetition time, in ms
	#[serde(default)]
	pub tr: Option<f64>,

	/// Time between samples, in s
	pub dwell: f64,

	pub nucleus: Nucleus,

	#[serde(default)]
	pub sequence: Option<Sequence>,

	/// Voxel to scanner transform, row-major.
	#[serde(default)]
	pub transform: Option<[[f64; 4]; 4]>,

	/// Voxel centre in scanner coordinates, in mm.
	/// Taken from `transform` if not given.
	#[serde(default)]
	pub centre: Option<[f64; 3]>,

	/// Voxel volume, in mm^3
	#[serde(default)]
	pub voxel_volume: Option<f64>,
}

impl AcquisitionInfo {
	/// Spectral width, in Hz
	pub fn spectral_width(&self) -> f64 {
		return 1.0 / self.dwell;
	}

	pub fn centre(&self) -> Option<[f64; 3]> {
		if let Some(c) = self.centre {
			return Some(c);
		}

		let t = self.transform?;
		return Some([t[0][3], t[1][3], t[2][3]]);
	}

	/// Voxel volume from the explicit field or from the transform's scale.
	pub fn voxel_volume(&self) -> Option<f64> {
		if let Some(v) = self.voxel_volume {
			return Some(v);
		}

		let t = self.transform?;
		let len = |i: usize| (t[0][i].powi(2) + t[1][i].powi(2) + t[2][i].powi(2)).sqrt();
		return Some(len(0) * len(1) * len(2));
	}
}
