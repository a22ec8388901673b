use tracing::debug;

use crate::{
	nifti::{NiftiError, NiftiImage},
	SegmentationError, SegmentationFiles, SegmentationRequest, TissueSums,
};

/// Water concentration of each tissue class, mM
const WATER_GM: f64 = 43300.0;
const WATER_WM: f64 = 35880.0;
const WATER_CSF: f64 = 55556.0;

fn load(path: &std::path::Path) -> Result<NiftiImage, SegmentationError> {
	NiftiImage::read(path).map_err(|error| SegmentationError::BadImage {
		path: path.to_owned(),
		error,
	})
}

/// The voxel's edge length along each axis: the largest
/// component of each of the transform's first three columns.
pub fn voxel_thickness(transform: &[[f64; 4]; 4]) -> [f64; 3] {
	let mut out = [0.0; 3];
	for (i, o) in out.iter_mut().enumerate() {
		*o = (0..3).map(|r| transform[r][i].abs()).fold(0.0, f64::max);
	}
	return out;
}

/// Index bounds `[start, end)` of the voxel window in `img`, clamped to the image
fn window(
	img: &NiftiImage,
	centre: [f64; 3],
	thickness: [f64; 3],
) -> Result<[(usize, usize); 3], NiftiError> {
	// Scanner coordinates are LPS, NIfTI world coordinates are RAS
	let ras = |p: [f64; 3]| [-p[0], -p[1], p[2]];
	let lo = [
		centre[0] - thickness[0] / 2.0,
		centre[1] - thickness[1] / 2.0,
		centre[2] - thickness[2] / 2.0,
	];
	let hi = [
		centre[0] + thickness[0] / 2.0,
		centre[1] + thickness[1] / 2.0,
		centre[2] + thickness[2] / 2.0,
	];

	let a = img.world_to_index(ras(lo))?;
	let b = img.world_to_index(ras(hi))?;

	let mut out = [(0, 0); 3];
	for i in 0..3 {
		// Truncate toward zero, like an integer cast
		let (mut s, mut e) = (a[i].trunc() as i64, b[i].trunc() as i64);
		if s > e {
			std::mem::swap(&mut s, &mut e);
		}
		let dim = img.dims[i] as i64;
		out[i] = (s.clamp(0, dim) as usize, e.clamp(0, dim) as usize);
	}
	return Ok(out);
}

fn window_sum(img: &NiftiImage, w: [(usize, usize); 3]) -> f64 {
	let mut sum = 0.0;
	for k in w[2].0..w[2].1 {
		for j in w[1].0..w[1].1 {
			for i in w[0].0..w[0].1 {
				sum += img.get(i, j, k).unwrap_or(0.0);
			}
		}
	}
	return sum;
}

/// Sum each tissue image inside the voxel window.
/// The window is taken from the white matter image and applied to all three.
pub fn window_sums(request: &SegmentationRequest) -> Result<TissueSums, SegmentationError> {
	let SegmentationFiles { wm, gm, csf } = &request.files;
	let wm_img = load(wm)?;
	let gm_img = load(gm)?;
	let csf_img = load(csf)?;

	let thickness = voxel_thickness(&request.transform);
	let w = window(&wm_img, request.centre, thickness).map_err(|error| {
		SegmentationError::BadImage {
			path: wm.clone(),
			error,
		}
	})?;
	debug!(message = "Segmentation window", ?thickness, ?w);

	return Ok(TissueSums {
		wm: window_sum(&wm_img, w),
		gm: window_sum(&gm_img, w),
		csf: window_sum(&csf_img, w),
	});
}

/// Fractions of each tissue class. They sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TissueFractions {
	pub wm: f64,
	pub gm: f64,
	pub csf: f64,
}

impl TissueFractions {
	/// `None` if the sums add up to zero
	pub fn from_sums(sums: &TissueSums) -> Option<Self> {
		let total = sums.wm + sums.gm + sums.csf;
		if total == 0.0 || !total.is_finite() {
			return None;
		}

		return Some(Self {
			wm: sums.wm / total,
			gm: sums.gm / total,
			csf: sums.csf / total,
		});
	}

	/// Tissue water concentration, corrected for csf volume.
	/// `None` if the voxel is all csf.
	pub fn water_concentration(&self) -> Option<f64> {
		if self.csf >= 1.0 {
			return None;
		}
		return Some(
			(WATER_GM * self.gm + WATER_WM * self.wm + WATER_CSF * self.csf) / (1.0 - self.csf),
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::nifti::test_image;
	use std::path::PathBuf;

	#[test]
	fn thickness() {
		let t = [
			[0.0, 20.0, 0.0, 1.0],
			[-10.0, 0.0, 0.0, 2.0],
			[0.0, 1.0, 15.0, 3.0],
			[0.0, 0.0, 0.0, 1.0],
		];
		assert_eq!(voxel_thickness(&t), [10.0, 20.0, 15.0]);
	}

	#[test]
	fn wconc() {
		let f = TissueFractions::from_sums(&TissueSums {
			wm: 2.0,
			gm: 1.0,
			csf: 1.0,
		})
		.unwrap();
		assert_eq!(f.wm, 0.5);

		let expected = (43300.0 * 0.25 + 35880.0 * 0.5 + 55556.0 * 0.25) / 0.75;
		assert!((f.water_concentration().unwrap() - expected).abs() < 1e-9);

		assert!(TissueFractions::from_sums(&TissueSums {
			wm: 0.0,
			gm: 0.0,
			csf: 0.0,
		})
		.is_none());
	}

	#[test]
	fn sums_in_window() {
		let dir = tempfile::tempdir().unwrap();

		// 4x4x4, 1mm voxels, world = index
		let sform = [
			[1.0, 0.0, 0.0, 0.0],
			[0.0, 1.0, 0.0, 0.0],
			[0.0, 0.0, 1.0, 0.0],
		];
		let write = |name: &str, v: f32| {
			let p = dir.path().join(name);
			std::fs::write(&p, test_image([4, 4, 4], sform, &[v; 64])).unwrap();
			p
		};

		let request = SegmentationRequest {
			files: SegmentationFiles {
				wm: write("wm.nii", 1.0),
				gm: write("gm.nii", 2.0),
				csf: write("csf.nii", 0.5),
			},
			// LPS (-2, -2, 2) is RAS (2, 2, 2)
			centre: [-2.0, -2.0, 2.0],
			transform: [
				[2.0, 0.0, 0.0, 0.0],
				[0.0, 2.0, 0.0, 0.0],
				[0.0, 0.0, 2.0, 0.0],
				[0.0, 0.0, 0.0, 1.0],
			],
			result: PathBuf::from("unused"),
		};

		// Window is [1, 3) on every axis: 8 voxels
		let sums = window_sums(&request).unwrap();
		assert_eq!(sums.wm, 8.0);
		assert_eq!(sums.gm, 16.0);
		assert_eq!(sums.csf, 4.0);
	}
}
