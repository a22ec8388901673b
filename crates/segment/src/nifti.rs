//! Segmentation images, read with the `nifti` crate.
//!
//! Keeps the first volume of a single-file image (`.nii` or `.nii.gz`)
//! and its voxel-to-world affine. Nothing else.

use ::nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NiftiError {
	#[error("could not read image")]
	Read(#[from] ::nifti::NiftiError),

	#[error("bad dimensions {0:?}")]
	BadDimensions(Vec<usize>),

	#[error("affine is singular")]
	SingularAffine,
}

/// The first volume of a NIfTI image, as `f64`.
#[derive(Debug, Clone)]
pub struct NiftiImage {
	pub dims: [usize; 3],

	/// Voxel values, x fastest
	pub data: Vec<f64>,

	/// Voxel index to world (RAS, mm)
	pub affine: [[f64; 4]; 4],
}

/// Rotation from the quaternion parameters, columns scaled by voxel size
fn qform(h: &NiftiHeader) -> [[f64; 4]; 4] {
	let (b, c, d) = (
		f64::from(h.quatern_b),
		f64::from(h.quatern_c),
		f64::from(h.quatern_d),
	);
	let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

	let qfac = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
	let (dx, dy, dz) = (
		f64::from(h.pixdim[1]),
		f64::from(h.pixdim[2]),
		f64::from(h.pixdim[3]) * qfac,
	);

	let r = [
		[a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
		[2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
		[2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - c * c - b * b],
	];
	let offset = [h.quatern_x, h.quatern_y, h.quatern_z].map(f64::from);

	let mut m = [[0.0; 4]; 4];
	for i in 0..3 {
		m[i] = [r[i][0] * dx, r[i][1] * dy, r[i][2] * dz, offset[i]];
	}
	m[3] = [0.0, 0.0, 0.0, 1.0];
	return m;
}

/// sform if set, then qform, then voxel size alone
fn affine(h: &NiftiHeader) -> [[f64; 4]; 4] {
	if h.sform_code > 0 {
		return [
			h.srow_x.map(f64::from),
			h.srow_y.map(f64::from),
			h.srow_z.map(f64::from),
			[0.0, 0.0, 0.0, 1.0],
		];
	}

	if h.qform_code > 0 {
		return qform(h);
	}

	let p = h.pixdim.map(f64::from);
	return [
		[p[1], 0.0, 0.0, 0.0],
		[0.0, p[2], 0.0, 0.0],
		[0.0, 0.0, p[3], 0.0],
		[0.0, 0.0, 0.0, 1.0],
	];
}

impl NiftiImage {
	pub fn read(path: &Path) -> Result<Self, NiftiError> {
		// `.gz` files are decompressed by the reader
		let object = ReaderOptions::new().read_file(path)?;
		let affine = affine(object.header());

		// Scaled by `scl_slope` and `scl_inter`, indexed `[x, y, z, ...]`
		let volume = object.into_volume().into_ndarray::<f64>()?;
		let shape = volume.shape().to_vec();
		if shape.is_empty() || shape.contains(&0) {
			return Err(NiftiError::BadDimensions(shape));
		}

		// Missing dimensions are 1
		let size = |i: usize| shape.get(i).copied().unwrap_or(1);
		let dims = [size(0), size(1), size(2)];

		let mut data = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
		let mut index = vec![0usize; shape.len()];
		for k in 0..dims[2] {
			for j in 0..dims[1] {
				for i in 0..dims[0] {
					for (axis, v) in [i, j, k].into_iter().enumerate().take(index.len()) {
						index[axis] = v;
					}
					data.push(volume.get(index.as_slice()).copied().unwrap_or(0.0));
				}
			}
		}

		return Ok(Self { dims, data, affine });
	}

	/// The continuous voxel index of world point `ras`
	pub fn world_to_index(&self, ras: [f64; 3]) -> Result<[f64; 3], NiftiError> {
		let m = &self.affine;
		let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
			- m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
			+ m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
		if det.abs() < 1e-12 {
			return Err(NiftiError::SingularAffine);
		}

		// Inverse of the upper 3x3 by cofactors
		let inv = [
			[
				(m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
				(m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
				(m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
			],
			[
				(m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
				(m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
				(m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
			],
			[
				(m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
				(m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
				(m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
			],
		];

		let p = [ras[0] - m[0][3], ras[1] - m[1][3], ras[2] - m[2][3]];
		let mut out = [0.0; 3];
		for (i, o) in out.iter_mut().enumerate() {
			*o = inv[i][0] * p[0] + inv[i][1] * p[1] + inv[i][2] * p[2];
		}
		return Ok(out);
	}

	pub fn get(&self, i: usize, j: usize, k: usize) -> Option<f64> {
		let [x, y, z] = self.dims;
		if i >= x || j >= y || k >= z {
			return None;
		}
		return self.data.get(i + x * (j + y * k)).copied();
	}
}

/// A little-endian float32 `.nii` with the given sform
#[cfg(test)]
pub(crate) fn test_image(dims: [i16; 3], sform: [[f32; 4]; 3], data: &[f32]) -> Vec<u8> {
	let mut b = vec![0u8; 352];
	b[0..4].copy_from_slice(&348i32.to_le_bytes());
	let dim: [i16; 8] = [3, dims[0], dims[1], dims[2], 1, 1, 1, 1];
	for (i, d) in dim.iter().enumerate() {
		b[40 + 2 * i..42 + 2 * i].copy_from_slice(&d.to_le_bytes());
	}
	b[70..72].copy_from_slice(&16i16.to_le_bytes());
	b[72..74].copy_from_slice(&32i16.to_le_bytes());
	for i in 0..4 {
		b[76 + 4 * i..80 + 4 * i].copy_from_slice(&1f32.to_le_bytes());
	}
	b[108..112].copy_from_slice(&352f32.to_le_bytes());
	b[112..116].copy_from_slice(&1f32.to_le_bytes());
	b[254..256].copy_from_slice(&1i16.to_le_bytes());
	for (r, row) in sform.iter().enumerate() {
		for (c, v) in row.iter().enumerate() {
			let at = 280 + 16 * r + 4 * c;
			b[at..at + 4].copy_from_slice(&v.to_le_bytes());
		}
	}
	b[344..348].copy_from_slice(b"n+1\0");
	for v in data {
		b.extend_from_slice(&v.to_le_bytes());
	}
	b
}

#[cfg(test)]
mod tests {
	use super::*;
	use flate2::{write::GzEncoder, Compression};
	use std::io::Write;

	const SFORM: [[f32; 4]; 3] = [
		[2.0, 0.0, 0.0, -10.0],
		[0.0, 2.0, 0.0, 0.0],
		[0.0, 0.0, 2.0, 5.0],
	];

	fn check(img: &NiftiImage) {
		assert_eq!(img.dims, [2, 2, 1]);
		assert_eq!(img.get(1, 0, 0), Some(2.0));
		assert_eq!(img.get(0, 1, 0), Some(3.0));
		assert_eq!(img.get(1, 1, 0), Some(4.0));
		assert_eq!(img.get(2, 0, 0), None);

		let idx = img.world_to_index([-8.0, 2.0, 5.0]).unwrap();
		assert_eq!(idx, [1.0, 1.0, 0.0]);
	}

	#[test]
	fn read_sform() {
		let dir = tempfile::tempdir().unwrap();
		let p = dir.path().join("gm.nii");
		std::fs::write(&p, test_image([2, 2, 1], SFORM, &[1.0, 2.0, 3.0, 4.0])).unwrap();
		check(&NiftiImage::read(&p).unwrap());
	}

	#[test]
	fn read_gzip() {
		let dir = tempfile::tempdir().unwrap();
		let p = dir.path().join("gm.nii.gz");
		let mut gz = GzEncoder::new(Vec::new(), Compression::default());
		gz.write_all(&test_image([2, 2, 1], SFORM, &[1.0, 2.0, 3.0, 4.0]))
			.unwrap();
		std::fs::write(&p, gz.finish().unwrap()).unwrap();
		check(&NiftiImage::read(&p).unwrap());
	}

	#[test]
	fn bad_magic() {
		let dir = tempfile::tempdir().unwrap();
		let p = dir.path().join("bad.nii");
		let mut bytes = test_image([1, 1, 1], SFORM, &[0.0]);
		bytes[344] = b'x';
		std::fs::write(&p, bytes).unwrap();
		assert!(matches!(NiftiImage::read(&p), Err(NiftiError::Read(_))));
	}

	#[test]
	fn truncated() {
		let dir = tempfile::tempdir().unwrap();
		let p = dir.path().join("short.nii");
		std::fs::write(&p, test_image([2, 2, 2], SFORM, &[0.0])).unwrap();
		assert!(matches!(NiftiImage::read(&p), Err(NiftiError::Read(_))));
	}

	#[test]
	fn singular_affine() {
		let img = NiftiImage {
			dims: [1, 1, 1],
			data: vec![0.0],
			affine: [[0.0; 4]; 4],
		};
		assert!(matches!(
			img.world_to_index([0.0; 3]),
			Err(NiftiError::SingularAffine)
		));
	}
}
