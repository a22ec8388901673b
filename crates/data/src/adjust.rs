use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

use crate::{Complex, Dataset, Fid};

/// Shift `fid` by `hz`. Positive values move peaks up in frequency.
pub fn shift_frequency(fid: &Fid, hz: f64, dwell: f64) -> Fid {
	let samples = fid
		.samples()
		.iter()
		.enumerate()
		.map(|(n, x)| {
			let t = n as f64 * dwell;
			x * Complex::from_polar(1.0, 2.0 * PI * hz * t)
		})
		.collect::<Vec<_>>();
	return Fid::new(samples);
}

/// Frequency of fft bin `k` of `n`, in Hz
fn bin_frequency(k: usize, n: usize, dwell: f64) -> f64 {
	let span = n as f64 * dwell;
	if k < n.div_ceil(2) {
		return k as f64 / span;
	} else {
		return (k as f64 - n as f64) / span;
	}
}

/// Apply a zero-order phase (rad) and a first-order phase (rad/Hz) in the frequency domain.
pub fn adjust_phase(fid: &Fid, zero: f64, first: f64, dwell: f64) -> Fid {
	let n = fid.len();
	if n == 0 {
		return fid.clone();
	}

	if first == 0.0 {
		let rot = Complex::from_polar(1.0, zero);
		return Fid::new(fid.samples().iter().map(|x| x * rot).collect());
	}

	let mut planner = FftPlanner::<f64>::new();
	let forward = planner.plan_fft_forward(n);
	let inverse = planner.plan_fft_inverse(n);

	let mut buf = fid.samples().to_vec();
	forward.process(&mut buf);
	for (k, x) in buf.iter_mut().enumerate() {
		let phi = zero + first * bin_frequency(k, n, dwell);
		*x *= Complex::from_polar(1.0, phi);
	}
	inverse.process(&mut buf);

	let scale = 1.0 / n as f64;
	return Fid::new(buf.into_iter().map(|x| x * scale).collect());
}

/// An error we encounter when adjustment values are out of range
#[derive(Debug, Error, PartialEq)]
pub enum AdjustmentError {
	#[error("`{name}` must be in [{min}, {max}], got {value}")]
	OutOfRange {
		name: &'static str,
		value: f64,
		min: f64,
		max: f64,
	},
}

/// Manual spectral alignment applied to the final result before fitting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualAdjustment {
	/// Frequency shift, in ppm
	pub frequency: f64,

	/// Zero-order phase, in degrees
	pub phase0: f64,

	/// First-order phase, in degrees/ppm
	pub phase1: f64,
}

impl ManualAdjustment {
	pub const FREQUENCY_RANGE: (f64, f64) = (-10.0, 10.0);
	pub const PHASE0_RANGE: (f64, f64) = (-180.0, 180.0);
	pub const PHASE1_RANGE: (f64, f64) = (-140.0, 140.0);

	pub fn validate(&self) -> Result<(), AdjustmentError> {
		for (name, value, (min, max)) in [
			("frequency", self.frequency, Self::FREQUENCY_RANGE),
			("phase0", self.phase0, Self::PHASE0_RANGE),
			("phase1", self.phase1, Self::PHASE1_RANGE),
		] {
			if !(min..=max).contains(&value) {
				return Err(AdjustmentError::OutOfRange {
					name,
					value,
					min,
					max,
				});
			}
		}
		return Ok(());
	}

	pub fn is_identity(&self) -> bool {
		return self.frequency == 0.0 && self.phase0 == 0.0 && self.phase1 == 0.0;
	}

	/// Apply this adjustment to every signal in `data`
	pub fn apply(&self, data: &Dataset) -> Dataset {
		if self.is_identity() {
			return data.clone();
		}

		let f0 = data.info.f0;
		let dwell = data.info.dwell;
		let zero = self.phase0 * PI / 180.0;
		let first = self.phase1 * PI / 180.0 / f0;

		return data.map_fids(|fid| {
			let shifted = shift_frequency(fid, -self.frequency * f0, dwell);
			adjust_phase(&shifted, zero, first, dwell)
		});
	}

	/// The `manual_adjustment.txt` text
	pub fn report(&self) -> String {
		return format!(
			"Frequency shift: {} ppm\nZero-order phase: {} deg\nFirst-order phase: {} deg/ppm\n",
			self.frequency, self.phase0, self.phase1
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Acquisition, AcquisitionInfo, Nucleus};
	use std::sync::Arc;

	fn close(a: Complex, b: Complex) -> bool {
		(a - b).norm() < 1e-9
	}

	fn ramp(n: usize) -> Fid {
		Fid::new((0..n).map(|i| Complex::new(i as f64, -(i as f64) / 2.0)).collect())
	}

	#[test]
	fn zero_order_only() {
		let f = ramp(8);
		let g = adjust_phase(&f, PI / 2.0, 0.0, 1e-3);
		for (a, b) in f.samples().iter().zip(g.samples()) {
			assert!(close(a * Complex::new(0.0, 1.0), *b));
		}
	}

	#[test]
	fn fft_path_is_identity_without_phase() {
		let f = ramp(16);
		// A first-order phase of zero on one bin frequency
		let g = adjust_phase(&f, 0.0, 1e-12, 1e-3);
		for (a, b) in f.samples().iter().zip(g.samples()) {
			assert!((a - b).norm() < 1e-6);
		}
	}

	#[test]
	fn shift_round_trip() {
		let f = ramp(8);
		let g = shift_frequency(&shift_frequency(&f, 12.5, 1e-3), -12.5, 1e-3);
		for (a, b) in f.samples().iter().zip(g.samples()) {
			assert!(close(*a, *b));
		}
	}

	#[test]
	fn ranges() {
		let ok = ManualAdjustment {
			frequency: 0.1,
			phase0: -170.0,
			phase1: 10.0,
		};
		assert!(ok.validate().is_ok());

		let bad = ManualAdjustment {
			phase1: 141.0,
			..ok
		};
		assert!(matches!(
			bad.validate(),
			Err(AdjustmentError::OutOfRange { name: "phase1", .. })
		));
	}

	#[test]
	fn identity_apply() {
		let info = Arc::new(AcquisitionInfo {
			f0: 123.0,
			te: 30.0,
			tr: None,
			dwell: 1e-3,
			nucleus: Nucleus::proton(),
			sequence: None,
			transform: None,
			centre: None,
			voxel_volume: None,
		});
		let d = Dataset::new(info, vec![Acquisition::single(ramp(4))]);
		assert_eq!(ManualAdjustment::default().apply(&d), d);
	}
}
