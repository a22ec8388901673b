use mrs_data::{Acquisition, AcquisitionInfo, Complex, Dataset, Fid, Nucleus};
use mrs_pipeline::base::{AcceptDefaults, StepContext, ThisNodeInfo};
use std::sync::Arc;

pub fn info() -> Arc<AcquisitionInfo> {
	Arc::new(AcquisitionInfo {
		f0: 123.2,
		te: 30.0,
		tr: Some(2000.0),
		dwell: 1.0 / 2000.0,
		nucleus: Nucleus::proton(),
		sequence: None,
		transform: None,
		centre: None,
		voxel_volume: None,
	})
}

/// A decaying signal with the given initial phase
pub fn fid(n: usize, amplitude: f64, phase: f64) -> Fid {
	Fid::new(
		(0..n)
			.map(|i| Complex::from_polar(amplitude * (-(i as f64) / 10.0).exp(), phase))
			.collect(),
	)
}

pub fn single(channels: Vec<Fid>) -> Dataset {
	Dataset::new(info(), vec![Acquisition::SingleVoxel { channels }])
}

pub static ACCEPT: AcceptDefaults = AcceptDefaults {};

pub fn ctx() -> StepContext<'static> {
	StepContext {
		node: ThisNodeInfo {
			id: "node".into(),
			node_type: "Test".into(),
			step: 0,
		},
		interactor: &ACCEPT,
	}
}
