use mrs_pipeline::base::{
	NodeBuilder, NodeCategory, NodeDescriptor, NodeOrigin, NodeRegistry, ProcessingNode,
	PropertySpec, PropertyType, PropertyValue, RegisterNodeError,
};

mod apodize;
mod average;
mod coilcombine;
mod eddycurrent;
mod freqshift;
mod phase;

#[cfg(test)]
mod testutil;

fn float(min: f64, max: f64, default: f64, description: &str) -> PropertySpec {
	PropertySpec {
		property_type: PropertyType::Float {
			min: Some(min),
			max: Some(max),
		},
		default: PropertyValue::Float(default),
		description: description.into(),
	}
}

fn choice(variants: &[&str], default: &str, description: &str) -> PropertySpec {
	PropertySpec {
		property_type: PropertyType::Enum {
			variants: variants.iter().map(|x| (*x).into()).collect(),
		},
		default: PropertyValue::String(default.into()),
		description: description.into(),
	}
}

fn builder<F>(f: F) -> Box<dyn NodeBuilder>
where
	F: Fn() -> Box<dyn ProcessingNode> + Send + Sync + 'static,
{
	Box::new(f)
}

/// Register all nodes in this module into the given registry.
///
/// `CoilCombination` must stay the first node of its category,
/// since the engine uses it for automatic coil combination.
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegisterNodeError> {
	registry.register_node(
		"CoilCombination",
		NodeDescriptor::new(
			NodeCategory::CoilCombination,
			"Combine receive channels into one signal",
		)
		.with_property(
			"weighting",
			choice(
				&["signal", "equal"],
				"signal",
				"Weight channels by first-point magnitude, or equally",
			),
		),
		NodeOrigin::BuiltIn,
		builder(|| Box::new(coilcombine::CoilCombination {})),
	)?;

	registry.register_node(
		"Average",
		NodeDescriptor::new(NodeCategory::Averaging, "Average all transients"),
		NodeOrigin::BuiltIn,
		builder(|| Box::new(average::Average {})),
	)?;

	registry.register_node(
		"FrequencyShift",
		NodeDescriptor::new(NodeCategory::FrequencyAlignment, "Shift by a fixed amount")
			.with_property(
				"shift",
				float(-10.0, 10.0, 0.0, "Frequency shift, in ppm"),
			),
		NodeOrigin::BuiltIn,
		builder(|| Box::new(freqshift::FrequencyShift {})),
	)?;

	registry.register_node(
		"PhaseCorrection",
		NodeDescriptor::new(NodeCategory::PhaseCorrection, "Zero- and first-order phase")
			.with_property(
				"mode",
				choice(
					&["manual", "first-point", "ask"],
					"first-point",
					"Use the phases below, make the first point real, or ask",
				),
			)
			.with_property(
				"phase0",
				float(-180.0, 180.0, 0.0, "Zero-order phase, in degrees"),
			)
			.with_property(
				"phase1",
				float(-140.0, 140.0, 0.0, "First-order phase, in degrees/ppm"),
			),
		NodeOrigin::BuiltIn,
		builder(|| Box::new(phase::PhaseCorrection {})),
	)?;

	registry.register_node(
		"LineBroadening",
		NodeDescriptor::new(NodeCategory::Apodization, "Exponential apodization")
			.with_property(
				"lb",
				float(0.0, 100.0, 1.0, "Line broadening, in Hz"),
			),
		NodeOrigin::BuiltIn,
		builder(|| Box::new(apodize::LineBroadening {})),
	)?;

	registry.register_node(
		"EddyCurrentCorrection",
		NodeDescriptor::new(
			NodeCategory::EddyCurrentCorrection,
			"Remove the water reference's phase evolution",
		),
		NodeOrigin::BuiltIn,
		builder(|| Box::new(eddycurrent::EddyCurrentCorrection {})),
	)?;

	return Ok(());
}
