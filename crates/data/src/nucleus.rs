use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::fmt::Display;

/// Gyromagnetic ratios over 2 pi, in MHz/T
const LARMOR_TABLE: &[(&str, f64)] = &[
	("1H", 42.577),
	("31P", 17.235),
	("23Na", 11.262),
	("2H", 6.536),
	("13C", 10.7084),
	("19F", 40.078),
];

/// The atomic species observed in an acquisition, like `1H` or `31P`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Nucleus(SmartString<LazyCompact>);

impl Nucleus {
	pub fn new(name: &str) -> Self {
		Self(name.trim().into())
	}

	pub fn proton() -> Self {
		Self::new("1H")
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Is this nucleus known?
	/// Loaders that cannot tell write `unknown` or nothing at all.
	pub fn is_known(&self) -> bool {
		return !self.0.is_empty() && !self.0.eq_ignore_ascii_case("unknown");
	}

	pub fn is_proton(&self) -> bool {
		return self.0 == "1H";
	}

	/// This nucleus' larmor constant, in MHz/T
	pub fn larmor(&self) -> Option<f64> {
		return LARMOR_TABLE
			.iter()
			.find(|(n, _)| *n == self.0.as_str())
			.map(|(_, g)| *g);
	}

	/// Estimate the main field strength (T) from a reference frequency in MHz,
	/// rounded to the nearest integer like scanner names are.
	pub fn field_strength(&self, f0: f64) -> Option<f64> {
		let gamma = self.larmor()?;
		return Some((f0 / gamma).round());
	}
}

impl Display for Nucleus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.0.fmt(f)
	}
}

impl From<&str> for Nucleus {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
