//! LCModel control files.
//!
//! A control file is a Fortran namelist:
//! ```text
//!  $LCMODL
//!  KEY = 123456789
//!  FILRAW = './lcm.RAW'
//!  DOWS = T
//!  $END
//! ```

use smartstring::{LazyCompact, SmartString};
use std::{
	fmt::Display,
	fs::File,
	io::{BufWriter, Write},
	path::Path,
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ControlFileError {
	#[error("i/o error while accessing control file")]
	Io(#[from] std::io::Error),
}

/// One value in a control file
#[derive(Debug, Clone, PartialEq)]
pub enum ControlValue {
	Bool(bool),
	Str(String),
	Int(i64),
	Float(f64),
	Tuple(Vec<f64>),
}

impl ControlValue {
	/// Parse a raw value the way LCModel users write them.
	///
	/// `T`/`F` are booleans, quoted values are strings,
	/// comma-separated values are float tuples. Anything
	/// that isn't a number is kept as-is.
	pub fn parse(value: &str) -> Self {
		let value = value.trim();

		if value == "T" {
			return Self::Bool(true);
		} else if value == "F" {
			return Self::Bool(false);
		}

		if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
			return Self::Str(value.trim_matches('\'').into());
		}

		if value.contains(',') {
			let tuple = value
				.split(',')
				.map(|x| x.trim().parse::<f64>())
				.collect::<Result<Vec<_>, _>>();
			if let Ok(tuple) = tuple {
				return Self::Tuple(tuple);
			}
		} else if let Ok(x) = value.parse::<i64>() {
			return Self::Int(x);
		}

		if let Ok(x) = value.parse::<f64>() {
			return Self::Float(x);
		}

		return Self::Str(value.into());
	}
}

impl Display for ControlValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Bool(true) => write!(f, "T"),
			Self::Bool(false) => write!(f, "F"),
			Self::Str(s) => write!(f, "'{s}'"),
			Self::Int(x) => write!(f, "{x}"),
			// Debug formatting always keeps a decimal point
			Self::Float(x) => write!(f, "{x:?}"),
			Self::Tuple(x) => {
				for (i, v) in x.iter().enumerate() {
					if i != 0 {
						write!(f, ", ")?;
					}
					write!(f, "{v:?}")?;
				}
				Ok(())
			}
		}
	}
}

impl From<bool> for ControlValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for ControlValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<f64> for ControlValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for ControlValue {
	fn from(value: &str) -> Self {
		Self::Str(value.into())
	}
}

impl From<String> for ControlValue {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}

/// An ordered set of control parameters.
/// Keys are always uppercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlParams {
	entries: Vec<(SmartString<LazyCompact>, ControlValue)>,
}

impl ControlParams {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set `key` to `value`.
	/// Existing keys keep their position.
	pub fn insert(&mut self, key: &str, value: impl Into<ControlValue>) {
		let key: SmartString<LazyCompact> = key.trim().to_uppercase().into();
		let value = value.into();

		match self.entries.iter_mut().find(|(k, _)| *k == key) {
			Some((_, v)) => *v = value,
			None => self.entries.push((key, value)),
		}
	}

	pub fn get(&self, key: &str) -> Option<&ControlValue> {
		let key = key.to_uppercase();
		self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
	}

	pub fn remove(&mut self, key: &str) -> Option<ControlValue> {
		let key = key.to_uppercase();
		let i = self.entries.iter().position(|(k, _)| *k == key)?;
		return Some(self.entries.remove(i).1);
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ControlValue)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Parse the text of a control file.
	/// Malformed lines are logged and skipped.
	pub fn parse(text: &str) -> Self {
		let mut out = Self::new();

		for line in text.lines() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('$') {
				continue;
			}

			let (key, value) = match line.split_once('=') {
				Some(x) => x,
				None => {
					warn!(message = "Malformed line in control file", line);
					continue;
				}
			};

			out.insert(key, ControlValue::parse(value));
		}

		return out;
	}

	pub fn read(path: &Path) -> Result<Self, ControlFileError> {
		let text = std::fs::read_to_string(path)?;
		return Ok(Self::parse(&text));
	}

	pub fn write_to(&self, w: &mut impl Write) -> std::io::Result<()> {
		writeln!(w, " $LCMODL")?;
		for (k, v) in &self.entries {
			writeln!(w, " {k} = {v}")?;
		}
		writeln!(w, " $END")?;
		return Ok(());
	}

	pub fn write(&self, path: &Path) -> std::io::Result<()> {
		let mut f = BufWriter::new(File::create(path)?);
		self.write_to(&mut f)?;
		f.flush()?;
		return Ok(());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("T", ControlValue::Bool(true))]
	#[case("F", ControlValue::Bool(false))]
	#[case("'./a.RAW'", ControlValue::Str("./a.RAW".into()))]
	#[case("12", ControlValue::Int(12))]
	#[case("-0.5", ControlValue::Float(-0.5))]
	#[case("1e-3", ControlValue::Float(0.001))]
	#[case("1.0, 2.5", ControlValue::Tuple(vec![1.0, 2.5]))]
	#[case("1.0, x", ControlValue::Str("1.0, x".into()))]
	#[case("abc", ControlValue::Str("abc".into()))]
	fn parse_values(#[case] raw: &str, #[case] expected: ControlValue) {
		assert_eq!(ControlValue::parse(raw), expected);
	}

	#[test]
	fn round_trip() {
		let mut p = ControlParams::new();
		p.insert("KEY", 123456789i64);
		p.insert("FILRAW", "./lcm.RAW");
		p.insert("DOWS", true);

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("lcm.CONTROL");
		p.write(&path).unwrap();

		let text = std::fs::read_to_string(&path).unwrap();
		assert_eq!(
			text,
			" $LCMODL\n KEY = 123456789\n FILRAW = './lcm.RAW'\n DOWS = T\n $END\n"
		);

		let q = ControlParams::read(&path).unwrap();
		assert_eq!(q, p);
		assert_eq!(q.get("key"), Some(&ControlValue::Int(123456789)));
		assert_eq!(q.get("FILRAW"), Some(&ControlValue::Str("./lcm.RAW".into())));
		assert_eq!(q.get("DOWS"), Some(&ControlValue::Bool(true)));
	}

	#[test]
	fn parse_skips_noise() {
		let p = ControlParams::parse(" $LCMODL\n\n title = 'x'\n garbage\n ppmst = 4.0\n $END\n");
		assert_eq!(p.len(), 2);
		assert_eq!(p.get("TITLE"), Some(&ControlValue::Str("x".into())));
		assert_eq!(p.get("PPMST"), Some(&ControlValue::Float(4.0)));
	}

	#[test]
	fn insert_keeps_order() {
		let mut p = ControlParams::new();
		p.insert("a", 1i64);
		p.insert("b", 2i64);
		p.insert("A", 3i64);
		let keys: Vec<_> = p.iter().map(|(k, _)| k).collect();
		assert_eq!(keys, vec!["A", "B"]);
		assert_eq!(p.remove("a"), Some(ControlValue::Int(3)));
		assert!(!p.contains_key("A"));
	}

	#[test]
	fn float_formatting() {
		assert_eq!(ControlValue::Float(2.0).to_string(), "2.0");
		assert_eq!(ControlValue::Float(0.0005).to_string(), "0.0005");
		assert_eq!(ControlValue::Tuple(vec![1.0, 2.0]).to_string(), "1.0, 2.0");
	}
}
