use serde::{Deserialize, Serialize};
use std::{
	fs::File,
	io::{BufWriter, Write},
	path::Path,
};

/// Raw header metadata as read from the input files.
/// Keys keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>", into = "Vec<(String, String)>")]
pub struct HeaderTable {
	entries: Vec<(String, String)>,
}

impl From<Vec<(String, String)>> for HeaderTable {
	fn from(value: Vec<(String, String)>) -> Self {
		let mut t = Self::new();
		for (k, v) in value {
			t.insert(&k, &v);
		}
		t
	}
}

impl From<HeaderTable> for Vec<(String, String)> {
	fn from(value: HeaderTable) -> Self {
		value.entries
	}
}

impl HeaderTable {
	pub fn new() -> Self {
		Self {
			entries: Vec::new(),
		}
	}

	/// Insert or replace a value
	pub fn insert(&mut self, key: &str, value: &str) {
		match self.entries.iter_mut().find(|(k, _)| k == key) {
			Some((_, v)) => *v = value.into(),
			None => self.entries.push((key.into(), value.into())),
		}
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Write this table as a two-column csv file
	pub fn write_csv(&self, path: &Path) -> Result<(), std::io::Error> {
		let mut f = BufWriter::new(File::create(path)?);
		writeln!(f, "Header,Value")?;
		for (k, v) in self.iter() {
			writeln!(f, "{},{}", csv_field(k), csv_field(v))?;
		}
		f.flush()?;
		return Ok(());
	}
}

/// Quote a csv field if it needs quoting
pub fn csv_field(s: &str) -> String {
	if s.contains([',', '"', '\n', '\r']) {
		return format!("\"{}\"", s.replace('"', "\"\""));
	}
	return s.into();
}
