//! Reading the concentration table out of LCModel `.coord` files

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordError {
	#[error("i/o error while reading coord file")]
	Io(#[from] std::io::Error),

	#[error("coord file has no concentration table")]
	NoTable,

	#[error("could not parse concentration row `{line}`")]
	BadRow { line: String },
}

/// One row of the concentration table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Concentration {
	pub metabolite: String,
	pub conc: f64,

	/// Cramér-Rao lower bound, percent
	pub sd: f64,

	/// Ratio to the reference metabolite
	pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CoordResult {
	/// The ratio column's reference, e.g. `Cr+PCr`
	pub reference: Option<String>,
	pub concentrations: Vec<Concentration>,

	/// Linewidth, ppm
	pub fwhm: Option<f64>,
	pub snr: Option<f64>,

	/// Data shift, ppm
	pub shift: Option<f64>,
}

impl CoordResult {
	pub fn get(&self, metabolite: &str) -> Option<&Concentration> {
		self.concentrations.iter().find(|c| c.metabolite == metabolite)
	}

	pub fn read(path: &Path) -> Result<Self, CoordError> {
		let text = std::fs::read_to_string(path)?;
		return Self::parse(&text);
	}

	pub fn parse(text: &str) -> Result<Self, CoordError> {
		let mut out = Self::default();
		let mut lines = text.lines();

		// " 23 lines in following concentration table = NCONC+1"
		let rows = lines
			.by_ref()
			.find_map(|l| {
				let l = l.trim();
				l.contains("lines in following concentration table")
					.then(|| l.split_whitespace().next()?.parse::<usize>().ok())
					.flatten()
			})
			.ok_or(CoordError::NoTable)?;

		// The first line of the table is its header
		if let Some(header) = lines.next() {
			out.reference = header
				.split_whitespace()
				.find_map(|x| x.strip_prefix('/'))
				.map(|x| x.to_owned());
		}

		for line in lines.by_ref().take(rows.saturating_sub(1)) {
			out.concentrations.push(parse_row(line)?);
		}

		for line in lines {
			let line = line.trim();
			if let Some(rest) = line.strip_prefix("FWHM =") {
				let mut it = rest.split_whitespace();
				out.fwhm = it.next().and_then(|x| x.parse().ok());
				if let Some(snr) = rest.split("S/N =").nth(1) {
					out.snr = snr.split_whitespace().next().and_then(|x| x.parse().ok());
				}
			} else if let Some(rest) = line.strip_prefix("Data shift =") {
				out.shift = rest.split_whitespace().next().and_then(|x| x.parse().ok());
			}
		}

		return Ok(out);
	}
}

/// Parse a row like `1.215E+00   10%   0.145 Asp`.
/// Large ratios can run into the name: `12.345+Glu`.
fn parse_row(line: &str) -> Result<Concentration, CoordError> {
	let bad = || CoordError::BadRow {
		line: line.trim().to_owned(),
	};

	let mut it = line.split_whitespace();
	let conc: f64 = it.next().and_then(|x| x.parse().ok()).ok_or_else(bad)?;
	let sd: f64 = it
		.next()
		.and_then(|x| x.strip_suffix('%'))
		.and_then(|x| x.parse().ok())
		.ok_or_else(bad)?;

	let rest: Vec<&str> = it.collect();
	let (ratio, metabolite) = match rest.as_slice() {
		[ratio, name] => (
			ratio.parse::<f64>().ok().ok_or_else(bad)?,
			(*name).to_owned(),
		),
		[glued] => {
			// Split where the number stops. Skip the first char, it may be a sign.
			let at = glued
				.char_indices()
				.skip(1)
				.find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
				.map(|(i, _)| i)
				.ok_or_else(bad)?;
			let (ratio, name) = glued.split_at(at);
			(ratio.parse::<f64>().ok().ok_or_else(bad)?, name.to_owned())
		}
		_ => return Err(bad()),
	};

	return Ok(Concentration {
		metabolite,
		conc,
		sd,
		ratio,
	});
}
