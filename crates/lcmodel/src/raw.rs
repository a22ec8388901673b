//! LCModel `.RAW` and `.H2O` files

use mrs_data::{AcquisitionInfo, Fid};
use std::{
	fs::File,
	io::{BufWriter, Write},
	path::Path,
};

/// Sequence name written when none was detected
pub const DEFAULT_SEQUENCE: &str = "PRESS";

/// Format `x` as ` d.dddddde+XX`, with a leading space for positive values.
fn sci(x: f64) -> String {
	let s = format!("{:.6e}", x.abs());
	let (mantissa, exponent) = s.split_once('e').unwrap_or((s.as_str(), "0"));
	let exponent: i32 = exponent.parse().unwrap_or(0);
	let sign = if x.is_sign_negative() && x != 0.0 {
		'-'
	} else {
		' '
	};
	let esign = if exponent < 0 { '-' } else { '+' };
	return format!("{sign}{mantissa}e{esign}{:02}", exponent.abs());
}

/// Write one signal in LCModel's raw format.
pub fn write_raw_to(
	w: &mut impl Write,
	fid: &Fid,
	info: &AcquisitionInfo,
	sequence: Option<&str>,
) -> std::io::Result<()> {
	writeln!(w, " $SEQPAR")?;
	writeln!(w, " ECHOT = {}", info.te)?;
	writeln!(w, " HZPPPM = {}", info.f0)?;
	writeln!(w, " SEQ = {}", sequence.unwrap_or(DEFAULT_SEQUENCE))?;
	writeln!(w, " $END")?;
	writeln!(w, " $NMID")?;
	writeln!(w, " FMTDAT = '(2E15.6)'")?;
	if info.transform.is_some() {
		if let Some(volume) = info.voxel_volume() {
			// mm^3 to ml
			writeln!(w, " VOLUME = {}", volume * 1e-3)?;
		}
	}
	writeln!(w, " $END")?;

	for x in fid.samples() {
		writeln!(w, "  {}  {}", sci(x.re), sci(x.im))?;
	}

	return Ok(());
}

pub fn write_raw(
	path: &Path,
	fid: &Fid,
	info: &AcquisitionInfo,
	sequence: Option<&str>,
) -> std::io::Result<()> {
	let mut f = BufWriter::new(File::create(path)?);
	write_raw_to(&mut f, fid, info, sequence)?;
	f.flush()?;
	return Ok(());
}

#[cfg(test)]
mod tests {
	use super::*;
	use mrs_data::{Complex, Nucleus};

	#[test]
	fn number_format() {
		assert_eq!(sci(1.0), " 1.000000e+00");
		assert_eq!(sci(-0.00123), "-1.230000e-03");
		assert_eq!(sci(0.0), " 0.000000e+00");
		assert_eq!(sci(12345.678), " 1.234568e+04");
	}

	#[test]
	fn layout() {
		let info = AcquisitionInfo {
			f0: 123.2,
			te: 30.0,
			tr: None,
			dwell: 0.0005,
			nucleus: Nucleus::proton(),
			sequence: None,
			transform: None,
			centre: None,
			voxel_volume: None,
		};
		let fid = Fid::new(vec![Complex::new(1.0, -2.0), Complex::new(0.5, 0.0)]);

		let mut out = Vec::new();
		write_raw_to(&mut out, &fid, &info, Some("STEAM")).unwrap();
		let text = String::from_utf8(out).unwrap();

		assert_eq!(
			text,
			concat!(
				" $SEQPAR\n",
				" ECHOT = 30\n",
				" HZPPPM = 123.2\n",
				" SEQ = STEAM\n",
				" $END\n",
				" $NMID\n",
				" FMTDAT = '(2E15.6)'\n",
				" $END\n",
				"   1.000000e+00  -2.000000e+00\n",
				"   5.000000e-01   0.000000e+00\n",
			)
		);
	}
}
