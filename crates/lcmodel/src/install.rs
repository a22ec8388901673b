//! Locating the LCModel binary, unpacking it if needed

use flate2::read::GzDecoder;
use std::{
	fs::File,
	path::{Path, PathBuf},
};
use tar::Archive;
use thiserror::Error;
use tracing::info;

/// A bundled copy of the binary, unpacked on first use
pub const ARCHIVE_NAME: &str = "lcmodel.tar.gz";

#[derive(Debug, Error)]
pub enum InstallError {
	#[error("no lcmodel binary or `{ARCHIVE_NAME}` in `{dir}`")]
	NotFound { dir: PathBuf },

	#[error("could not unpack `{archive}`")]
	Unpack {
		archive: PathBuf,
		#[source]
		error: std::io::Error,
	},

	#[error("i/o error")]
	Io(#[from] std::io::Error),
}

pub fn binary_name() -> &'static str {
	if cfg!(windows) {
		"lcmodel.exe"
	} else {
		"lcmodel"
	}
}

fn unpack(archive: &Path, dest: &Path) -> Result<(), InstallError> {
	let wrap = |error| InstallError::Unpack {
		archive: archive.to_owned(),
		error,
	};

	let file = File::open(archive).map_err(wrap)?;
	let mut archive = Archive::new(GzDecoder::new(file));
	archive.unpack(dest).map_err(wrap)?;
	return Ok(());
}

/// Find the LCModel binary in `dir`, unpacking the bundled archive if it is missing.
/// Returns an absolute path.
pub fn ensure_binary(dir: &Path) -> Result<PathBuf, InstallError> {
	let binary = dir.join(binary_name());

	if !binary.is_file() {
		let archive = dir.join(ARCHIVE_NAME);
		if !archive.is_file() {
			return Err(InstallError::NotFound { dir: dir.to_owned() });
		}

		info!(message = "LCModel binary not found, unpacking", ?archive);
		unpack(&archive, dir)?;

		if !binary.is_file() {
			return Err(InstallError::NotFound { dir: dir.to_owned() });
		}
	}

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o700))?;
	}

	return Ok(std::fs::canonicalize(binary)?);
}

#[cfg(test)]
mod tests {
	use super::*;
	use flate2::{write::GzEncoder, Compression};

	#[test]
	fn unpacks_archive() {
		let dir = tempfile::tempdir().unwrap();

		{
			let f = File::create(dir.path().join(ARCHIVE_NAME)).unwrap();
			let mut b = tar::Builder::new(GzEncoder::new(f, Compression::default()));
			let body = b"#!/bin/sh\n";
			let mut header = tar::Header::new_gnu();
			header.set_size(body.len() as u64);
			header.set_mode(0o644);
			header.set_cksum();
			b.append_data(&mut header, binary_name(), &body[..]).unwrap();
			b.into_inner().unwrap().finish().unwrap();
		}

		let bin = ensure_binary(dir.path()).unwrap();
		assert!(bin.is_absolute());
		assert!(bin.is_file());

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let mode = std::fs::metadata(&bin).unwrap().permissions().mode();
			assert_eq!(mode & 0o777, 0o700);
		}

		// Second call finds the binary directly
		assert_eq!(ensure_binary(dir.path()).unwrap(), bin);
	}

	#[test]
	fn missing() {
		let dir = tempfile::tempdir().unwrap();
		assert!(matches!(
			ensure_binary(dir.path()),
			Err(InstallError::NotFound { .. })
		));
	}
}
