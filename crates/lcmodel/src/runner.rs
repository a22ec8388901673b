use std::{
	fs::File,
	io::Read,
	path::{Path, PathBuf},
	process::{Child, Command, ExitStatus, Stdio},
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, warn};

/// An error we encounter while fitting one voxel
#[derive(Debug, Error)]
pub enum FitError {
	#[error("i/o error")]
	Io(#[from] std::io::Error),

	#[error("could not write `{file}`")]
	Write {
		file: String,
		#[source]
		error: std::io::Error,
	},

	#[error("could not start `{binary}`")]
	Spawn {
		binary: PathBuf,
		#[source]
		error: std::io::Error,
	},

	#[error("fit exited with {status}: {stderr}")]
	Failed { status: String, stderr: String },

	#[error("fit did not finish within {seconds} seconds")]
	TimedOut { seconds: u64 },

	#[error("fit did not produce {files:?}")]
	MissingOutputs { files: Vec<String> },
}

/// Runs a single fit.
///
/// `control` names a file inside `workdir`. The fit reads it
/// and writes its outputs into `workdir`. Returns whatever the
/// fit printed on stdout.
pub trait FitRunner: Send + Sync {
	fn run(&self, workdir: &Path, control: &Path) -> Result<String, FitError>;
}

/// Runs the LCModel binary with a control file on stdin
#[derive(Debug, Clone)]
pub struct LcmodelProcess {
	binary: PathBuf,

	/// `None` waits forever
	timeout: Option<Duration>,
}

impl LcmodelProcess {
	pub fn new(binary: PathBuf, timeout: Option<Duration>) -> Self {
		Self { binary, timeout }
	}

	pub fn binary(&self) -> &Path {
		&self.binary
	}
}

fn read_all(stream: Option<impl Read + Send + 'static>) -> JoinHandle<String> {
	thread::spawn(move || {
		let mut s = String::new();
		if let Some(mut r) = stream {
			if let Err(error) = r.read_to_string(&mut s) {
				warn!(message = "Could not read fit output", ?error);
			}
		}
		s
	})
}

fn wait_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, FitError> {
	let start = Instant::now();
	loop {
		if let Some(status) = child.try_wait()? {
			return Ok(status);
		}

		if start.elapsed() >= timeout {
			child.kill()?;
			child.wait()?;
			return Err(FitError::TimedOut {
				seconds: timeout.as_secs(),
			});
		}

		thread::sleep(Duration::from_millis(50));
	}
}

impl FitRunner for LcmodelProcess {
	fn run(&self, workdir: &Path, control: &Path) -> Result<String, FitError> {
		let stdin = File::open(workdir.join(control))?;

		debug!(
			message = "Starting fit",
			binary = ?self.binary,
			?workdir,
			?control
		);

		let mut child = Command::new(&self.binary)
			.current_dir(workdir)
			.stdin(Stdio::from(stdin))
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.map_err(|error| FitError::Spawn {
				binary: self.binary.clone(),
				error,
			})?;

		let stdout = read_all(child.stdout.take());
		let stderr = read_all(child.stderr.take());

		let status = match self.timeout {
			None => child.wait()?,
			Some(t) => wait_timeout(&mut child, t)?,
		};

		let stdout = stdout.join().unwrap_or_default();
		let stderr = stderr.join().unwrap_or_default();

		if !status.success() {
			return Err(FitError::Failed {
				status: status.to_string(),
				stderr,
			});
		}

		return Ok(stdout);
	}
}
