use serde::Deserialize;
use std::fmt::Display;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
	Trace,
	Debug,
	Info,
	Warn,
	Error,
}

impl Default for LogLevel {
	fn default() -> Self {
		Self::Info
	}
}

impl Display for LogLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Trace => write!(f, "trace"),
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warn => write!(f, "warn"),
			Self::Error => write!(f, "error"),
		}
	}
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LoggingPreset {
	Default,
	Verbose,
	Develop,
	Trace,
}

impl Default for LoggingPreset {
	fn default() -> Self {
		return Self::Default;
	}
}

impl LoggingPreset {
	pub fn get_config(&self) -> LoggingConfig {
		match self {
			Self::Default => LoggingConfig {
				other: LogLevel::Warn,

				cli: LogLevel::Info,
				engine: LogLevel::Info,
				worker: LogLevel::Info,
				pipeline: LogLevel::Warn,
				lcmodel: LogLevel::Info,
				segment: LogLevel::Info,
				nodes: LogLevel::Warn,
			},

			Self::Verbose => LoggingConfig {
				other: LogLevel::Warn,

				cli: LogLevel::Debug,
				engine: LogLevel::Debug,
				worker: LogLevel::Debug,
				pipeline: LogLevel::Info,
				lcmodel: LogLevel::Debug,
				segment: LogLevel::Debug,
				nodes: LogLevel::Info,
			},

			Self::Develop => LoggingConfig {
				other: LogLevel::Debug,

				cli: LogLevel::Trace,
				engine: LogLevel::Trace,
				worker: LogLevel::Debug,
				pipeline: LogLevel::Debug,
				lcmodel: LogLevel::Trace,
				segment: LogLevel::Trace,
				nodes: LogLevel::Debug,
			},

			Self::Trace => LoggingConfig {
				other: LogLevel::Trace,

				cli: LogLevel::Trace,
				engine: LogLevel::Trace,
				worker: LogLevel::Trace,
				pipeline: LogLevel::Trace,
				lcmodel: LogLevel::Trace,
				segment: LogLevel::Trace,
				nodes: LogLevel::Trace,
			},
		}
	}
}

pub struct LoggingConfig {
	other: LogLevel,

	cli: LogLevel,
	engine: LogLevel,
	worker: LogLevel,
	pipeline: LogLevel,
	lcmodel: LogLevel,
	segment: LogLevel,
	nodes: LogLevel,
}

impl LoggingConfig {
	/// The filter directive string for this config
	pub fn directives(&self) -> String {
		return [
			format!("mrs={}", self.cli),
			format!("mrs_engine::worker={}", self.worker),
			format!("mrs_engine={}", self.engine),
			format!("mrs_pipeline={}", self.pipeline),
			format!("mrs_lcmodel={}", self.lcmodel),
			format!("mrs_segment={}", self.segment),
			format!("mrs_seghelper={}", self.segment),
			format!("mrs_nodes={}", self.nodes),
			self.other.to_string(),
		]
		.join(",");
	}
}

impl From<LoggingConfig> for EnvFilter {
	fn from(value: LoggingConfig) -> Self {
		// Every directive above is well-formed,
		// fall back to a flat level anyway.
		return EnvFilter::try_new(value.directives())
			.unwrap_or_else(|_| EnvFilter::new(value.other.to_string()));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn presets_build_filters() {
		for preset in [
			LoggingPreset::Default,
			LoggingPreset::Verbose,
			LoggingPreset::Develop,
			LoggingPreset::Trace,
		] {
			let d = preset.get_config().directives();
			assert!(EnvFilter::try_new(&d).is_ok(), "bad directives {d}");
		}
	}

	#[test]
	fn worker_directive_precedes_engine() {
		let d = LoggingPreset::Default.get_config().directives();
		let w = d.find("mrs_engine::worker").unwrap();
		let e = d.find("mrs_engine=").unwrap();
		assert!(w < e);
	}
}
