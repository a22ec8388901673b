//! External processing nodes.
//!
//! A plugin is a `*.toml` descriptor in the plugin directory naming a command.
//! The command gets a json [`PluginRequest`] on stdin and must print a json
//! [`PluginResponse`] on stdout.
//!
//! ```toml
//! node_type = "Scale"
//! category = "other"
//! description = "Multiply every sample"
//! command = "./scale.py"
//!
//! [properties.factor]
//! type = "float"
//! default = 2.0
//! min = 0.0
//! ```

use mrs_data::Dataset;
use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::{
	collections::{BTreeMap, BTreeSet},
	io::Write,
	path::{Path, PathBuf},
	process::{Command, Stdio},
	sync::Arc,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
	base::{
		NodeCategory, NodeDescriptor, NodeId, NodeOrigin, NodeRegistry, ProcessingNode,
		PropertyError, PropertySpec, PropertyType, PropertyValue, RegisterNodeError,
		RunNodeError, SocketName, StepContext, StepInput, StepOutput, DEFAULT_INPUT,
		DEFAULT_OUTPUT,
	},
	helpers::NodeProperties,
};

//
// MARK: Errors
//

/// An error we encounter while loading one plugin descriptor
#[derive(Debug, Error)]
pub enum PluginError {
	#[error("could not read `{path}`")]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	#[error("could not parse `{path}`")]
	Parse {
		path: PathBuf,
		#[source]
		error: toml::de::Error,
	},

	#[error("property `{property}` in `{path}`: {message}")]
	BadProperty {
		path: PathBuf,
		property: SmartString<LazyCompact>,
		message: String,
	},

	#[error("command `{command}` for `{path}` does not exist")]
	MissingCommand { path: PathBuf, command: PathBuf },

	#[error("could not register `{path}`")]
	Register {
		path: PathBuf,
		#[source]
		error: RegisterNodeError,
	},
}

//
// MARK: Descriptor
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PluginPropertyType {
	Boolean,
	Integer,
	Float,
	String,
	Enum,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginProperty {
	#[serde(rename = "type")]
	property_type: PluginPropertyType,
	default: toml::Value,
	#[serde(default)]
	description: String,
	#[serde(default)]
	min: Option<f64>,
	#[serde(default)]
	max: Option<f64>,
	#[serde(default)]
	variants: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginDescriptor {
	node_type: String,
	category: NodeCategory,
	#[serde(default)]
	description: String,

	/// Relative to the descriptor's directory
	command: PathBuf,
	#[serde(default)]
	args: Vec<String>,

	#[serde(default)]
	inputs: Option<Vec<String>>,
	#[serde(default)]
	outputs: Option<Vec<String>>,

	#[serde(default)]
	properties: BTreeMap<String, PluginProperty>,
}

impl PluginProperty {
	fn to_spec(&self) -> Result<PropertySpec, String> {
		let property_type = match self.property_type {
			PluginPropertyType::Boolean => PropertyType::Boolean,
			PluginPropertyType::String => PropertyType::String,
			PluginPropertyType::Integer => PropertyType::Integer {
				min: self.min.map(|x| x.floor() as i64),
				max: self.max.map(|x| x.ceil() as i64),
			},
			PluginPropertyType::Float => PropertyType::Float {
				min: self.min,
				max: self.max,
			},
			PluginPropertyType::Enum => {
				if self.variants.is_empty() {
					return Err("enum properties need at least one variant".into());
				}
				PropertyType::Enum {
					variants: self.variants.iter().map(|x| x.as_str().into()).collect(),
				}
			}
		};

		let default = match &self.default {
			toml::Value::Boolean(x) => PropertyValue::Boolean(*x),
			toml::Value::Integer(x) => PropertyValue::Integer(*x),
			toml::Value::Float(x) => PropertyValue::Float(*x),
			toml::Value::String(x) => PropertyValue::String(x.as_str().into()),
			x => return Err(format!("unsupported default value `{x}`")),
		};

		return PropertySpec::new(property_type, default, &self.description)
			.map_err(|e: PropertyError| format!("bad default: {e}"));
	}
}

/// Read one descriptor and register its node
fn register_plugin(registry: &mut NodeRegistry, path: &Path) -> Result<String, PluginError> {
	let text = std::fs::read_to_string(path).map_err(|error| PluginError::Io {
		path: path.into(),
		error,
	})?;

	let desc: PluginDescriptor = toml::from_str(&text).map_err(|error| PluginError::Parse {
		path: path.into(),
		error,
	})?;

	let base = path.parent().unwrap_or(Path::new("."));
	let command = base.join(&desc.command);
	if !command.is_file() {
		return Err(PluginError::MissingCommand {
			path: path.into(),
			command,
		});
	}

	let sockets = |x: &Option<Vec<String>>, default: &str| -> Vec<SocketName> {
		match x {
			None => vec![SocketName::new(default)],
			Some(v) => v.iter().map(|s| SocketName::new(s)).collect(),
		}
	};

	let mut descriptor = NodeDescriptor::new(desc.category, &desc.description);
	descriptor.inputs = sockets(&desc.inputs, DEFAULT_INPUT);
	descriptor.outputs = sockets(&desc.outputs, DEFAULT_OUTPUT);
	for (name, prop) in &desc.properties {
		let spec = prop.to_spec().map_err(|message| PluginError::BadProperty {
			path: path.into(),
			property: name.as_str().into(),
			message,
		})?;
		descriptor.properties.insert(name.as_str().into(), spec);
	}

	let builder = CommandNodeBuilder {
		command: Arc::new(command),
		args: Arc::new(desc.args),
		workdir: Arc::new(base.to_path_buf()),
	};

	registry
		.register_node(
			&desc.node_type,
			descriptor,
			NodeOrigin::Plugin {
				descriptor_path: path.into(),
			},
			Box::new(move || Box::new(builder.instance()) as Box<dyn ProcessingNode>),
		)
		.map_err(|error| PluginError::Register {
			path: path.into(),
			error,
		})?;

	return Ok(desc.node_type);
}

/// Drop all plugin nodes from `registry` and register every valid
/// descriptor found in `dir`. Invalid descriptors are logged and skipped.
///
/// Returns the node types that were registered.
pub fn reload_plugins(registry: &mut NodeRegistry, dir: &Path) -> Vec<String> {
	let removed = registry.remove_plugins();
	debug!(message = "Removed plugin nodes", removed);

	if !dir.is_dir() {
		debug!(message = "Plugin directory does not exist", ?dir);
		return Vec::new();
	}

	let mut paths: BTreeSet<PathBuf> = BTreeSet::new();
	for entry in WalkDir::new(dir).max_depth(2).follow_links(true) {
		match entry {
			Ok(e) => {
				let p = e.path();
				if e.file_type().is_file() && p.extension().is_some_and(|x| x == "toml") {
					paths.insert(p.to_path_buf());
				}
			}
			Err(error) => warn!(message = "Could not read plugin directory entry", %error),
		}
	}

	let mut loaded = Vec::new();
	for path in paths {
		match register_plugin(registry, &path) {
			Ok(node_type) => {
				info!(message = "Loaded plugin node", node_type, ?path);
				loaded.push(node_type);
			}
			Err(error) => warn!(message = "Skipping invalid plugin", ?path, %error),
		}
	}

	return loaded;
}

//
// MARK: Command node
//

/// What a plugin command reads on stdin
#[derive(Debug, Serialize)]
pub struct PluginRequest<'a> {
	pub node_id: &'a NodeId,
	pub properties: BTreeMap<SmartString<LazyCompact>, PropertyValue>,
	pub input: &'a Dataset,
	pub wref: Option<&'a Dataset>,
}

/// What a plugin command writes on stdout
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginResponse {
	pub output: Dataset,
	#[serde(default)]
	pub wref_output: Option<Dataset>,
	#[serde(default)]
	pub labels: Option<Vec<String>>,
}

#[derive(Clone)]
struct CommandNodeBuilder {
	command: Arc<PathBuf>,
	args: Arc<Vec<String>>,
	workdir: Arc<PathBuf>,
}

impl CommandNodeBuilder {
	fn instance(&self) -> CommandNode {
		CommandNode {
			command: self.command.clone(),
			args: self.args.clone(),
			workdir: self.workdir.clone(),
		}
	}
}

/// Runs an external command as a processing step
pub struct CommandNode {
	command: Arc<PathBuf>,
	args: Arc<Vec<String>>,
	workdir: Arc<PathBuf>,
}

impl ProcessingNode for CommandNode {
	fn run(
		&mut self,
		ctx: &StepContext<'_>,
		properties: NodeProperties,
		input: StepInput,
	) -> Result<StepOutput, RunNodeError> {
		let request = PluginRequest {
			node_id: &ctx.node.id,
			properties: properties.into_inner(),
			input: &input.data,
			wref: input.wref.as_deref(),
		};
		let body = serde_json::to_vec(&request).map_err(|e| RunNodeError::BadInput {
			message: e.to_string(),
		})?;

		debug!(
			message = "Starting plugin command",
			node_id = %ctx.node.id,
			command = ?self.command
		);

		let mut child = Command::new(self.command.as_path())
			.args(self.args.iter())
			.current_dir(self.workdir.as_path())
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()?;

		// Write from another thread so a chatty command can't deadlock us
		let stdin = child.stdin.take();
		let writer = std::thread::spawn(move || -> std::io::Result<()> {
			if let Some(mut s) = stdin {
				s.write_all(&body)?;
			}
			Ok(())
		});

		let output = child.wait_with_output()?;
		match writer.join() {
			Ok(Ok(())) => {}
			Ok(Err(error)) => {
				// The command may legitimately exit without reading everything
				debug!(message = "Plugin command closed stdin early", %error);
			}
			Err(_) => {
				return Err(RunNodeError::BadCommandOutput {
					message: "stdin writer panicked".into(),
				})
			}
		}

		if !output.status.success() {
			return Err(RunNodeError::CommandFailed {
				status: output.status.to_string(),
				stderr: String::from_utf8_lossy(&output.stderr).trim().into(),
			});
		}

		let response: PluginResponse =
			serde_json::from_slice(&output.stdout).map_err(|e| RunNodeError::BadCommandOutput {
				message: e.to_string(),
			})?;

		return Ok(StepOutput {
			data: response.output,
			wref: response.wref_output,
			labels: response.labels,
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	fn write(dir: &Path, name: &str, text: &str) {
		fs::write(dir.join(name), text).unwrap();
	}

	#[test]
	fn reload() {
		let dir = tempfile::tempdir().unwrap();
		write(dir.path(), "scale.sh", "#!/bin/sh\ncat\n");
		write(
			dir.path(),
			"scale.toml",
			r#"
				node_type = "Scale"
				category = "other"
				command = "scale.sh"

				[properties.factor]
				type = "float"
				default = 2
				min = 0.0
			"#,
		);
		write(
			dir.path(),
			"broken.toml",
			r#"
				node_type = "Broken"
				category = "other"
				command = "missing.sh"
			"#,
		);
		write(
			dir.path(),
			"badprop.toml",
			r#"
				node_type = "BadProp"
				category = "apodization"
				command = "scale.sh"

				[properties.mode]
				type = "enum"
				default = "x"
				variants = ["a", "b"]
			"#,
		);

		let mut r = NodeRegistry::new();
		let loaded = reload_plugins(&mut r, dir.path());
		assert_eq!(loaded, vec!["Scale".to_owned()]);

		let d = r.descriptor("Scale").unwrap();
		assert_eq!(d.properties["factor"].default, PropertyValue::Float(2.0));
		assert!(matches!(r.origin("Scale"), Some(NodeOrigin::Plugin { .. })));

		// Reloading is idempotent
		let loaded = reload_plugins(&mut r, dir.path());
		assert_eq!(loaded.len(), 1);

		fs::remove_file(dir.path().join("scale.toml")).unwrap();
		assert!(reload_plugins(&mut r, dir.path()).is_empty());
		assert!(!r.has_node("Scale"));
	}

	#[test]
	fn missing_dir() {
		let mut r = NodeRegistry::new();
		assert!(reload_plugins(&mut r, Path::new("/nonexistent/plugins")).is_empty());
	}
}
