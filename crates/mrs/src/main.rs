use clap::{Parser, Subcommand};
use commands::RunArgs;
use config::MrsConfig;
use mrs_pipeline::{base::NodeRegistry, plugin::reload_plugins};
use mrs_util::{load_env, logging::LoggingPreset, LoadedEnv};
use std::{path::PathBuf, process::exit, sync::Arc};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod drive;
mod errors;
mod prompt;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	/// Process and fit one dataset
	Run {
		/// The pipeline to run
		#[arg(long)]
		pipeline: PathBuf,

		/// Water reference file. Only the first one is used.
		#[arg(long)]
		water: Vec<PathBuf>,

		/// Segmentation images (wm, gm and csf)
		#[arg(long)]
		segmentation: Vec<PathBuf>,

		#[arg(long)]
		basis: Option<PathBuf>,

		#[arg(long)]
		control: Option<PathBuf>,

		/// Write results here instead of a new folder in the output directory
		#[arg(long)]
		output: Option<PathBuf>,

		/// Advance one step at a time
		#[arg(long, conflicts_with = "yes")]
		manual: bool,

		/// Accept every default without asking
		#[arg(long)]
		yes: bool,

		/// Save every step's signals
		#[arg(long)]
		save_steps: bool,

		/// Metabolite data files
		#[arg(required = true)]
		inputs: Vec<PathBuf>,
	},

	/// Run a pipeline over every participant folder in a study
	Batch {
		#[arg(long)]
		pipeline: PathBuf,

		#[arg(long)]
		study: PathBuf,

		#[arg(long)]
		yes: bool,
	},

	/// Create an empty study folder
	CreateBatch {
		#[arg(long)]
		study: PathBuf,

		#[arg(long, default_value_t = 1)]
		participants: usize,
	},

	/// List every node type, including plugins
	Nodes,

	Pipeline {
		#[command(subcommand)]
		command: PipelineCommands,
	},
}

#[derive(Debug, Subcommand)]
enum PipelineCommands {
	/// Print the steps a pipeline runs
	Show { file: PathBuf },
}

/// Built-in nodes, then every plugin in `plugin_dir`
fn make_registry(config: &MrsConfig) -> NodeRegistry {
	let mut registry = NodeRegistry::new();
	if let Err(error) = mrs_nodes::register(&mut registry) {
		error!(message = "Could not register built-in nodes", ?error);
		exit(1);
	}

	let plugins = reload_plugins(&mut registry, &config.mrs_plugin_dir);
	debug!(
		message = "Loaded plugins",
		dir = ?config.mrs_plugin_dir,
		count = plugins.len()
	);
	return registry;
}

fn main() {
	let cli = Args::parse();

	let loaded = match load_env::<MrsConfig>() {
		Ok(x) => x,
		Err(error) => {
			tracing_subscriber::fmt()
				.with_env_filter(EnvFilter::from(LoggingPreset::Default.get_config()))
				.without_time()
				.with_ansi(true)
				.init();
			error!(message = "Could not load configuration", ?error);
			exit(1);
		}
	};

	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from(
			loaded.get_config().mrs_loglevel.get_config(),
		))
		.without_time()
		.with_ansi(true)
		.init();

	match &loaded {
		LoadedEnv::FoundFile { path, .. } => {
			debug!(message = "Loaded config from .env", ?path)
		}
		LoadedEnv::OnlyVars(_) => {
			debug!(message = "No `.env` found, loaded config from environment")
		}
	}
	let config = loaded.into_config();
	debug!(message = "Configuration", ?config);

	let mut settings = config.engine_settings();
	let registry = Arc::new(make_registry(&config));

	let result = match cli.command {
		Commands::Run {
			pipeline,
			water,
			segmentation,
			basis,
			control,
			output,
			manual,
			yes,
			save_steps,
			inputs,
		} => {
			settings.save_step_data |= save_steps;
			commands::run(
				registry,
				settings,
				RunArgs {
					pipeline,
					inputs,
					water,
					segmentation,
					basis,
					control,
					output,
					manual,
					yes,
				},
			)
		}

		Commands::Batch {
			pipeline,
			study,
			yes,
		} => commands::batch(registry, settings, &pipeline, study, yes),

		Commands::CreateBatch {
			study,
			participants,
		} => commands::scaffold(&study, participants),

		Commands::Nodes => {
			commands::list_nodes(&registry);
			Ok(())
		}

		Commands::Pipeline {
			command: PipelineCommands::Show { file },
		} => commands::show_pipeline(&registry, &file),
	};

	match result {
		Ok(()) => info!(message = "Done"),
		Err(error) => {
			error!(message = "mrs failed", %error, ?error);
			exit(1);
		}
	}
}
