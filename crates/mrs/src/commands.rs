use crossbeam::channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use mrs_data::LoaderSet;
use mrs_engine::{
	batch::{create_batch, run_batch},
	context::{DriveMode, EngineState, RunContext, RunInputs},
	engine::Engine,
	settings::EngineSettings,
	worker::{interaction_channel, PendingInteraction, Worker},
};
use mrs_pipeline::{
	base::{NodeOrigin, NodeRegistry},
	definition::PipelineDefinition,
	graph::PipelineGraph,
};
use nu_ansi_term::Color;
use std::{
	io::{stdin, stdout},
	path::{Path, PathBuf},
	sync::Arc,
};
use tracing::{info, warn};

use crate::{
	drive::{cancel_on_interrupt, drive, Suspended},
	errors::CliError,
	prompt::{Prompt, Responder, Unattended},
};

/// Everything `mrs run` takes
#[derive(Debug)]
pub struct RunArgs {
	pub pipeline: PathBuf,
	pub inputs: Vec<PathBuf>,
	pub water: Vec<PathBuf>,
	pub segmentation: Vec<PathBuf>,
	pub basis: Option<PathBuf>,
	pub control: Option<PathBuf>,
	pub output: Option<PathBuf>,
	pub manual: bool,
	pub yes: bool,
}

fn load_pipeline(
	registry: &Arc<NodeRegistry>,
	path: &Path,
) -> Result<(PipelineGraph, PipelineDefinition), CliError> {
	let definition = PipelineDefinition::read(path)?;
	let graph = PipelineGraph::deserialize(registry.clone(), &definition)?;
	return Ok((graph, definition));
}

fn responder(yes: bool) -> Box<dyn Responder> {
	if yes {
		Box::new(Unattended {})
	} else {
		Box::new(Prompt::new(stdin().lock(), stdout()))
	}
}

fn print_summary(ctx: &RunContext) {
	let output = ctx
		.output_dir()
		.map(|x| x.display().to_string())
		.unwrap_or_default();

	match ctx.report() {
		Some(report) if report.is_success() => println!(
			"{} fitted {} voxel(s), results in {}",
			Color::Green.bold().paint("Done:"),
			report.completed.len(),
			output
		),
		Some(report) => {
			println!(
				"{} fitted {} voxel(s), {} failed, results in {}",
				Color::Yellow.bold().paint("Done:"),
				report.completed.len(),
				report.failed.len(),
				output
			);
			for failure in &report.failed {
				println!("  {} {}", Color::Red.paint(&failure.label), failure.error);
			}
		}
		None => println!("{} results in {}", Color::Green.bold().paint("Done:"), output),
	}
}

/// Process and fit one dataset
pub fn run(
	registry: Arc<NodeRegistry>,
	settings: EngineSettings,
	args: RunArgs,
) -> Result<(), CliError> {
	let (graph, definition) = load_pipeline(&registry, &args.pipeline)?;
	let chain = graph.linearize()?;
	info!(
		message = "Loaded pipeline",
		pipeline = ?args.pipeline,
		steps = chain.len()
	);

	let inputs = RunInputs {
		files: args.inputs,
		water: args.water,
		segmentation: args.segmentation,
		basis: args.basis,
		control: args.control,
		output_dir: args.output,
	};

	let mode = if args.manual {
		DriveMode::Manual
	} else {
		DriveMode::Continuous
	};

	let mut ctx = RunContext::from_chain(chain, definition, inputs, mode);
	let (interactor, requests) = interaction_channel();
	let mut engine = Engine::new(
		registry,
		Arc::new(LoaderSet::new()),
		settings,
		Arc::new(interactor),
	);
	let worker = Worker::new();
	cancel_on_interrupt(&worker);

	if args.manual {
		return run_manual(engine, ctx, &worker, &requests);
	}

	let mut responder = responder(args.yes);
	let (ctx, result) = drive(&worker, &requests, &mut *responder, move |cancel| {
		let r = engine.run_continuous(&mut ctx, cancel);
		(ctx, r)
	})?;

	result?;
	print_summary(&ctx);
	return Ok(());
}

/// Tick the engine once per user command
fn run_manual(
	mut engine: Engine,
	mut ctx: RunContext,
	worker: &Worker,
	requests: &Receiver<PendingInteraction>,
) -> Result<(), CliError> {
	let mut prompt = Prompt::new(stdin().lock(), stdout());

	loop {
		let state = ctx.state();
		let step = match state {
			EngineState::Stepping(i) => ctx
				.chain()
				.get(i)
				.map(|n| format!(" {} ({})", n.id, n.node_type))
				.unwrap_or_default(),
			_ => String::new(),
		};
		println!(
			"{}{step}, {} snapshot(s)",
			Color::Green.paint(state.name()),
			ctx.history().len()
		);

		if state == EngineState::Complete {
			print_summary(&ctx);
			return Ok(());
		}

		let command = match prompt.line("[Enter] tick, b <step> roll back, r reset, q quit:")? {
			Some(x) => x,
			None => return Ok(()),
		};
		let mut words = command.split_whitespace();

		match (words.next(), words.next()) {
			(None, _) => {
				if state == EngineState::Failed {
					println!("{}", Color::Red.paint("Run failed. Roll back or reset first."));
					continue;
				}

				let (e, c, result) = drive(worker, requests, &mut prompt, move |_| {
					let r = engine.tick(&mut ctx);
					(engine, ctx, r)
				})?;
				engine = e;
				ctx = c;

				if let Err(error) = result {
					warn!(message = "Tick failed", stage = state.name(), ?error);
					println!("{} {error}", Color::Red.paint("Error:"));
				}
			}

			(Some("b"), Some(step)) => match step.parse::<usize>() {
				Ok(step) if ctx.rollback(step) => {}
				_ => println!("{}", Color::Red.paint("No such snapshot")),
			},

			(Some("r"), None) => ctx.reset(),
			(Some("q"), None) => return Ok(()),
			_ => println!("{}", Color::Red.paint("Unknown command")),
		}
	}
}

/// Run a pipeline over every subject in a study folder
pub fn batch(
	registry: Arc<NodeRegistry>,
	settings: EngineSettings,
	pipeline: &Path,
	study: PathBuf,
	yes: bool,
) -> Result<(), CliError> {
	let (graph, _) = load_pipeline(&registry, pipeline)?;
	let (interactor, requests) = interaction_channel();
	let mut engine = Engine::new(
		registry,
		Arc::new(LoaderSet::new()),
		settings,
		Arc::new(interactor),
	);

	let bar = ProgressBar::new(0);
	if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan} {pos}/{len} {msg}") {
		bar.set_style(style);
	}

	let job_bar = bar.clone();
	let mut responder = responder(yes);
	let mut responder = Suspended {
		bar: &bar,
		inner: &mut *responder,
	};

	let worker = Worker::new();
	cancel_on_interrupt(&worker);
	let report = drive(&worker, &requests, &mut responder, move |cancel| {
		run_batch(&mut engine, &graph, &study, cancel, |i, n, name| {
			job_bar.set_length(n as u64);
			job_bar.set_position(i as u64);
			job_bar.set_message(name.to_owned());
		})
	})??;
	bar.finish_and_clear();

	println!(
		"{} {} completed, {} skipped, {} failed, results in {}",
		Color::Green.bold().paint("Batch done:"),
		report.completed.len(),
		report.skipped.len(),
		report.failed.len(),
		report.output.display()
	);
	for (subject, error) in &report.failed {
		println!("  {} {error}", Color::Red.paint(subject));
	}
	return Ok(());
}

pub fn scaffold(study: &Path, participants: usize) -> Result<(), CliError> {
	let made = create_batch(study, participants)?;
	println!(
		"{} {} participant folder(s) in {}",
		Color::Green.bold().paint("Created"),
		made.len(),
		study.display()
	);
	return Ok(());
}

/// Print every registered node type
pub fn list_nodes(registry: &NodeRegistry) {
	for (node_type, descriptor, origin) in registry.iter() {
		let origin = match origin {
			NodeOrigin::BuiltIn => Color::DarkGray.paint("built-in"),
			NodeOrigin::Plugin { .. } => Color::Purple.paint("plugin"),
		};
		println!(
			"{} {} [{}] {}",
			Color::Cyan.bold().paint(node_type),
			origin,
			descriptor.category,
			descriptor.description
		);
		for (name, spec) in &descriptor.properties {
			println!(
				"    {name}: {} = {}",
				spec.property_type.name(),
				spec.default
			);
		}
	}
}

/// Print the steps a pipeline runs, in order
pub fn show_pipeline(registry: &Arc<NodeRegistry>, path: &Path) -> Result<(), CliError> {
	let (graph, definition) = load_pipeline(registry, path)?;
	let chain = graph.linearize()?;

	println!("{}", Color::Cyan.bold().paint(path.display().to_string()));
	for (i, node) in chain.iter().enumerate() {
		let properties = node
			.properties
			.iter()
			.map(|(k, v)| format!("{k}={v}"))
			.collect::<Vec<_>>()
			.join(", ");
		println!(
			"{:>3}. {} {} {}",
			i + 1,
			node.id,
			Color::Green.paint(node.node_type.as_str()),
			Color::DarkGray.paint(properties)
		);
	}

	if let Some(a) = definition.adjustment {
		println!("Stored manual adjustment:\n{}", a.report());
	}
	return Ok(());
}
