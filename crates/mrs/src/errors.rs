use mrs_engine::errors::{BatchError, RunError, WorkerError};
use mrs_pipeline::{definition::DefinitionError, graph::GraphError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("could not read pipeline")]
	Definition(#[from] DefinitionError),

	#[error("invalid pipeline")]
	Graph(#[from] GraphError),

	#[error("run failed")]
	Run(#[from] RunError),

	#[error("batch failed")]
	Batch(#[from] BatchError),

	#[error("could not start worker")]
	Worker(#[from] WorkerError),

	#[error("worker thread panicked")]
	WorkerPanicked,

	#[error("i/o error")]
	Io(#[from] std::io::Error),
}
