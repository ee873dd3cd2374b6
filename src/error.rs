use std::io;

use thiserror::Error;

use crate::instruction::InstructionSetKind;

/// The OS refused to bind the calling thread to a core
#[derive(Debug, Error)]
#[error("failed to pin thread to core {core_id}: {source}")]
pub struct PinError {
	pub core_id: usize,
	#[source]
	pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum BenchError {
	#[error("the CPU does not support {} instructions", .kind.name())]
	UnsupportedInstructionSet { kind: InstructionSetKind },

	#[error(transparent)]
	PinFailure(#[from] PinError),

	#[error("no frequency measurements were taken on core {core_id}")]
	NoSamplesCollected { core_id: usize },

	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),

	#[error("failed to write progress: {0}")]
	Output(#[from] io::Error),
}

impl BenchError {
	pub fn invalid(message: impl Into<String>) -> Self {
		BenchError::InvalidConfiguration(message.into())
	}
}
