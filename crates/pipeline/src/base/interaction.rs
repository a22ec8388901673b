//! Blocking requests a running step can make of the user.
//!
//! A step never talks to a presentation layer directly. It hands an
//! [`InteractionRequest`] to an [`Interactor`] and blocks until it gets
//! an [`InteractionResponse`] back.

use mrs_data::ManualAdjustment;
use smartstring::{LazyCompact, SmartString};
use std::{collections::BTreeMap, path::PathBuf};

use super::{NodeId, PropertySpec, PropertyValue};

#[derive(Debug, Clone)]
pub enum InteractionRequest {
	/// A default basis set was found. Use it?
	/// Answer with `Yes`, `No` (pick another) or `Cancel` (abort the run).
	ConfirmBasisSet { path: PathBuf },

	/// No usable basis set was found. Answer with `Path`.
	SelectBasisSet { reason: String },

	/// The final result may be aligned by hand before fitting.
	/// Answer with `Adjustment`; `None` declines.
	OfferManualAdjustment { current: ManualAdjustment },

	/// A node asks a yes/no question
	Confirm { node: NodeId, message: String },

	/// A node asks for parameter values. Answer with `Properties`.
	Properties {
		node: NodeId,
		message: String,
		fields: BTreeMap<SmartString<LazyCompact>, PropertySpec>,
	},
}

impl InteractionRequest {
	/// A short name for logs
	pub fn kind(&self) -> &'static str {
		match self {
			Self::ConfirmBasisSet { .. } => "ConfirmBasisSet",
			Self::SelectBasisSet { .. } => "SelectBasisSet",
			Self::OfferManualAdjustment { .. } => "OfferManualAdjustment",
			Self::Confirm { .. } => "Confirm",
			Self::Properties { .. } => "Properties",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionResponse {
	Yes,
	No,
	Cancel,
	Path(Option<PathBuf>),
	Adjustment(Option<ManualAdjustment>),
	Properties(Option<BTreeMap<SmartString<LazyCompact>, PropertyValue>>),
}

/// Resolves interaction requests. Calls block until the answer is known.
pub trait Interactor: Send + Sync {
	fn request(&self, request: InteractionRequest) -> InteractionResponse;
}

/// Answers every request without asking anyone:
/// confirms, declines adjustments and keeps defaults.
pub struct AcceptDefaults {}

impl Interactor for AcceptDefaults {
	fn request(&self, request: InteractionRequest) -> InteractionResponse {
		match request {
			InteractionRequest::ConfirmBasisSet { .. } => InteractionResponse::Yes,
			InteractionRequest::SelectBasisSet { .. } => InteractionResponse::Path(None),
			InteractionRequest::OfferManualAdjustment { .. } => {
				InteractionResponse::Adjustment(None)
			}
			InteractionRequest::Confirm { .. } => InteractionResponse::Yes,
			InteractionRequest::Properties { .. } => InteractionResponse::Properties(None),
		}
	}
}
