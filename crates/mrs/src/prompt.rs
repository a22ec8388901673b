//! Answers interaction requests on the terminal

use mrs_data::ManualAdjustment;
use mrs_pipeline::base::{
	AcceptDefaults, InteractionRequest, InteractionResponse, Interactor, PropertyError,
	PropertyType, PropertyValue,
};
use nu_ansi_term::Color;
use std::{
	collections::BTreeMap,
	io::{self, BufRead, Write},
	path::PathBuf,
};
use tracing::{debug, warn};

/// Something the foreground uses to answer a request from the worker
pub trait Responder {
	fn respond(&mut self, request: InteractionRequest) -> InteractionResponse;
}

/// Never asks. Used with `--yes`.
pub struct Unattended {}

impl Responder for Unattended {
	fn respond(&mut self, request: InteractionRequest) -> InteractionResponse {
		debug!(message = "Answering with defaults", kind = request.kind());
		return AcceptDefaults {}.request(request);
	}
}

/// Asks on `output` and reads answers from `input`.
/// End of input cancels.
pub struct Prompt<R: BufRead, W: Write> {
	input: R,
	output: W,
}

impl<R: BufRead, W: Write> Responder for Prompt<R, W> {
	fn respond(&mut self, request: InteractionRequest) -> InteractionResponse {
		let kind = request.kind();
		return match self.ask(request) {
			Ok(Some(x)) => x,
			Ok(None) => {
				debug!(message = "End of input, cancelling", kind);
				InteractionResponse::Cancel
			}
			Err(error) => {
				warn!(message = "Could not prompt, cancelling", kind, ?error);
				InteractionResponse::Cancel
			}
		};
	}
}

impl<R: BufRead, W: Write> Prompt<R, W> {
	pub fn new(input: R, output: W) -> Self {
		Self { input, output }
	}

	/// Print `question` and read one trimmed line.
	/// `None` at end of input.
	pub fn line(&mut self, question: &str) -> io::Result<Option<String>> {
		write!(self.output, "{} ", Color::Cyan.paint(question))?;
		self.output.flush()?;

		let mut s = String::new();
		if self.input.read_line(&mut s)? == 0 {
			return Ok(None);
		}
		return Ok(Some(s.trim().to_owned()));
	}

	fn ask(&mut self, request: InteractionRequest) -> io::Result<Option<InteractionResponse>> {
		match request {
			InteractionRequest::ConfirmBasisSet { path } => {
				writeln!(self.output, "Found default basis set {}", path.display())?;
				loop {
					let answer = match self.line("Use it? [Y/n/c]")? {
						Some(x) => x.to_lowercase(),
						None => return Ok(None),
					};
					match answer.as_str() {
						"" | "y" | "yes" => return Ok(Some(InteractionResponse::Yes)),
						"n" | "no" => return Ok(Some(InteractionResponse::No)),
						"c" | "cancel" => return Ok(Some(InteractionResponse::Cancel)),
						_ => continue,
					}
				}
			}

			InteractionRequest::SelectBasisSet { reason } => {
				writeln!(self.output, "{}", Color::Yellow.paint(reason))?;
				let answer = match self.line("Path to a basis set (empty for none):")? {
					Some(x) => x,
					None => return Ok(None),
				};
				let path = (!answer.is_empty()).then(|| PathBuf::from(answer));
				return Ok(Some(InteractionResponse::Path(path)));
			}

			InteractionRequest::OfferManualAdjustment { current } => {
				writeln!(
					self.output,
					"Manual adjustment, currently {} ppm, {} deg, {} deg/ppm",
					current.frequency, current.phase0, current.phase1
				)?;
				loop {
					let answer = match self
						.line("Frequency, zero-order and first-order phase (empty to skip, c to cancel):")?
					{
						Some(x) => x,
						None => return Ok(None),
					};

					match answer.as_str() {
						"" => return Ok(Some(InteractionResponse::Adjustment(None))),
						"c" | "cancel" => return Ok(Some(InteractionResponse::Cancel)),
						_ => {}
					}

					match parse_adjustment(&answer) {
						Some(a) => match a.validate() {
							Ok(()) => return Ok(Some(InteractionResponse::Adjustment(Some(a)))),
							Err(error) => {
								writeln!(self.output, "{}", Color::Red.paint(error.to_string()))?
							}
						},
						None => writeln!(self.output, "{}", Color::Red.paint("Expected three numbers"))?,
					}
				}
			}

			InteractionRequest::Confirm { node, message } => {
				let answer = match self.line(&format!("[{node}] {message} [y/N/c]"))? {
					Some(x) => x.to_lowercase(),
					None => return Ok(None),
				};
				return Ok(Some(match answer.as_str() {
					"y" | "yes" => InteractionResponse::Yes,
					"c" | "cancel" => InteractionResponse::Cancel,
					_ => InteractionResponse::No,
				}));
			}

			InteractionRequest::Properties {
				node,
				message,
				fields,
			} => {
				writeln!(self.output, "[{node}] {message}")?;
				let mut values = BTreeMap::new();
				for (name, spec) in fields {
					loop {
						let question = format!(
							"{name} ({}, default {}):",
							spec.property_type.name(),
							spec.default
						);
						let answer = match self.line(&question)? {
							Some(x) => x,
							None => return Ok(None),
						};

						if answer.is_empty() {
							values.insert(name.clone(), spec.default.clone());
							break;
						}

						match parse_value(&spec.property_type, &answer) {
							Ok(v) => {
								values.insert(name.clone(), v);
								break;
							}
							Err(error) => {
								writeln!(self.output, "{}", Color::Red.paint(error.to_string()))?
							}
						}
					}
				}
				return Ok(Some(InteractionResponse::Properties(Some(values))));
			}
		}
	}
}

/// Three whitespace-separated numbers
fn parse_adjustment(s: &str) -> Option<ManualAdjustment> {
	let mut parts = s.split_whitespace().map(|x| x.parse::<f64>().ok());
	let a = ManualAdjustment {
		frequency: parts.next()??,
		phase0: parts.next()??,
		phase1: parts.next()??,
	};
	if parts.next().is_some() {
		return None;
	}
	return Some(a);
}

/// Parse a typed-in property value
fn parse_value(t: &PropertyType, s: &str) -> Result<PropertyValue, PropertyError> {
	let wrong = || PropertyError::WrongType { expected: t.name() };

	let value = match t {
		PropertyType::Boolean => match s.to_lowercase().as_str() {
			"true" | "yes" | "y" | "1" => PropertyValue::Boolean(true),
			"false" | "no" | "n" | "0" => PropertyValue::Boolean(false),
			_ => return Err(wrong()),
		},
		PropertyType::Integer { .. } => PropertyValue::Integer(s.parse().ok().ok_or_else(wrong)?),
		PropertyType::Float { .. } => PropertyValue::Float(s.parse().ok().ok_or_else(wrong)?),
		PropertyType::String | PropertyType::Enum { .. } => PropertyValue::String(s.into()),
	};

	return t.coerce(value);
}

#[cfg(test)]
mod tests {
	use super::*;
	use mrs_pipeline::base::{NodeId, PropertySpec};
	use rstest::rstest;
	use std::io::Cursor;

	fn prompt(input: &str) -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
		Prompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
	}

	#[rstest]
	#[case("\n", InteractionResponse::Yes)]
	#[case("huh\nn\n", InteractionResponse::No)]
	#[case("c\n", InteractionResponse::Cancel)]
	#[case("", InteractionResponse::Cancel)]
	fn confirm_basis(#[case] input: &str, #[case] expected: InteractionResponse) {
		let r = prompt(input).respond(InteractionRequest::ConfirmBasisSet {
			path: "3T_PRESS_TE30ms.BASIS".into(),
		});
		assert_eq!(r, expected);
	}

	#[test]
	fn select_basis() {
		let request = || InteractionRequest::SelectBasisSet {
			reason: "none found".into(),
		};
		assert_eq!(
			prompt("my.BASIS\n").respond(request()),
			InteractionResponse::Path(Some("my.BASIS".into()))
		);
		assert_eq!(prompt("\n").respond(request()), InteractionResponse::Path(None));
	}

	#[test]
	fn adjustment() {
		let request = || InteractionRequest::OfferManualAdjustment {
			current: ManualAdjustment::default(),
		};

		// Out of range and malformed answers ask again
		let r = prompt("20 0 0\n1 2\n0.1 -5 3\n").respond(request());
		assert_eq!(
			r,
			InteractionResponse::Adjustment(Some(ManualAdjustment {
				frequency: 0.1,
				phase0: -5.0,
				phase1: 3.0,
			}))
		);

		assert_eq!(
			prompt("\n").respond(request()),
			InteractionResponse::Adjustment(None)
		);
		assert_eq!(prompt("c\n").respond(request()), InteractionResponse::Cancel);
	}

	#[test]
	fn properties() {
		let mut fields = BTreeMap::new();
		fields.insert(
			"phase0".into(),
			PropertySpec::new(
				PropertyType::Float {
					min: Some(-180.0),
					max: Some(180.0),
				},
				PropertyValue::Float(0.0),
				"Zero-order phase",
			)
			.unwrap(),
		);
		fields.insert(
			"scale".into(),
			PropertySpec::new(
				PropertyType::Integer {
					min: None,
					max: None,
				},
				PropertyValue::Integer(1),
				"Scale",
			)
			.unwrap(),
		);

		// phase0 is retried after an out-of-range value, scale keeps its default
		let r = prompt("400\n45\n\n").respond(InteractionRequest::Properties {
			node: NodeId::new("n0"),
			message: "Phase".into(),
			fields,
		});

		let mut expected = BTreeMap::new();
		expected.insert("phase0".into(), PropertyValue::Float(45.0));
		expected.insert("scale".into(), PropertyValue::Integer(1));
		assert_eq!(r, InteractionResponse::Properties(Some(expected)));
	}

	#[rstest]
	#[case(PropertyType::Boolean, "yes", Some(PropertyValue::Boolean(true)))]
	#[case(PropertyType::Boolean, "maybe", None)]
	#[case(PropertyType::Integer { min: Some(0), max: None }, "-1", None)]
	#[case(PropertyType::Float { min: None, max: None }, "1.5", Some(PropertyValue::Float(1.5)))]
	#[case(PropertyType::String, "abc", Some(PropertyValue::String("abc".into())))]
	fn values(#[case] t: PropertyType, #[case] s: &str, #[case] expected: Option<PropertyValue>) {
		assert_eq!(parse_value(&t, s).ok(), expected);
	}
}
