use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::{collections::BTreeSet, fmt::Display};
use thiserror::Error;

/// The types of node properties we accept
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
	/// A yes or a no
	Boolean,

	/// An integer, optionally bounded (inclusive)
	Integer { min: Option<i64>, max: Option<i64> },

	/// A float, optionally bounded (inclusive)
	Float { min: Option<f64>, max: Option<f64> },

	/// A plain string
	String,

	/// One of many predefined strings
	Enum {
		/// The values this enum can take
		variants: BTreeSet<SmartString<LazyCompact>>,
	},
}

/// The value of a node property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "property_type", content = "value")]
pub enum PropertyValue {
	/// A yes or a no
	Boolean(bool),

	/// An integer
	Integer(i64),

	/// A float
	Float(f64),

	/// A plain string. This is used to carry the value of both
	/// `String` and `Enum` types.
	String(SmartString<LazyCompact>),
}

impl Display for PropertyValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Boolean(x) => write!(f, "{x}"),
			Self::Integer(x) => write!(f, "{x}"),
			Self::Float(x) => write!(f, "{x}"),
			Self::String(x) => write!(f, "{x}"),
		}
	}
}

/// Why a property value does not fit its type
#[derive(Debug, Error, PartialEq)]
pub enum PropertyError {
	#[error("expected a {expected} value")]
	WrongType { expected: &'static str },

	#[error("value {value} is out of range")]
	OutOfRange { value: String },

	#[error("`{value}` is not one of the allowed values")]
	NotAVariant { value: SmartString<LazyCompact> },
}

impl PropertyType {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Boolean => "boolean",
			Self::Integer { .. } => "integer",
			Self::Float { .. } => "float",
			Self::String => "string",
			Self::Enum { .. } => "enum",
		}
	}

	/// Check `value` against this type, converting integers to floats
	/// where a float is expected.
	pub fn coerce(&self, value: PropertyValue) -> Result<PropertyValue, PropertyError> {
		let wrong = || PropertyError::WrongType {
			expected: self.name(),
		};

		match (self, value) {
			(Self::Boolean, v @ PropertyValue::Boolean(_)) => return Ok(v),
			(Self::String, v @ PropertyValue::String(_)) => return Ok(v),

			(Self::Integer { min, max }, PropertyValue::Integer(x)) => {
				if min.is_some_and(|m| x < m) || max.is_some_and(|m| x > m) {
					return Err(PropertyError::OutOfRange {
						value: x.to_string(),
					});
				}
				return Ok(PropertyValue::Integer(x));
			}

			(Self::Float { min, max }, PropertyValue::Float(x)) => {
				if !x.is_finite() || min.is_some_and(|m| x < m) || max.is_some_and(|m| x > m) {
					return Err(PropertyError::OutOfRange {
						value: x.to_string(),
					});
				}
				return Ok(PropertyValue::Float(x));
			}

			(t @ Self::Float { .. }, PropertyValue::Integer(x)) => {
				return t.coerce(PropertyValue::Float(x as f64))
			}

			(Self::Enum { variants }, PropertyValue::String(s)) => {
				if !variants.contains(&s) {
					return Err(PropertyError::NotAVariant { value: s });
				}
				return Ok(PropertyValue::String(s));
			}

			_ => return Err(wrong()),
		}
	}
}

/// A description of one property a node accepts
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
	pub property_type: PropertyType,

	/// The value a new node starts with
	pub default: PropertyValue,

	pub description: String,
}

impl PropertySpec {
	/// Make a new spec, checking that `default` fits `property_type`.
	pub fn new(
		property_type: PropertyType,
		default: PropertyValue,
		description: &str,
	) -> Result<Self, PropertyError> {
		let default = property_type.coerce(default)?;
		return Ok(Self {
			property_type,
			default,
			description: description.into(),
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn coerce() {
		let t = PropertyType::Float {
			min: Some(-180.0),
			max: Some(180.0),
		};
		assert_eq!(
			t.coerce(PropertyValue::Integer(90)),
			Ok(PropertyValue::Float(90.0))
		);
		assert!(matches!(
			t.coerce(PropertyValue::Float(200.0)),
			Err(PropertyError::OutOfRange { .. })
		));
		assert!(matches!(
			t.coerce(PropertyValue::Boolean(true)),
			Err(PropertyError::WrongType { expected: "float" })
		));

		let t = PropertyType::Enum {
			variants: ["mean", "median"].into_iter().map(Into::into).collect(),
		};
		assert!(t.coerce(PropertyValue::String("mean".into())).is_ok());
		assert!(matches!(
			t.coerce(PropertyValue::String("max".into())),
			Err(PropertyError::NotAVariant { .. })
		));
	}

	#[test]
	fn tagged_json() {
		let v: PropertyValue =
			serde_json::from_str(r#"{"property_type": "Float", "value": 1.5}"#).unwrap();
		assert_eq!(v, PropertyValue::Float(1.5));
	}
}
