use smartstring::{LazyCompact, SmartString};
use std::collections::BTreeMap;

use crate::base::{PropertyValue, RunNodeError};

/// The properties handed to one node run.
/// Nodes pop what they use and then call [`NodeProperties::err_if_not_empty`].
#[derive(Debug, Clone, Default)]
pub struct NodeProperties {
	props: BTreeMap<SmartString<LazyCompact>, PropertyValue>,
}

impl From<BTreeMap<SmartString<LazyCompact>, PropertyValue>> for NodeProperties {
	fn from(value: BTreeMap<SmartString<LazyCompact>, PropertyValue>) -> Self {
		Self::new(value)
	}
}

impl NodeProperties {
	pub fn new(props: BTreeMap<SmartString<LazyCompact>, PropertyValue>) -> Self {
		Self { props }
	}

	/// Return `Err(RunNodeError::UnexpectedProperty)` if we still have unhandled properties.
	/// Otherwise, return `Ok(())`.
	pub fn err_if_not_empty(self) -> Result<(), RunNodeError> {
		if let Some((property, _)) = self.props.first_key_value() {
			return Err(RunNodeError::UnexpectedProperty {
				property: property.clone(),
			});
		}

		return Ok(());
	}

	pub fn into_inner(self) -> BTreeMap<SmartString<LazyCompact>, PropertyValue> {
		self.props
	}
}

impl NodeProperties {
	pub fn pop_val(&mut self, property: &str) -> Result<PropertyValue, RunNodeError> {
		return self
			.props
			.remove(property)
			.ok_or_else(|| RunNodeError::MissingProperty {
				property: property.into(),
			});
	}

	pub fn pop_bool(&mut self, property: &str) -> Result<bool, RunNodeError> {
		match self.pop_val(property)? {
			PropertyValue::Boolean(x) => return Ok(x),
			_ => {
				return Err(RunNodeError::BadPropertyType {
					property: property.into(),
				})
			}
		}
	}

	pub fn pop_int(&mut self, property: &str) -> Result<i64, RunNodeError> {
		match self.pop_val(property)? {
			PropertyValue::Integer(x) => return Ok(x),
			_ => {
				return Err(RunNodeError::BadPropertyType {
					property: property.into(),
				})
			}
		}
	}

	/// Integers are accepted where floats are expected
	pub fn pop_float(&mut self, property: &str) -> Result<f64, RunNodeError> {
		match self.pop_val(property)? {
			PropertyValue::Float(x) => return Ok(x),
			PropertyValue::Integer(x) => return Ok(x as f64),
			_ => {
				return Err(RunNodeError::BadPropertyType {
					property: property.into(),
				})
			}
		}
	}

	pub fn pop_str(&mut self, property: &str) -> Result<SmartString<LazyCompact>, RunNodeError> {
		match self.pop_val(property)? {
			PropertyValue::String(x) => return Ok(x),
			_ => {
				return Err(RunNodeError::BadPropertyType {
					property: property.into(),
				})
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pop() {
		let mut p = NodeProperties::new(BTreeMap::from([
			("a".into(), PropertyValue::Integer(3)),
			("b".into(), PropertyValue::Boolean(true)),
			("c".into(), PropertyValue::String("x".into())),
		]));

		assert_eq!(p.pop_float("a").unwrap(), 3.0);
		assert!(matches!(
			p.pop_int("b"),
			Err(RunNodeError::BadPropertyType { .. })
		));
		assert!(matches!(
			p.pop_int("b"),
			Err(RunNodeError::MissingProperty { .. })
		));
		assert!(matches!(
			p.clone().err_if_not_empty(),
			Err(RunNodeError::UnexpectedProperty { .. })
		));
		assert_eq!(p.pop_str("c").unwrap(), "x");
		assert!(p.err_if_not_empty().is_ok());
	}
}
