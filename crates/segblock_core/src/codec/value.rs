use crate::codec::DataBlock;

/// Decoded field value.
///
/// Floats compare by bit pattern, so a decoded NaN equals itself.
#[derive(Debug, Clone)]
pub enum Value {
	/// Signed integer, sign-extended from its declared width.
	I64(i64),
	/// Unsigned integer, zero-extended from its declared width.
	U64(u64),
	/// Single precision float.
	F32(f32),
	/// Double precision float.
	F64(f64),
	/// Raw on-disk pointer, segment tag included.
	Ptr(u32),
	/// Array elements in storage order.
	Array(Vec<Value>),
	/// Inline nested record.
	Block(DataBlock),
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::I64(a), Self::I64(b)) => a == b,
			(Self::U64(a), Self::U64(b)) => a == b,
			(Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
			(Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
			(Self::Ptr(a), Self::Ptr(b)) => a == b,
			(Self::Array(a), Self::Array(b)) => a == b,
			(Self::Block(a), Self::Block(b)) => a == b,
			_ => false,
		}
	}
}

impl Value {
	/// Short label of the value kind, used in diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::I64(_) => "i64",
			Self::U64(_) => "u64",
			Self::F32(_) => "f32",
			Self::F64(_) => "f64",
			Self::Ptr(_) => "ptr",
			Self::Array(_) => "array",
			Self::Block(_) => "block",
		}
	}

	/// Integer view of scalar integer and pointer values.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::I64(v) => Some(*v),
			Self::U64(v) => i64::try_from(*v).ok(),
			Self::Ptr(v) => Some(i64::from(*v)),
			_ => None,
		}
	}

	/// Unsigned view of scalar integer and pointer values.
	pub fn as_u64(&self) -> Option<u64> {
		match self {
			Self::I64(v) => u64::try_from(*v).ok(),
			Self::U64(v) => Some(*v),
			Self::Ptr(v) => Some(u64::from(*v)),
			_ => None,
		}
	}

	/// Raw pointer value.
	pub fn as_ptr(&self) -> Option<u32> {
		match self {
			Self::Ptr(v) => Some(*v),
			_ => None,
		}
	}

	/// Array elements.
	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Self::Array(items) => Some(items),
			_ => None,
		}
	}

	/// Nested record.
	pub fn as_block(&self) -> Option<&DataBlock> {
		match self {
			Self::Block(block) => Some(block),
			_ => None,
		}
	}

	/// Mutable nested record.
	pub fn as_block_mut(&mut self) -> Option<&mut DataBlock> {
		match self {
			Self::Block(block) => Some(block),
			_ => None,
		}
	}
}

/// One named field of a [`DataBlock`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
	/// Declared field name (`|`-joined for alias groups).
	pub name: Box<str>,
	/// Stored value.
	pub value: Value,
}

#[cfg(test)]
mod tests {
	use super::Value;

	#[test]
	fn floats_compare_by_bits() {
		assert_eq!(Value::F32(f32::NAN), Value::F32(f32::NAN));
		assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
		assert_ne!(Value::F32(0.0), Value::F32(-0.0));
		assert_ne!(Value::I64(1), Value::U64(1));
	}
}
