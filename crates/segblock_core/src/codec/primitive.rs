use crate::codec::{CodecError, Result, Value};

/// Width in bytes of an on-disk pointer field.
pub const POINTER_SIZE: usize = 4;

/// Byte order used when decoding or encoding multi-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
	/// Most significant byte first. Native order of the on-disk formats.
	#[default]
	Big,
	/// Least significant byte first.
	Little,
}

impl Endianness {
	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Big => "big",
			Self::Little => "little",
		}
	}

	/// Decode `bytes` as an unsigned integer, zero-extended to `u64`.
	pub fn read_uint(self, bytes: &[u8]) -> u64 {
		let fold = |acc: u64, byte: &u8| (acc << 8) | u64::from(*byte);
		match self {
			Self::Big => bytes.iter().fold(0, fold),
			Self::Little => bytes.iter().rev().fold(0, fold),
		}
	}

	/// Encode the low `width` bytes of `raw`.
	pub fn write_uint(self, raw: u64, width: usize) -> Vec<u8> {
		match self {
			Self::Big => raw.to_be_bytes()[8 - width..].to_vec(),
			Self::Little => raw.to_le_bytes()[..width].to_vec(),
		}
	}
}

/// Fixed-size scalar types understood by the declaration language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
	/// Unsigned 8-bit integer.
	U8,
	/// Signed 8-bit integer.
	S8,
	/// Unsigned 16-bit integer.
	U16,
	/// Signed 16-bit integer.
	S16,
	/// Unsigned 32-bit integer.
	U32,
	/// Signed 32-bit integer.
	S32,
	/// Unsigned 64-bit integer.
	U64,
	/// Signed 64-bit integer.
	S64,
	/// IEEE-754 single precision float.
	F32,
	/// IEEE-754 double precision float.
	F64,
}

impl Primitive {
	/// Look up a primitive by its declaration keyword.
	pub fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"u8" => Self::U8,
			"s8" => Self::S8,
			"u16" => Self::U16,
			"s16" => Self::S16,
			"u32" => Self::U32,
			"s32" => Self::S32,
			"u64" => Self::U64,
			"s64" => Self::S64,
			"f32" => Self::F32,
			"f64" => Self::F64,
			_ => return None,
		})
	}

	/// Declaration keyword for this primitive.
	pub fn name(self) -> &'static str {
		match self {
			Self::U8 => "u8",
			Self::S8 => "s8",
			Self::U16 => "u16",
			Self::S16 => "s16",
			Self::U32 => "u32",
			Self::S32 => "s32",
			Self::U64 => "u64",
			Self::S64 => "s64",
			Self::F32 => "f32",
			Self::F64 => "f64",
		}
	}

	/// Encoded width in bytes.
	pub fn size(self) -> usize {
		match self {
			Self::U8 | Self::S8 => 1,
			Self::U16 | Self::S16 => 2,
			Self::U32 | Self::S32 | Self::F32 => 4,
			Self::U64 | Self::S64 | Self::F64 => 8,
		}
	}

	/// Whether integer decoding sign-extends.
	pub fn is_signed(self) -> bool {
		matches!(self, Self::S8 | Self::S16 | Self::S32 | Self::S64)
	}

	/// Whether this is a floating point type.
	pub fn is_float(self) -> bool {
		matches!(self, Self::F32 | Self::F64)
	}

	/// Mask selecting the low `size()` bytes of a raw value.
	pub fn raw_mask(self) -> u64 {
		match self.size() {
			8 => u64::MAX,
			width => (1_u64 << (width * 8)) - 1,
		}
	}

	/// Interpret zero-extended raw bits as a typed value.
	pub fn value_from_raw(self, raw: u64) -> Value {
		match self {
			Self::F32 => Value::F32(f32::from_bits(raw as u32)),
			Self::F64 => Value::F64(f64::from_bits(raw)),
			Self::S8 => Value::I64(i64::from(raw as u8 as i8)),
			Self::S16 => Value::I64(i64::from(raw as u16 as i16)),
			Self::S32 => Value::I64(i64::from(raw as u32 as i32)),
			Self::S64 => Value::I64(raw as i64),
			Self::U8 | Self::U16 | Self::U32 | Self::U64 => Value::U64(raw),
		}
	}

	/// Decode `bytes` (exactly `size()` long) in the given order.
	pub fn decode(self, bytes: &[u8], order: Endianness) -> Value {
		self.value_from_raw(order.read_uint(bytes))
	}

	/// Convert a value to raw bits, rejecting kinds and ranges that do not fit.
	pub fn raw_from_value(self, value: &Value, field: &str) -> Result<u64> {
		match (self, value) {
			(Self::F32, Value::F32(v)) => Ok(u64::from(v.to_bits())),
			(Self::F64, Value::F64(v)) => Ok(v.to_bits()),
			(Self::F64, Value::F32(v)) => Ok(f64::from(*v).to_bits()),
			(Self::F32 | Self::F64, other) => Err(CodecError::TypeMismatch {
				field: field.to_owned(),
				expected: "float",
				got: other.kind(),
			}),
			(_, Value::I64(v)) => self.int_to_raw(i128::from(*v)),
			(_, Value::U64(v)) => self.int_to_raw(i128::from(*v)),
			(Self::U32 | Self::S32 | Self::U64 | Self::S64, Value::Ptr(v)) => self.int_to_raw(i128::from(*v)),
			(_, other) => Err(CodecError::TypeMismatch {
				field: field.to_owned(),
				expected: "integer",
				got: other.kind(),
			}),
		}
	}

	/// Encode a value into `size()` bytes.
	pub fn encode(self, value: &Value, order: Endianness, field: &str) -> Result<Vec<u8>> {
		let raw = self.raw_from_value(value, field)?;
		Ok(order.write_uint(raw, self.size()))
	}

	/// Zero value of this primitive.
	pub fn zero(self) -> Value {
		self.value_from_raw(0)
	}

	fn int_to_raw(self, value: i128) -> Result<u64> {
		let bits = (self.size() * 8) as u32;
		let (min, max) = if self.is_signed() {
			(-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1)
		} else {
			(0, (1_i128 << bits) - 1)
		};
		if value < min || value > max {
			return Err(CodecError::ValueOutOfRange {
				value: value.to_string(),
				primitive: self.name(),
			});
		}
		Ok((value as u64) & self.raw_mask())
	}
}
