use std::sync::Arc;

use crate::codec::{ArrayLen, ByteWriter, CodecError, FieldDescriptor, FieldKind, FieldValue, Result, TypeDecl, TypeRegistry, Value};

const MAX_ZERO_DEPTH: u32 = 64;
const MAX_ZERO_ELEMS: usize = 1 << 20;

/// Byte range one field occupied when its block was first written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldSpan {
	pub(crate) offset: usize,
	pub(crate) len: usize,
}

/// One decoded or under-construction record of a registered type.
///
/// Holds exactly one value per declared field, in declaration order. The
/// declaration handle is captured at construction, so re-registering the type
/// later does not change how this block encodes.
#[derive(Debug, Clone)]
pub struct DataBlock {
	decl: Arc<TypeDecl>,
	fields: Vec<FieldValue>,
	read_addr: Option<usize>,
	write_addr: Option<usize>,
	spans: Vec<FieldSpan>,
	raw: Option<Vec<u8>>,
}

impl PartialEq for DataBlock {
	fn eq(&self, other: &Self) -> bool {
		self.decl.name == other.decl.name && self.fields == other.fields && self.raw == other.raw
	}
}

impl DataBlock {
	pub(crate) fn from_values(decl: Arc<TypeDecl>, values: Vec<Value>, read_addr: Option<usize>) -> Self {
		let fields = decl
			.fields
			.iter()
			.zip(values)
			.map(|(field, value)| FieldValue {
				name: field.field_name.clone(),
				value,
			})
			.collect();
		Self {
			decl,
			fields,
			read_addr,
			write_addr: None,
			spans: Vec::new(),
			raw: None,
		}
	}

	/// Zero-initialized block of the type currently bound to `name`.
	///
	/// Fixed arrays are filled with zero elements, unbounded arrays start empty.
	pub fn zeroed(registry: &TypeRegistry, name: &str) -> Result<Self> {
		Self::zeroed_decl(registry, Arc::clone(registry.decl(name)?))
	}

	/// Zero-initialized block of a specific declaration handle.
	pub fn zeroed_decl(registry: &TypeRegistry, decl: Arc<TypeDecl>) -> Result<Self> {
		zeroed_impl(registry, decl, 0)
	}

	/// Block carrying an opaque payload emitted verbatim by [`ByteWriter::write_block_raw`].
	pub fn opaque(type_name: &str, payload: Vec<u8>) -> Self {
		let decl = Arc::new(TypeDecl {
			name: type_name.into(),
			fields: Vec::new(),
			sources: Vec::new(),
			vars: Default::default(),
		});
		Self {
			decl,
			fields: Vec::new(),
			read_addr: None,
			write_addr: None,
			spans: Vec::new(),
			raw: Some(payload),
		}
	}

	/// Registered name of this block's type.
	pub fn type_name(&self) -> &str {
		&self.decl.name
	}

	/// Declaration this block was built from.
	pub fn decl(&self) -> &Arc<TypeDecl> {
		&self.decl
	}

	/// Fields in declaration order.
	pub fn fields(&self) -> &[FieldValue] {
		&self.fields
	}

	pub(crate) fn fields_mut(&mut self) -> &mut [FieldValue] {
		&mut self.fields
	}

	/// Value of the field answering to `name`, union aliases included.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.decl.field_index(name).map(|idx| &self.fields[idx].value)
	}

	/// Mutable value of the field answering to `name`.
	pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
		self.decl.field_index(name).map(|idx| &mut self.fields[idx].value)
	}

	/// Replace the value of a declared field.
	pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
		let (idx, _) = self.decl.field_or_err(name)?;
		self.fields[idx].value = value;
		Ok(())
	}

	/// Offset this block was decoded from.
	pub fn read_addr(&self) -> Option<usize> {
		self.read_addr
	}

	/// Offset this block was first written to.
	pub fn write_addr(&self) -> Option<usize> {
		self.write_addr
	}

	pub(crate) fn commit(&mut self, addr: usize, spans: Vec<FieldSpan>) {
		if self.write_addr.is_none() {
			self.write_addr = Some(addr);
			self.spans = spans;
		}
	}

	/// Forget the write address of this block and every nested block, so
	/// they can be committed to a new buffer.
	pub fn clear_write_addr(&mut self) {
		self.write_addr = None;
		self.spans.clear();
		for field in &mut self.fields {
			clear_nested(&mut field.value);
		}
	}

	/// Opaque payload, if this block was built with [`DataBlock::opaque`].
	pub fn raw(&self) -> Option<&[u8]> {
		self.raw.as_deref()
	}

	/// Set `field` to `value` and overwrite its already-emitted bytes in `out`.
	///
	/// Only the bytes `field` occupied when the block was first written change,
	/// whatever has happened to the other field values since. The new value
	/// must encode to that same width.
	pub fn update(&mut self, writer: &ByteWriter<'_>, out: &mut [u8], field: &str, value: Value) -> Result<()> {
		let uncommitted = || CodecError::UncommittedBlock {
			type_name: self.decl.name.to_string(),
		};
		let base = self.write_addr.ok_or_else(uncommitted)?;
		let decl = Arc::clone(&self.decl);
		let (idx, desc) = decl.field_or_err(field)?;
		let span = self.spans.get(idx).copied().ok_or_else(uncommitted)?;

		let bytes = writer.field_bytes(&decl.name, desc, &value)?;
		if bytes.len() != span.len {
			return Err(CodecError::PatchLengthMismatch {
				field: field.to_owned(),
				expected: span.len,
				got: bytes.len(),
			});
		}

		let at = base + span.offset;
		writer.patch(out, at, &bytes)?;
		log::trace!("patched {}.{} at 0x{at:x}", decl.name, field);
		self.fields[idx].value = value;
		Ok(())
	}
}

fn zeroed_impl(registry: &TypeRegistry, decl: Arc<TypeDecl>, depth: u32) -> Result<DataBlock> {
	if depth >= MAX_ZERO_DEPTH {
		return Err(CodecError::Size {
			type_name: decl.name.to_string(),
			reason: "struct nesting too deep or recursive",
		});
	}

	let values = decl
		.fields
		.iter()
		.map(|field| match field.array {
			ArrayLen::Scalar => zero_element(registry, field, depth),
			ArrayLen::Fixed(count) if count > MAX_ZERO_ELEMS => Err(CodecError::DecodeArrayTooLarge { count, max: MAX_ZERO_ELEMS }),
			ArrayLen::Fixed(count) => (0..count)
				.map(|_| zero_element(registry, field, depth))
				.collect::<Result<Vec<_>>>()
				.map(Value::Array),
			ArrayLen::Unbounded => Ok(Value::Array(Vec::new())),
		})
		.collect::<Result<Vec<_>>>()?;

	Ok(DataBlock::from_values(decl, values, None))
}

fn clear_nested(value: &mut Value) {
	match value {
		Value::Block(block) => block.clear_write_addr(),
		Value::Array(items) => items.iter_mut().for_each(clear_nested),
		_ => {}
	}
}

fn zero_element(registry: &TypeRegistry, field: &FieldDescriptor, depth: u32) -> Result<Value> {
	Ok(match &field.kind {
		FieldKind::Primitive(primitive) => primitive.zero(),
		FieldKind::Pointer(_) => Value::Ptr(0),
		FieldKind::Struct(name) => Value::Block(zeroed_impl(registry, Arc::clone(registry.decl(name)?), depth + 1)?),
	})
}
