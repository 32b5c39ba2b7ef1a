use crate::codec::block::FieldSpan;
use crate::codec::reader::lookup_marker;
use crate::codec::{
	ArrayLen, CodecError, DataBlock, EndMarker, EndMarkers, Endianness, FieldDescriptor, FieldKind, POINTER_SIZE, Primitive, Result, TypeRegistry, Value,
};

/// Encoder appending registered records to a destination buffer.
///
/// Every block written records the offset it landed at, which later lets
/// [`DataBlock::update`] patch its already-emitted bytes.
pub struct ByteWriter<'a> {
	registry: &'a TypeRegistry,
	order: Endianness,
	pointer_order: Option<Endianness>,
	end_markers: EndMarkers,
}

impl<'a> ByteWriter<'a> {
	/// Big-endian writer.
	pub fn new(registry: &'a TypeRegistry) -> Self {
		Self {
			registry,
			order: Endianness::Big,
			pointer_order: None,
			end_markers: EndMarkers::new(),
		}
	}

	/// Set the destination byte order.
	pub fn with_order(mut self, order: Endianness) -> Self {
		self.order = order;
		self
	}

	/// Encode pointer fields in a different order than everything else.
	pub fn with_pointer_order(mut self, order: Endianness) -> Self {
		self.pointer_order = Some(order);
		self
	}

	/// End markers re-emitted after unbounded arrays that skipped their sentinel on decode.
	pub fn with_end_markers(mut self, end_markers: EndMarkers) -> Self {
		self.end_markers = end_markers;
		self
	}

	/// Register one end marker.
	pub fn with_end_marker(mut self, field: &str, marker: EndMarker) -> Self {
		self.end_markers.insert(field.to_owned(), marker);
		self
	}

	/// Destination byte order.
	pub fn order(&self) -> Endianness {
		self.order
	}

	/// Append `value` encoded as `primitive`.
	pub fn write(&self, out: &mut Vec<u8>, value: &Value, primitive: Primitive) -> Result<()> {
		out.extend(primitive.encode(value, self.order, primitive.name())?);
		Ok(())
	}

	/// Append a raw pointer in the pointer byte order.
	pub fn write_ptr(&self, out: &mut Vec<u8>, raw: u32) {
		out.extend(self.pointer_order.unwrap_or(self.order).write_uint(u64::from(raw), POINTER_SIZE));
	}

	/// Append a zero-initialized record of `name` and return it, committed.
	///
	/// Pointer fields hold zero until the caller patches them with [`DataBlock::update`].
	pub fn write_placeholder(&self, out: &mut Vec<u8>, name: &str, pad: usize) -> Result<DataBlock> {
		let mut block = DataBlock::zeroed(self.registry, name)?;
		self.write_block(out, &mut block, pad)?;
		Ok(block)
	}

	/// Append `block` field by field, then zero-pad `out` to a multiple of `pad`.
	///
	/// The block and every nested block record their write address the first
	/// time they are emitted.
	pub fn write_block(&self, out: &mut Vec<u8>, block: &mut DataBlock, pad: usize) -> Result<()> {
		self.emit_block(out, block)?;
		pad_to(out, pad);
		Ok(())
	}

	/// Append the opaque payload of `block` verbatim.
	pub fn write_block_raw(&self, out: &mut Vec<u8>, block: &mut DataBlock) -> Result<()> {
		let payload = block.raw().ok_or_else(|| CodecError::MissingPayload {
			type_name: block.type_name().to_owned(),
		})?;
		let addr = out.len();
		out.extend_from_slice(payload);
		block.commit(addr, Vec::new());
		log::trace!("wrote raw {} ({} bytes) at 0x{addr:x}", block.type_name(), out.len() - addr);
		Ok(())
	}

	/// Overwrite `bytes.len()` bytes of `out` starting at `at`.
	pub fn patch(&self, out: &mut [u8], at: usize, bytes: &[u8]) -> Result<()> {
		let len = out.len();
		let slot = at
			.checked_add(bytes.len())
			.and_then(|end| out.get_mut(at..end))
			.ok_or(CodecError::Bounds { at, need: bytes.len(), len })?;
		slot.copy_from_slice(bytes);
		Ok(())
	}

	/// Number of bytes `block` would emit, runtime array lengths included.
	pub fn encoded_len(&self, block: &DataBlock) -> Result<usize> {
		if let Some(raw) = block.raw() {
			return Ok(raw.len());
		}
		let mut scratch = block.clone();
		let mut buf = Vec::new();
		self.emit_block(&mut buf, &mut scratch)?;
		Ok(buf.len())
	}

	/// Start address of each block when written in order from `base` with `pad`.
	///
	/// Lets callers fill forward pointers before anything is emitted.
	pub fn plan_layout(&self, blocks: &[&DataBlock], base: usize, pad: usize) -> Result<Vec<usize>> {
		let mut addr = base;
		let mut out = Vec::with_capacity(blocks.len());
		for block in blocks {
			out.push(addr);
			let end = addr.checked_add(self.encoded_len(block)?).ok_or(CodecError::Size {
				type_name: block.type_name().to_owned(),
				reason: "size overflow",
			})?;
			addr = align_up(end, pad);
		}
		log::debug!("planned {} blocks spanning 0x{base:x}..0x{addr:x}", blocks.len());
		Ok(out)
	}

	/// Encoded bytes of one field value of an `owner` record, without recording any write address.
	pub(crate) fn field_bytes(&self, owner: &str, desc: &FieldDescriptor, value: &Value) -> Result<Vec<u8>> {
		let mut scratch = value.clone();
		let mut buf = Vec::new();
		self.emit_field(&mut buf, owner, desc, &mut scratch)?;
		Ok(buf)
	}

	fn emit_block(&self, out: &mut Vec<u8>, block: &mut DataBlock) -> Result<()> {
		if block.raw().is_some() {
			return self.write_block_raw(out, block);
		}

		let addr = out.len();
		let decl = std::sync::Arc::clone(block.decl());
		let mut spans = Vec::with_capacity(decl.fields.len());
		for (desc, field) in decl.fields.iter().zip(block.fields_mut()) {
			let start = out.len();
			self.emit_field(out, &decl.name, desc, &mut field.value)?;
			spans.push(FieldSpan {
				offset: start - addr,
				len: out.len() - start,
			});
		}
		block.commit(addr, spans);
		log::trace!("wrote {} ({} bytes) at 0x{addr:x}", decl.name, out.len() - addr);
		Ok(())
	}

	fn emit_field(&self, out: &mut Vec<u8>, owner: &str, desc: &FieldDescriptor, value: &mut Value) -> Result<()> {
		match desc.array {
			ArrayLen::Scalar => self.emit_element(out, desc, value),
			ArrayLen::Fixed(count) => {
				let items = array_items(desc, value)?;
				if items.len() != count {
					return Err(CodecError::ArrayLength {
						field: desc.field_name.to_string(),
						expected: count,
						got: items.len(),
					});
				}
				items.iter_mut().try_for_each(|item| self.emit_element(out, desc, item))
			}
			ArrayLen::Unbounded => {
				let items = array_items(desc, value)?;
				items.iter_mut().try_for_each(|item| self.emit_element(out, desc, item))?;
				if let Some(marker) = lookup_marker(&self.end_markers, owner, desc).filter(|marker| !marker.include_last) {
					out.extend(self.order.write_uint(marker.sentinel & marker.primitive.raw_mask(), marker.primitive.size()));
				}
				Ok(())
			}
		}
	}

	fn emit_element(&self, out: &mut Vec<u8>, desc: &FieldDescriptor, value: &mut Value) -> Result<()> {
		match &desc.kind {
			FieldKind::Primitive(primitive) => {
				out.extend(primitive.encode(value, self.order, &desc.field_name)?);
				Ok(())
			}
			FieldKind::Pointer(_) => {
				let got = value.kind();
				let raw = match value {
					Value::Ptr(raw) => Some(*raw),
					other => other.as_u64().and_then(|raw| u32::try_from(raw).ok()),
				};
				let raw = raw.ok_or_else(|| CodecError::TypeMismatch {
					field: desc.field_name.to_string(),
					expected: "ptr",
					got,
				})?;
				self.write_ptr(out, raw);
				Ok(())
			}
			FieldKind::Struct(name) => {
				let got = value.kind();
				let block = value.as_block_mut().ok_or_else(|| CodecError::TypeMismatch {
					field: desc.field_name.to_string(),
					expected: "block",
					got,
				})?;
				if block.raw().is_none() && block.type_name() != &**name {
					return Err(CodecError::TypeMismatch {
						field: desc.field_name.to_string(),
						expected: "block of the declared type",
						got: "block of another type",
					});
				}
				self.emit_block(out, block)
			}
		}
	}
}

fn array_items<'v>(desc: &FieldDescriptor, value: &'v mut Value) -> Result<&'v mut Vec<Value>> {
	let got = value.kind();
	match value {
		Value::Array(items) => Ok(items),
		_ => Err(CodecError::TypeMismatch {
			field: desc.field_name.to_string(),
			expected: "array",
			got,
		}),
	}
}

fn align_up(len: usize, pad: usize) -> usize {
	if pad <= 1 { len } else { len.div_ceil(pad) * pad }
}

fn pad_to(out: &mut Vec<u8>, pad: usize) {
	let target = align_up(out.len(), pad);
	out.resize(target, 0);
}
