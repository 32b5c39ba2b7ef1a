use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codec::{
	ArrayLen, CodecError, DataBlock, Endianness, FieldDescriptor, FieldKind, POINTER_SIZE, Primitive, Result, SegPtr, SegmentTable, TypeDecl, TypeRegistry,
	Value,
};

/// How an unbounded array's length is discovered.
///
/// Before each element the reader peeks a `primitive` at the cursor. A value
/// equal to `sentinel` ends the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndMarker {
	/// Type of the peeked tag.
	pub primitive: Primitive,
	/// Raw bits that end the array, compared at the primitive's width.
	pub sentinel: u64,
	/// Decode the terminating element and append it instead of skipping the tag.
	pub include_last: bool,
}

impl EndMarker {
	/// Marker that consumes the sentinel tag without appending it.
	pub fn new(primitive: Primitive, sentinel: u64) -> Self {
		Self {
			primitive,
			sentinel,
			include_last: false,
		}
	}

	/// Same marker, but the terminating element is decoded and kept.
	pub fn including_last(mut self) -> Self {
		self.include_last = true;
		self
	}

	/// Whether peeked raw bits terminate the array.
	pub fn matches(&self, raw: u64) -> bool {
		let mask = self.primitive.raw_mask();
		raw & mask == self.sentinel & mask
	}
}

/// End markers keyed by field name, or by `type.field` to scope one type.
pub type EndMarkers = BTreeMap<String, EndMarker>;

pub(crate) fn lookup_marker<'m>(markers: &'m EndMarkers, owner: &str, field: &FieldDescriptor) -> Option<&'m EndMarker> {
	markers
		.get(&format!("{owner}.{}", field.name()))
		.or_else(|| markers.get(field.name()))
		.or_else(|| markers.get(&*field.field_name))
}

/// Runtime limits for record decoding.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
	/// Maximum nesting depth of inline structs.
	pub max_depth: u32,
	/// Maximum element count of any single array.
	pub max_array_elems: usize,
	/// End markers for unbounded array fields.
	pub end_markers: EndMarkers,
}

impl Default for DecodeOptions {
	fn default() -> Self {
		Self {
			max_depth: 16,
			max_array_elems: 1 << 20,
			end_markers: EndMarkers::new(),
		}
	}
}

/// Cursor over a source buffer that decodes registered types.
pub struct ByteReader<'a> {
	registry: &'a TypeRegistry,
	bytes: &'a [u8],
	pos: usize,
	order: Endianness,
	addr_mask: u32,
	options: DecodeOptions,
}

impl<'a> ByteReader<'a> {
	/// Big-endian reader at offset 0 with no address mask.
	pub fn new(registry: &'a TypeRegistry, bytes: &'a [u8]) -> Self {
		Self {
			registry,
			bytes,
			pos: 0,
			order: Endianness::Big,
			addr_mask: u32::MAX,
			options: DecodeOptions::default(),
		}
	}

	/// Set the source byte order.
	pub fn with_order(mut self, order: Endianness) -> Self {
		self.order = order;
		self
	}

	/// Set the mask applied to every address passed to [`ByteReader::set_cursor`].
	pub fn with_addr_mask(mut self, mask: u32) -> Self {
		self.addr_mask = mask;
		self
	}

	/// Replace the decode options.
	pub fn with_options(mut self, options: DecodeOptions) -> Self {
		self.options = options;
		self
	}

	/// Register an end marker for an unbounded array field.
	pub fn with_end_marker(mut self, field: &str, marker: EndMarker) -> Self {
		self.options.end_markers.insert(field.to_owned(), marker);
		self
	}

	/// Source byte order.
	pub fn order(&self) -> Endianness {
		self.order
	}

	/// Current cursor offset.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Bytes left after the cursor.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Whole source buffer.
	pub fn bytes(&self) -> &'a [u8] {
		self.bytes
	}

	/// Move the cursor to `addr` after applying the address mask.
	///
	/// Seeking to the very end is allowed; any read from there fails.
	pub fn set_cursor(&mut self, addr: usize) -> Result<()> {
		let masked = (addr as u64 & u64::from(self.addr_mask)) as usize;
		if masked > self.bytes.len() {
			return Err(CodecError::Bounds {
				at: masked,
				need: 0,
				len: self.bytes.len(),
			});
		}
		self.pos = masked;
		Ok(())
	}

	/// Resolve a raw pointer through `segments` and seek to its target.
	///
	/// Returns `None` without moving for null pointers.
	pub fn seek_ptr(&mut self, raw: u32, segments: &SegmentTable) -> Result<Option<SegPtr>> {
		let Some(ptr) = segments.resolve(raw, self.bytes.len())? else {
			return Ok(None);
		};
		self.set_cursor(ptr.addr())?;
		Ok(Some(ptr))
	}

	/// Read exactly `n` bytes and advance.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		let bytes = self.slice_at(self.pos, n)?;
		self.pos += n;
		Ok(bytes)
	}

	/// Decode one primitive at the cursor and advance.
	pub fn read_primitive(&mut self, primitive: Primitive) -> Result<Value> {
		let raw = self.read_exact(primitive.size())?;
		Ok(primitive.decode(raw, self.order))
	}

	/// Decode one raw pointer at the cursor and advance.
	pub fn read_ptr(&mut self) -> Result<u32> {
		let raw = self.read_exact(POINTER_SIZE)?;
		Ok(self.order.read_uint(raw) as u32)
	}

	/// Decode one primitive at the cursor without advancing.
	pub fn peek(&self, primitive: Primitive) -> Result<Value> {
		Ok(primitive.decode(self.slice_at(self.pos, primitive.size())?, self.order))
	}

	/// Decode `n` consecutive primitives at the cursor without advancing.
	pub fn peek_n(&self, primitive: Primitive, n: usize) -> Result<Vec<Value>> {
		let size = primitive.size();
		let total = size.checked_mul(n).ok_or(CodecError::Bounds {
			at: self.pos,
			need: usize::MAX,
			len: self.bytes.len(),
		})?;
		let bytes = self.slice_at(self.pos, total)?;
		Ok(bytes.chunks_exact(size).map(|chunk| primitive.decode(chunk, self.order)).collect())
	}

	/// Decode one record of the type currently bound to `name`.
	pub fn read_block(&mut self, name: &str) -> Result<DataBlock> {
		let decl = Arc::clone(self.registry.decl(name)?);
		self.read_block_impl(decl, 0)
	}

	/// Decode one record of a specific declaration handle.
	pub fn read_block_decl(&mut self, decl: &Arc<TypeDecl>) -> Result<DataBlock> {
		self.read_block_impl(Arc::clone(decl), 0)
	}

	/// Decode `count` consecutive records of `name`.
	pub fn read_blocks(&mut self, name: &str, count: usize) -> Result<Vec<DataBlock>> {
		if count > self.options.max_array_elems {
			return Err(CodecError::DecodeArrayTooLarge {
				count,
				max: self.options.max_array_elems,
			});
		}
		let decl = Arc::clone(self.registry.decl(name)?);
		(0..count).map(|_| self.read_block_impl(Arc::clone(&decl), 0)).collect()
	}

	/// Decode the elements of an array field.
	///
	/// Fixed arrays read exactly their declared count. Unbounded arrays need
	/// `end_marker`; see [`EndMarker`] for how the terminator is handled.
	pub fn read_array(&mut self, field: &FieldDescriptor, end_marker: Option<&EndMarker>) -> Result<Vec<Value>> {
		self.read_array_impl(field, end_marker, 0)
	}

	fn read_block_impl(&mut self, decl: Arc<TypeDecl>, depth: u32) -> Result<DataBlock> {
		if depth >= self.options.max_depth {
			return Err(CodecError::DecodeDepthExceeded {
				max_depth: self.options.max_depth,
			});
		}

		let start = self.pos;
		let mut values = Vec::with_capacity(decl.fields.len());
		for field in &decl.fields {
			log::trace!("read {}.{} at 0x{:x}", decl.name, field.field_name, self.pos);
			let value = match field.array {
				ArrayLen::Scalar => self.read_element(field, depth)?,
				ArrayLen::Fixed(_) | ArrayLen::Unbounded => {
					let marker = lookup_marker(&self.options.end_markers, &decl.name, field).copied();
					Value::Array(self.read_array_impl(field, marker.as_ref(), depth)?)
				}
			};
			values.push(value);
		}

		Ok(DataBlock::from_values(decl, values, Some(start)))
	}

	fn read_array_impl(&mut self, field: &FieldDescriptor, end_marker: Option<&EndMarker>, depth: u32) -> Result<Vec<Value>> {
		let max = self.options.max_array_elems;
		match field.array {
			ArrayLen::Scalar => Ok(vec![self.read_element(field, depth)?]),
			ArrayLen::Fixed(count) => {
				if count > max {
					return Err(CodecError::DecodeArrayTooLarge { count, max });
				}
				(0..count).map(|_| self.read_element(field, depth)).collect()
			}
			ArrayLen::Unbounded => {
				let marker = end_marker.ok_or_else(|| CodecError::MissingEndMarker {
					field: field.field_name.to_string(),
				})?;
				self.read_until_marker(field, marker, depth)
			}
		}
	}

	/// Scan, read one record, scan again; the first sentinel terminates for good.
	fn read_until_marker(&mut self, field: &FieldDescriptor, marker: &EndMarker, depth: u32) -> Result<Vec<Value>> {
		let mut out = Vec::new();
		loop {
			let at = self.pos;
			let raw = match self.slice_at(at, marker.primitive.size()) {
				Ok(bytes) => self.order.read_uint(bytes),
				Err(_) => {
					return Err(CodecError::TruncatedSentinel {
						field: field.field_name.to_string(),
						at,
					});
				}
			};

			if marker.matches(raw) {
				if marker.include_last {
					out.push(self.read_element(field, depth)?);
				} else {
					self.pos += marker.primitive.size();
				}
				log::trace!("{} terminated after {} elements at 0x{:x}", field.field_name, out.len(), self.pos);
				return Ok(out);
			}

			if out.len() >= self.options.max_array_elems {
				return Err(CodecError::DecodeArrayTooLarge {
					count: out.len() + 1,
					max: self.options.max_array_elems,
				});
			}
			out.push(self.read_element(field, depth)?);
		}
	}

	fn read_element(&mut self, field: &FieldDescriptor, depth: u32) -> Result<Value> {
		match &field.kind {
			FieldKind::Primitive(primitive) => self.read_primitive(*primitive),
			FieldKind::Pointer(_) => Ok(Value::Ptr(self.read_ptr()?)),
			FieldKind::Struct(name) => {
				let decl = Arc::clone(self.registry.decl(name)?);
				Ok(Value::Block(self.read_block_impl(decl, depth + 1)?))
			}
		}
	}

	fn slice_at(&self, at: usize, n: usize) -> Result<&'a [u8]> {
		at.checked_add(n)
			.and_then(|end| self.bytes.get(at..end))
			.ok_or(CodecError::Bounds {
				at,
				need: n,
				len: self.bytes.len(),
			})
	}
}

#[cfg(test)]
mod tests;
