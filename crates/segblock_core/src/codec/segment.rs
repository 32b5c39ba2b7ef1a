use std::collections::BTreeSet;

use crate::codec::{CodecError, Result};

/// Low bits of a pointer holding the byte offset.
pub const OFFSET_MASK: u32 = 0x00FF_FFFF;
/// Tag of an untagged in-blob offset.
pub const SEG_RAW: u8 = 0x00;
/// Tag of an offset relative to the start of the current data blob.
pub const SEG_BLOB: u8 = 0x05;

/// Pointer split into its segment tag and masked offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegPtr {
	/// High byte of the on-disk value.
	pub tag: u8,
	/// Offset with the tag masked off.
	pub offset: u32,
}

impl SegPtr {
	/// Build a pointer from a tag and an offset that must fit in 24 bits.
	pub fn new(tag: u8, offset: usize) -> Result<Self> {
		let offset = u32::try_from(offset)
			.ok()
			.filter(|offset| *offset <= OFFSET_MASK)
			.ok_or_else(|| CodecError::ValueOutOfRange {
				value: format!("0x{offset:x}"),
				primitive: "segment offset",
			})?;
		Ok(Self { tag, offset })
	}

	/// On-disk value, tag bits included.
	pub fn raw(self) -> u32 {
		(u32::from(self.tag) << 24) | self.offset
	}

	/// Masked offset as a buffer index.
	pub fn addr(self) -> usize {
		self.offset as usize
	}
}

/// Set of segment tags accepted when resolving pointers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTable {
	tags: BTreeSet<u8>,
}

impl Default for SegmentTable {
	fn default() -> Self {
		Self {
			tags: BTreeSet::from([SEG_RAW, SEG_BLOB]),
		}
	}
}

impl SegmentTable {
	/// Accept an additional segment tag.
	pub fn with_tag(mut self, tag: u8) -> Self {
		self.tags.insert(tag);
		self
	}

	/// Whether `tag` is accepted.
	pub fn knows(&self, tag: u8) -> bool {
		self.tags.contains(&tag)
	}

	/// Split `raw` into tag and offset and bounds-check it against `len`.
	///
	/// A raw value of zero is a null pointer and resolves to `None`.
	pub fn resolve(&self, raw: u32, len: usize) -> Result<Option<SegPtr>> {
		if raw == 0 {
			return Ok(None);
		}

		let tag = (raw >> 24) as u8;
		if !self.knows(tag) {
			return Err(CodecError::UnknownSegmentTag { tag, raw });
		}

		let ptr = SegPtr { tag, offset: raw & OFFSET_MASK };
		if ptr.addr() >= len {
			return Err(CodecError::Bounds { at: ptr.addr(), need: 1, len });
		}
		Ok(Some(ptr))
	}
}

#[cfg(test)]
mod tests {
	use super::{SEG_BLOB, SegPtr, SegmentTable};
	use crate::codec::CodecError;

	#[test]
	fn tagged_pointer_masks_and_remembers_tag() {
		let table = SegmentTable::default();
		let ptr = table.resolve(0x0500_0010, 0x100).expect("resolves").expect("not null");
		assert_eq!(ptr.tag, SEG_BLOB);
		assert_eq!(ptr.addr(), 0x10);
		assert_eq!(ptr.raw(), 0x0500_0010);
	}

	#[test]
	fn untagged_pointer_passes_through() {
		let table = SegmentTable::default();
		let ptr = table.resolve(0x24, 0x100).expect("resolves").expect("not null");
		assert_eq!(ptr.tag, 0);
		assert_eq!(ptr.raw(), 0x24);
	}

	#[test]
	fn null_pointer_resolves_to_none() {
		assert_eq!(SegmentTable::default().resolve(0, 0).expect("resolves"), None);
	}

	#[test]
	fn unknown_tag_is_a_hard_error() {
		let err = SegmentTable::default().resolve(0x0E00_0010, 0x100).expect_err("must fail");
		assert!(matches!(err, CodecError::UnknownSegmentTag { tag: 0x0E, .. }));
		assert!(SegmentTable::default().with_tag(0x0E).resolve(0x0E00_0010, 0x100).is_ok());
	}

	#[test]
	fn offset_past_buffer_is_a_bounds_error() {
		let err = SegmentTable::default().resolve(0x0500_0100, 0x100).expect_err("must fail");
		assert!(matches!(err, CodecError::Bounds { at: 0x100, .. }));
	}

	#[test]
	fn oversized_offsets_cannot_be_tagged() {
		assert!(SegPtr::new(SEG_BLOB, 0x0100_0000).is_err());
		assert_eq!(SegPtr::new(SEG_BLOB, 0x20).expect("fits").raw(), 0x0500_0020);
	}
}
