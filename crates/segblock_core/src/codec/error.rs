use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors produced while parsing schemas and decoding or encoding records.
///
/// Every variant aborts the current operation. A misread field shifts every
/// later offset of a sequential-cursor format, so nothing is retried.
#[derive(Debug, Error)]
pub enum CodecError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Schema document could not be deserialized.
	#[error("schema: {0}")]
	Schema(#[from] serde_json::Error),
	/// Field declaration text is malformed.
	#[error("parse error in declaration {decl:?}: {reason}")]
	Parse {
		/// Offending declaration text.
		decl: String,
		/// What was wrong with it.
		reason: &'static str,
	},
	/// Array-size expression names a variable with no binding.
	#[error("unbound variable {var:?} in declaration {decl:?}")]
	UnboundVariable {
		/// Variable name.
		var: String,
		/// Declaration that referenced it.
		decl: String,
	},
	/// Requested type name is not registered.
	#[error("unknown type: {name}")]
	UnknownType {
		/// Requested type name.
		name: String,
	},
	/// Size or offset could not be computed for a type.
	#[error("cannot size {type_name}: {reason}")]
	Size {
		/// Type being sized.
		type_name: String,
		/// Why the size is undefined.
		reason: &'static str,
	},
	/// Requested field is not declared on a type.
	#[error("field {field} not declared on {type_name}")]
	FieldNotFound {
		/// Type name searched.
		type_name: String,
		/// Missing field name.
		field: String,
	},
	/// A read or write would leave the buffer.
	#[error("out of bounds at offset {at}: need {need} bytes, buffer length {len}")]
	Bounds {
		/// Offset where the access started.
		at: usize,
		/// Bytes requested.
		need: usize,
		/// Total buffer length.
		len: usize,
	},
	/// Unbounded array field read without an end marker.
	#[error("unbounded array {field} has no end marker")]
	MissingEndMarker {
		/// Array field name.
		field: String,
	},
	/// Buffer ran out before an end marker was seen.
	#[error("buffer exhausted at offset {at} before end marker of {field}")]
	TruncatedSentinel {
		/// Array field name.
		field: String,
		/// Cursor offset where the peek failed.
		at: usize,
	},
	/// Pointer high byte is not a known segment tag.
	#[error("unknown segment tag 0x{tag:02x} in pointer 0x{raw:08x}")]
	UnknownSegmentTag {
		/// Extracted tag byte.
		tag: u8,
		/// Full raw pointer value.
		raw: u32,
	},
	/// Backpatch requested on a block that was never written.
	#[error("block {type_name} has not been written yet")]
	UncommittedBlock {
		/// Type of the uncommitted block.
		type_name: String,
	},
	/// Value kind does not fit the declared field type.
	#[error("type mismatch for {field}: expected {expected}, got {got}")]
	TypeMismatch {
		/// Field being encoded.
		field: String,
		/// Expected value kind.
		expected: &'static str,
		/// Actual value kind.
		got: &'static str,
	},
	/// Fixed-size array value holds the wrong number of elements.
	#[error("array {field} holds {got} elements, declaration requires {expected}")]
	ArrayLength {
		/// Array field name.
		field: String,
		/// Declared element count.
		expected: usize,
		/// Elements present in the value.
		got: usize,
	},
	/// Raw write requested for a block without an opaque payload.
	#[error("block {type_name} has no raw payload")]
	MissingPayload {
		/// Type of the block.
		type_name: String,
	},
	/// Integer does not fit the declared primitive width.
	#[error("value {value} out of range for {primitive}")]
	ValueOutOfRange {
		/// Rendered value.
		value: String,
		/// Target primitive name.
		primitive: &'static str,
	},
	/// Patched value encoded to a different width than the original slot.
	#[error("patch of {field} encodes to {got} bytes, slot holds {expected}")]
	PatchLengthMismatch {
		/// Patched field name.
		field: String,
		/// Bytes in the emitted slot.
		expected: usize,
		/// Bytes produced for the new value.
		got: usize,
	},
	/// Decoder recursion depth exceeded configured limit.
	#[error("decode depth exceeded (max={max_depth})")]
	DecodeDepthExceeded {
		/// Configured depth ceiling.
		max_depth: u32,
	},
	/// Requested array length exceeded configured limit.
	#[error("decode array too large: count={count}, max={max}")]
	DecodeArrayTooLarge {
		/// Requested array length.
		count: usize,
		/// Maximum permitted array length.
		max: usize,
	},
	/// Unknown leading compression magic.
	#[error("unrecognized compression magic {magic:02x?}")]
	UnknownMagic {
		/// First up-to-2 bytes of the stream.
		magic: [u8; 2],
	},
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
	/// Inflated length disagrees with the framed length field.
	#[error("decompressed length {actual} does not match header length {expected}")]
	LengthMismatch {
		/// Length stored in the frame header.
		expected: usize,
		/// Length actually produced.
		actual: usize,
	},
	/// Payload too large for a 24-bit length field.
	#[error("payload of {len} bytes does not fit a 24-bit length field")]
	LengthOverflow {
		/// Payload length.
		len: usize,
	},
}
