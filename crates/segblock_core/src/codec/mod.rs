mod block;
mod compression;
mod decl;
mod error;
mod primitive;
mod reader;
mod registry;
mod schema;
mod segment;
mod value;
mod writer;

/// In-memory record model.
pub use block::DataBlock;
/// Outer DEFLATE framing.
pub use compression::{Framing, MAX_DECOMPRESSED_BYTES, compress, decompress};
/// Field declaration parser types.
pub use decl::{ArrayLen, FieldDescriptor, FieldKind, Vars, parse_field_decl};
/// Error and result aliases.
pub use error::{CodecError, Result};
/// Scalar type table and byte order.
pub use primitive::{Endianness, POINTER_SIZE, Primitive};
/// Decode path.
pub use reader::{ByteReader, DecodeOptions, EndMarker, EndMarkers};
/// Schema table.
pub use registry::{TypeDecl, TypeRegistry};
/// JSON schema documents.
pub use schema::{EndMarkerSpec, SchemaFile, SentinelLit, TypeSpec};
/// Pointer segment conventions.
pub use segment::{OFFSET_MASK, SEG_BLOB, SEG_RAW, SegPtr, SegmentTable};
/// Decoded value types.
pub use value::{FieldValue, Value};
/// Encode path.
pub use writer::ByteWriter;
