//! Declarative binary-structure codec for N64-era game data blobs.
//!
//! Record layouts are declared as C-like field lists, registered in a
//! [`codec::TypeRegistry`], and decoded or re-encoded byte-exactly with
//! [`codec::ByteReader`] and [`codec::ByteWriter`].

/// Schema registry, cursor-based reader/writer, block model, and compression framing.
pub mod codec;
