use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

use crate::codec::{CodecError, Result};

/// Upper bound on inflated output.
pub const MAX_DECOMPRESSED_BYTES: usize = 64 * 1024 * 1024;
const MAX_FRAMED_LEN: usize = 0x00FF_FFFF;

/// Header layout in front of a raw DEFLATE stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
	/// `11 72` magic directly followed by the stream.
	Bare,
	/// `11 73` magic, 24-bit big-endian uncompressed length, then the stream.
	Sized,
}

impl Framing {
	/// Two-byte magic identifying this framing.
	pub fn magic(self) -> [u8; 2] {
		match self {
			Self::Bare => [0x11, 0x72],
			Self::Sized => [0x11, 0x73],
		}
	}

	/// Stable label, the magic in hex.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Bare => "1172",
			Self::Sized => "1173",
		}
	}

	/// Detect the framing of a compressed buffer.
	pub fn detect(raw: &[u8]) -> Result<Self> {
		match raw {
			[0x11, 0x72, ..] => Ok(Self::Bare),
			[0x11, 0x73, ..] => Ok(Self::Sized),
			_ => Err(CodecError::UnknownMagic { magic: first2(raw) }),
		}
	}

	fn header_len(self) -> usize {
		match self {
			Self::Bare => 2,
			Self::Sized => 5,
		}
	}
}

/// Frame `payload` as a raw DEFLATE stream behind the given header.
///
/// Payloads larger than [`decompress`] will inflate are rejected.
pub fn compress(payload: &[u8], framing: Framing) -> Result<Vec<u8>> {
	if payload.len() > MAX_DECOMPRESSED_BYTES {
		return Err(CodecError::DecompressedTooLarge { limit: MAX_DECOMPRESSED_BYTES });
	}
	let mut out = framing.magic().to_vec();
	if framing == Framing::Sized {
		if payload.len() > MAX_FRAMED_LEN {
			return Err(CodecError::LengthOverflow { len: payload.len() });
		}
		out.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
	}

	let mut encoder = DeflateEncoder::new(out, Compression::best());
	encoder.write_all(payload)?;
	let out = encoder.finish()?;
	log::debug!("compressed {} bytes to {} ({})", payload.len(), out.len(), framing.as_str());
	Ok(out)
}

/// Inflate a framed buffer produced by [`compress`] or the game's own packer.
pub fn decompress(raw: &[u8]) -> Result<Vec<u8>> {
	let framing = Framing::detect(raw)?;
	let header = raw.get(..framing.header_len()).ok_or(CodecError::Bounds {
		at: 0,
		need: framing.header_len(),
		len: raw.len(),
	})?;
	let expected = match framing {
		Framing::Bare => None,
		Framing::Sized => Some((usize::from(header[2]) << 16) | (usize::from(header[3]) << 8) | usize::from(header[4])),
	};

	let out = inflate(&raw[framing.header_len()..])?;
	if let Some(expected) = expected.filter(|expected| *expected != out.len()) {
		return Err(CodecError::LengthMismatch { expected, actual: out.len() });
	}

	log::debug!("decompressed {} bytes to {} ({})", raw.len(), out.len(), framing.as_str());
	Ok(out)
}

fn inflate(stream: &[u8]) -> Result<Vec<u8>> {
	let mut decoder = DeflateDecoder::new(stream);
	let mut out = Vec::new();
	let mut buf = [0_u8; 8192];

	loop {
		let read = decoder.read(&mut buf)?;
		if read == 0 {
			break;
		}

		if out.len() + read > MAX_DECOMPRESSED_BYTES {
			return Err(CodecError::DecompressedTooLarge { limit: MAX_DECOMPRESSED_BYTES });
		}

		out.extend_from_slice(&buf[..read]);
	}

	Ok(out)
}

fn first2(bytes: &[u8]) -> [u8; 2] {
	let mut magic = [0_u8; 2];
	let take = bytes.len().min(2);
	magic[..take].copy_from_slice(&bytes[..take]);
	magic
}

#[cfg(test)]
mod tests {
	use super::{Framing, MAX_DECOMPRESSED_BYTES, compress, decompress};
	use crate::codec::CodecError;

	#[test]
	fn empty_payload_round_trips_in_both_framings() {
		for framing in [Framing::Bare, Framing::Sized] {
			let packed = compress(&[], framing).expect("compresses");
			assert_eq!(packed[..2], framing.magic());
			assert_eq!(decompress(&packed).expect("decompresses"), Vec::<u8>::new());
		}
	}

	#[test]
	fn one_megabyte_of_repeated_bytes_round_trips() {
		let payload = vec![0xA5_u8; 1024 * 1024];
		for framing in [Framing::Bare, Framing::Sized] {
			let packed = compress(&payload, framing).expect("compresses");
			assert!(packed.len() < payload.len() / 100, "repeated bytes should shrink");
			assert_eq!(decompress(&packed).expect("decompresses"), payload);
		}
	}

	#[test]
	fn mixed_payload_round_trips() {
		let payload: Vec<u8> = (0..50_000_u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8).collect();
		let packed = compress(&payload, Framing::Sized).expect("compresses");
		assert_eq!(decompress(&packed).expect("decompresses"), payload);
	}

	#[test]
	fn sized_header_stores_big_endian_length() {
		let packed = compress(&[1, 2, 3], Framing::Sized).expect("compresses");
		assert_eq!(&packed[..5], &[0x11, 0x73, 0x00, 0x00, 0x03]);
	}

	#[test]
	fn unknown_magic_is_rejected() {
		assert!(matches!(decompress(&[0x1F, 0x8B, 0x08]), Err(CodecError::UnknownMagic { magic: [0x1F, 0x8B] })));
		assert!(matches!(decompress(&[]), Err(CodecError::UnknownMagic { .. })));
	}

	#[test]
	fn length_mismatch_is_detected() {
		let mut packed = compress(&[7; 32], Framing::Sized).expect("compresses");
		packed[4] = 31;
		assert!(matches!(decompress(&packed), Err(CodecError::LengthMismatch { expected: 31, actual: 32 })));
	}

	#[test]
	fn payloads_past_the_inflate_limit_are_refused() {
		let payload = vec![0_u8; MAX_DECOMPRESSED_BYTES + 1];
		assert!(matches!(compress(&payload, Framing::Bare), Err(CodecError::DecompressedTooLarge { .. })));
		assert!(matches!(compress(&payload, Framing::Sized), Err(CodecError::DecompressedTooLarge { .. })));
	}

	#[test]
	fn truncated_sized_header_is_a_bounds_error() {
		assert!(matches!(decompress(&[0x11, 0x73, 0x00]), Err(CodecError::Bounds { .. })));
	}
}
