/// Compression framing commands.
pub mod compress;
/// Record decode command.
pub mod decode;
/// Type layout listing.
pub mod layout;
/// Pretty printer and JSON view of decoded values.
pub mod print;
/// Decode/encode symmetry check.
pub mod roundtrip;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
