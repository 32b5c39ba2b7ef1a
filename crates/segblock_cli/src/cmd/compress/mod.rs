use std::path::PathBuf;

use segblock::codec::{Framing, Result, compress, decompress};

#[derive(clap::Args)]
pub struct CompressArgs {
	pub input: PathBuf,
	pub output: PathBuf,
	/// `1172` for a bare stream, `1173` to prepend the 24-bit length.
	#[arg(long, default_value = "1173", value_parser = parse_framing)]
	pub framing: Framing,
}

#[derive(clap::Args)]
pub struct DecompressArgs {
	pub input: PathBuf,
	pub output: PathBuf,
}

fn parse_framing(raw: &str) -> std::result::Result<Framing, String> {
	match raw {
		"1172" => Ok(Framing::Bare),
		"1173" => Ok(Framing::Sized),
		other => Err(format!("unknown framing {other:?}, expected 1172 or 1173")),
	}
}

/// Pack a file behind a DEFLATE framing header.
pub fn run_compress(args: CompressArgs) -> Result<()> {
	let payload = std::fs::read(&args.input)?;
	let packed = compress(&payload, args.framing)?;
	std::fs::write(&args.output, &packed)?;
	println!("{} -> {} ({} -> {} bytes, {})", args.input.display(), args.output.display(), payload.len(), packed.len(), args.framing.as_str());
	Ok(())
}

/// Unpack a framed file, detecting the framing from its magic.
pub fn run_decompress(args: DecompressArgs) -> Result<()> {
	let packed = std::fs::read(&args.input)?;
	let framing = Framing::detect(&packed)?;
	let payload = decompress(&packed)?;
	std::fs::write(&args.output, &payload)?;
	println!("{} -> {} ({} -> {} bytes, {})", args.input.display(), args.output.display(), packed.len(), payload.len(), framing.as_str());
	Ok(())
}

#[cfg(test)]
mod tests;
