use std::path::PathBuf;
use std::process::ExitCode;

use segblock::codec::Result;

use crate::cmd::util::{addr_hex, emit_json, load_schema, parse_addr, read_input};

#[derive(clap::Args)]
pub struct Args {
	pub schema: PathBuf,
	pub file: PathBuf,
	#[arg(long = "type")]
	pub type_name: String,
	#[arg(long)]
	pub at: Option<String>,
	#[arg(long, default_value_t = 1)]
	pub count: usize,
	#[arg(long = "var")]
	pub vars: Vec<String>,
	#[arg(long)]
	pub inflate: bool,
	#[arg(long)]
	pub json: bool,
}

/// Decode records, re-encode them, and compare against the source bytes.
///
/// Exits with status 2 when the re-encoded bytes differ.
pub fn run(args: Args) -> Result<ExitCode> {
	let (schema, registry) = load_schema(&args.schema, &args.vars)?;
	let bytes = read_input(&args.file, args.inflate)?;

	let mut reader = schema.reader(&registry, &bytes)?;
	if let Some(at) = &args.at {
		reader.set_cursor(parse_addr(at)?)?;
	}
	let start = reader.pos();
	let mut blocks = reader.read_blocks(&args.type_name, args.count)?;
	let end = reader.pos();

	let writer = schema.writer(&registry)?;
	let mut out = Vec::with_capacity(end - start);
	for block in &mut blocks {
		writer.write_block(&mut out, block, 1)?;
	}

	let original = &bytes[start..end];
	let first_diff = original
		.iter()
		.zip(&out)
		.position(|(a, b)| a != b)
		.or_else(|| (original.len() != out.len()).then(|| original.len().min(out.len())));
	let identical = first_diff.is_none();
	log::debug!("re-encoded {} bytes against {} source bytes", out.len(), original.len());

	if args.json {
		emit_json(&RoundtripJson {
			type_name: args.type_name,
			start: addr_hex(start),
			decoded_len: original.len(),
			encoded_len: out.len(),
			identical,
			first_diff: first_diff.map(|at| addr_hex(start + at)),
		})?;
	} else {
		println!("type: {}", args.type_name);
		println!("range: {}..{}", addr_hex(start), addr_hex(end));
		println!("decoded_len: {}", original.len());
		println!("encoded_len: {}", out.len());
		println!("identical: {identical}");
		if let Some(at) = first_diff {
			println!("first_diff: {}", addr_hex(start + at));
		}
	}

	Ok(if identical { ExitCode::SUCCESS } else { ExitCode::from(2) })
}

#[derive(serde::Serialize)]
struct RoundtripJson {
	#[serde(rename = "type")]
	type_name: String,
	start: String,
	decoded_len: usize,
	encoded_len: usize,
	identical: bool,
	first_diff: Option<String>,
}
