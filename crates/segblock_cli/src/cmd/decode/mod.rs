use std::path::PathBuf;

use segblock::codec::Result;

use crate::cmd::print::{PrintOptions, block_to_json, render_block};
use crate::cmd::util::{addr_hex, emit_json, load_schema, parse_addr, read_input};

#[derive(clap::Args)]
pub struct Args {
	pub schema: PathBuf,
	pub file: PathBuf,
	#[arg(long = "type")]
	pub type_name: String,
	/// Start offset; the schema's address mask is applied first.
	#[arg(long)]
	pub at: Option<String>,
	/// Number of consecutive records to decode.
	#[arg(long, default_value_t = 1)]
	pub count: usize,
	#[arg(long = "var")]
	pub vars: Vec<String>,
	/// Inflate a 1172/1173 framed input before decoding.
	#[arg(long)]
	pub inflate: bool,
	#[arg(long = "max-array-items", default_value_t = 16)]
	pub max_array_items: usize,
	#[arg(long = "max-depth", default_value_t = 6)]
	pub max_depth: u32,
	#[arg(long)]
	pub json: bool,
}

/// Decode and print consecutive records of one type.
pub fn run(args: Args) -> Result<()> {
	let (schema, registry) = load_schema(&args.schema, &args.vars)?;
	let bytes = read_input(&args.file, args.inflate)?;

	let mut reader = schema.reader(&registry, &bytes)?;
	if let Some(at) = &args.at {
		reader.set_cursor(parse_addr(at)?)?;
	}
	let start = reader.pos();
	let blocks = reader.read_blocks(&args.type_name, args.count)?;
	let end = reader.pos();
	log::debug!("decoded {} x {} over 0x{start:x}..0x{end:x}", blocks.len(), args.type_name);

	if args.json {
		return emit_json(&DecodeJson {
			path: args.file.display().to_string(),
			type_name: args.type_name,
			start: addr_hex(start),
			end: addr_hex(end),
			records: blocks
				.iter()
				.map(|block| RecordJson {
					addr: addr_hex(block.read_addr().unwrap_or(start)),
					fields: block_to_json(block),
				})
				.collect(),
		});
	}

	let options = PrintOptions {
		max_array_items: args.max_array_items,
		max_print_depth: args.max_depth,
		..PrintOptions::default()
	};
	println!("path: {}", args.file.display());
	println!("type: {}", args.type_name);
	println!("range: {}..{}", addr_hex(start), addr_hex(end));
	for block in &blocks {
		println!();
		println!("@{}", addr_hex(block.read_addr().unwrap_or(start)));
		print!("{}", render_block(block, options));
	}
	Ok(())
}

#[derive(serde::Serialize)]
struct RecordJson {
	addr: String,
	fields: serde_json::Value,
}

#[derive(serde::Serialize)]
struct DecodeJson {
	path: String,
	#[serde(rename = "type")]
	type_name: String,
	start: String,
	end: String,
	records: Vec<RecordJson>,
}
