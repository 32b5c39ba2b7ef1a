use std::path::PathBuf;

use segblock::codec::{ArrayLen, FieldKind, Result, TypeDecl, TypeRegistry};

use crate::cmd::util::{emit_json, load_schema};

#[derive(clap::Args)]
pub struct Args {
	pub schema: PathBuf,
	/// Only show this type.
	#[arg(long = "type")]
	pub type_name: Option<String>,
	/// Override a schema variable, `NAME=VALUE`.
	#[arg(long = "var")]
	pub vars: Vec<String>,
	#[arg(long)]
	pub json: bool,
}

/// Print static sizes and field offsets of registered types.
pub fn run(args: Args) -> Result<()> {
	let (_, registry) = load_schema(&args.schema, &args.vars)?;

	let names: Vec<String> = match args.type_name {
		Some(name) => {
			registry.decl(&name)?;
			vec![name]
		}
		None => registry.names().map(str::to_owned).collect(),
	};

	let types = names
		.iter()
		.map(|name| registry.decl(name).map(|decl| type_layout(&registry, decl)))
		.collect::<Result<Vec<_>>>()?;

	if args.json {
		return emit_json(&LayoutJson {
			schema: args.schema.display().to_string(),
			types,
		});
	}

	println!("schema: {}", args.schema.display());
	for item in &types {
		println!();
		println!("{} size={}", item.name, render_opt(item.size));
		println!("offset\tsize\tcount\tkind\tfield");
		for field in &item.fields {
			println!(
				"{}\t{}\t{}\t{}\t{}",
				render_opt(field.offset),
				render_opt(field.size),
				field.count.map_or_else(|| "[]".to_owned(), |count| count.to_string()),
				field.kind,
				field.name
			);
		}
	}
	Ok(())
}

/// Offsets become unknown after the first runtime-sized field.
fn type_layout(registry: &TypeRegistry, decl: &TypeDecl) -> TypeJson {
	let mut offset = Some(0_usize);
	let fields = decl
		.fields
		.iter()
		.map(|field| {
			let size = registry.field_size(decl, field).ok();
			let row = FieldJson {
				name: field.field_name.to_string(),
				kind: kind_label(&field.kind, field.array),
				offset,
				size,
				count: field.array_size(),
			};
			offset = offset.zip(size).map(|(at, size)| at + size);
			row
		})
		.collect();

	TypeJson {
		name: decl.name.to_string(),
		size: registry.size_of_decl(decl).ok(),
		fields,
	}
}

fn kind_label(kind: &FieldKind, array: ArrayLen) -> String {
	let base = match kind {
		FieldKind::Primitive(primitive) => primitive.name().to_owned(),
		FieldKind::Struct(name) => format!("struct {name}"),
		FieldKind::Pointer(name) => format!("{name}*"),
	};
	match array {
		ArrayLen::Scalar => base,
		ArrayLen::Fixed(count) => format!("{base}[{count}]"),
		ArrayLen::Unbounded => format!("{base}[]"),
	}
}

fn render_opt(value: Option<usize>) -> String {
	value.map_or_else(|| "?".to_owned(), |value| value.to_string())
}

#[derive(serde::Serialize)]
struct FieldJson {
	name: String,
	kind: String,
	offset: Option<usize>,
	size: Option<usize>,
	count: Option<usize>,
}

#[derive(serde::Serialize)]
struct TypeJson {
	name: String,
	size: Option<usize>,
	fields: Vec<FieldJson>,
}

#[derive(serde::Serialize)]
struct LayoutJson {
	schema: String,
	types: Vec<TypeJson>,
}
