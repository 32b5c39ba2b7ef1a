use std::fmt::Write as _;

use segblock::codec::{DataBlock, Value};

/// Output truncation limits for decoded values.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
	/// Maximum number of fields printed for a single record.
	pub max_fields_per_block: usize,
	/// Maximum number of elements printed for arrays.
	pub max_array_items: usize,
	/// Maximum recursive print depth for nested arrays/records.
	pub max_print_depth: u32,
}

impl Default for PrintOptions {
	fn default() -> Self {
		Self {
			max_fields_per_block: 80,
			max_array_items: 16,
			max_print_depth: 6,
		}
	}
}

/// Render one decoded record, with a trailing newline.
pub fn render_block(block: &DataBlock, options: PrintOptions) -> String {
	let mut out = String::new();
	write_block(&mut out, block, 0, 0, options);
	out
}

fn write_value(out: &mut String, value: &Value, indent: usize, depth: u32, options: PrintOptions) {
	let pad = " ".repeat(indent);
	match value {
		Value::I64(v) => line(out, format_args!("{pad}{v}")),
		Value::U64(v) => line(out, format_args!("{pad}{v}")),
		Value::F32(v) => line(out, format_args!("{pad}{v}")),
		Value::F64(v) => line(out, format_args!("{pad}{v}")),
		Value::Ptr(v) => line(out, format_args!("{pad}{}", format_ptr(*v))),
		Value::Array(items) => {
			if depth >= options.max_print_depth {
				line(out, format_args!("{pad}[... {} items]", items.len()));
				return;
			}
			line(out, format_args!("{pad}["));
			for item in items.iter().take(options.max_array_items) {
				write_value(out, item, indent + 2, depth + 1, options);
			}
			if items.len() > options.max_array_items {
				line(out, format_args!("{pad}  ... {} more", items.len() - options.max_array_items));
			}
			line(out, format_args!("{pad}]"));
		}
		Value::Block(block) => write_block(out, block, indent, depth, options),
	}
}

fn write_block(out: &mut String, block: &DataBlock, indent: usize, depth: u32, options: PrintOptions) {
	let pad = " ".repeat(indent);
	if let Some(raw) = block.raw() {
		line(out, format_args!("{pad}{} bytes[{}]", block.type_name(), raw.len()));
		return;
	}
	if depth >= options.max_print_depth {
		line(out, format_args!("{pad}{} {{ ... }}", block.type_name()));
		return;
	}

	line(out, format_args!("{pad}{} {{", block.type_name()));
	for field in block.fields().iter().take(options.max_fields_per_block) {
		let _ = write!(out, "{pad}  {} = ", field.name);
		if matches!(field.value, Value::Block(_) | Value::Array(_)) {
			out.push('\n');
			write_value(out, &field.value, indent + 4, depth + 1, options);
		} else {
			write_value(out, &field.value, 0, depth + 1, options);
		}
	}
	if block.fields().len() > options.max_fields_per_block {
		line(out, format_args!("{pad}  ... {} more fields", block.fields().len() - options.max_fields_per_block));
	}
	line(out, format_args!("{pad}}}"));
}

fn line(out: &mut String, args: std::fmt::Arguments<'_>) {
	let _ = out.write_fmt(args);
	out.push('\n');
}

fn format_ptr(ptr: u32) -> String {
	let raw = format!("0x{ptr:08x}");
	if ptr == 0 {
		return format!("{raw} (null)");
	}
	format!("{raw} (seg 0x{:02x} +0x{:06x})", ptr >> 24, ptr & 0x00FF_FFFF)
}

/// JSON view of a decoded value. Pointers render as hex strings.
pub fn value_to_json(value: &Value) -> serde_json::Value {
	match value {
		Value::I64(v) => serde_json::Value::from(*v),
		Value::U64(v) => serde_json::Value::from(*v),
		Value::F32(v) => serde_json::Value::from(f64::from(*v)),
		Value::F64(v) => serde_json::Value::from(*v),
		Value::Ptr(v) => serde_json::Value::String(format!("0x{v:08x}")),
		Value::Array(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
		Value::Block(block) => block_to_json(block),
	}
}

/// JSON object of a record's fields keyed by declared name.
pub fn block_to_json(block: &DataBlock) -> serde_json::Value {
	if let Some(raw) = block.raw() {
		let hex: String = raw.iter().map(|byte| format!("{byte:02x}")).collect();
		return serde_json::json!({ "raw": hex });
	}
	let fields = block
		.fields()
		.iter()
		.map(|field| (field.name.to_string(), value_to_json(&field.value)))
		.collect::<serde_json::Map<_, _>>();
	serde_json::Value::Object(fields)
}
