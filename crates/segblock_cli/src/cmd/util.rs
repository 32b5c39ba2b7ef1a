use std::path::Path;

use segblock::codec::{CodecError, Result, SchemaFile, TypeRegistry, Vars, decompress};

/// Parse repeated `NAME=VALUE` overrides. Values accept decimal or `0x` hex.
pub fn parse_vars(raw: &[String]) -> Result<Vars> {
	raw.iter()
		.map(|item| {
			let bad = || CodecError::Parse {
				decl: item.clone(),
				reason: "expected NAME=VALUE",
			};
			let (name, value) = item.split_once('=').ok_or_else(bad)?;
			let name = name.trim();
			if name.is_empty() {
				return Err(bad());
			}
			Ok((name.to_owned(), parse_int(value.trim()).ok_or_else(bad)?))
		})
		.collect()
}

/// Parse a decimal or `0x`-prefixed address.
pub fn parse_addr(raw: &str) -> Result<usize> {
	parse_int(raw)
		.and_then(|value| usize::try_from(value).ok())
		.ok_or_else(|| CodecError::Parse {
			decl: raw.to_owned(),
			reason: "expected a non-negative decimal or 0x address",
		})
}

fn parse_int(raw: &str) -> Option<i64> {
	let (negative, digits) = match raw.strip_prefix('-') {
		Some(rest) => (true, rest),
		None => (false, raw),
	};
	let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
		Some(hex) => i64::from_str_radix(hex, 16).ok()?,
		None => digits.parse::<i64>().ok()?,
	};
	Some(if negative { -value } else { value })
}

/// Load a schema document and register its types with CLI overrides applied.
pub fn load_schema(path: &Path, vars: &[String]) -> Result<(SchemaFile, TypeRegistry)> {
	let schema = SchemaFile::load(path)?;
	let registry = schema.build_registry(&parse_vars(vars)?)?;
	Ok((schema, registry))
}

/// Read an input file, inflating it first when asked.
pub fn read_input(path: &Path, inflate: bool) -> Result<Vec<u8>> {
	let bytes = std::fs::read(path)?;
	if inflate { decompress(&bytes) } else { Ok(bytes) }
}

/// Render an address the way every command prints them.
pub fn addr_hex(addr: usize) -> String {
	format!("0x{addr:06x}")
}

/// Print a serializable payload as pretty JSON on stdout.
pub fn emit_json<T: serde::Serialize>(payload: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(payload)?);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::{addr_hex, parse_addr, parse_vars};

	#[test]
	fn vars_accept_decimal_hex_and_negatives() {
		let vars = parse_vars(&["N=4".to_owned(), "MASK=0x10".to_owned(), "OFF = -2".to_owned()]).expect("parses");
		assert_eq!(vars["N"], 4);
		assert_eq!(vars["MASK"], 16);
		assert_eq!(vars["OFF"], -2);
	}

	#[test]
	fn malformed_vars_are_rejected() {
		assert!(parse_vars(&["N".to_owned()]).is_err());
		assert!(parse_vars(&["=3".to_owned()]).is_err());
		assert!(parse_vars(&["N=three".to_owned()]).is_err());
	}

	#[test]
	fn addresses_parse_and_render() {
		assert_eq!(parse_addr("0x05000010").expect("parses"), 0x0500_0010);
		assert_eq!(parse_addr("32").expect("parses"), 32);
		assert!(parse_addr("-1").is_err());
		assert_eq!(addr_hex(0x120), "0x000120");
	}
}
