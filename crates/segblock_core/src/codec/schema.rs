use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::{ByteReader, ByteWriter, CodecError, DecodeOptions, EndMarker, EndMarkers, Endianness, Primitive, Result, TypeRegistry, Vars};

/// JSON schema document describing a family of record layouts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
	/// Byte order of the described files.
	#[serde(default)]
	pub byte_order: Endianness,
	/// Mask applied to every seek address.
	#[serde(default = "default_addr_mask")]
	pub addr_mask: u32,
	/// Variables bound for every type.
	#[serde(default)]
	pub vars: Vars,
	/// Type declarations, registered in order.
	#[serde(default)]
	pub types: Vec<TypeSpec>,
	/// End markers for unbounded arrays, keyed by `field` or `type.field`.
	#[serde(default)]
	pub end_markers: BTreeMap<String, EndMarkerSpec>,
}

/// One named type in a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TypeSpec {
	/// Registered type name.
	pub name: String,
	/// Field declarations in order.
	pub fields: Vec<String>,
	/// Variables bound for this type only.
	#[serde(default)]
	pub vars: Vars,
}

/// End marker as written in a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndMarkerSpec {
	/// Primitive keyword of the peeked tag.
	#[serde(rename = "type")]
	pub primitive: String,
	/// Terminating value.
	pub sentinel: SentinelLit,
	/// Keep the terminating element.
	#[serde(default)]
	pub include_last: bool,
}

/// Sentinel literal: unsigned, negative, or a `0x` string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SentinelLit {
	/// Non-negative integer.
	Unsigned(u64),
	/// Negative integer, stored as two's complement bits.
	Signed(i64),
	/// Decimal or `0x`-prefixed hex text.
	Text(String),
}

fn default_addr_mask() -> u32 {
	u32::MAX
}

impl Default for SchemaFile {
	fn default() -> Self {
		Self {
			byte_order: Endianness::Big,
			addr_mask: default_addr_mask(),
			vars: Vars::new(),
			types: Vec::new(),
			end_markers: BTreeMap::new(),
		}
	}
}

impl SchemaFile {
	/// Read and parse a schema document from disk.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let text = fs::read_to_string(path)?;
		Self::from_json(&text)
	}

	/// Parse a schema document.
	pub fn from_json(text: &str) -> Result<Self> {
		Ok(serde_json::from_str(text)?)
	}

	/// Register every type. `overrides` beat per-type vars, which beat global vars.
	pub fn build_registry(&self, overrides: &Vars) -> Result<TypeRegistry> {
		let mut registry = TypeRegistry::new();
		for spec in &self.types {
			let mut vars = self.vars.clone();
			vars.extend(spec.vars.iter().map(|(name, value)| (name.clone(), *value)));
			vars.extend(overrides.iter().map(|(name, value)| (name.clone(), *value)));
			registry.register(&spec.name, &spec.fields, &vars)?;
		}
		log::debug!("schema registered {} types", self.types.len());
		Ok(registry)
	}

	/// Resolved end markers.
	pub fn end_markers(&self) -> Result<EndMarkers> {
		self.end_markers
			.iter()
			.map(|(field, spec)| -> Result<(String, EndMarker)> { Ok((field.clone(), spec.to_marker(field)?)) })
			.collect()
	}

	/// Decode options carrying this schema's end markers.
	pub fn decode_options(&self) -> Result<DecodeOptions> {
		Ok(DecodeOptions {
			end_markers: self.end_markers()?,
			..DecodeOptions::default()
		})
	}

	/// Reader configured with this schema's byte order, mask, and end markers.
	pub fn reader<'a>(&self, registry: &'a TypeRegistry, bytes: &'a [u8]) -> Result<ByteReader<'a>> {
		Ok(ByteReader::new(registry, bytes)
			.with_order(self.byte_order)
			.with_addr_mask(self.addr_mask)
			.with_options(self.decode_options()?))
	}

	/// Writer configured with this schema's byte order and end markers.
	pub fn writer<'a>(&self, registry: &'a TypeRegistry) -> Result<ByteWriter<'a>> {
		Ok(ByteWriter::new(registry).with_order(self.byte_order).with_end_markers(self.end_markers()?))
	}
}

impl EndMarkerSpec {
	fn to_marker(&self, field: &str) -> Result<EndMarker> {
		let err = |reason| CodecError::Parse {
			decl: format!("end marker {field}"),
			reason,
		};
		let primitive = Primitive::from_name(&self.primitive).ok_or_else(|| err("unknown end marker type"))?;
		let sentinel = match &self.sentinel {
			SentinelLit::Unsigned(value) => *value,
			SentinelLit::Signed(value) => *value as u64,
			SentinelLit::Text(text) => {
				let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
					Some(hex) => u64::from_str_radix(hex, 16),
					None => text.parse::<u64>(),
				};
				parsed.map_err(|_| err("invalid sentinel literal"))?
			}
		};
		Ok(EndMarker {
			primitive,
			sentinel,
			include_last: self.include_last,
		})
	}
}
