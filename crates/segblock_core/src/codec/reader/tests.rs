use super::{ByteReader, DecodeOptions, EndMarker};
use crate::codec::{CodecError, Endianness, Primitive, SegmentTable, TypeRegistry, Value, Vars, parse_field_decl};

fn record_registry() -> TypeRegistry {
	let mut registry = TypeRegistry::new();
	registry.register("rec", &["s32 id", "u16 x", "u16 y"], &Vars::new()).expect("registers");
	registry
		.register("list", &["u16 count", "u16 _pad_", "struct rec items[]", "u8 tail"], &Vars::new())
		.expect("registers");
	registry
}

fn record_bytes(id: i32, x: u16, y: u16) -> Vec<u8> {
	let mut out = id.to_be_bytes().to_vec();
	out.extend(x.to_be_bytes());
	out.extend(y.to_be_bytes());
	out
}

fn three_records_then_sentinel() -> Vec<u8> {
	let mut bytes = Vec::new();
	bytes.extend(record_bytes(1, 10, 11));
	bytes.extend(record_bytes(2, 20, 21));
	bytes.extend(record_bytes(3, 30, 31));
	bytes.extend([0xFF; 4]);
	bytes.push(0x7E);
	bytes
}

#[test]
fn primitives_decode_in_configured_order() {
	let registry = TypeRegistry::new();
	let bytes = [0x12, 0x34, 0xFF, 0xFE];

	let mut reader = ByteReader::new(&registry, &bytes);
	assert_eq!(reader.read_primitive(Primitive::U16).expect("reads"), Value::U64(0x1234));
	assert_eq!(reader.read_primitive(Primitive::S16).expect("reads"), Value::I64(-2));
	assert_eq!(reader.pos(), 4);

	let mut reader = ByteReader::new(&registry, &bytes).with_order(Endianness::Little);
	assert_eq!(reader.read_primitive(Primitive::U16).expect("reads"), Value::U64(0x3412));
}

#[test]
fn reads_past_the_end_are_bounds_errors() {
	let registry = TypeRegistry::new();
	let bytes = [0x00, 0x01, 0x02];
	let mut reader = ByteReader::new(&registry, &bytes);

	let err = reader.read_primitive(Primitive::U32).expect_err("must fail");
	assert!(matches!(err, CodecError::Bounds { at: 0, need: 4, len: 3 }));
	assert_eq!(reader.pos(), 0, "failed reads do not move the cursor");
	assert!(matches!(reader.set_cursor(4), Err(CodecError::Bounds { .. })));
}

#[test]
fn peek_does_not_advance() {
	let registry = TypeRegistry::new();
	let bytes = [0x00, 0x01, 0x00, 0x02, 0x00, 0x03];
	let mut reader = ByteReader::new(&registry, &bytes);

	assert_eq!(reader.peek(Primitive::U16).expect("peeks"), Value::U64(1));
	assert_eq!(
		reader.peek_n(Primitive::U16, 3).expect("peeks"),
		vec![Value::U64(1), Value::U64(2), Value::U64(3)]
	);
	assert_eq!(reader.pos(), 0);
	assert!(reader.peek_n(Primitive::U16, 4).is_err());

	reader.read_primitive(Primitive::U16).expect("reads");
	assert_eq!(reader.peek(Primitive::U16).expect("peeks"), Value::U64(2));
}

#[test]
fn sentinel_terminated_array_stops_after_the_marker() {
	let registry = record_registry();
	let bytes = three_records_then_sentinel();
	let mut reader = ByteReader::new(&registry, &bytes);
	let field = parse_field_decl("struct rec items[]", &Vars::new()).expect("parses");
	let marker = EndMarker::new(Primitive::S32, 0xFFFF_FFFF);

	let items = reader.read_array(&field, Some(&marker)).expect("reads");
	assert_eq!(items.len(), 3);
	let ids: Vec<_> = items
		.iter()
		.map(|item| item.as_block().and_then(|block| block.get("id")).cloned())
		.collect();
	assert_eq!(ids, vec![Some(Value::I64(1)), Some(Value::I64(2)), Some(Value::I64(3))]);
	assert_eq!(reader.pos(), 3 * 8 + 4, "cursor sits right after the sentinel");
}

#[test]
fn include_last_keeps_the_terminating_record() {
	let registry = record_registry();
	let mut bytes = three_records_then_sentinel();
	bytes.extend([0x00, 0x05, 0x00, 0x06]);
	let mut reader = ByteReader::new(&registry, &bytes);
	let field = parse_field_decl("struct rec items[]", &Vars::new()).expect("parses");
	let marker = EndMarker::new(Primitive::S32, 0xFFFF_FFFF).including_last();

	let items = reader.read_array(&field, Some(&marker)).expect("reads");
	assert_eq!(items.len(), 4);
	let last = items[3].as_block().expect("block");
	assert_eq!(last.get("id"), Some(&Value::I64(-1)));
	assert_eq!(reader.pos(), 4 * 8);
}

#[test]
fn immediate_sentinel_yields_empty_array() {
	let registry = record_registry();
	let bytes = [0xFF, 0xFF, 0xFF, 0xFF];
	let mut reader = ByteReader::new(&registry, &bytes);
	let field = parse_field_decl("struct rec items[]", &Vars::new()).expect("parses");

	let items = reader.read_array(&field, Some(&EndMarker::new(Primitive::S32, 0xFFFF_FFFF))).expect("reads");
	assert!(items.is_empty());
	assert_eq!(reader.pos(), 4);
}

#[test]
fn missing_sentinel_is_truncation() {
	let registry = record_registry();
	let bytes = record_bytes(1, 2, 3);
	let mut reader = ByteReader::new(&registry, &bytes);
	let field = parse_field_decl("struct rec items[]", &Vars::new()).expect("parses");

	let err = reader
		.read_array(&field, Some(&EndMarker::new(Primitive::S32, 0xFFFF_FFFF)))
		.expect_err("must fail");
	assert!(matches!(err, CodecError::TruncatedSentinel { at: 8, .. }));
}

#[test]
fn unbounded_array_without_marker_fails() {
	let registry = record_registry();
	let bytes = three_records_then_sentinel();
	let mut reader = ByteReader::new(&registry, &bytes);
	let field = parse_field_decl("u32 words[]", &Vars::new()).expect("parses");
	assert!(matches!(reader.read_array(&field, None), Err(CodecError::MissingEndMarker { .. })));
}

#[test]
fn read_block_uses_field_end_markers() {
	let registry = record_registry();
	let mut bytes = vec![0x00, 0x03, 0x00, 0x00];
	bytes.extend(three_records_then_sentinel());
	let mut reader = ByteReader::new(&registry, &bytes).with_end_marker("list.items", EndMarker::new(Primitive::S32, 0xFFFF_FFFF));

	let block = reader.read_block("list").expect("reads");
	assert_eq!(block.read_addr(), Some(0));
	assert_eq!(block.get("count"), Some(&Value::U64(3)));
	assert_eq!(block.get("items").and_then(Value::as_array).map(<[Value]>::len), Some(3));
	assert_eq!(block.get("tail"), Some(&Value::U64(0x7E)));
	assert_eq!(reader.remaining(), 0);
}

#[test]
fn fixed_arrays_flatten_every_dimension() {
	let mut registry = TypeRegistry::new();
	let vars: Vars = [("N".to_owned(), 2)].into_iter().collect();
	registry.register("mesh", &["s16 vertices[N][3]"], &vars).expect("registers");
	let bytes: Vec<u8> = (1..=6_i16).flat_map(|v| (-v).to_be_bytes()).collect();

	let block = ByteReader::new(&registry, &bytes).read_block("mesh").expect("reads");
	let values = block.get("vertices").and_then(Value::as_array).expect("array");
	assert_eq!(values.len(), 6);
	assert_eq!(values[5], Value::I64(-6));
}

#[test]
fn nested_blocks_and_union_aliases() {
	let mut registry = TypeRegistry::new();
	registry.register("coord", &["f32 x", "f32 y", "f32 z"], &Vars::new()).expect("registers");
	registry
		.register("node", &["u16 type", "u16 _pad_", "struct coord pos", "Gfx *gdl|child"], &Vars::new())
		.expect("registers");

	let mut bytes = vec![0x00, 0x18, 0x00, 0x00];
	for v in [1.0_f32, 2.0, -3.5] {
		bytes.extend(v.to_be_bytes());
	}
	bytes.extend([0x05, 0x00, 0x01, 0x20]);

	let block = ByteReader::new(&registry, &bytes).read_block("node").expect("reads");
	let pos = block.get("pos").and_then(Value::as_block).expect("nested");
	assert_eq!(pos.get("z"), Some(&Value::F32(-3.5)));
	assert_eq!(pos.read_addr(), Some(4));
	assert_eq!(block.get("gdl"), Some(&Value::Ptr(0x0500_0120)));
	assert_eq!(block.get("child"), block.get("gdl"));
	assert_eq!(block.fields().len(), 4);
}

#[test]
fn set_cursor_applies_address_mask() {
	let registry = TypeRegistry::new();
	let bytes = [0x00, 0x00, 0xAB, 0xCD];
	let mut reader = ByteReader::new(&registry, &bytes).with_addr_mask(0x00FF_FFFF);

	reader.set_cursor(0x0500_0002).expect("seeks");
	assert_eq!(reader.pos(), 2);
	assert_eq!(reader.read_primitive(Primitive::U16).expect("reads"), Value::U64(0xABCD));
}

#[test]
fn seek_ptr_resolves_segment_tags() {
	let registry = TypeRegistry::new();
	let bytes = [0_u8; 16];
	let mut reader = ByteReader::new(&registry, &bytes);
	let table = SegmentTable::default();

	let ptr = reader.seek_ptr(0x0500_0008, &table).expect("seeks").expect("not null");
	assert_eq!(ptr.tag, 0x05);
	assert_eq!(reader.pos(), 8);

	reader.seek_ptr(0, &table).expect("null is fine");
	assert_eq!(reader.pos(), 8, "null pointers do not move the cursor");

	assert!(matches!(reader.seek_ptr(0x0900_0008, &table), Err(CodecError::UnknownSegmentTag { .. })));
	assert!(matches!(reader.seek_ptr(0x0500_0010, &table), Err(CodecError::Bounds { .. })));
}

#[test]
fn backward_references_can_be_revisited() {
	let registry = record_registry();
	let bytes = three_records_then_sentinel();
	let mut reader = ByteReader::new(&registry, &bytes);

	reader.set_cursor(16).expect("seeks");
	let third = reader.read_block("rec").expect("reads");
	reader.set_cursor(0).expect("seeks");
	let first = reader.read_block("rec").expect("reads");

	assert_eq!(third.get("id"), Some(&Value::I64(3)));
	assert_eq!(first.get("id"), Some(&Value::I64(1)));
	assert_eq!(third.read_addr(), Some(16));
}

#[test]
fn depth_limit_stops_runaway_nesting() {
	let mut registry = TypeRegistry::new();
	registry.register("loop", &["u8 tag", "struct loop inner"], &Vars::new()).expect("registers");
	let bytes = [0_u8; 64];
	let options = DecodeOptions {
		max_depth: 4,
		..DecodeOptions::default()
	};

	let err = ByteReader::new(&registry, &bytes).with_options(options).read_block("loop").expect_err("must fail");
	assert!(matches!(err, CodecError::DecodeDepthExceeded { max_depth: 4 }));
}

#[test]
fn read_blocks_reads_consecutive_records() {
	let registry = record_registry();
	let bytes = three_records_then_sentinel();
	let blocks = ByteReader::new(&registry, &bytes).read_blocks("rec", 3).expect("reads");
	assert_eq!(blocks.iter().map(|block| block.read_addr()).collect::<Vec<_>>(), vec![Some(0), Some(8), Some(16)]);
}

#[test]
fn captured_declarations_survive_rebinding() {
	let mut registry = TypeRegistry::new();
	let two: Vars = [("N".to_owned(), 2)].into_iter().collect();
	let old = registry.register("strip", &["u8 data[N]"], &two).expect("registers");
	let three: Vars = [("N".to_owned(), 3)].into_iter().collect();
	registry.rebind("strip", &three).expect("rebinds");
	let bytes = [1_u8, 2, 3, 4];

	let mut reader = ByteReader::new(&registry, &bytes);
	let captured = reader.read_block_decl(&old).expect("reads");
	assert_eq!(captured.get("data").and_then(Value::as_array).map(<[Value]>::len), Some(2));
	assert_eq!(reader.pos(), 2);

	reader.set_cursor(0).expect("seeks");
	let current = reader.read_block("strip").expect("reads");
	assert_eq!(current.get("data").and_then(Value::as_array).map(<[Value]>::len), Some(3));
	assert_eq!(reader.bytes().len(), 4);
	assert_eq!(reader.order(), Endianness::Big);
}
