use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

use segblock_testkit::{scratch_file, scratch_json, target_dir as workspace_target_dir};

static SEGBLOCK_BIN: OnceLock<PathBuf> = OnceLock::new();

/// Records `rec { s32 id; u16 x; u16 y; }` plus a sentinel-terminated `list`.
pub(crate) fn write_schema() -> PathBuf {
	scratch_json(
		"schema.json",
		&serde_json::json!({
			"byte_order": "big",
			"addr_mask": 0x00FF_FFFF,
			"vars": { "N": 2 },
			"types": [
				{ "name": "rec", "fields": ["s32 id", "u16 x", "u16 y"] },
				{ "name": "coord", "fields": ["s16 v[N]"] },
				{ "name": "list", "fields": ["u16 count", "u16 _pad_", "struct rec items[]", "u8 tail"] }
			],
			"end_markers": {
				"list.items": { "type": "s32", "sentinel": -1 }
			}
		}),
	)
}

/// Three `rec`s followed by the `0xFFFFFFFF` terminator and a tail byte, behind a list header.
pub(crate) fn list_bytes() -> Vec<u8> {
	let mut bytes = vec![0x00, 0x03, 0x00, 0x00];
	for (id, x, y) in [(1_i32, 10_u16, 11_u16), (2, 20, 21), (-3, 30, 31)] {
		bytes.extend(id.to_be_bytes());
		bytes.extend(x.to_be_bytes());
		bytes.extend(y.to_be_bytes());
	}
	bytes.extend([0xFF; 4]);
	bytes.push(0x7E);
	bytes
}

pub(crate) fn write_data(name: &str, bytes: &[u8]) -> PathBuf {
	scratch_file(name, bytes)
}

pub(crate) fn path_arg(path: &Path) -> String {
	path.to_string_lossy().into_owned()
}

pub(crate) fn run_segblock(args: &[&str]) -> Output {
	Command::new(segblock_bin()).args(args).output().expect("segblock command executes")
}

pub(crate) fn run_segblock_json(args: &[&str]) -> serde_json::Value {
	let output = run_segblock(args);
	assert!(
		output.status.success(),
		"segblock command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}

fn segblock_bin() -> &'static PathBuf {
	SEGBLOCK_BIN.get_or_init(resolve_segblock_bin)
}

fn resolve_segblock_bin() -> PathBuf {
	if let Ok(path) = std::env::var("CARGO_BIN_EXE_segblock") {
		return PathBuf::from(path);
	}

	let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
	let target_dir = workspace_target_dir();

	let mut bin = target_dir.join("debug");
	bin.push(if cfg!(windows) { "segblock.exe" } else { "segblock" });

	let status = Command::new("cargo")
		.current_dir(&manifest_dir)
		.args(["build", "--quiet", "--bin", "segblock"])
		.status()
		.expect("cargo build executes");
	assert!(status.success(), "failed to build segblock binary at {}", bin.display());

	bin
}
