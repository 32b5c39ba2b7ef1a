//! Shared test helpers for workspace crates.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static SCRATCH_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Resolve the workspace root path.
pub fn workspace_root() -> PathBuf {
	let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
	manifest_dir
		.join("..")
		.join("..")
		.canonicalize()
		.unwrap_or_else(|_| manifest_dir.join("..").join(".."))
}

/// Resolve the workspace target directory.
pub fn target_dir() -> PathBuf {
	std::env::var_os("CARGO_TARGET_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|| workspace_root().join("target"))
}

/// Fresh, not yet existing path under `<target>/segblock-scratch` ending in `name`.
///
/// Unique per process and call, so parallel tests never share a file.
pub fn scratch_path(name: &str) -> PathBuf {
	let dir = target_dir().join("segblock-scratch");
	std::fs::create_dir_all(&dir).expect("scratch dir is creatable");
	let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
	dir.join(format!("{}-{seq}-{name}", std::process::id()))
}

/// Write `bytes` to a fresh scratch file and return its path.
pub fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
	let path = scratch_path(name);
	std::fs::write(&path, bytes).expect("scratch file is writable");
	path
}

/// Serialize `doc` into a fresh scratch JSON file and return its path.
pub fn scratch_json(name: &str, doc: &serde_json::Value) -> PathBuf {
	let text = serde_json::to_string_pretty(doc).expect("json value serializes");
	scratch_file(name, text.as_bytes())
}
