use segblock_testkit::scratch_path;

use super::parse_framing;
use crate::cmd::test_support::{list_bytes, path_arg, run_segblock, write_data};

#[test]
fn framing_flag_accepts_both_magics() {
	assert_eq!(parse_framing("1172").expect("parses").as_str(), "1172");
	assert_eq!(parse_framing("1173").expect("parses").as_str(), "1173");
	assert!(parse_framing("gzip").is_err());
}

#[test]
fn compress_then_decompress_restores_the_file() {
	let payload: Vec<u8> = list_bytes().repeat(64);
	let input = write_data("payload.bin", &payload);
	for framing in ["1172", "1173"] {
		let packed = scratch_path("payload.packed");
		let restored = scratch_path("payload.restored");

		let output = run_segblock(&["compress", &path_arg(&input), &path_arg(&packed), "--framing", framing]);
		assert!(output.status.success(), "compress should succeed");
		let header = std::fs::read(&packed).expect("packed file exists");
		assert_eq!(header[0], 0x11);
		assert_eq!(format!("{:02x}{:02x}", header[0], header[1]), framing);

		let output = run_segblock(&["decompress", &path_arg(&packed), &path_arg(&restored)]);
		assert!(output.status.success(), "decompress should succeed");
		let stdout = String::from_utf8(output.stdout).expect("stdout is utf8");
		assert!(stdout.contains(framing));
		assert_eq!(std::fs::read(&restored).expect("restored file exists"), payload);
	}
}

#[test]
fn decompress_rejects_unknown_magic() {
	let input = write_data("not-packed.bin", &[0x1F, 0x8B, 0x08, 0x00]);
	let output = run_segblock(&["decompress", &path_arg(&input), &path_arg(&scratch_path("never.bin"))]);

	assert!(!output.status.success());
	let stderr = String::from_utf8(output.stderr).expect("stderr is utf8");
	assert!(stderr.contains("magic"), "unexpected stderr: {stderr}");
}
