/*!
# Burnbox: Build
*/

use argyle::KeyWordsBuilder;
use std::path::PathBuf;



/// # Set Up CLI Arguments.
fn main() {
	println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");

	let mut builder = KeyWordsBuilder::default();
	builder.push_commands([
		"blank",
		"disk-info",
		"drive-info",
		"read-cd",
		"read-toc",
		"simulate",
		"write",
	]);
	builder.push_keys([
		"--eject",
		"--force",
		"-h", "--help",
		"--minimal",
		"--multi",
		"--raw",
		"--remote",
		"--scan",
		"--simulate",
		"--sync",
		"-v", "--verbose",
		"-V", "--version",
	]);
	builder.push_keys_with_values([
		"--buffers",
		"--catalog",
		"-d", "--dev",
		"-o", "--output",
		"--pregap",
		"--session",
		"-s", "--speed",
	]);
	builder.save(out_path("argyle.rs"));
}

/// # Output Path.
///
/// Append the sub-path to OUT_DIR and return it.
fn out_path(stub: &str) -> PathBuf {
	std::fs::canonicalize(std::env::var("OUT_DIR").expect("Missing OUT_DIR."))
		.expect("Missing OUT_DIR.")
		.join(stub)
}
