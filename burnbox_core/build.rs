/*!
# Burnbox: Build

This parses the driver table into a constant array that can be searched at
runtime.
*/

use std::{
	env,
	fs::File,
	io::Write,
	path::PathBuf,
};



/// # Known Driver Kinds.
const KINDS: [(&str, &str); 2] = [
	("generic-mmc", "DriverKind::Mmc"),
	("generic-mmc-raw", "DriverKind::MmcRaw"),
];

/// # Known Options.
///
/// These must match the constants on `DriverOptions`.
const OPTIONS: [&str; 12] = [
	"CD_TEXT",
	"GET_TOC_GENERIC",
	"NO_BURNPROOF",
	"NO_CDTEXT_READ",
	"NO_OPC",
	"NO_PREGAP_READ",
	"NO_SUBCHAN_READ",
	"PQ_BCD",
	"RAW_TOC_BCD",
	"RAW_TOC_HEX",
	"SWAP_READ_SAMPLES",
	"USE_PQ",
];



/// # Main.
fn main() {
	println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");
	println!("cargo:rerun-if-changed=skel");

	let raw = std::fs::read_to_string("skel/drivers.txt")
		.expect("Unable to open skel/drivers.txt");

	let mut entries = Vec::new();
	for line in raw.lines() {
		let line = line.trim_end();
		if line.is_empty() || line.starts_with('#') { continue; }
		match parse_line(line) {
			Some(entry) => entries.push(entry),
			None => println!("cargo:warning=Invalid driver line: {line}."),
		}
	}

	if entries.is_empty() { panic!("No drivers could be parsed."); }

	// Announce the total for reference.
	if env::var("SHOW_TOTALS").is_ok() {
		println!("cargo:warning=Drivers: {}", entries.len());
	}

	let data = format!(
		r#"
/// # Driver Table.
const DRIVER_TABLE: [DriverEntry; {}] = [
{}
];
"#,
		entries.len(),
		entries.join("\n"),
	);

	File::create(out_path("drivers.rs"))
		.and_then(|mut f| f.write_all(data.as_bytes()).and_then(|()| f.flush()))
		.expect("Unable to save driver data.");
}

/// # Out path.
///
/// This generates a (file/dir) path relative to `OUT_DIR`.
fn out_path(name: &str) -> PathBuf {
	let dir = env::var("OUT_DIR").expect("Missing OUT_DIR.");
	let mut out = std::fs::canonicalize(dir).expect("Missing OUT_DIR.");
	out.push(name);
	out
}

/// # Parse a Single Entry.
///
/// Lines take the form `VENDOR|MODEL|DRIVER|OPTIONS`; the result is the
/// equivalent Rust code.
fn parse_line(line: &str) -> Option<String> {
	let mut parts = line.split('|');
	let vendor = parts.next()?.trim();
	let model = parts.next()?;
	let kind = parts.next()?.trim();
	let opts = parts.next().unwrap_or_default().trim();
	if parts.next().is_some() || vendor.is_empty() || model.trim().is_empty() {
		return None;
	}
	if ! vendor.is_ascii() || ! model.is_ascii() { return None; }

	let kind = KINDS.iter().find(|(k, _)| *k == kind)?.1;

	let mut options = String::from("DriverOptions::empty()");
	for opt in opts.split(',').map(str::trim).filter(|o| ! o.is_empty()) {
		if ! OPTIONS.contains(&opt) { return None; }
		options.push_str(&format!(".union(DriverOptions::{opt})"));
	}

	Some(format!(
		"\tDriverEntry {{ vendor: {:?}, model: {:?}, kind: {kind}, options: {options} }},",
		vendor.to_ascii_uppercase(),
		model.to_ascii_uppercase(),
	))
}
