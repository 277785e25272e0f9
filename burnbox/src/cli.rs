/*!
# Burnbox: CLI
*/

use argyle::Argument;
use burnbox_core::{
	Barcode,
	BlankMode,
	BurnError,
	ReadOptions,
	SubTrack,
	Toc,
	TocType,
	Track,
	TrackMode,
	WriteOptions,
};
use dactyl::traits::BytesToUnsigned;
use std::path::{
	Path,
	PathBuf,
};
use trimothy::TrimMut;



/// # Default Pre-gap (Blocks).
const DEFAULT_PREGAP: u32 = 150;

/// # Default Read Output.
const DEFAULT_OUTPUT: &str = "data.bin";



#[derive(Debug)]
/// # Action.
pub(super) enum Action {
	/// # Write (or Simulate) These Files.
	Write(Vec<PathBuf>),

	/// # Blank.
	Blank(BlankMode),

	/// # Disc Information.
	DiskInfo,

	/// # Drive Information.
	DriveInfo,

	/// # Print the TOC.
	ReadToc,

	/// # Copy the Disc.
	ReadCd,
}



#[derive(Debug)]
/// # Settings.
pub(super) struct Settings {
	/// # What To Do.
	pub(super) action: Action,

	/// # Device Path.
	pub(super) dev: Option<PathBuf>,

	/// # Write Options.
	pub(super) write: WriteOptions,

	/// # Read Options.
	pub(super) read: ReadOptions,

	/// # Pre-gap Between Tracks.
	pub(super) pregap: u32,

	/// # Catalog Number.
	pub(super) catalog: Option<Barcode>,

	/// # Read Output.
	pub(super) output: PathBuf,

	/// # Use the Raw Driver.
	pub(super) raw: bool,

	/// # Remote Progress.
	pub(super) remote: bool,
}

impl Settings {
	/// # Write TOC.
	///
	/// Assemble a CD-DA TOC from the files to be written, one audio track
	/// apiece. WAVs are referenced by their sample data; anything else is
	/// taken to be raw 16-bit little-endian stereo.
	///
	/// ## Errors
	///
	/// Returns an error if a file is missing or malformed, or the TOC
	/// would be invalid.
	pub(super) fn write_toc(&self) -> Result<Toc, BurnError> {
		let Action::Write(files) = &self.action else { return Err(BurnError::Noop); };
		if files.is_empty() { return Err(BurnError::Noop); }

		let mut toc = Toc::new(TocType::CdDa);
		toc.set_catalog(self.catalog);
		for (idx, file) in files.iter().enumerate() {
			let mut track = Track::new(TrackMode::Audio);
			if idx != 0 && self.pregap != 0 {
				track = track.with_pregap(self.pregap)
					.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, self.pregap));
			}
			toc.push_track(track.with_subtrack(source(file)?))?;
		}

		Ok(toc)
	}
}



/// # Parse Options.
pub(super) fn parse() -> Result<Settings, BurnError> {
	let args = argyle::args()
		.with_keywords(include!(concat!(env!("OUT_DIR"), "/argyle.rs")));

	let mut action = None;
	let mut write = WriteOptions::default();
	let mut read = ReadOptions::default();
	let mut minimal = false;
	let mut files = Vec::new();
	let mut dev = None;
	let mut pregap = DEFAULT_PREGAP;
	let mut catalog = None;
	let mut output = PathBuf::from(DEFAULT_OUTPUT);
	let mut raw = false;
	let mut remote = false;

	for arg in args {
		match arg {
			Argument::Command(s) => {
				if action.is_some() { return Err(BurnError::CliArg(s.to_owned())); }
				if s == "simulate" { write = write.with_simulate(true); }
				action.replace(s);
			},

			Argument::Key("--eject") => { write = write.with_eject(true); },
			Argument::Key("--force") => { write = write.with_force(true); },
			Argument::Key("-h" | "--help") => return Err(BurnError::PrintHelp),
			Argument::Key("--minimal") => { minimal = true; },
			Argument::Key("--multi") => { write = write.with_multi_session(true); },
			Argument::Key("--raw") => { raw = true; },
			Argument::Key("--remote") => { remote = true; },
			Argument::Key("--scan") => { read = read.with_scan(true); },
			Argument::Key("--simulate") => { write = write.with_simulate(true); },
			Argument::Key("--sync") => { read = read.with_sync(true); },
			Argument::Key("-v" | "--verbose") => {
				write = write.with_verbose(true);
				read = read.with_verbose(true);
			},
			Argument::Key("-V" | "--version") => return Err(BurnError::PrintVersion),

			Argument::KeyWithValue("--buffers", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.ok_or(BurnError::CliParse("--buffers"))?;
				write = write.with_buffers(s);
			},
			Argument::KeyWithValue("--catalog", s) => {
				let s = Barcode::try_from(s.trim())
					.map_err(|_| BurnError::CliParse("--catalog"))?;
				catalog.replace(s);
			},
			Argument::KeyWithValue("-d" | "--dev", mut s) => {
				s.trim_mut();
				dev.replace(PathBuf::from(s));
			},
			Argument::KeyWithValue("-o" | "--output", mut s) => {
				s.trim_mut();
				if s.is_empty() { return Err(BurnError::CliParse("-o/--output")); }
				output = PathBuf::from(s);
			},
			Argument::KeyWithValue("--pregap", s) => {
				pregap = u32::btou(s.trim().as_bytes())
					.ok_or(BurnError::CliParse("--pregap"))?;
			},
			Argument::KeyWithValue("--session", s) => {
				let s = u8::btou(s.trim().as_bytes())
					.filter(|n| 0 != *n)
					.ok_or(BurnError::CliParse("--session"))?;
				read = read.with_session(s);
			},
			Argument::KeyWithValue("-s" | "--speed", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.ok_or(BurnError::CliParse("-s/--speed"))?;
				write = write.with_speed(s);
				read = read.with_speed(s);
			},

			Argument::Other(s) => {
				if s.starts_with('-') { return Err(BurnError::CliArg(s)); }
				files.push(PathBuf::from(s));
			},

			_ => {},
		}
	}

	let action = match action.unwrap_or("disk-info") {
		"write" | "simulate" => Action::Write(files),
		"blank" => Action::Blank(if minimal { BlankMode::Minimal } else { BlankMode::Full }),
		"drive-info" => Action::DriveInfo,
		"read-toc" => Action::ReadToc,
		"read-cd" => Action::ReadCd,
		_ =>
			// Only writes take files.
			if let Some(f) = files.first() {
				return Err(BurnError::CliArg(f.to_string_lossy().into_owned()));
			}
			else { Action::DiskInfo },
	};

	Ok(Settings {
		action,
		dev,
		write,
		read,
		pregap,
		catalog,
		output,
		raw,
		remote,
	})
}



/// # Track Source.
fn source(path: &Path) -> Result<SubTrack, BurnError> {
	let is_wav = path.extension()
		.is_some_and(|e| e.eq_ignore_ascii_case("wav"));
	if is_wav { SubTrack::wav(path) }
	else {
		let len = std::fs::metadata(path)
			.ok()
			.filter(std::fs::Metadata::is_file)
			.map(|m| m.len())
			.ok_or_else(|| BurnError::Read(path.to_string_lossy().into_owned()))?;
		Ok(SubTrack::file(path, 0, len))
	}
}
