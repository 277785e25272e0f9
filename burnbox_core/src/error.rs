/*!
# Burnbox: Errors
*/

use cdtoc::TocError;
use crate::Sense;
use fyi_msg::Msg;
use std::{
	error::Error,
	fmt,
};



#[cfg(feature = "bin")]
/// # Help Text.
const HELP: &str = concat!(r"
   .-------.
  /  .---.  \    Burnbox v", env!("CARGO_PKG_VERSION"), r#"
 |  ( (o) )  |   Disk-at-once CD recording
  \  '---'  /    for audio and data.
   '-------'

USAGE:
    burnbox [OPTIONS] <COMMAND> [FILE(s)]

COMMANDS:
    write             Write the listed WAV (or raw 2352-byte) files to a
                      blank disc, one audio track per file.
    simulate          Same as write, but with the laser off.
    blank             Blank a rewritable disc.
    disk-info         Print information about the inserted disc.
    drive-info        Print information about the drive.
    read-toc          Print the table of contents of the inserted disc.
    read-cd           Copy the inserted disc (or one session) to an image
                      file, or a WAV if it is audio-only.

WRITE SETTINGS:
    -s, --speed <NUM> Write (or read) speed, as a multiple of 176KB/s.
                      [default: 0 (maximum)]
        --buffers <NUM>
                      The number of one-second chunks to buffer while writing.
                      Raise this if your sources are slow.
                      [default: 32; range: 10..=1000]
        --pregap <NUM>
                      The number of blocks of silence to insert before each
                      track after the first. [default: 150]
        --catalog <EAN/UPC>
                      Add a catalog number to the disc.
        --multi       Leave the disc open for additional sessions.
        --raw         Use the raw driver, synthesizing the sub-channel in
                      software rather than on the drive.
        --eject       Eject the disc when finished.
        --force       Write even if the TOC checks raise warnings or the
                      program will not fit on the disc.
        --simulate    Same as the simulate command.
        --remote      Write machine-readable progress to file descriptor 3.

READ SETTINGS:
        --session <NUM>
                      The session to read. [default: 1]
    -o, --output <PATH>
                      Where to save read-cd output. [default: data.bin]
        --scan        Find index marks with a linear sub-channel scan instead
                      of the default binary search.
        --sync        Confirm audio read positions with the sub-channel,
                      re-reading sectors that land in the wrong place.

BLANK SETTINGS:
        --minimal     Only blank the TOC and PMA. [default: full blank]

MISCELLANEOUS:
    -d, --dev <PATH>  The device path for the optical drive, like /dev/sr0.
                      [default: auto]
    -h, --help        Print help information to STDOUT and exit.
    -v, --verbose     Print a detailed session log to STDOUT when finished.
    -V, --version     Print version information to STDOUT and exit.

EARLY EXIT:
    Press CTRL+C to stop a write early. The data already written cannot be
    recovered, and the disc will most likely be unusable.
"#);



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Errors.
pub enum BurnError {
	/// # Invalid barcode.
	Barcode,

	/// # Bug!
	Bug(&'static str),

	/// # Not enough room.
	Capacity {
		/// # Blocks Needed.
		needed: u32,

		/// # Blocks Available.
		available: u32,
	},

	/// # CDTOC passthrough.
	Cdtoc(TocError),

	/// # Invalid CD-TEXT.
	CdText(&'static str),

	/// # Invalid device.
	Device(String),

	/// # Unable to open device.
	DeviceOpen(Option<String>),

	/// # Disc is not appendable.
	DiskNotAppendable,

	/// # Disc is not empty.
	DiskNotEmpty,

	/// # Invalid ISRC.
	Isrc,

	/// # User Abort.
	Killed,

	/// # No medium.
	NoDisc,

	/// # Noop.
	Noop,

	/// # Unit never became ready.
	NotReady,

	/// # Raw TOC cannot be interpreted.
	RawTocAmbiguous,

	/// # Reading from a source.
	Read(String),

	/// # Missing session.
	Session(u8),

	/// # SCSI command failure.
	Scsi {
		/// # Opcode.
		op: u8,

		/// # Sense Data.
		sense: Option<Sense>,
	},

	/// # Sub-Channel Read.
	SubChannel,

	/// # TOC check failure.
	TocCheck(String),

	/// # Too many tracks.
	TrackCount,

	/// # Invalid/unsupported track mode.
	TrackMode,

	/// # Invalid track number.
	TrackNumber(u8),

	/// # Operation not supported by this driver.
	Unsupported(&'static str),

	/// # WAV format.
	WavFormat(String),

	/// # Writing to disk.
	Write(String),

	#[cfg(feature = "bin")]
	/// # Invalid CLI arg.
	CliArg(String),

	#[cfg(feature = "bin")]
	/// # CLI Parsing failure.
	CliParse(&'static str),

	#[cfg(feature = "bin")]
	/// # Print Help (Not an Error).
	PrintHelp,

	#[cfg(feature = "bin")]
	/// # Print Version (Not an Error).
	PrintVersion,
}

impl Error for BurnError {}

impl From<TocError> for BurnError {
	#[inline]
	fn from(err: TocError) -> Self { Self::Cdtoc(err) }
}

impl From<BurnError> for Msg {
	#[inline]
	fn from(src: BurnError) -> Self { Self::error(src.to_string()) }
}

impl fmt::Display for BurnError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Barcode => f.write_str("Invalid/unsupported barcode."),
			Self::Bug(s) => write!(f, "Bug: {s}."),
			Self::Capacity { needed, available } => write!(
				f,
				"The program needs {needed} blocks but only {available} are available.",
			),
			Self::Cdtoc(s) => write!(f, "{s}"),
			Self::CdText(s) => write!(f, "Invalid CD-TEXT: {s}."),
			Self::Device(s) => write!(f, "Invalid device path {s}."),
			Self::DeviceOpen(s) =>
				if let Some(s) = s { write!(f, "Unable to open connection with {s}.") }
				else {
					f.write_str("Unable to open connection with default optical drive.")
				},
			Self::DiskNotAppendable => f.write_str("The disc is closed; no more sessions can be added."),
			Self::DiskNotEmpty => f.write_str("The disc is not empty."),
			Self::Isrc => f.write_str("Invalid ISRC."),
			Self::Killed => f.write_str("User abort."),
			Self::NoDisc => f.write_str("There is no disc in the drive."),
			Self::Noop => f.write_str("There's nothing to do!"),
			Self::NotReady => f.write_str("The drive never became ready."),
			Self::RawTocAmbiguous => f.write_str("Unable to determine the raw TOC encoding."),
			Self::Read(s) => write!(f, "Unable to read from {s}."),
			Self::Scsi { op, sense } => {
				write!(f, "{} failed", opcode_name(*op))?;
				if let Some(sense) = sense { write!(f, " (sense {sense})")?; }
				f.write_str(".")
			},
			Self::SubChannel => f.write_str("Unable to read the sub-channel."),
			Self::TocCheck(s) => write!(f, "TOC check failed: {s}"),
			Self::TrackCount => f.write_str("A disc can hold at most 99 tracks."),
			Self::TrackMode => f.write_str("Invalid or unsupported track layout."),
			Self::Session(n) => write!(f, "The disc has no session #{n}."),
			Self::TrackNumber(n) => write!(f, "Invalid track number ({n})."),
			Self::Unsupported(s) => write!(f, "This driver does not support {s}."),
			Self::WavFormat(s) => write!(f, "{s} is not 16-bit stereo PCM at 44.1kHz."),
			Self::Write(s) => write!(f, "Unable to write to {s}."),

			#[cfg(feature = "bin")]
			Self::CliArg(s) => write!(f, "Invalid CLI option: {s}"),

			#[cfg(feature = "bin")]
			Self::CliParse(s) => write!(f, "Unable to parse {s}."),

			#[cfg(feature = "bin")]
			Self::PrintHelp => f.write_str(HELP),

			#[cfg(feature = "bin")]
			Self::PrintVersion => f.write_str(concat!("Burnbox v", env!("CARGO_PKG_VERSION"))),
		}
	}
}

impl BurnError {
	#[must_use]
	/// # Severity.
	///
	/// Collapse the error into the classic status convention: `2` means
	/// "try something else" (e.g. fall back from the raw TOC to the generic
	/// one), `1` means the disc or TOC is unsuitable, and `-1` means the
	/// operation itself failed.
	pub const fn severity(&self) -> i8 {
		match self {
			Self::RawTocAmbiguous => 2,
			Self::Capacity { .. } |
			Self::DiskNotAppendable |
			Self::DiskNotEmpty |
			Self::NoDisc |
			Self::Session(_) |
			Self::TocCheck(_) |
			Self::TrackCount |
			Self::TrackMode => 1,
			_ => -1,
		}
	}

	#[must_use]
	/// # Exit Code.
	pub const fn exit_code(&self) -> u8 {
		match self {
			#[cfg(feature = "bin")]
			Self::PrintHelp | Self::PrintVersion => 0,
			Self::Killed => 130,
			_ =>
				if 0 < self.severity() { 2 }
				else { 1 },
		}
	}

	#[must_use]
	/// # Sense Data.
	pub const fn sense(&self) -> Option<Sense> {
		if let Self::Scsi { sense, .. } = self { *sense }
		else { None }
	}
}



/// # Opcode Name.
///
/// Return a human-readable name for a SCSI/MMC opcode.
pub(crate) const fn opcode_name(op: u8) -> &'static str {
	match op {
		0x00 => "TEST UNIT READY",
		0x01 => "REZERO UNIT",
		0x03 => "REQUEST SENSE",
		0x12 => "INQUIRY",
		0x15 => "MODE SELECT(6)",
		0x1A => "MODE SENSE(6)",
		0x1B => "START STOP UNIT",
		0x1E => "PREVENT ALLOW MEDIUM REMOVAL",
		0x25 => "READ CAPACITY",
		0x2A => "WRITE(10)",
		0x35 => "SYNCHRONIZE CACHE",
		0x42 => "READ SUB-CHANNEL",
		0x43 => "READ TOC/PMA/ATIP",
		0x45 => "PLAY AUDIO(10)",
		0x46 => "GET CONFIGURATION",
		0x51 => "READ DISC INFORMATION",
		0x52 => "READ TRACK INFORMATION",
		0x54 => "SEND OPC INFORMATION",
		0x55 => "MODE SELECT(10)",
		0x5A => "MODE SENSE(10)",
		0x5C => "READ BUFFER CAPACITY",
		0x5D => "SEND CUE SHEET",
		0xA1 => "BLANK",
		0xBB => "SET CD SPEED",
		0xBD => "MECHANISM STATUS",
		0xBE => "READ CD",
		_ => "SCSI command",
	}
}
