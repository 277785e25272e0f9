/*!
# Burnbox: Library

This crate contains the disk-at-once CD recording engine used by the `burnbox`
binary: the TOC model, sub-channel and cue-sheet encoders, a generic SCSI/MMC
driver (in normal and raw flavors), the buffered DAO writer, and the reading
and analysis side needed to turn an inserted disc back into a TOC.

The device is reached through the [`ScsiTransport`] trait; the production
implementation, [`CdioDevice`], sits on top of `libcdio`.
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod abort;
mod barcode;
mod bcd;
mod cdtext;
mod cuesheet;
mod dao;
mod driver;
mod error;
mod extract;
mod isrc;
mod log;
mod msf;
mod opts;
mod report;
mod scsi;
mod sector;
mod subchannel;
mod toc;

pub use abort::KillSwitch;
pub use barcode::Barcode;
pub use bcd::{
	bcd,
	bcd2int,
	is_bcd,
};
pub use cdtext::{
	CdText,
	CdTextBlock,
	CdTextKind,
};
pub use cuesheet::CueSheet;
pub use dao::{
	remote::RemoteReporter,
	write_disk,
};
pub use driver::{
	BlankMode,
	Capabilities,
	CdRawToc,
	CdToc,
	CdrDriver,
	DiskInfo,
	DiskStatus,
	DriverKind,
	DriverOptions,
	UnitStatus,
};
pub use error::BurnError;
pub use extract::{
	AudioExtractor,
	ExtractReport,
	VerifyExtractor,
};
pub use isrc::Isrc;
pub(crate) use log::DaoLog;
pub use msf::Msf;
pub use opts::{
	ReadOptions,
	WriteOptions,
};
pub use report::{
	MessageKind,
	NullReporter,
	Phase,
	Progress,
	Reporter,
};
pub use scsi::{
	cdio::CdioDevice,
	DataDir,
	HwInfo,
	ScsiTransport,
	Sense,
};
pub use subchannel::{
	QMode,
	SubChannel,
};
pub use toc::{
	Toc,
	TocCheck,
	TocType,
	track::{
		SubTrack,
		SubTrackSource,
		Track,
		TrackFlags,
		TrackMode,
	},
};



/// # 16-bit Stereo Sample (raw PCM bytes).
pub(crate) type Sample = [u8; 4];

/// # Bytes Per Sample.
pub const BYTES_PER_SAMPLE: u16 = 4;

/// # Samples per sector.
pub const SAMPLES_PER_SECTOR: u16 = 588;

/// # Raw Sector Size.
///
/// Every CD sector is this big once sync, headers and error correction are
/// accounted for. For audio, it is all samples.
pub const CD_FRAME_SIZE: u16 = SAMPLES_PER_SECTOR * BYTES_PER_SAMPLE;

/// # Mode 1 (or Mode 2 Form 1) User Data.
pub const CD_MODE1_SIZE: u16 = 2048;

/// # Mode 2 (Formless) User Data.
///
/// This also happens to be the size of an XA sub-header plus a Form 1 or
/// Form 2 payload and its trailer.
pub const CD_MODE2_SIZE: u16 = 2336;

/// # Mode 2 Form 2 User Data.
pub const CD_FORM2_SIZE: u16 = 2324;

/// # Packed P/Q Sub-Channel Size.
pub const PQ_SUBCHANNEL_SIZE: u16 = 16;

/// # Raw P-W Sub-Channel Size.
pub const PW_SUBCHANNEL_SIZE: u16 = 96;

/// # Number of lead-in sectors.
///
/// All discs have a 2-second region at the start before any data. Different
/// contexts include or exclude this amount, so it's good to keep it handy.
pub const CD_LEADIN: i32 = 150;

/// # Lead-out Track Number.
///
/// This value is written as-is, never BCD-encoded.
pub const CD_LEADOUT_TRACK: u8 = 0xAA;

/// # Lead-out Length.
///
/// Raw writers are responsible for their own lead-out, which runs for 90
/// seconds.
pub const CD_LEADOUT_LEN: u32 = 6750;

/// # Frames Per Second.
pub const FRAMES_PER_SECOND: u32 = 75;

/// # Maximum Tracks.
pub const MAX_TRACKS: u8 = 99;

/// # Null sample.
///
/// Audio CD silence is typically literally nothing.
pub(crate) const NULL_SAMPLE: Sample = [0, 0, 0, 0];

/// # Wave Spec.
pub(crate) const WAVE_SPEC: hound::WavSpec = hound::WavSpec {
	channels: 2,
	sample_rate: 44100,
	bits_per_sample: 16,
	sample_format: hound::SampleFormat::Int,
};
