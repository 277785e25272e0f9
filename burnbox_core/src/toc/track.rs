/*!
# Burnbox: Tracks
*/

use crate::{
	BurnError,
	CD_FORM2_SIZE,
	CD_FRAME_SIZE,
	CD_MODE1_SIZE,
	CD_MODE2_SIZE,
	Isrc,
	WAVE_SPEC,
};
use std::{
	fmt,
	path::{
		Path,
		PathBuf,
	},
};



/// # Minimum Track Length (4 seconds).
const MIN_TRACK_LEN: u32 = 300;

/// # Maximum Index Marks (2..=99).
const MAX_INDICES: usize = 98;



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Track Mode.
///
/// This describes both the on-disc format of a track and the shape of the
/// data its sub-tracks provide.
pub enum TrackMode {
	/// # Audio (2352).
	Audio,

	/// # Mode 1 (2048).
	Mode1,

	/// # Mode 1, Raw Sectors (2352).
	Mode1Raw,

	/// # Mode 2, Formless (2336).
	Mode2,

	/// # Mode 2 Form 1 (2048).
	Mode2Form1,

	/// # Mode 2 Form 2 (2324).
	Mode2Form2,

	/// # Mode 2, Mixed Forms (2336, Sub-Header Included).
	Mode2FormMix,

	/// # Mode 2, Raw Sectors (2352).
	Mode2Raw,
}

impl fmt::Display for TrackMode {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl TrackMode {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Audio => "AUDIO",
			Self::Mode1 => "MODE1",
			Self::Mode1Raw => "MODE1_RAW",
			Self::Mode2 => "MODE2",
			Self::Mode2Form1 => "MODE2_FORM1",
			Self::Mode2Form2 => "MODE2_FORM2",
			Self::Mode2FormMix => "MODE2_FORM_MIX",
			Self::Mode2Raw => "MODE2_RAW",
		}
	}

	#[must_use]
	/// # Is Data?
	pub const fn is_data(self) -> bool { ! matches!(self, Self::Audio) }

	#[must_use]
	/// # Is XA?
	pub const fn is_xa(self) -> bool {
		matches!(self, Self::Mode2Form1 | Self::Mode2Form2 | Self::Mode2FormMix)
	}

	#[must_use]
	/// # Is Raw?
	pub const fn is_raw(self) -> bool { matches!(self, Self::Mode1Raw | Self::Mode2Raw) }

	#[must_use]
	/// # Source Block Size.
	///
	/// The number of bytes per sector sub-track data is expected to supply.
	pub const fn source_block_size(self) -> u16 {
		match self {
			Self::Audio | Self::Mode1Raw | Self::Mode2Raw => CD_FRAME_SIZE,
			Self::Mode1 | Self::Mode2Form1 => CD_MODE1_SIZE,
			Self::Mode2 | Self::Mode2FormMix => CD_MODE2_SIZE,
			Self::Mode2Form2 => CD_FORM2_SIZE,
		}
	}

	#[must_use]
	/// # Write Block Size.
	///
	/// The number of bytes per sector sent to the drive by the (non-raw)
	/// driver. The XA forms are wrapped into formless Mode 2 blocks.
	pub const fn write_block_size(self) -> u16 {
		match self {
			Self::Audio | Self::Mode1Raw | Self::Mode2Raw => CD_FRAME_SIZE,
			Self::Mode1 => CD_MODE1_SIZE,
			Self::Mode2 | Self::Mode2Form1 | Self::Mode2Form2 | Self::Mode2FormMix => CD_MODE2_SIZE,
		}
	}

	#[must_use]
	/// # Cue Sheet Data Form.
	pub const fn data_form(self) -> u8 {
		match self {
			Self::Audio => 0x00,
			Self::Mode1 => 0x10,
			Self::Mode1Raw => 0x11,
			Self::Mode2Form1 | Self::Mode2Form2 | Self::Mode2FormMix => 0x20,
			Self::Mode2 => 0x30,
			Self::Mode2Raw => 0x31,
		}
	}

	#[must_use]
	/// # Cue Sheet Data Form (Device-Generated).
	///
	/// This is used for the lead-in (when there is no CD-TEXT) and the
	/// lead-out, whose content the drive synthesizes itself.
	pub const fn generated_data_form(self) -> u8 {
		match self {
			Self::Audio => 0x01,
			Self::Mode1 | Self::Mode1Raw => 0x14,
			Self::Mode2Form1 | Self::Mode2Form2 | Self::Mode2FormMix => 0x24,
			Self::Mode2 | Self::Mode2Raw => 0x34,
		}
	}

	#[must_use]
	/// # Header Mode Byte.
	pub const fn sector_mode(self) -> u8 {
		match self {
			Self::Audio => 0,
			Self::Mode1 | Self::Mode1Raw => 1,
			_ => 2,
		}
	}
}



/// # Flag: Copy Permitted.
const FLAG_COPY: u8 =         0b0000_0010;

/// # Flag: Pre-emphasis.
const FLAG_PREEMPHASIS: u8 =  0b0000_0001;

/// # Flag: Four-Channel Audio.
const FLAG_FOUR_CHANNEL: u8 = 0b0000_1000;

/// # Flag: Data.
const FLAG_DATA: u8 =         0b0000_0100;

#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Track Flags.
///
/// The user-settable bits of the control nibble. The data bit is derived
/// from the track mode.
pub struct TrackFlags(u8);

impl TrackFlags {
	#[must_use]
	/// # With Copy Permitted.
	pub const fn with_copy(self, v: bool) -> Self {
		if v { Self(self.0 | FLAG_COPY) } else { Self(self.0 & ! FLAG_COPY) }
	}

	#[must_use]
	/// # With Pre-emphasis.
	pub const fn with_preemphasis(self, v: bool) -> Self {
		if v { Self(self.0 | FLAG_PREEMPHASIS) } else { Self(self.0 & ! FLAG_PREEMPHASIS) }
	}

	#[must_use]
	/// # With Four-Channel Audio.
	pub const fn with_four_channel(self, v: bool) -> Self {
		if v { Self(self.0 | FLAG_FOUR_CHANNEL) } else { Self(self.0 & ! FLAG_FOUR_CHANNEL) }
	}

	#[must_use]
	/// # Copy Permitted?
	pub const fn copy(self) -> bool { FLAG_COPY == self.0 & FLAG_COPY }

	#[must_use]
	/// # Pre-emphasis?
	pub const fn preemphasis(self) -> bool { FLAG_PREEMPHASIS == self.0 & FLAG_PREEMPHASIS }

	#[must_use]
	/// # Four-Channel?
	pub const fn four_channel(self) -> bool { FLAG_FOUR_CHANNEL == self.0 & FLAG_FOUR_CHANNEL }

	#[must_use]
	/// # From Control Nibble.
	pub const fn from_ctl(ctl: u8) -> Self {
		Self(ctl & (FLAG_COPY | FLAG_PREEMPHASIS | FLAG_FOUR_CHANNEL))
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Sub-Track Source.
pub enum SubTrackSource {
	/// # Zero-Fill.
	Zero,

	/// # Raw File Range.
	File {
		/// # Path.
		path: PathBuf,

		/// # Byte Offset.
		offset: u64,

		/// # Swap Sample Byte Order?
		swap: bool,
	},

	/// # WAV File.
	Wav {
		/// # Path.
		path: PathBuf,

		/// # First Sample.
		offset: u32,
	},

	/// # Standard Input.
	///
	/// Data is read from a pipe, in order, without seeking.
	Stdin,
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// # Sub-Track.
///
/// A contiguous run of track data, measured in bytes.
pub struct SubTrack {
	source: SubTrackSource,
	len: u64,
}

impl SubTrack {
	#[must_use]
	/// # Zero-Fill.
	pub const fn zero(len: u64) -> Self {
		Self { source: SubTrackSource::Zero, len }
	}

	#[must_use]
	/// # Zero Blocks.
	pub const fn zero_blocks(mode: TrackMode, blocks: u32) -> Self {
		Self::zero(blocks as u64 * mode.source_block_size() as u64)
	}

	#[must_use]
	/// # Raw File Range.
	pub fn file<P: AsRef<Path>>(path: P, offset: u64, len: u64) -> Self {
		Self {
			source: SubTrackSource::File {
				path: path.as_ref().to_path_buf(),
				offset,
				swap: false,
			},
			len,
		}
	}

	#[must_use]
	/// # Raw File Range (Byte-Swapped Samples).
	///
	/// For big-endian audio sources.
	pub fn swapped_file<P: AsRef<Path>>(path: P, offset: u64, len: u64) -> Self {
		Self {
			source: SubTrackSource::File {
				path: path.as_ref().to_path_buf(),
				offset,
				swap: true,
			},
			len,
		}
	}

	/// # WAV File.
	///
	/// Reference an entire WAV file. It must be 16-bit stereo PCM at
	/// 44.1kHz, i.e. CD audio.
	///
	/// ## Errors
	///
	/// Returns an error if the file cannot be read or has the wrong format.
	pub fn wav<P: AsRef<Path>>(path: P) -> Result<Self, BurnError> {
		let path = path.as_ref();
		let reader = hound::WavReader::open(path)
			.map_err(|_| BurnError::Read(path.to_string_lossy().into_owned()))?;
		if reader.spec() != WAVE_SPEC {
			return Err(BurnError::WavFormat(path.to_string_lossy().into_owned()));
		}

		Ok(Self {
			source: SubTrackSource::Wav {
				path: path.to_path_buf(),
				offset: 0,
			},
			len: u64::from(reader.duration()) * 4,
		})
	}

	#[must_use]
	/// # WAV File Range.
	///
	/// Reference `len` bytes of sample data starting with sample `offset`.
	/// Unlike [`SubTrack::wav`], the file is not opened here; this is for
	/// images that are still being written.
	pub fn wav_range<P: AsRef<Path>>(path: P, offset: u32, len: u64) -> Self {
		Self {
			source: SubTrackSource::Wav {
				path: path.as_ref().to_path_buf(),
				offset,
			},
			len,
		}
	}

	#[must_use]
	/// # Standard Input.
	pub const fn stdin(len: u64) -> Self {
		Self { source: SubTrackSource::Stdin, len }
	}

	#[must_use]
	/// # Source.
	pub const fn source(&self) -> &SubTrackSource { &self.source }

	#[must_use]
	/// # Length (Bytes).
	pub const fn len(&self) -> u64 { self.len }

	#[must_use]
	/// # Is Empty?
	pub const fn is_empty(&self) -> bool { self.len == 0 }
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Track.
///
/// A track's data is the concatenation of its sub-tracks. The first
/// `pregap` blocks of that data belong to the pre-gap (index 0); the rest is
/// the track proper, starting at index 1.
///
/// Additional index marks are stored as block offsets relative to index 1.
pub struct Track {
	mode: TrackMode,
	pregap: u32,
	indices: Vec<u32>,
	flags: TrackFlags,
	isrc: Option<Isrc>,
	subtracks: Vec<SubTrack>,
}

impl Track {
	#[must_use]
	/// # New.
	pub const fn new(mode: TrackMode) -> Self {
		Self {
			mode,
			pregap: 0,
			indices: Vec::new(),
			flags: TrackFlags(0),
			isrc: None,
			subtracks: Vec::new(),
		}
	}

	#[must_use]
	/// # With Pre-gap (Blocks).
	pub fn with_pregap(self, pregap: u32) -> Self { Self { pregap, ..self } }

	#[must_use]
	/// # With Index Mark.
	///
	/// Add an index mark (2, 3, …) at `offset` blocks past index 1.
	pub fn with_index(mut self, offset: u32) -> Self {
		self.indices.push(offset);
		self
	}

	#[must_use]
	/// # With Flags.
	pub fn with_flags(self, flags: TrackFlags) -> Self { Self { flags, ..self } }

	#[must_use]
	/// # With ISRC.
	pub fn with_isrc(self, isrc: Option<Isrc>) -> Self { Self { isrc, ..self } }

	#[must_use]
	/// # With Sub-Track.
	pub fn with_subtrack(mut self, sub: SubTrack) -> Self {
		self.subtracks.push(sub);
		self
	}
}

impl Track {
	#[must_use]
	/// # Mode.
	pub const fn mode(&self) -> TrackMode { self.mode }

	#[must_use]
	/// # Pre-gap (Blocks).
	pub const fn pregap(&self) -> u32 { self.pregap }

	#[must_use]
	/// # Index Marks.
	pub fn indices(&self) -> &[u32] { &self.indices }

	#[must_use]
	/// # Flags.
	pub const fn flags(&self) -> TrackFlags { self.flags }

	#[must_use]
	/// # Control Nibble.
	pub const fn ctl(&self) -> u8 {
		let mut ctl = self.flags.0;
		if self.mode.is_data() {
			// Data tracks can't be pre-emphasized or four-channel.
			ctl = (ctl & FLAG_COPY) | FLAG_DATA;
		}
		ctl
	}

	#[must_use]
	/// # ISRC.
	pub const fn isrc(&self) -> Option<&Isrc> { self.isrc.as_ref() }

	#[must_use]
	/// # Sub-Tracks.
	pub fn subtracks(&self) -> &[SubTrack] { &self.subtracks }

	#[must_use]
	/// # Data Length (Bytes).
	pub fn data_len(&self) -> u64 { self.subtracks.iter().map(SubTrack::len).sum() }

	#[must_use]
	/// # Total Blocks.
	///
	/// Pre-gap included. Partial blocks are rounded up.
	pub fn blocks(&self) -> u32 {
		let size = u64::from(self.mode.source_block_size());
		u32::try_from(self.data_len().div_ceil(size)).unwrap_or(u32::MAX)
	}

	#[must_use]
	/// # Length (Blocks).
	///
	/// Pre-gap excluded.
	pub fn length(&self) -> u32 { self.blocks().saturating_sub(self.pregap) }
}

impl Track {
	/// # Check.
	///
	/// Push any problems onto the appropriate list.
	pub(super) fn check(&self, num: u8, warnings: &mut Vec<String>, errors: &mut Vec<String>) {
		if self.subtracks.is_empty() {
			errors.push(format!("Track {num:02} has no data."));
			return;
		}

		let size = u64::from(self.mode.source_block_size());
		if 0 != self.data_len() % size {
			let msg = format!("Track {num:02} does not end on a block boundary.");
			if self.mode.is_data() { errors.push(msg); }
			else { warnings.push(format!("{msg} It will be padded with silence.")); }
		}

		if self.blocks() < self.pregap {
			errors.push(format!("Track {num:02} is shorter than its pre-gap."));
			return;
		}

		let len = self.length();
		if len < MIN_TRACK_LEN {
			errors.push(format!("Track {num:02} is shorter than 4 seconds."));
		}

		if MAX_INDICES < self.indices.len() {
			errors.push(format!("Track {num:02} has too many index marks."));
		}
		let mut last = 0;
		for &idx in &self.indices {
			if idx <= last || len <= idx {
				errors.push(format!("Track {num:02} has an out-of-order or out-of-range index mark."));
				break;
			}
			last = idx;
		}

		if self.isrc.is_some() && self.mode.is_data() {
			warnings.push(format!("Track {num:02} is a data track; its ISRC will be ignored."));
		}

		if self.mode.is_data() && (self.flags.preemphasis() || self.flags.four_channel()) {
			warnings.push(format!("Track {num:02} is a data track; audio flags will be ignored."));
		}
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_lengths() {
		let track = Track::new(TrackMode::Audio)
			.with_pregap(150)
			.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 150))
			.with_subtrack(SubTrack::zero(2352 * 1000 + 4));

		assert_eq!(track.blocks(), 1151, "Partial blocks count.");
		assert_eq!(track.length(), 1001);
		assert_eq!(track.pregap(), 150);

		let mut warnings = Vec::new();
		let mut errors = Vec::new();
		track.check(1, &mut warnings, &mut errors);
		assert_eq!(warnings.len(), 1, "Partial block should warn.");
		assert!(errors.is_empty(), "No errors expected: {errors:?}");
	}

	#[test]
	fn t_check() {
		let mut warnings = Vec::new();
		let mut errors = Vec::new();

		// Too short.
		Track::new(TrackMode::Audio)
			.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 299))
			.check(1, &mut warnings, &mut errors);
		assert_eq!(errors.len(), 1);

		// Bad indices.
		errors.truncate(0);
		Track::new(TrackMode::Audio)
			.with_index(500)
			.with_index(400)
			.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 1000))
			.check(1, &mut warnings, &mut errors);
		assert_eq!(errors.len(), 1);

		// Data must be whole.
		errors.truncate(0);
		Track::new(TrackMode::Mode1)
			.with_subtrack(SubTrack::zero(2048 * 300 + 1))
			.check(1, &mut warnings, &mut errors);
		assert_eq!(errors.len(), 1);

		// No data at all.
		errors.truncate(0);
		Track::new(TrackMode::Audio).check(1, &mut warnings, &mut errors);
		assert_eq!(errors.len(), 1);
	}

	#[test]
	fn t_ctl() {
		let flags = TrackFlags::default().with_copy(true).with_preemphasis(true);
		assert_eq!(Track::new(TrackMode::Audio).with_flags(flags).ctl(), 0b0011);
		assert_eq!(Track::new(TrackMode::Mode1).with_flags(flags).ctl(), 0b0110);
		assert_eq!(TrackFlags::from_ctl(0b1111), TrackFlags::default().with_copy(true).with_preemphasis(true).with_four_channel(true));
	}

	#[test]
	fn t_modes() {
		assert_eq!(TrackMode::Mode2Form1.source_block_size(), 2048);
		assert_eq!(TrackMode::Mode2Form1.write_block_size(), 2336);
		assert_eq!(TrackMode::Mode2Form2.source_block_size(), 2324);
		assert_eq!(TrackMode::Mode1Raw.data_form(), 0x11);
		assert_eq!(TrackMode::Mode2Form2.generated_data_form(), 0x24);
		assert!(! TrackMode::Audio.is_data());
	}
}
