/*!
# Burnbox: Table of Contents
*/

pub(super) mod track;

use crate::{
	Barcode,
	BurnError,
	CD_LEADIN,
	CdText,
	MAX_TRACKS,
	Msf,
};
use std::fmt;
use track::{
	Track,
	TrackMode,
};



/// # Maximum Program Length (99:59:74).
const MAX_PROGRAM_LEN: u32 = 449_999;



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Disc Type.
pub enum TocType {
	#[default]
	/// # Audio CD.
	CdDa,

	/// # CD-ROM.
	CdRom,

	/// # CD-ROM XA.
	CdRomXa,

	/// # CD-i.
	CdI,
}

impl fmt::Display for TocType {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl TocType {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::CdDa => "CD_DA",
			Self::CdRom => "CD_ROM",
			Self::CdRomXa => "CD_ROM_XA",
			Self::CdI => "CD_I",
		}
	}

	#[must_use]
	/// # Session Format.
	///
	/// The disc-type byte used by mode page 5 and the `A0` lead-in entry.
	pub const fn session_format(self) -> u8 {
		match self {
			Self::CdDa | Self::CdRom => 0x00,
			Self::CdRomXa => 0x20,
			Self::CdI => 0x10,
		}
	}

	#[must_use]
	/// # From Session Format.
	pub const fn from_session_format(v: u8) -> Self {
		match v {
			0x10 => Self::CdI,
			0x20 => Self::CdRomXa,
			_ => Self::CdRom,
		}
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # TOC Check Result.
///
/// Warnings can be overridden with `--force`; errors cannot.
pub enum TocCheck {
	/// # All Good.
	Ok,

	/// # Warnings.
	Warning(Vec<String>),

	/// # Errors (and Warnings).
	Error(Vec<String>),
}

impl TocCheck {
	#[must_use]
	/// # Is Okay?
	pub const fn is_ok(&self) -> bool { matches!(self, Self::Ok) }

	#[must_use]
	/// # Is Error?
	pub const fn is_error(&self) -> bool { matches!(self, Self::Error(_)) }

	#[must_use]
	/// # Messages.
	pub fn messages(&self) -> &[String] {
		match self {
			Self::Ok => &[],
			Self::Warning(v) | Self::Error(v) => v.as_slice(),
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Track Position.
///
/// Session-relative LBAs for a track, pre-gap inclusive.
pub(crate) struct TrackPos {
	/// # First Pre-gap Block (Index 0).
	pub(crate) pregap: i32,

	/// # Index 1.
	pub(crate) start: i32,

	/// # One Past the Last Block.
	pub(crate) end: i32,
}

impl TrackPos {
	/// # Contains?
	pub(crate) const fn contains(&self, lba: i32) -> bool {
		self.pregap <= lba && lba < self.end
	}
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Table of Contents.
///
/// This is the in-memory description of a session: its tracks, in order,
/// plus disc-level metadata.
///
/// Positions are session-relative; the first track's first block
/// (pre-gap included) sits at LBA zero.
pub struct Toc {
	kind: TocType,
	tracks: Vec<Track>,
	catalog: Option<Barcode>,
	lead_in_mode: Option<TrackMode>,
	lead_out_mode: Option<TrackMode>,
	cd_text: Option<CdText>,
}

impl Toc {
	#[must_use]
	/// # New.
	pub const fn new(kind: TocType) -> Self {
		Self {
			kind,
			tracks: Vec::new(),
			catalog: None,
			lead_in_mode: None,
			lead_out_mode: None,
			cd_text: None,
		}
	}

	/// # Push Track.
	///
	/// ## Errors
	///
	/// Returns an error if the TOC already holds 99 tracks.
	pub fn push_track(&mut self, track: Track) -> Result<(), BurnError> {
		if usize::from(MAX_TRACKS) <= self.tracks.len() { Err(BurnError::TrackCount) }
		else {
			self.tracks.push(track);
			Ok(())
		}
	}

	/// # Set Catalog Number.
	pub fn set_catalog(&mut self, catalog: Option<Barcode>) { self.catalog = catalog; }

	/// # Set CD-TEXT.
	pub fn set_cd_text(&mut self, cd_text: Option<CdText>) { self.cd_text = cd_text; }

	/// # Set Lead-in Mode.
	pub fn set_lead_in_mode(&mut self, mode: Option<TrackMode>) { self.lead_in_mode = mode; }

	/// # Set Lead-out Mode.
	pub fn set_lead_out_mode(&mut self, mode: Option<TrackMode>) { self.lead_out_mode = mode; }

	/// # Set Disc Type.
	pub fn set_kind(&mut self, kind: TocType) { self.kind = kind; }
}

impl Toc {
	#[must_use]
	/// # Disc Type.
	pub const fn kind(&self) -> TocType { self.kind }

	#[must_use]
	/// # Tracks.
	pub fn tracks(&self) -> &[Track] { &self.tracks }

	#[must_use]
	/// # Track.
	///
	/// Tracks are numbered from one.
	pub fn track(&self, num: u8) -> Option<&Track> {
		self.tracks.get(usize::from(num.checked_sub(1)?))
	}

	#[must_use]
	/// # Catalog Number.
	pub const fn catalog(&self) -> Option<&Barcode> { self.catalog.as_ref() }

	#[must_use]
	/// # CD-TEXT.
	pub const fn cd_text(&self) -> Option<&CdText> { self.cd_text.as_ref() }

	#[must_use]
	/// # Lead-in Mode.
	///
	/// This defaults to the mode of the first track.
	pub fn lead_in_mode(&self) -> TrackMode {
		self.lead_in_mode
			.or_else(|| self.tracks.first().map(Track::mode))
			.unwrap_or(TrackMode::Audio)
	}

	#[must_use]
	/// # Lead-out Mode.
	///
	/// This defaults to the mode of the last track.
	pub fn lead_out_mode(&self) -> TrackMode {
		self.lead_out_mode
			.or_else(|| self.tracks.last().map(Track::mode))
			.unwrap_or(TrackMode::Audio)
	}

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.tracks.is_empty() }

	#[must_use]
	/// # Track Count.
	pub fn len(&self) -> u8 { u8::try_from(self.tracks.len()).unwrap_or(u8::MAX) }

	#[must_use]
	/// # Total Blocks.
	///
	/// The total number of blocks (pre-gaps included) in the program area.
	pub fn blocks(&self) -> u32 { self.tracks.iter().map(Track::blocks).sum() }

	#[must_use]
	/// # Lead-out LBA.
	pub fn leadout(&self) -> i32 { i32::try_from(self.blocks()).unwrap_or(i32::MAX) }

	#[must_use]
	/// # Has Data Tracks?
	pub fn has_data(&self) -> bool { self.tracks.iter().any(|t| t.mode().is_data()) }

	/// # Positions.
	///
	/// Lay the tracks out back-to-back starting from LBA zero.
	pub(crate) fn positions(&self) -> Vec<TrackPos> {
		let mut out = Vec::with_capacity(self.tracks.len());
		let mut cursor = 0_i32;
		for t in &self.tracks {
			let pregap = i32::try_from(t.pregap()).unwrap_or(i32::MAX);
			let blocks = i32::try_from(t.blocks()).unwrap_or(i32::MAX);
			out.push(TrackPos {
				pregap: cursor,
				start: cursor.saturating_add(pregap),
				end: cursor.saturating_add(blocks),
			});
			cursor = cursor.saturating_add(blocks);
		}
		out
	}

	#[must_use]
	/// # Track Start.
	///
	/// Return the (session-relative) LBA of index 1 for a track.
	pub fn track_start(&self, num: u8) -> Option<i32> {
		let idx = usize::from(num.checked_sub(1)?);
		self.positions().get(idx).map(|p| p.start)
	}
}

impl Toc {
	#[must_use]
	/// # Check.
	///
	/// Verify the TOC is something that can actually be written.
	pub fn check(&self) -> TocCheck {
		let mut warnings = Vec::new();
		let mut errors = Vec::new();

		if self.tracks.is_empty() {
			errors.push("There are no tracks.".to_owned());
		}
		else if usize::from(MAX_TRACKS) < self.tracks.len() {
			errors.push("There are more than 99 tracks.".to_owned());
		}

		for (t, num) in self.tracks.iter().zip(1..=MAX_TRACKS) {
			t.check(num, &mut warnings, &mut errors);
		}

		if MAX_PROGRAM_LEN < self.blocks() {
			errors.push(format!(
				"The program ({}) exceeds the maximum addressable length.",
				Msf::from_frames(self.blocks()),
			));
		}

		match self.kind {
			TocType::CdDa if self.has_data() => {
				warnings.push("Audio discs should not contain data tracks.".to_owned());
			},
			TocType::CdRom if self.tracks.iter().any(|t| t.mode().is_xa()) => {
				warnings.push("XA tracks should be written to CD-ROM-XA discs.".to_owned());
			},
			_ => {},
		}

		if errors.is_empty() {
			if warnings.is_empty() { TocCheck::Ok }
			else { TocCheck::Warning(warnings) }
		}
		else {
			errors.append(&mut warnings);
			TocCheck::Error(errors)
		}
	}

	/// # CDTOC.
	///
	/// Convert to a [`cdtoc::Toc`] for the sake of disc ID calculations.
	/// Positions are offset by the standard 150-block lead-in.
	///
	/// ## Errors
	///
	/// This will return an error if the layout is not supported by
	/// `cdtoc`, e.g. data tracks anywhere but the end.
	pub fn cdtoc(&self) -> Result<cdtoc::Toc, BurnError> {
		let pos = self.positions();
		let mut audio = Vec::with_capacity(pos.len());
		let mut data = None;
		for (t, p) in self.tracks.iter().zip(&pos) {
			let start = u32::try_from(p.start + CD_LEADIN).map_err(|_| BurnError::TrackMode)?;
			if data.is_some() { return Err(BurnError::TrackMode); }
			if t.mode().is_data() { data.replace(start); }
			else { audio.push(start); }
		}

		let leadout = u32::try_from(self.leadout() + CD_LEADIN)
			.map_err(|_| BurnError::TrackMode)?;
		cdtoc::Toc::from_parts(audio, data, leadout).map_err(BurnError::Cdtoc)
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use track::SubTrack;

	fn audio(blocks: u32, pregap: u32) -> Track {
		Track::new(TrackMode::Audio)
			.with_pregap(pregap)
			.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, blocks))
	}

	#[test]
	fn t_positions() {
		let mut toc = Toc::new(TocType::CdDa);
		toc.push_track(audio(1000, 0)).expect("Push failed.");
		toc.push_track(audio(2150, 150)).expect("Push failed.");

		let pos = toc.positions();
		assert_eq!(pos[0], TrackPos { pregap: 0, start: 0, end: 1000 });
		assert_eq!(pos[1], TrackPos { pregap: 1000, start: 1150, end: 3150 });
		assert_eq!(toc.leadout(), 3150);
		assert_eq!(toc.track_start(2), Some(1150));
		assert_eq!(toc.track_start(3), None);
		assert!(pos[1].contains(1000));
		assert!(! pos[1].contains(3150));
		assert!(toc.check().is_ok(), "{:?}", toc.check());
	}

	#[test]
	fn t_limits() {
		let mut toc = Toc::new(TocType::CdDa);
		assert!(toc.check().is_error(), "Empty TOCs are invalid.");
		for _ in 0..99 { toc.push_track(audio(300, 0)).expect("Push failed."); }
		assert_eq!(toc.push_track(audio(300, 0)), Err(BurnError::TrackCount));
		assert_eq!(toc.len(), 99);
	}

	#[test]
	fn t_check_kind() {
		let mut toc = Toc::new(TocType::CdDa);
		toc.push_track(audio(300, 0)).expect("Push failed.");
		toc.push_track(
			Track::new(TrackMode::Mode1)
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Mode1, 300))
		).expect("Push failed.");

		let check = toc.check();
		assert!(matches!(check, TocCheck::Warning(_)), "Expected a warning: {check:?}");
		assert_eq!(toc.lead_in_mode(), TrackMode::Audio);
		assert_eq!(toc.lead_out_mode(), TrackMode::Mode1);
	}

	#[test]
	fn t_cdtoc() {
		let mut toc = Toc::new(TocType::CdDa);
		toc.push_track(audio(1000, 0)).expect("Push failed.");
		toc.push_track(audio(2150, 150)).expect("Push failed.");

		let cdtoc = toc.cdtoc().expect("CDTOC failed.");
		assert_eq!(cdtoc.audio_tracks().count(), 2);
		assert_eq!(cdtoc.leadout_normalized(), 3150);

		// Data in the middle is unsupported.
		let mut toc = Toc::new(TocType::CdRom);
		toc.push_track(
			Track::new(TrackMode::Mode1)
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Mode1, 300))
		).expect("Push failed.");
		toc.push_track(audio(300, 0)).expect("Push failed.");
		assert!(toc.cdtoc().is_err());
	}
}
