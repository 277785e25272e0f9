/*!
# Burnbox: Cue Sheet
*/

use crate::{
	BurnError,
	CD_LEADOUT_TRACK,
	MAX_TRACKS,
	Msf,
	Toc,
};



/// # ADR: Position.
const ADR_POSITION: u8 = 0x01;

/// # ADR: Catalog Number.
const ADR_CATALOG: u8 = 0x02;

/// # ADR: ISRC.
const ADR_ISRC: u8 = 0x03;

/// # Lead-in Data Form (CD-TEXT in R-W).
const FORM_LEADIN_CD_TEXT: u8 = 0x41;



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Cue Sheet.
///
/// This is the SEND CUE SHEET payload for session-at-once writing: a list
/// of eight-byte entries (`CTL/ADR`, `TNO`, `INDEX`, `DATA FORM`, `SCMS`,
/// `MIN`, `SEC`, `FRAME`) describing every catalog, ISRC and index
/// transition in the session.
///
/// The entries are, in order:
/// * The catalog number pair, if any;
/// * The lead-in;
/// * For each track: its ISRC pair (if any), index 0 (if there is a
///   pre-gap), index 1, and any further index marks;
/// * The lead-out;
pub struct CueSheet(Vec<[u8; 8]>);

impl CueSheet {
	/// # New.
	///
	/// Build a cue sheet for `toc`. When adding a session to a disc,
	/// `prev_last_track` and `session_lba` shift the track numbers and
	/// positions accordingly; for a blank disc both are zero.
	///
	/// ## Errors
	///
	/// Returns an error if the track numbers would exceed 99.
	pub fn new(toc: &Toc, cd_text: bool, prev_last_track: u8, session_lba: i32)
	-> Result<Self, BurnError> {
		let tracks = toc.tracks();
		let (Some(first), Some(last)) = (tracks.first(), tracks.last()) else {
			return Err(BurnError::Noop);
		};
		if MAX_TRACKS < prev_last_track.saturating_add(toc.len()) {
			return Err(BurnError::TrackNumber(prev_last_track.saturating_add(toc.len())));
		}

		let mut out = Vec::with_capacity(tracks.len() * 3 + 4);

		// Catalog.
		if let Some(catalog) = toc.catalog() {
			let c = catalog.as_bytes();
			out.push([ADR_CATALOG, c[0], c[1], c[2], c[3], c[4], c[5], c[6]]);
			out.push([ADR_CATALOG, c[7], c[8], c[9], c[10], c[11], c[12], 0]);
		}

		// Lead-in.
		let form =
			if cd_text { FORM_LEADIN_CD_TEXT }
			else { toc.lead_in_mode().generated_data_form() };
		out.push([ctl_adr(first.ctl(), ADR_POSITION), 0, 0, form, 0, 0, 0, 0]);

		// Tracks.
		for ((t, pos), tno) in tracks.iter().zip(toc.positions()).zip(prev_last_track + 1..) {
			let ctl = t.ctl();
			let form = t.mode().data_form();

			if let Some(isrc) = t.isrc().filter(|_| ! t.mode().is_data()) {
				let i = isrc.as_bytes();
				let adr = ctl_adr(ctl, ADR_ISRC);
				out.push([adr, tno, i[0], i[1], i[2], i[3], i[4], i[5]]);
				out.push([adr, tno, i[6], i[7], i[8], i[9], i[10], i[11]]);
			}

			let adr = ctl_adr(ctl, ADR_POSITION);
			if 0 < t.pregap() {
				out.push(entry(adr, tno, 0, form, session_lba + pos.pregap));
			}
			out.push(entry(adr, tno, 1, form, session_lba + pos.start));
			for (&offset, idx) in t.indices().iter().zip(2_u8..) {
				let lba = pos.start.saturating_add_unsigned(offset);
				out.push(entry(adr, tno, idx, form, session_lba + lba));
			}
		}

		// Lead-out.
		out.push(entry(
			ctl_adr(last.ctl(), ADR_POSITION),
			CD_LEADOUT_TRACK,
			1,
			toc.lead_out_mode().generated_data_form(),
			session_lba + toc.leadout(),
		));

		Ok(Self(out))
	}

	#[must_use]
	/// # Entries.
	pub fn entries(&self) -> &[[u8; 8]] { &self.0 }

	#[must_use]
	/// # Length (Entries).
	pub fn len(&self) -> usize { self.0.len() }

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.0.is_empty() }

	#[must_use]
	/// # Byte Length.
	pub fn byte_len(&self) -> usize { self.0.len() * 8 }

	#[must_use]
	/// # To Bytes.
	///
	/// Flatten the entries into the command payload.
	pub fn to_bytes(&self) -> Vec<u8> { self.0.as_flattened().to_vec() }
}



#[inline]
/// # CTL/ADR Byte.
const fn ctl_adr(ctl: u8, adr: u8) -> u8 { (ctl << 4) | adr }

/// # Position Entry.
fn entry(adr: u8, tno: u8, idx: u8, form: u8, lba: i32) -> [u8; 8] {
	let [m, s, f] = Msf::from_lba(lba).to_array();
	[adr, tno, idx, form, 0, m, s, f]
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		Barcode,
		Isrc,
		SubTrack,
		TocType,
		Track,
		TrackFlags,
		TrackMode,
	};

	/// # Two-Track Disc.
	fn two_tracks() -> Toc {
		let mut toc = Toc::new(TocType::CdDa);
		toc.push_track(
			Track::new(TrackMode::Audio)
				.with_index(400)
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 1000))
		).expect("Push failed.");
		toc.push_track(
			Track::new(TrackMode::Audio)
				.with_pregap(150)
				.with_isrc(Isrc::try_from("US-ABC-99-00001").ok())
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 150))
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 2000))
		).expect("Push failed.");
		toc
	}

	#[test]
	fn t_two_tracks() {
		let toc = two_tracks();
		assert!(toc.check().is_ok(), "Check failed: {:?}", toc.check());

		let cue = CueSheet::new(&toc, false, 0, 0).expect("Cue sheet failed.");
		let expected: [[u8; 8]; 8] = [
			[0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00], // Lead-in.
			[0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00], // T1 I1, LBA 0.
			[0x01, 0x01, 0x02, 0x00, 0x00, 0x00, 0x07, 0x19], // T1 I2, LBA 400.
			[0x03, 0x02, b'U', b'S', b'A', b'B', b'C', b'9'], // T2 ISRC.
			[0x03, 0x02, b'9', b'0', b'0', b'0', b'0', b'1'],
			[0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x0F, 0x19], // T2 I0, LBA 1000.
			[0x01, 0x02, 0x01, 0x00, 0x00, 0x00, 0x11, 0x19], // T2 I1, LBA 1150.
			[0x01, 0xAA, 0x01, 0x01, 0x00, 0x00, 0x2C, 0x00], // Lead-out, LBA 3150.
		];
		assert_eq!(cue.entries(), expected.as_slice(), "Cue sheet mismatch.");
		assert_eq!(cue.byte_len(), 64);
		assert_eq!(cue.to_bytes()[..8], expected[0]);
	}

	#[test]
	fn t_count() {
		// 1 + 2C + N + P + 2R + I + 1.
		let toc = two_tracks();
		let cue = CueSheet::new(&toc, false, 0, 0).expect("Cue sheet failed.");
		assert_eq!(cue.len(), 1 + 2 + 1 + 2 + 1 + 1);

		// Add a catalog, a third track with a pre-gap and two indices.
		let mut toc = two_tracks();
		toc.set_catalog(Barcode::try_from(b"9332727016318".as_slice()).ok());
		toc.push_track(
			Track::new(TrackMode::Audio)
				.with_pregap(75)
				.with_index(100)
				.with_index(200)
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 475))
		).expect("Push failed.");
		let cue = CueSheet::new(&toc, false, 0, 0).expect("Cue sheet failed.");
		let (n, c, p, r, i) = (3, 1, 2, 1, 3);
		assert_eq!(cue.len(), 1 + 2 * c + n + p + 2 * r + i + 1, "Entry count mismatch.");
		assert_eq!(cue.entries()[0], [0x02, b'9', b'3', b'3', b'2', b'7', b'2', b'7']);
		assert_eq!(cue.entries()[1], [0x02, b'0', b'1', b'6', b'3', b'1', b'8', 0]);
	}

	#[test]
	fn t_flags_and_sessions() {
		let mut toc = Toc::new(TocType::CdRomXa);
		toc.push_track(
			Track::new(TrackMode::Audio)
				.with_flags(TrackFlags::default().with_copy(true).with_preemphasis(true))
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 300))
		).expect("Push failed.");
		toc.push_track(
			Track::new(TrackMode::Mode2Form1)
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Mode2Form1, 300))
		).expect("Push failed.");

		// Second session, starting after track 3 at LBA 20000.
		let cue = CueSheet::new(&toc, true, 3, 20_000).expect("Cue sheet failed.");
		let e = cue.entries();
		assert_eq!(e.len(), 4);
		assert_eq!(e[0], [0x31, 0, 0, 0x41, 0, 0, 0, 0], "CD-TEXT lead-in.");
		assert_eq!(e[1][..4], [0x31, 4, 1, 0x00], "Audio track.");
		assert_eq!(e[1][5..], Msf::from_lba(20_000).to_array());
		assert_eq!(e[2][..4], [0x41, 5, 1, 0x20], "XA track.");
		assert_eq!(e[3][..4], [0x41, 0xAA, 1, 0x24], "Lead-out.");
		assert_eq!(e[3][5..], Msf::from_lba(20_600).to_array());

		// Too many tracks.
		assert!(CueSheet::new(&toc, false, 98, 0).is_err());
	}
}
