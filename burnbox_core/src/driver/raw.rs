/*!
# Burnbox: Raw Sub-Channel

Raw (write type 3) sessions leave the sub-channel entirely to the host. This
module lays out a session once and then answers "what goes in the P/Q (and
R-W) channels at this address?" for every block from the start of the
lead-in through the end of the lead-out.
*/

use crate::{
	bcd,
	bcd2int,
	Barcode,
	CD_LEADIN,
	CD_LEADOUT_TRACK,
	CdText,
	Isrc,
	Msf,
	QMode,
	SubChannel,
	Toc,
	cdtext::PACK_SIZE,
};



/// # Catalog Interval.
///
/// Every hundred blocks, one position frame is swapped for a catalog frame,
/// and (halfway between) one for the track's ISRC.
const MODE23_INTERVAL: i32 = 100;

/// # ISRC Offset Within the Interval.
const ISRC_OFFSET: i32 = 50;

/// # Lead-in Repetitions.
const LEAD_IN_REPEAT: usize = 3;

/// # Next Session Offset.
///
/// The next session's program area begins after this session's lead-out
/// and the next session's lead-in.
const NEXT_SESSION_GAP: i32 = 6750 + 4500;



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Lead-in Entry.
enum LeadIn {
	/// # Mode 1 TOC Entry.
	Toc { ctl: u8, point: u8, pmsf: [u8; 3] },

	/// # Mode 5 Next-Session Pointer.
	Next { ctl: u8, next: Msf, max: Msf },
}

impl LeadIn {
	/// # Sub-Channel.
	fn subchannel(self, running: Msf) -> SubChannel {
		match self {
			Self::Toc { ctl, point, pmsf } => SubChannel::toc_entry(ctl, point, running, pmsf),
			Self::Next { ctl, next, max } => SubChannel::next_session(ctl, next, 1, max),
		}
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Track Layout.
struct RawTrack {
	number: u8,
	ctl: u8,
	pregap: i32,
	start: i32,
	end: i32,
	indices: Vec<i32>,
	isrc: Option<Isrc>,
}

impl RawTrack {
	/// # Index at LBA.
	fn index(&self, lba: i32) -> u8 {
		if lba < self.start { 0 }
		else {
			let n = self.indices.iter().take_while(|i| **i <= lba).count();
			u8::try_from(n + 1).unwrap_or(99)
		}
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Raw Session Layout.
pub(super) struct RawLayout {
	tracks: Vec<RawTrack>,
	lead_in: Vec<LeadIn>,
	lead_in_start: i32,
	leadout: i32,
	lead_out_ctl: u8,
	catalog: Option<Barcode>,
	packs: Vec<[u8; PACK_SIZE]>,
}

impl RawLayout {
	/// # New.
	///
	/// Lay out a (first) session. `lead_in_start` is the ATIP lead-in
	/// address; `lead_out_max` (if known) is announced in the multi-session
	/// pointer.
	pub(super) fn new(
		toc: &Toc,
		lead_in_start: i32,
		multi: bool,
		lead_out_max: Option<i32>,
		packs: Vec<[u8; PACK_SIZE]>,
	) -> Self {
		let mut tracks = Vec::with_capacity(toc.tracks().len());
		for ((t, pos), number) in toc.tracks().iter().zip(toc.positions()).zip(1_u8..) {
			let mut pregap = pos.pregap;
			// The first track's pre-gap always includes the initial pause.
			if number == 1 { pregap -= CD_LEADIN; }
			tracks.push(RawTrack {
				number,
				ctl: t.ctl(),
				pregap,
				start: pos.start,
				end: pos.end,
				indices: t.indices().iter()
					.map(|i| pos.start.saturating_add(i32::try_from(*i).unwrap_or(i32::MAX)))
					.collect(),
				isrc: if t.mode().is_data() { None } else { t.isrc().copied() },
			});
		}

		let leadout = toc.leadout();
		let first_ctl = tracks.first().map_or(0, |t| t.ctl);
		let last = tracks.last().map_or((1, 0), |t| (t.number, t.ctl));

		let mut lead_in: Vec<LeadIn> = tracks.iter()
			.map(|t| LeadIn::Toc {
				ctl: t.ctl,
				point: t.number,
				pmsf: Msf::from_lba(t.start).to_bcd(),
			})
			.collect();
		lead_in.push(LeadIn::Toc {
			ctl: first_ctl,
			point: 0xA0,
			pmsf: [bcd(1), toc.kind().session_format(), 0],
		});
		lead_in.push(LeadIn::Toc { ctl: last.1, point: 0xA1, pmsf: [bcd(last.0), 0, 0] });
		lead_in.push(LeadIn::Toc {
			ctl: last.1,
			point: 0xA2,
			pmsf: Msf::from_lba(leadout).to_bcd(),
		});
		if multi {
			lead_in.push(LeadIn::Next {
				ctl: first_ctl,
				next: Msf::from_lba(leadout + NEXT_SESSION_GAP),
				max: Msf::from_lba(lead_out_max.unwrap_or(leadout)),
			});
		}

		Self {
			tracks,
			lead_in,
			lead_in_start,
			leadout,
			lead_out_ctl: last.1,
			catalog: toc.catalog().copied(),
			packs,
		}
	}

	/// # Lead-in Start.
	pub(super) const fn lead_in_start(&self) -> i32 { self.lead_in_start }

	/// # Lead-out Start.
	pub(super) const fn leadout(&self) -> i32 { self.leadout }

	/// # Sub-Channel at LBA.
	pub(super) fn subchannel(&self, lba: i32) -> SubChannel {
		// Lead-in: the TOC, over and over.
		if lba < -CD_LEADIN {
			let idx = lba.saturating_sub(self.lead_in_start).max(0).unsigned_abs();
			let entry = self.lead_in[(idx as usize / LEAD_IN_REPEAT) % self.lead_in.len()];
			return entry.subchannel(Msf::from_frames(idx));
		}

		// Lead-out.
		if self.leadout <= lba {
			let rel = lba.abs_diff(self.leadout);
			let p = (rel * 4 / 75) % 2 == 0;
			return SubChannel::position(
				self.lead_out_ctl,
				CD_LEADOUT_TRACK,
				1,
				Msf::from_frames(rel),
				Msf::from_lba(lba),
			).with_p(p);
		}

		// Program area.
		let Some(track) = self.tracks.iter().find(|t| t.pregap <= lba && lba < t.end)
			.or_else(|| self.tracks.last())
			else { return SubChannel::default(); };

		let index = track.index(lba);
		let p = index == 0;
		let abs = Msf::from_lba(lba);
		let n = lba + CD_LEADIN;

		if let Some(catalog) = &self.catalog {
			if n % MODE23_INTERVAL == 0 {
				return SubChannel::catalog(track.ctl, catalog, abs).with_p(p);
			}
		}
		if let Some(isrc) = &track.isrc {
			if index != 0 && n % MODE23_INTERVAL == ISRC_OFFSET {
				return SubChannel::isrc(track.ctl, isrc, abs).with_p(p);
			}
		}

		SubChannel::position(
			track.ctl,
			track.number,
			index,
			Msf::from_frames(lba.abs_diff(track.start)),
			abs,
		).with_p(p)
	}

	/// # R-W Payload at LBA.
	///
	/// CD-TEXT lives in the lead-in.
	pub(super) fn rw(&self, lba: i32) -> Option<[u8; 96]> {
		if self.packs.is_empty() || -CD_LEADIN <= lba { return None; }
		let idx = lba.saturating_sub(self.lead_in_start).max(0).unsigned_abs();
		Some(CdText::rw_symbols(&self.packs, idx as usize))
	}
}



/// # PQ16 in Hex.
///
/// Most drives want the packed Q with its BCD fields converted to binary
/// (the CRC recomputed to match).
pub(super) fn pq_hex(sub: &SubChannel) -> [u8; 16] {
	let mut q = *sub.as_q();
	match sub.mode() {
		QMode::Mode1Data => {
			if q[1] != CD_LEADOUT_TRACK { q[1] = bcd2int(q[1]); }
			for b in &mut q[2..10] { *b = bcd2int(*b); }
		},
		QMode::Mode1Toc => {
			let point = q[2];
			if point < 0xA0 { q[2] = bcd2int(point); }
			for b in &mut q[3..6] { *b = bcd2int(*b); }
			if point == 0xA0 || point == 0xA1 { q[7] = bcd2int(q[7]); }
			else {
				for b in &mut q[7..10] { *b = bcd2int(*b); }
			}
		},
		QMode::Mode5Toc => for b in &mut q[3..10] { *b = bcd2int(*b); },
		QMode::Mode2 | QMode::Mode3 | QMode::Illegal => {},
	}

	q[10] = 0;
	q[11] = 0;
	SubChannel::from_q(q).with_p(sub.p()).to_pq16()
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		SubTrack,
		Track,
		TrackMode,
		TocType,
	};

	fn toc() -> Toc {
		let mut toc = Toc::new(TocType::CdDa);
		toc.set_catalog(Barcode::try_from("9332727016318").ok());
		toc.push_track(
			Track::new(TrackMode::Audio)
				.with_isrc(Isrc::try_from("USABC9900001").ok())
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 400))
		).unwrap();
		toc.push_track(
			Track::new(TrackMode::Audio)
				.with_pregap(150)
				.with_index(100)
				.with_subtrack(SubTrack::zero_blocks(TrackMode::Audio, 500))
		).unwrap();
		toc
	}

	#[test]
	fn t_lead_in() {
		let layout = RawLayout::new(&toc(), -11_000, false, None, Vec::new());
		assert_eq!(layout.lead_in.len(), 5, "Two tracks plus A0/A1/A2.");

		// Each entry is repeated thrice.
		let points: Vec<u8> = (0..15)
			.map(|i| layout.subchannel(-11_000 + i).as_q()[2])
			.collect();
		assert_eq!(
			points,
			[1, 1, 1, 2, 2, 2, 0xA0, 0xA0, 0xA0, 0xA1, 0xA1, 0xA1, 0xA2, 0xA2, 0xA2],
		);

		// And then it loops.
		let sub = layout.subchannel(-11_000 + 15);
		assert_eq!(sub.mode(), QMode::Mode1Toc);
		assert_eq!(sub.point(), Some((1, Msf::from_lba(0).to_bcd())));
		assert!(sub.check_crc());
		assert!(! sub.p());

		// Lead-out pointer.
		let sub = layout.subchannel(-11_000 + 12);
		assert_eq!(sub.as_q()[7..10], Msf::from_lba(900).to_bcd());

		// Multi-session adds B0.
		let layout = RawLayout::new(&toc(), -11_000, true, Some(300_000), Vec::new());
		assert_eq!(layout.lead_in.len(), 6);
		let sub = layout.subchannel(-11_000 + 15);
		assert_eq!(sub.mode(), QMode::Mode5Toc);
		assert_eq!(sub.as_q()[3..6], Msf::from_lba(900 + 11_250).to_bcd());
	}

	#[test]
	fn t_program() {
		let layout = RawLayout::new(&toc(), -11_000, false, None, Vec::new());

		// The initial pause belongs to track one, index zero.
		let sub = layout.subchannel(-149);
		assert_eq!((sub.track(), sub.index()), (Some(1), Some(0)));
		assert!(sub.p());
		assert_eq!(sub.rel_time(), Some(Msf::from_frames(149)), "Counting down.");

		let sub = layout.subchannel(1);
		assert_eq!((sub.track(), sub.index()), (Some(1), Some(1)));
		assert!(! sub.p());
		assert_eq!(sub.abs_time(), Some(Msf::from_lba(1)));

		// Catalog and ISRC frames.
		let sub = layout.subchannel(-50);
		assert_eq!(sub.mode(), QMode::Mode2);
		assert_eq!(sub.catalog_number().map(|c| c.to_string()).as_deref(), Some("9332727016318"));
		let sub = layout.subchannel(0);
		assert_eq!(sub.mode(), QMode::Mode3, "150 % 100 is 50.");
		assert_eq!(sub.isrc_code().map(|c| c.to_string()).as_deref(), Some("USABC9900001"));

		// Track two's pre-gap and index.
		let sub = layout.subchannel(401);
		assert_eq!((sub.track(), sub.index()), (Some(2), Some(0)));
		assert!(sub.p());
		let sub = layout.subchannel(400 + 150 + 101);
		assert_eq!((sub.track(), sub.index()), (Some(2), Some(2)));

		// No ISRC for track two.
		let sub = layout.subchannel(700);
		assert_eq!(sub.mode(), QMode::Mode1Data);
	}

	#[test]
	fn t_lead_out() {
		let layout = RawLayout::new(&toc(), -11_000, false, None, Vec::new());
		let sub = layout.subchannel(900);
		assert_eq!(sub.track(), Some(CD_LEADOUT_TRACK));
		assert_eq!(sub.index(), Some(1));
		assert!(sub.p(), "Starts high.");
		assert!(! layout.subchannel(900 + 19).p(), "Then toggles at 2 Hz.");
		assert!(layout.subchannel(900 + 38).p());
	}

	#[test]
	fn t_pq_hex() {
		let sub = SubChannel::position(0, 12, 1, Msf::new(0, 59, 10), Msf::new(3, 22, 74));
		let hex = pq_hex(&sub);
		assert_eq!(hex[1..10], [12, 1, 0, 59, 10, 0, 3, 22, 74]);
		let back = SubChannel::from_pq16(&hex);
		assert!(back.check_crc(), "The CRC should match the new bytes.");

		// A0's second is the disc type, not a time.
		let sub = SubChannel::toc_entry(0, 0xA0, Msf::from_frames(0), [bcd(1), 0x20, 0]);
		let hex = pq_hex(&sub);
		assert_eq!(hex[2], 0xA0);
		assert_eq!(hex[7..10], [1, 0x20, 0]);

		// The lead-out track stays put.
		let sub = SubChannel::position(0, CD_LEADOUT_TRACK, 1, Msf::from_frames(0), Msf::new(20, 0, 0))
			.with_p(true);
		let hex = pq_hex(&sub);
		assert_eq!(hex[1], CD_LEADOUT_TRACK);
		assert_eq!(hex[15], 0x80);
	}
}
