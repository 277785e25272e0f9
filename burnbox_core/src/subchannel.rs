/*!
# Burnbox: Sub-Channel Codec

Every CD sector carries 96 bits of sub-channel data per channel P through W.
Only P (a pause flag) and Q (position, catalog, ISRC and lead-in TOC) matter
for timing; R through W carry CD-TEXT in the lead-in and nothing at all
elsewhere.

Drives deliver and accept this in two shapes: 16 "packed" bytes holding the
twelve Q bytes and the P flag, or 96 raw bytes with one bit of each channel
per byte.
*/

use crate::{
	bcd,
	bcd2int,
	Barcode,
	CD_LEADOUT_TRACK,
	FRAMES_PER_SECOND,
	is_bcd,
	Isrc,
	Msf,
};
use crc::{
	Crc,
	CRC_16_GSM,
};



/// # Q CRC.
///
/// CRC-CCITT (`x^16 + x^12 + x^5 + 1`), zero init, inverted on output.
const Q_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_GSM);



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Q Mode.
///
/// The ADR nibble of the first Q byte determines how the rest of the frame
/// should be read.
pub enum QMode {
	/// # Lead-in TOC Entry (ADR 1, Track 0).
	Mode1Toc,

	/// # Position (ADR 1).
	Mode1Data,

	/// # Media Catalog Number (ADR 2).
	Mode2,

	/// # ISRC (ADR 3).
	Mode3,

	/// # Multi-Session Pointers (ADR 5).
	Mode5Toc,

	/// # Anything Else.
	Illegal,
}



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Sub-Channel Frame.
///
/// This holds the twelve Q bytes, CRC included, along with the P flag.
///
/// Decoding never fails: sub-channel data is noisy and callers are expected
/// to consult [`SubChannel::check_crc`] and [`SubChannel::check_consistency`]
/// before trusting anything.
///
/// All multi-byte time fields are stored BCD-encoded, exactly as they appear
/// on disc.
pub struct SubChannel {
	q: [u8; 12],
	p: bool,
}

impl SubChannel {
	#[must_use]
	/// # Position Frame (Mode 1).
	///
	/// Build a program-area (or lead-out) Q frame. Pass [`CD_LEADOUT_TRACK`]
	/// for the lead-out; all other track numbers are BCD-encoded.
	///
	/// The CRC is calculated automatically.
	pub fn position(ctl: u8, track: u8, index: u8, rel: Msf, abs: Msf) -> Self {
		let mut q = [0_u8; 12];
		q[0] = ctl_adr(ctl, 1);
		q[1] = encode_track(track);
		q[2] = bcd(index);
		q[3..6].copy_from_slice(&rel.to_bcd());
		q[7..10].copy_from_slice(&abs.to_bcd());
		Self::from_q(q)
	}

	#[must_use]
	/// # Lead-in TOC Frame (Mode 1).
	///
	/// `point` is a track number (BCD-encoded here) or one of the literal
	/// pointers `0xA0`, `0xA1`, `0xA2`. `running` is the time elapsed since
	/// the start of the lead-in; `pmsf` is the three raw point bytes, already
	/// encoded by the caller since their meaning depends on the pointer.
	pub fn toc_entry(ctl: u8, point: u8, running: Msf, pmsf: [u8; 3]) -> Self {
		let mut q = [0_u8; 12];
		q[0] = ctl_adr(ctl, 1);
		q[2] = encode_point(point);
		q[3..6].copy_from_slice(&running.to_bcd());
		q[7..10].copy_from_slice(&pmsf);
		Self::from_q(q)
	}

	#[must_use]
	/// # Multi-Session Pointer Frame (Mode 5).
	///
	/// This builds the `B0` entry announcing where the next session's
	/// program area may begin, and the latest possible lead-out.
	pub fn next_session(ctl: u8, next: Msf, pointers: u8, max_leadout: Msf) -> Self {
		let mut q = [0_u8; 12];
		q[0] = ctl_adr(ctl, 5);
		q[2] = 0xB0;
		q[3..6].copy_from_slice(&next.to_bcd());
		q[6] = bcd(pointers);
		q[7..10].copy_from_slice(&max_leadout.to_bcd());
		Self::from_q(q)
	}

	#[must_use]
	/// # Catalog Frame (Mode 2).
	///
	/// `abs` supplies the AFRAME byte (the only timing data in the frame).
	pub fn catalog(ctl: u8, catalog: &Barcode, abs: Msf) -> Self {
		let mut q = [0_u8; 12];
		q[0] = ctl_adr(ctl, 2);
		q[1..8].copy_from_slice(&catalog.to_q());
		q[9] = bcd(abs.frac());
		Self::from_q(q)
	}

	#[must_use]
	/// # ISRC Frame (Mode 3).
	pub fn isrc(ctl: u8, isrc: &Isrc, abs: Msf) -> Self {
		let mut q = [0_u8; 12];
		q[0] = ctl_adr(ctl, 3);
		q[1..9].copy_from_slice(&isrc.to_q());
		q[9] = bcd(abs.frac());
		Self::from_q(q)
	}

	#[must_use]
	/// # From Raw Q.
	///
	/// Wrap twelve Q bytes as-is. If the CRC bytes are zero, it is calculated
	/// for you.
	pub fn from_q(q: [u8; 12]) -> Self {
		let mut out = Self { q, p: false };
		if out.q[10] == 0 && out.q[11] == 0 { out.calc_crc(); }
		out
	}

	#[must_use]
	/// # Decode Packed (16 Bytes).
	///
	/// This reads the MMC "formatted Q" layout: the twelve Q bytes, three
	/// reserved bytes, and a final byte with the P flag in its MSB.
	pub fn from_pq16(raw: &[u8; 16]) -> Self {
		let mut q = [0_u8; 12];
		q.copy_from_slice(&raw[..12]);
		Self { q, p: 0 != raw[15] & 0x80 }
	}

	#[must_use]
	/// # Decode Raw (96 Bytes).
	///
	/// Each byte holds one bit of each channel, P in bit 7, Q in bit 6. The P
	/// flag is decided by majority since it should be constant for the whole
	/// sector.
	pub fn from_pw96(raw: &[u8; 96]) -> Self {
		let mut q = [0_u8; 12];
		let mut p = 0_u8;
		for (i, b) in raw.iter().copied().enumerate() {
			if 0 != b & 0x80 { p += 1; }
			if 0 != b & 0x40 { q[i / 8] |= 0x80 >> (i % 8); }
		}
		Self { q, p: 48 < p }
	}
}

impl SubChannel {
	#[must_use]
	/// # Encode Packed (16 Bytes).
	pub fn to_pq16(&self) -> [u8; 16] {
		let mut out = [0_u8; 16];
		out[..12].copy_from_slice(&self.q);
		if self.p { out[15] = 0x80; }
		out
	}

	#[must_use]
	/// # Encode Raw (96 Bytes).
	///
	/// The optional `rw` payload supplies the six R-W bits of each byte, e.g.
	/// CD-TEXT symbols. Its upper two bits are ignored.
	pub fn to_pw96(&self, rw: Option<&[u8; 96]>) -> [u8; 96] {
		let mut out = rw.map_or([0_u8; 96], |rw| rw.map(|b| b & 0x3F));
		for (i, b) in out.iter_mut().enumerate() {
			if self.p { *b |= 0x80; }
			if 0 != self.q[i / 8] & (0x80 >> (i % 8)) { *b |= 0x40; }
		}
		out
	}

	#[must_use]
	/// # As Q Bytes.
	pub const fn as_q(&self) -> &[u8; 12] { &self.q }

	#[must_use]
	/// # Pause Flag.
	pub const fn p(&self) -> bool { self.p }

	/// # Set Pause Flag.
	pub fn set_p(&mut self, p: bool) { self.p = p; }

	#[must_use]
	/// # With Pause Flag.
	pub const fn with_p(self, p: bool) -> Self { Self { p, ..self } }
}

impl SubChannel {
	/// # Calculate (and Store) CRC.
	pub fn calc_crc(&mut self) {
		let crc = Q_CRC.checksum(&self.q[..10]);
		self.q[10..].copy_from_slice(&crc.to_be_bytes());
	}

	#[must_use]
	/// # Check CRC.
	pub fn check_crc(&self) -> bool {
		Q_CRC.checksum(&self.q[..10]).to_be_bytes() == [self.q[10], self.q[11]]
	}

	#[must_use]
	/// # Check Consistency.
	///
	/// Run sanity checks on the mode-specific fields, like making sure time
	/// values are BCD and within range. This says nothing about the CRC.
	pub fn check_consistency(&self) -> bool {
		match self.mode() {
			QMode::Mode1Data =>
				(self.q[1] == CD_LEADOUT_TRACK || (is_bcd(self.q[1]) && self.q[1] != 0)) &&
				is_bcd(self.q[2]) &&
				valid_msf(&self.q[3..6]) &&
				self.q[6] == 0 &&
				valid_msf(&self.q[7..10]),
			QMode::Mode1Toc =>
				(is_bcd(self.q[2]) || (0xA0..=0xA2).contains(&self.q[2])) &&
				valid_msf(&self.q[3..6]),
			QMode::Mode2 =>
				Barcode::from_q(&self.q).is_ok() &&
				self.q[8] == 0 &&
				valid_frame(self.q[9]),
			QMode::Mode3 =>
				Isrc::from_q(&self.q).is_ok() &&
				valid_frame(self.q[9]),
			QMode::Mode5Toc => valid_msf(&self.q[3..6]),
			QMode::Illegal => false,
		}
	}
}

impl SubChannel {
	#[must_use]
	/// # Control Nibble.
	pub const fn ctl(&self) -> u8 { self.q[0] >> 4 }

	#[must_use]
	/// # ADR Nibble.
	pub const fn adr(&self) -> u8 { self.q[0] & 0x0F }

	#[must_use]
	/// # Q Mode.
	pub const fn mode(&self) -> QMode {
		match self.adr() {
			1 if self.q[1] == 0 => QMode::Mode1Toc,
			1 => QMode::Mode1Data,
			2 => QMode::Mode2,
			3 => QMode::Mode3,
			5 => QMode::Mode5Toc,
			_ => QMode::Illegal,
		}
	}

	#[must_use]
	/// # Track Number.
	///
	/// This returns the decoded track for position frames. The lead-out is
	/// returned as [`CD_LEADOUT_TRACK`].
	pub const fn track(&self) -> Option<u8> {
		if matches!(self.mode(), QMode::Mode1Data) { Some(decode_track(self.q[1])) }
		else { None }
	}

	#[must_use]
	/// # Index Number.
	pub const fn index(&self) -> Option<u8> {
		if matches!(self.mode(), QMode::Mode1Data) { Some(bcd2int(self.q[2])) }
		else { None }
	}

	#[must_use]
	/// # Relative Time.
	///
	/// For position frames, this is the time relative to the track's index
	/// one. (In a pre-gap it counts down.) The result is a duration.
	pub const fn rel_time(&self) -> Option<Msf> {
		if matches!(self.mode(), QMode::Mode1Data) {
			Some(Msf::from_bcd(self.q[3], self.q[4], self.q[5]))
		}
		else { None }
	}

	#[must_use]
	/// # Absolute Time.
	pub const fn abs_time(&self) -> Option<Msf> {
		if matches!(self.mode(), QMode::Mode1Data) {
			Some(Msf::from_bcd(self.q[7], self.q[8], self.q[9]))
		}
		else { None }
	}

	#[must_use]
	/// # Lead-in Point.
	///
	/// For lead-in TOC frames, return the point (decoded) and the raw point
	/// time bytes.
	pub const fn point(&self) -> Option<(u8, [u8; 3])> {
		if matches!(self.mode(), QMode::Mode1Toc) {
			let point = self.q[2];
			let point =
				if 0xA0 <= point { point }
				else { bcd2int(point) };
			Some((point, [self.q[7], self.q[8], self.q[9]]))
		}
		else { None }
	}

	#[must_use]
	/// # Catalog.
	pub fn catalog_number(&self) -> Option<Barcode> {
		if matches!(self.mode(), QMode::Mode2) { Barcode::from_q(&self.q).ok() }
		else { None }
	}

	#[must_use]
	/// # ISRC.
	pub fn isrc_code(&self) -> Option<Isrc> {
		if matches!(self.mode(), QMode::Mode3) { Isrc::from_q(&self.q).ok() }
		else { None }
	}
}



/// # CTL/ADR Byte.
const fn ctl_adr(ctl: u8, adr: u8) -> u8 { (ctl << 4) | (adr & 0x0F) }

/// # Encode Track.
const fn encode_track(track: u8) -> u8 {
	if track == CD_LEADOUT_TRACK { track }
	else { bcd(track) }
}

/// # Decode Track.
const fn decode_track(track: u8) -> u8 {
	if track == CD_LEADOUT_TRACK { track }
	else { bcd2int(track) }
}

/// # Encode Point.
const fn encode_point(point: u8) -> u8 {
	if 0xA0 <= point { point }
	else { bcd(point) }
}

/// # Valid BCD Frame?
const fn valid_frame(b: u8) -> bool {
	is_bcd(b) && (bcd2int(b) as u32) < FRAMES_PER_SECOND
}

/// # Valid BCD MSF?
fn valid_msf(raw: &[u8]) -> bool {
	raw.len() == 3 &&
	is_bcd(raw[0]) &&
	is_bcd(raw[1]) && bcd2int(raw[1]) < 60 &&
	valid_frame(raw[2])
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_crc() {
		let mut sub = SubChannel::position(0, 1, 1, Msf::from_frames(0), Msf::from_lba(0));
		assert!(sub.check_crc(), "Fresh frames should have valid CRCs.");

		// Flip every payload bit, one at a time.
		let original = *sub.as_q();
		for byte in 0..10 {
			for bit in 0..8 {
				let mut q = original;
				q[byte] ^= 1 << bit;
				let bad = SubChannel { q, p: false };
				assert!(! bad.check_crc(), "Bit {bit} of byte {byte} went undetected.");
			}
		}

		// Recalculation fixes it.
		sub.q[4] = 0x33;
		assert!(! sub.check_crc());
		sub.calc_crc();
		assert!(sub.check_crc(), "Recalculated CRC should check out.");
	}

	#[test]
	fn t_position() {
		let rel = Msf::from_frames(4500 + 75 + 12);
		let abs = Msf::from_lba(1234);
		let sub = SubChannel::position(0x2, 12, 3, rel, abs);
		assert_eq!(sub.mode(), QMode::Mode1Data);
		assert_eq!(sub.ctl(), 0x2);
		assert_eq!(sub.track(), Some(12));
		assert_eq!(sub.index(), Some(3));
		assert_eq!(sub.rel_time(), Some(rel));
		assert_eq!(sub.abs_time(), Some(abs));
		assert_eq!(sub.as_q()[..10], [0x21, 0x12, 0x03, 0x01, 0x01, 0x12, 0x00, 0x00, 0x18, 0x34]);
		assert!(sub.check_consistency(), "Position should be consistent.");

		// Lead-out isn't BCD.
		let sub = SubChannel::position(0, CD_LEADOUT_TRACK, 1, Msf::default(), abs);
		assert_eq!(sub.as_q()[1], 0xAA);
		assert_eq!(sub.track(), Some(CD_LEADOUT_TRACK));
		assert!(sub.check_consistency(), "Lead-out should be consistent.");

		// Busted time.
		let mut q = *sub.as_q();
		q[4] = 0x61;
		assert!(! SubChannel::from_q(q).check_consistency(), "Seconds out of range.");
	}

	#[test]
	fn t_modes() {
		let bc = Barcode::try_from("0075992742320").expect("Barcode failed.");
		let sub = SubChannel::catalog(0, &bc, Msf::from_frames(74));
		assert_eq!(sub.mode(), QMode::Mode2);
		assert_eq!(sub.catalog_number(), Some(bc));
		assert_eq!(sub.as_q()[9], 0x74);
		assert!(sub.check_consistency(), "Catalog should be consistent.");

		let isrc = Isrc::try_from("USABC9900001").expect("ISRC failed.");
		let sub = SubChannel::isrc(0, &isrc, Msf::from_frames(3));
		assert_eq!(sub.mode(), QMode::Mode3);
		assert_eq!(sub.isrc_code(), Some(isrc));
		assert!(sub.check_consistency(), "ISRC should be consistent.");

		let sub = SubChannel::toc_entry(4, 0xA1, Msf::from_frames(10), [0x02, 0, 0]);
		assert_eq!(sub.mode(), QMode::Mode1Toc);
		assert_eq!(sub.point(), Some((0xA1, [0x02, 0, 0])));

		let sub = SubChannel::toc_entry(0, 10, Msf::from_frames(10), [0x02, 0, 0]);
		assert_eq!(sub.as_q()[2], 0x10, "Track points are BCD.");
		assert_eq!(sub.point(), Some((10, [0x02, 0, 0])));

		let sub = SubChannel::next_session(4, Msf::new(20, 0, 0), 1, Msf::new(79, 59, 74));
		assert_eq!(sub.mode(), QMode::Mode5Toc);

		assert_eq!(SubChannel::from_q([0x07, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).mode(), QMode::Illegal);
	}

	#[test]
	fn t_packed() {
		let sub = SubChannel::position(0, 2, 0, Msf::from_frames(149), Msf::from_lba(1000))
			.with_p(true);

		let pq = sub.to_pq16();
		assert_eq!(pq[15], 0x80, "P lives in the last byte.");
		assert_eq!(pq[12..15], [0, 0, 0]);
		assert_eq!(SubChannel::from_pq16(&pq), sub);

		let mut rw = [0_u8; 96];
		for (i, b) in rw.iter_mut().enumerate() { *b = (i as u8) | 0xC0; }
		let pw = sub.to_pw96(Some(&rw));
		assert!(pw.iter().all(|b| 0 != b & 0x80), "P should be set everywhere.");
		for (i, b) in pw.iter().enumerate() {
			assert_eq!(b & 0x3F, (i as u8) & 0x3F, "R-W data was mangled.");
		}

		let back = SubChannel::from_pw96(&pw);
		assert_eq!(back, sub);
		assert!(back.check_crc(), "Interleaving should not break the CRC.");
	}
}
