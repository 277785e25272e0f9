/*!
# Burnbox: READ TOC
*/

use crate::{
	bcd2int,
	BurnError,
	CD_LEADOUT_TRACK,
	CdrDriver,
	CdText,
	DataDir,
	DriverOptions,
	is_bcd,
	Msf,
	ScsiTransport,
	TocType,
};



/// # Formatted TOC Buffer Size.
///
/// A header plus 100 eight-byte descriptors.
const TOC_LEN: u16 = 4 + 100 * 8;

/// # Raw TOC Buffer Size.
const RAW_TOC_LEN: u16 = 4 + 256 * 11;

/// # CD-TEXT Buffer Size.
const CD_TEXT_LEN: u16 = 4 + 2048 * 18;

/// # First Special Point.
const POINT_A0: u8 = 0xA0;

/// # Last Track Point.
const POINT_A1: u8 = 0xA1;

/// # Lead-out Point.
const POINT_A2: u8 = 0xA2;

/// # Next Session Point.
const POINT_B0: u8 = 0xB0;



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Formatted TOC Entry.
pub struct CdToc {
	/// # Track Number (`0xAA` for the lead-out).
	pub track: u8,

	/// # ADR/CTL.
	pub adr_ctl: u8,

	/// # Start LBA.
	pub start: i32,
}

impl CdToc {
	#[must_use]
	/// # Control Nibble.
	pub const fn ctl(&self) -> u8 { self.adr_ctl & 0x0F }

	#[must_use]
	/// # Data Track?
	pub const fn is_data(&self) -> bool { 0 != self.ctl() & 0x04 }

	#[must_use]
	/// # Lead-out?
	pub const fn is_leadout(&self) -> bool { self.track == CD_LEADOUT_TRACK }
}



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Raw TOC Entry.
///
/// Fields are always binary here, whatever the drive sent.
pub struct CdRawToc {
	/// # Session.
	pub session: u8,

	/// # ADR/CTL.
	pub adr_ctl: u8,

	/// # Point.
	pub point: u8,

	/// # Running Time (Minute).
	pub min: u8,

	/// # Running Time (Second).
	pub sec: u8,

	/// # Running Time (Frame).
	pub frame: u8,

	/// # Point Minute.
	pub pmin: u8,

	/// # Point Second.
	pub psec: u8,

	/// # Point Frame.
	pub pframe: u8,
}

impl CdRawToc {
	#[must_use]
	/// # ADR.
	pub const fn adr(&self) -> u8 { self.adr_ctl >> 4 }

	#[must_use]
	/// # Control Nibble.
	pub const fn ctl(&self) -> u8 { self.adr_ctl & 0x0F }

	#[must_use]
	/// # Track Point?
	pub const fn is_track(&self) -> bool {
		self.adr() == 1 && 1 <= self.point && self.point <= 99
	}

	#[must_use]
	/// # Lead-out Point?
	pub const fn is_leadout(&self) -> bool { self.adr() == 1 && self.point == POINT_A2 }

	#[must_use]
	/// # Disc Type.
	///
	/// The `A0` entry carries the session format in its PSEC byte.
	pub const fn disc_type(&self) -> Option<TocType> {
		if self.adr() == 1 && self.point == POINT_A0 {
			Some(TocType::from_session_format(self.psec))
		}
		else { None }
	}

	#[must_use]
	/// # Point Address.
	///
	/// The start LBA for track and lead-out points.
	pub const fn start(&self) -> i32 { Msf::new(self.pmin, self.psec, self.pframe).lba() }

	/// # From Raw Bytes.
	fn from_raw(raw: &[u8], bcd: bool) -> Self {
		let conv = |b: u8| if bcd { bcd2int(b) } else { b };
		let adr = raw[1] >> 4;
		let point = raw[3];

		let mut out = Self {
			session: raw[0],
			adr_ctl: raw[1],
			point,
			min: raw[4],
			sec: raw[5],
			frame: raw[6],
			pmin: raw[8],
			psec: raw[9],
			pframe: raw[10],
		};

		match (adr, point) {
			// Track numbers, not times, sit in A0/A1; A0's second is the disc
			// type.
			(1, POINT_A0 | POINT_A1) => {
				out.pmin = conv(raw[8]);
				out.min = conv(raw[4]);
				out.sec = conv(raw[5]);
				out.frame = conv(raw[6]);
			},
			(1, _) | (5, POINT_B0) => {
				if point < POINT_A0 { out.point = conv(point); }
				out.min = conv(raw[4]);
				out.sec = conv(raw[5]);
				out.frame = conv(raw[6]);
				out.pmin = conv(raw[8]);
				out.psec = conv(raw[9]);
				out.pframe = conv(raw[10]);
			},
			_ => {},
		}

		out
	}
}



impl<T: ScsiTransport> CdrDriver<T> {
	/// # Get TOC.
	///
	/// Read the formatted TOC (format 0) with LBA addressing.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails or the TOC is empty.
	pub fn get_toc(&mut self) -> Result<Vec<CdToc>, BurnError> {
		self.formatted_toc(false)
	}

	/// # Get TOC (Generic).
	///
	/// Read the formatted TOC using MSF addressing, for drives that botch the
	/// LBA form.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails or the TOC is empty.
	pub fn get_toc_generic(&mut self) -> Result<Vec<CdToc>, BurnError> {
		self.formatted_toc(true)
	}

	/// # Formatted TOC.
	fn formatted_toc(&mut self, msf: bool) -> Result<Vec<CdToc>, BurnError> {
		let mut buf = vec![0_u8; usize::from(TOC_LEN)];
		let [a, b] = TOC_LEN.to_be_bytes();
		self.send(
			&[0x43, if msf { 0x02 } else { 0 }, 0, 0, 0, 0, 0, a, b, 0],
			DataDir::In(&mut buf),
		)?;

		let len = usize::from(u16::from_be_bytes([buf[0], buf[1]])) + 2;
		let body = buf.get(4..len.min(buf.len())).unwrap_or_default();
		let out: Vec<CdToc> = body.chunks_exact(8)
			.map(|e| CdToc {
				track: e[2],
				adr_ctl: e[1],
				start:
					if msf { Msf::new(e[5], e[6], e[7]).lba() }
					else { i32::from_be_bytes([e[4], e[5], e[6], e[7]]) },
			})
			.collect();

		if out.iter().any(|e| ! e.is_leadout()) { Ok(out) }
		else { Err(BurnError::NoDisc) }
	}

	/// # Get Raw TOC.
	///
	/// Read the full (format 2) TOC. Drives disagree on whether the address
	/// fields are BCD or binary; unless the model is known, this is
	/// determined by looking at the values themselves, with the formatted
	/// TOC breaking ties.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails, or
	/// [`BurnError::RawTocAmbiguous`] if the encoding can't be determined, in
	/// which case callers should fall back to [`CdrDriver::get_toc`].
	pub fn get_raw_toc(&mut self) -> Result<Vec<CdRawToc>, BurnError> {
		let mut buf = vec![0_u8; usize::from(RAW_TOC_LEN)];
		let [a, b] = RAW_TOC_LEN.to_be_bytes();
		self.send(&[0x43, 0x02, 0x02, 0, 0, 0, 1, a, b, 0], DataDir::In(&mut buf))?;

		let len = usize::from(u16::from_be_bytes([buf[0], buf[1]])) + 2;
		let body = buf.get(4..len.min(buf.len())).unwrap_or_default();
		let raw: Vec<&[u8]> = body.chunks_exact(11).collect();
		if raw.is_empty() { return Err(BurnError::NoDisc); }

		let bcd =
			if self.has(DriverOptions::RAW_TOC_BCD) { true }
			else if self.has(DriverOptions::RAW_TOC_HEX) { false }
			else {
				match (plausible(&raw, true), plausible(&raw, false)) {
					(true, false) => true,
					(false, true) => false,
					(true, true) => {
						let as_bcd = leadout(&raw, true);
						let as_hex = leadout(&raw, false);
						if as_bcd == as_hex { true }
						else {
							let real = self.get_toc()
								.ok()
								.and_then(|t| t.iter().find(|e| e.is_leadout()).map(|e| e.start));
							if real.is_some() && real == as_bcd { true }
							else if real.is_some() && real == as_hex { false }
							else { return Err(BurnError::RawTocAmbiguous); }
						}
					},
					(false, false) => return Err(BurnError::RawTocAmbiguous),
				}
			};

		Ok(raw.into_iter().map(|r| CdRawToc::from_raw(r, bcd)).collect())
	}

	/// # Read CD-TEXT.
	///
	/// Read and decode the lead-in CD-TEXT (format 5), if any.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails for reasons other than there
	/// being no CD-TEXT.
	pub fn read_cd_text(&mut self) -> Result<Option<CdText>, BurnError> {
		if self.has(DriverOptions::NO_CDTEXT_READ) { return Ok(None); }

		let mut buf = vec![0_u8; usize::from(CD_TEXT_LEN)];
		let [a, b] = CD_TEXT_LEN.to_be_bytes();
		match self.send(&[0x43, 0, 0x05, 0, 0, 0, 0, a, b, 0], DataDir::In(&mut buf)) {
			Ok(()) => {},
			// Illegal request: there's nothing there.
			Err(BurnError::Scsi { sense: Some(s), .. }) if s.key == 5 => return Ok(None),
			Err(e) => return Err(e),
		}

		let len = usize::from(u16::from_be_bytes([buf[0], buf[1]])) + 2;
		let body = buf.get(4..len.min(buf.len())).unwrap_or_default();
		let text = CdText::decode(body);
		if text.is_empty() { Ok(None) }
		else { Ok(Some(text)) }
	}
}



/// # Plausible Encoding?
///
/// Return true if every ADR-1 entry makes sense under the given encoding,
/// and track starts increase within each session.
fn plausible(raw: &[&[u8]], bcd: bool) -> bool {
	let time_ok = |m: u8, s: u8, f: u8|
		if bcd { is_bcd(m) && is_bcd(s) && is_bcd(f) && bcd2int(s) < 60 && bcd2int(f) < 75 }
		else { s < 60 && f < 75 };
	let num_ok = |n: u8|
		if bcd { is_bcd(n) && (1..=99).contains(&bcd2int(n)) }
		else { (1..=99).contains(&n) };

	let mut last: Option<(u8, i32)> = None;
	for r in raw.iter().filter(|r| r[1] >> 4 == 1) {
		let point = r[3];
		match point {
			POINT_A0 | POINT_A1 => if ! num_ok(r[8]) { return false; },
			POINT_A2 => if ! time_ok(r[8], r[9], r[10]) { return false; },
			p if p < POINT_A0 => {
				if ! num_ok(p) || ! time_ok(r[8], r[9], r[10]) { return false; }
				let e = CdRawToc::from_raw(r, bcd);
				if let Some((session, start)) = last {
					if session == e.session && e.start() <= start { return false; }
				}
				last.replace((e.session, e.start()));
			},
			_ => {},
		}
	}

	true
}

/// # First Lead-out Under Encoding.
fn leadout(raw: &[&[u8]], bcd: bool) -> Option<i32> {
	raw.iter()
		.map(|r| CdRawToc::from_raw(r, bcd))
		.find(CdRawToc::is_leadout)
		.map(|e| e.start())
}
