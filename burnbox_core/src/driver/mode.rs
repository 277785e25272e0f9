/*!
# Burnbox: Mode Pages
*/

use crate::{
	BurnError,
	CdrDriver,
	DataDir,
	DriverOptions,
	ScsiTransport,
	Toc,
	WriteOptions,
};



/// # Write Parameters Page.
const PAGE_WRITE: u8 = 0x05;

/// # Capabilities Page.
const PAGE_CAPABILITIES: u8 = 0x2A;

/// # Mode Sense Buffer Size.
const SENSE_LEN: u8 = 0xFF;

/// # Mode (10) Header Size.
const HEADER10: usize = 8;

/// # Mode (6) Header Size.
const HEADER6: usize = 4;

/// # Default Audio Pause (Blocks).
const AUDIO_PAUSE: u16 = 150;

/// # Single-Speed Rate (KB/s).
const KB_PER_X: u16 = 176;



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
/// # Drive Capabilities.
///
/// The interesting bits of mode page 0x2A.
pub struct Capabilities {
	/// # Write CD-R.
	pub write_cdr: bool,

	/// # Write CD-RW.
	pub write_cdrw: bool,

	/// # Test (Simulated) Writes.
	pub test_write: bool,

	/// # BURN-Proof (Buffer Underrun Protection).
	pub burnproof: bool,

	/// # Accurate CD-DA Stream.
	pub accurate_stream: bool,

	/// # C2 Error Pointers.
	pub c2: bool,

	/// # R-W Sub-Channel Reads (Needed for CD-TEXT).
	pub rw_read: bool,

	/// # ISRC Reads.
	pub isrc: bool,

	/// # Catalog Reads.
	pub upc: bool,

	/// # Maximum Read Speed (x).
	pub max_read_speed: u16,

	/// # Maximum Write Speed (x).
	pub max_write_speed: u16,

	/// # Buffer Size (KiB).
	pub buffer_kb: u16,
}

impl Capabilities {
	/// # From Page.
	fn from_page(page: &[u8]) -> Self {
		let bit = |idx: usize, mask: u8| page.get(idx).is_some_and(|b| 0 != b & mask);
		let word = |idx: usize| match (page.get(idx), page.get(idx + 1)) {
			(Some(a), Some(b)) => u16::from_be_bytes([*a, *b]),
			_ => 0,
		};

		Self {
			write_cdr: bit(3, 0b0000_0001),
			write_cdrw: bit(3, 0b0000_0010),
			test_write: bit(3, 0b0000_0100),
			burnproof: bit(4, 0b1000_0000),
			accurate_stream: bit(5, 0b0000_0010),
			c2: bit(5, 0b0001_0000),
			rw_read: bit(5, 0b0000_0100),
			isrc: bit(5, 0b0010_0000),
			upc: bit(5, 0b0100_0000),
			max_read_speed: word(8) / KB_PER_X,
			max_write_speed: word(18) / KB_PER_X,
			buffer_kb: word(12),
		}
	}
}



impl<T: ScsiTransport> CdrDriver<T> {
	/// # Mode Page (10-byte).
	///
	/// Return the current values of a mode page, sans header and block
	/// descriptors.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails or the drive returns some other
	/// page.
	pub fn mode_page(&mut self, page: u8) -> Result<Vec<u8>, BurnError> {
		let mut buf = vec![0_u8; usize::from(SENSE_LEN)];
		self.send(
			&[0x5A, 0x08, page & 0x3F, 0, 0, 0, 0, 0, SENSE_LEN, 0],
			DataDir::In(&mut buf),
		)?;

		let bd = usize::from(u16::from_be_bytes([buf[6], buf[7]]));
		extract_page(&buf, HEADER10 + bd, page)
	}

	/// # Set Mode Page (10-byte).
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn set_mode_page(&mut self, page: &[u8]) -> Result<(), BurnError> {
		let mut data = vec![0_u8; HEADER10 + page.len()];
		data[HEADER10..].copy_from_slice(page);
		data[HEADER10] &= 0x7F; // The PS bit must be zero.

		let [a, b] = u16::try_from(data.len())
			.map_err(|_| BurnError::Bug("oversized mode page"))?
			.to_be_bytes();
		self.send(&[0x55, 0x10, 0, 0, 0, 0, 0, a, b, 0], DataDir::Out(&data))
	}

	/// # Mode Page (6-byte).
	///
	/// ## Errors
	///
	/// Returns an error if the command fails or the drive returns some other
	/// page.
	pub fn mode_page6(&mut self, page: u8) -> Result<Vec<u8>, BurnError> {
		let mut buf = vec![0_u8; usize::from(SENSE_LEN)];
		self.send(&[0x1A, 0x08, page & 0x3F, 0, SENSE_LEN, 0], DataDir::In(&mut buf))?;

		let bd = usize::from(buf[3]);
		extract_page(&buf, HEADER6 + bd, page)
	}

	/// # Set Mode Page (6-byte).
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn set_mode_page6(&mut self, page: &[u8]) -> Result<(), BurnError> {
		let mut data = vec![0_u8; HEADER6 + page.len()];
		data[HEADER6..].copy_from_slice(page);
		data[HEADER6] &= 0x7F;

		let len = u8::try_from(data.len()).map_err(|_| BurnError::Bug("oversized mode page"))?;
		self.send(&[0x15, 0x10, 0, 0, len, 0], DataDir::Out(&data))
	}

	/// # Capabilities.
	///
	/// ## Errors
	///
	/// Returns an error if the page can't be read.
	pub fn capabilities(&mut self) -> Result<Capabilities, BurnError> {
		self.mode_page(PAGE_CAPABILITIES).map(|p| Capabilities::from_page(&p))
	}

	/// # Toggle Test Writes.
	pub(super) fn set_test_write(&mut self, on: bool) -> Result<(), BurnError> {
		let mut page = self.mode_page(PAGE_WRITE)?;
		if page.len() < 4 { return Err(BurnError::Unsupported("write parameters page")); }
		if on { page[2] |= 0b0001_0000; }
		else { page[2] &= ! 0b0001_0000; }
		self.set_mode_page(&page)
	}

	/// # Set Write Parameters.
	///
	/// Configure page 0x05 for the session: write type, test writes,
	/// BURN-Proof, multi-session, data block type and session format.
	pub(super) fn set_write_params(
		&mut self,
		toc: &Toc,
		opts: &WriteOptions,
		first_session: bool,
		burnproof: bool,
	) -> Result<(), BurnError> {
		let mut page = self.mode_page(PAGE_WRITE)?;
		if page.len() < 16 { return Err(BurnError::Unsupported("write parameters page")); }

		let bufe = burnproof && opts.burnproof() && ! self.has(DriverOptions::NO_BURNPROOF);
		page[2] =
			(u8::from(bufe) << 6) |
			(u8::from(opts.simulate()) << 4) |
			self.kind.write_type();

		// 11: another session may follow; 01: this closes a multi-session
		// disc; 00: single session.
		let multi: u8 =
			if opts.multi_session() { 0b11 }
			else if first_session { 0b00 }
			else { 0b01 };
		let ctl = toc.tracks().first().map_or(0, |t| t.ctl() & 0x0F);
		page[3] = (multi << 6) | (page[3] & 0b0011_0000) | ctl;
		page[4] = self.data_block_type();
		page[8] = toc.kind().session_format();

		let [a, b] = AUDIO_PAUSE.to_be_bytes();
		page[14] = a;
		page[15] = b;

		self.set_mode_page(&page)
	}
}



/// # Extract Page.
///
/// Pull a page out of a MODE SENSE response, making sure it is the one that
/// was asked for.
fn extract_page(buf: &[u8], start: usize, page: u8) -> Result<Vec<u8>, BurnError> {
	let code = *buf.get(start).ok_or(BurnError::Unsupported("mode page"))?;
	let len = usize::from(*buf.get(start + 1).ok_or(BurnError::Unsupported("mode page"))?);
	if code & 0x3F != page & 0x3F || len == 0 {
		return Err(BurnError::Unsupported("mode page"));
	}

	let end = (start + 2 + len).min(buf.len());
	Ok(buf[start..end].to_vec())
}
