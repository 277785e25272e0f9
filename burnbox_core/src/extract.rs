/*!
# Burnbox: Audio Extraction

Reading audio accurately is its own discipline; the driver only asks an
[`AudioExtractor`] for sectors. [`VerifyExtractor`] is the simple default.
*/

use crate::{
	BurnError,
	CD_FRAME_SIZE,
	CdrDriver,
	Msf,
	QMode,
	ScsiTransport,
};
use crc::{
	Crc,
	CRC_32_ISO_HDLC,
};



/// # Hasher.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// # Default Attempts Per Sector.
const DEFAULT_TRIES: u8 = 8;



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Extraction Report.
pub struct ExtractReport {
	/// # Sectors Read More Than Twice.
	pub retries: u32,

	/// # Sub-Channel Position Mismatches.
	pub desyncs: u32,

	/// # Sectors That Never Agreed.
	pub failures: u32,
}

impl std::ops::AddAssign for ExtractReport {
	fn add_assign(&mut self, other: Self) {
		self.retries += other.retries;
		self.desyncs += other.desyncs;
		self.failures += other.failures;
	}
}

impl ExtractReport {
	#[must_use]
	/// # Clean?
	pub const fn is_clean(&self) -> bool { self.failures == 0 && self.desyncs == 0 }
}



/// # Audio Extractor.
///
/// Read audio sectors with whatever jitter and scratch correction the
/// implementation provides, reporting anything that couldn't be corrected.
pub trait AudioExtractor {
	/// # Read Audio.
	///
	/// Fill `buf` with `count` 2352-byte sectors starting at `lba`.
	///
	/// ## Errors
	///
	/// Returns an error if the drive fails outright. Sectors that merely
	/// can't be verified are counted in the report instead.
	fn read_audio<T: ScsiTransport>(
		&mut self,
		driver: &mut CdrDriver<T>,
		lba: i32,
		count: u16,
		buf: &mut [u8],
	) -> Result<ExtractReport, BurnError>;
}



#[derive(Debug, Clone)]
/// # Verifying Extractor.
///
/// Every sector is read at least twice; it is accepted once two consecutive
/// reads agree. With `sync` enabled, the sub-channel must also place the
/// read at the requested address.
pub struct VerifyExtractor {
	tries: u8,
	sync: bool,
	scratch: Vec<u8>,
	single: Vec<u8>,
}

impl Default for VerifyExtractor {
	fn default() -> Self { Self::new(false) }
}

impl VerifyExtractor {
	#[must_use]
	/// # New.
	pub const fn new(sync: bool) -> Self {
		Self {
			tries: DEFAULT_TRIES,
			sync,
			scratch: Vec::new(),
			single: Vec::new(),
		}
	}

	#[must_use]
	/// # With Attempts.
	///
	/// Values are capped to `2..=100`.
	pub fn with_tries(self, mut tries: u8) -> Self {
		if tries < 2 { tries = 2; }
		else if 100 < tries { tries = 100; }
		Self { tries, ..self }
	}
}

impl AudioExtractor for VerifyExtractor {
	fn read_audio<T: ScsiTransport>(
		&mut self,
		driver: &mut CdrDriver<T>,
		lba: i32,
		count: u16,
		buf: &mut [u8],
	) -> Result<ExtractReport, BurnError> {
		let size = usize::from(CD_FRAME_SIZE);
		let len = usize::from(count) * size;
		let buf = buf.get_mut(..len).ok_or(BurnError::Bug("short read buffer"))?;
		let mut report = ExtractReport::default();

		// Two full passes.
		let synced = read_pass(driver, lba, count, buf, self.sync, &mut report)?;
		self.scratch.resize(len, 0);
		let synced2 = read_pass(driver, lba, count, &mut self.scratch, self.sync, &mut report)?;

		self.single.resize(size, 0);
		for (((a, b), l), ok) in buf.chunks_exact_mut(size)
			.zip(self.scratch.chunks_exact(size))
			.zip(lba..)
			.zip(synced.into_iter().zip(synced2).map(|(x, y)| x && y))
		{
			if ok && CRC32.checksum(a) == CRC32.checksum(b) { continue; }

			// Keep reading until two in a row agree.
			a.copy_from_slice(b);
			let mut last = CRC32.checksum(b);
			let mut good = false;
			for _ in 2..self.tries {
				report.retries += 1;
				let synced = read_pass(driver, l, 1, &mut self.single, self.sync, &mut report)?;
				a.copy_from_slice(&self.single);
				let hash = CRC32.checksum(&self.single);
				if synced.first().copied().unwrap_or(false) && hash == last {
					good = true;
					break;
				}
				last = hash;
			}

			if ! good { report.failures += 1; }
		}

		Ok(report)
	}
}



/// # Read Pass.
///
/// Read the sectors once, returning whether each was where it should be.
/// (Without `sync`, they all are.)
fn read_pass<T: ScsiTransport>(
	driver: &mut CdrDriver<T>,
	lba: i32,
	count: u16,
	buf: &mut [u8],
	sync: bool,
	report: &mut ExtractReport,
) -> Result<Vec<bool>, BurnError> {
	if sync {
		let subs = driver.read_cd_subchannel(lba, count, buf)?;
		let out: Vec<bool> = subs.iter()
			.zip(lba..)
			.map(|(s, l)|
				// Only intact position frames can say where we are.
				! s.check_crc() ||
				! matches!(s.mode(), QMode::Mode1Data) ||
				s.abs_time() == Some(Msf::from_lba(l))
			)
			.collect();
		report.desyncs += u32::try_from(out.iter().filter(|ok| ! **ok).count()).unwrap_or(u32::MAX);
		Ok(out)
	}
	else {
		driver.read_cd(lba, count, buf)?;
		Ok(vec![true; usize::from(count)])
	}
}
