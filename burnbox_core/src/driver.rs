/*!
# Burnbox: Driver

This is the generic MMC driver, covering both session-at-once (drive
synthesizes sub-channel) and raw (host synthesizes sub-channel) writing,
plus the reading and analysis commands needed to turn a disc back into a
TOC.
*/

mod analyze;
mod disk_info;
mod mode;
mod options;
mod raw;
mod session;
mod toc;

pub use disk_info::{
	DiskInfo,
	DiskStatus,
};
pub use mode::Capabilities;
pub use options::{
	DriverKind,
	DriverOptions,
};
pub use toc::{
	CdRawToc,
	CdToc,
};

use crate::{
	BurnError,
	CD_FRAME_SIZE,
	DaoLog,
	DataDir,
	HwInfo,
	MessageKind,
	Phase,
	PQ_SUBCHANNEL_SIZE,
	PW_SUBCHANNEL_SIZE,
	Reporter,
	ScsiTransport,
	Sense,
	TrackMode,
};
use session::DaoState;
use std::{
	fmt,
	thread::sleep,
	time::Duration,
};



/// # Ready Attempts.
///
/// TEST UNIT READY is retried (once per second) this many times during
/// setup.
const READY_TRIES: u16 = 60;

/// # Ready Delay.
const READY_DELAY: Duration = Duration::from_secs(1);

/// # Long Write Delay.
const LONG_WRITE_DELAY: Duration = Duration::from_millis(40);

/// # Long Write Attempts.
///
/// About a minute's worth.
const LONG_WRITE_TRIES: u16 = 1500;

/// # Blanking Attempts.
///
/// Full blanks of slow media can take a very long time.
const BLANK_TRIES: u16 = 80 * 60;

/// # Zero Chunk (Blocks).
const ZERO_CHUNK: u32 = 75;



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Unit Status.
pub enum UnitStatus {
	/// # Ready.
	Ready = 0,

	/// # Command Failed.
	Failed = 1,

	/// # Not (Yet) Ready.
	NotReady = 2,
}



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Blanking Mode.
pub enum BlankMode {
	#[default]
	/// # Entire Disc.
	Full,

	/// # PMA, TOC, and First Pre-gap Only.
	Minimal,
}

impl fmt::Display for BlankMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl BlankMode {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Full => "full",
			Self::Minimal => "minimal",
		}
	}

	/// # Blanking Type (CDB Byte 1).
	const fn code(self) -> u8 {
		match self {
			Self::Full => 0,
			Self::Minimal => 1,
		}
	}
}



#[derive(Debug)]
/// # CD Recorder Driver.
///
/// This owns the transport exclusively for its lifetime; every operation
/// takes `&mut self`.
///
/// A write session runs [`CdrDriver::init_dao`] → [`CdrDriver::start_dao`]
/// → [`CdrDriver::write_data`]… → [`CdrDriver::finish_dao`], with
/// [`CdrDriver::abort_dao`] available at any point after initialization.
pub struct CdrDriver<T: ScsiTransport> {
	dev: T,
	kind: DriverKind,
	options: DriverOptions,
	hw: Option<HwInfo>,
	pub(crate) log: DaoLog,
	dao: Option<DaoState>,
}

impl<T: ScsiTransport> CdrDriver<T> {
	#[must_use]
	/// # New.
	///
	/// Wrap a transport with an explicit driver kind and options.
	pub fn new(dev: T, kind: DriverKind, options: DriverOptions) -> Self {
		let hw = dev.hw_info();
		Self {
			dev,
			kind,
			options,
			hw,
			log: DaoLog::new(),
			dao: None,
		}
	}

	#[must_use]
	/// # Detect.
	///
	/// Wrap a transport, choosing the driver kind and options from the
	/// vendor/model table.
	pub fn detect(dev: T) -> Self {
		let (kind, options) = dev.hw_info()
			.map_or_else(Default::default, |hw| options::select(&hw));
		Self::new(dev, kind, options)
	}

	#[must_use]
	/// # With Kind.
	///
	/// Override the driver kind.
	pub fn with_kind(mut self, kind: DriverKind) -> Self {
		self.kind = kind;
		self
	}

	#[must_use]
	/// # Driver Kind.
	pub const fn kind(&self) -> DriverKind { self.kind }

	#[must_use]
	/// # Driver Options.
	pub const fn options(&self) -> DriverOptions { self.options }

	#[must_use]
	/// # Hardware Info.
	pub const fn hw_info(&self) -> Option<&HwInfo> { self.hw.as_ref() }

	#[must_use]
	/// # Session Active?
	pub const fn in_session(&self) -> bool { self.dao.is_some() }

	#[cfg(test)]
	/// # Transport.
	pub(crate) const fn dev(&self) -> &T { &self.dev }

	#[cfg(test)]
	/// # Transport (Mutable).
	pub(crate) fn dev_mut(&mut self) -> &mut T { &mut self.dev }

	/// # Has Option?
	const fn has(&self, opt: DriverOptions) -> bool { self.options.contains(opt) }

	/// # Send.
	fn send(&mut self, cdb: &[u8], dir: DataDir<'_>) -> Result<(), BurnError> {
		self.dev.send(cdb, dir)
	}

	/// # Wire Block Size.
	///
	/// Raw writers add sub-channel to full sectors; everyone else sends the
	/// mode's write block as-is.
	pub(crate) fn block_size(&self, mode: TrackMode) -> usize {
		match self.kind {
			DriverKind::Mmc => usize::from(mode.write_block_size()),
			DriverKind::MmcRaw =>
				if self.has(DriverOptions::USE_PQ) {
					usize::from(CD_FRAME_SIZE + PQ_SUBCHANNEL_SIZE)
				}
				else { usize::from(CD_FRAME_SIZE + PW_SUBCHANNEL_SIZE) },
		}
	}

	/// # Raw Data Block Type (Page 0x05).
	const fn data_block_type(&self) -> u8 {
		match self.kind {
			DriverKind::Mmc => 0,
			DriverKind::MmcRaw =>
				if self.has(DriverOptions::USE_PQ) { 1 }
				else { 3 },
		}
	}
}

impl<T: ScsiTransport> CdrDriver<T> {
	/// # Test Unit Ready.
	///
	/// Unit attentions (disc changes, resets) can optionally be treated as
	/// success.
	pub fn test_unit_ready(&mut self, ignore_unit_attention: bool) -> UnitStatus {
		match self.send(&[0x00, 0, 0, 0, 0, 0], DataDir::None) {
			Ok(()) => UnitStatus::Ready,
			Err(BurnError::Scsi { sense: Some(s), .. }) =>
				if ignore_unit_attention && s.is_unit_attention() { UnitStatus::Ready }
				else if s.is_not_ready() { UnitStatus::NotReady }
				else { UnitStatus::Failed },
			Err(_) => UnitStatus::Failed,
		}
	}

	/// # Wait Until Ready.
	///
	/// ## Errors
	///
	/// Returns an error if there is no disc, the command fails outright, or
	/// the drive takes too long to settle.
	pub fn wait_ready(&mut self) -> Result<(), BurnError> {
		for _ in 0..READY_TRIES {
			match self.send(&[0x00, 0, 0, 0, 0, 0], DataDir::None) {
				Ok(()) => return Ok(()),
				Err(BurnError::Scsi { sense: Some(s), .. }) =>
					if s.is_no_medium() { return Err(BurnError::NoDisc); }
					else if ! s.is_not_ready() && ! s.is_unit_attention() {
						return Err(BurnError::Scsi { op: 0x00, sense: Some(s) });
					},
				Err(e) => return Err(e),
			}
			sleep(READY_DELAY);
		}

		Err(BurnError::NotReady)
	}

	/// # Read Capacity.
	///
	/// Return the number of readable blocks.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn read_capacity(&mut self) -> Result<u32, BurnError> {
		let mut buf = [0_u8; 8];
		self.send(&[0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0], DataDir::In(&mut buf))?;
		let last = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
		Ok(last.saturating_add(1))
	}

	/// # Start/Stop Unit.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn start_stop_unit(&mut self, start: bool, load_eject: bool) -> Result<(), BurnError> {
		let flags = (u8::from(load_eject) << 1) | u8::from(start);
		self.send(&[0x1B, 0, 0, 0, flags, 0], DataDir::None)
	}

	/// # Load Tray.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn load(&mut self) -> Result<(), BurnError> { self.start_stop_unit(true, true) }

	/// # Eject.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn eject(&mut self) -> Result<(), BurnError> {
		let _res = self.prevent_medium_removal(false);
		self.start_stop_unit(false, true)
	}

	/// # Prevent/Allow Medium Removal.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn prevent_medium_removal(&mut self, lock: bool) -> Result<(), BurnError> {
		self.send(&[0x1E, 0, 0, 0, u8::from(lock), 0], DataDir::None)
	}

	/// # Rezero Unit.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn rezero_unit(&mut self) -> Result<(), BurnError> {
		self.send(&[0x01, 0, 0, 0, 0, 0], DataDir::None)
	}

	/// # Flush Cache.
	///
	/// Errors are logged but otherwise ignored; there is nothing useful to
	/// do about them.
	pub fn flush_cache(&mut self) {
		if let Err(e) = self.send(&[0x35, 0, 0, 0, 0, 0, 0, 0, 0, 0], DataDir::None) {
			self.log.add_error(0, &e);
		}
	}

	/// # Set Write Speed.
	///
	/// Speeds are multiples of 1x (176 KB/s); zero means as fast as
	/// possible.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn set_speed(&mut self, speed: u16) -> Result<(), BurnError> {
		let [w1, w2] = speed_kb(speed).to_be_bytes();
		self.send(&[0xBB, 0, 0xFF, 0xFF, w1, w2, 0, 0, 0, 0, 0, 0], DataDir::None)
	}

	/// # Set Read Speed.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn set_read_speed(&mut self, speed: u16) -> Result<(), BurnError> {
		let [r1, r2] = speed_kb(speed).to_be_bytes();
		self.send(&[0xBB, 0, r1, r2, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0], DataDir::None)
	}

	/// # Send OPC Information.
	///
	/// Ask the drive to perform power calibration, unless the model is known
	/// to choke on it. Failures are logged and ignored; plenty of drives
	/// calibrate on their own.
	pub fn send_opc(&mut self) {
		if self.has(DriverOptions::NO_OPC) { return; }
		if let Err(e) = self.send(&[0x54, 0x01, 0, 0, 0, 0, 0, 0, 0, 0], DataDir::None) {
			self.log.add_error(0, &e);
		}
	}

	/// # Mechanism Status.
	///
	/// Return `true` if the tray is open.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn mechanism_status(&mut self) -> Result<bool, BurnError> {
		let mut buf = [0_u8; 8];
		self.send(&[0xBD, 0, 0, 0, 0, 0, 0, 0, 0, 8, 0, 0], DataDir::In(&mut buf))?;
		Ok(0 != buf[1] & 0b0001_0000)
	}

	/// # Buffer Fill.
	///
	/// Return the drive's buffer fill (as a percentage), if it reports a
	/// buffer at all.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn buffer_capacity(&mut self) -> Result<Option<u8>, BurnError> {
		let mut buf = [0_u8; 12];
		self.send(&[0x5C, 0, 0, 0, 0, 0, 0, 0, 12, 0], DataDir::In(&mut buf))?;
		let len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
		let blank = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
		if len == 0 || len < blank { return Ok(None); }

		let used = u64::from(len - blank) * 100 / u64::from(len);
		Ok(u8::try_from(used).ok())
	}

	/// # Current Profile.
	///
	/// Return the current media profile (e.g. `0x0009` for CD-R, `0x000A`
	/// for CD-RW).
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn current_profile(&mut self) -> Result<u16, BurnError> {
		let mut buf = [0_u8; 8];
		self.send(&[0x46, 0x02, 0, 0, 0, 0, 0, 0, 8, 0], DataDir::In(&mut buf))?;
		Ok(u16::from_be_bytes([buf[6], buf[7]]))
	}

	/// # Blank.
	///
	/// Erase a rewritable disc, polling until the drive is ready again. When
	/// `simulate` is set, the test-write bit is raised first.
	///
	/// ## Errors
	///
	/// Returns an error if the disc can't be blanked, or the operation is
	/// aborted (which is only checked between polls; the drive will finish
	/// regardless).
	pub fn blank<R: Reporter + ?Sized>(
		&mut self,
		mode: BlankMode,
		simulate: bool,
		reporter: &R,
		killed: &crate::KillSwitch,
	) -> Result<(), BurnError> {
		self.wait_ready()?;
		if simulate { self.set_test_write(true)?; }

		reporter.status(Phase::Blank, 0);
		self.send(
			&[0xA1, 0x10 | mode.code(), 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
			DataDir::None,
		)?;

		for _ in 0..BLANK_TRIES {
			match self.test_unit_ready(true) {
				UnitStatus::Ready => {
					reporter.finished(0);
					return Ok(());
				},
				UnitStatus::NotReady => {},
				UnitStatus::Failed => {
					reporter.finished(1);
					return Err(BurnError::NotReady);
				},
			}
			if killed.killed() {
				reporter.message(
					MessageKind::Warning,
					"The drive will finish blanking in the background.",
				);
				reporter.finished(1);
				return Err(BurnError::Killed);
			}
			sleep(READY_DELAY);
		}

		reporter.finished(1);
		Err(BurnError::NotReady)
	}
}

impl<T: ScsiTransport> CdrDriver<T> {
	/// # Write Data.
	///
	/// Write `count` blocks of `mode` data starting at `lba`, in chunks of
	/// however many blocks fit in a single transfer. `buf` holds write-format
	/// blocks (see [`TrackMode::write_block_size`]); raw drivers expand them
	/// into full sectors with synthesized sub-channel along the way.
	///
	/// `lba` is advanced in place as chunks succeed. "Long write in
	/// progress" conditions are waited out and the same chunk retried; any
	/// other failure ends the call.
	///
	/// ## Errors
	///
	/// Returns an error if the buffer is too small, the address is out of
	/// order, or a write fails.
	pub fn write_data(&mut self, mode: TrackMode, lba: &mut i32, buf: &[u8], count: u32)
	-> Result<(), BurnError> {
		let src_size = usize::from(mode.write_block_size());
		let total = usize::try_from(count).map_err(|_| BurnError::Bug("block count overflow"))?;
		if buf.len() < src_size * total { return Err(BurnError::Bug("short write buffer")); }

		if let Some(dao) = &self.dao {
			if *lba != dao.next_lba { return Err(BurnError::Bug("out-of-order write")); }
		}

		let wire = self.block_size(mode);
		let per = (self.dev.max_transfer() / wire).clamp(1, usize::from(u16::MAX));
		let raw = matches!(self.kind, DriverKind::MmcRaw);
		let pq = self.has(DriverOptions::USE_PQ);
		let bcd = self.has(DriverOptions::PQ_BCD);

		let mut done = 0;
		while done < total {
			let n = per.min(total - done);
			let blocks = u16::try_from(n).map_err(|_| BurnError::Bug("chunk overflow"))?;
			let chunk = &buf[done * src_size..(done + n) * src_size];

			if raw {
				let dao = self.dao.as_mut()
					.ok_or(BurnError::Bug("raw writes require an active session"))?;
				dao.encode_raw(mode, *lba, chunk, pq, bcd)?;
				write10(&mut self.dev, &mut self.log, *lba, blocks, &dao.buf)?;
			}
			else {
				write10(&mut self.dev, &mut self.log, *lba, blocks, chunk)?;
			}

			*lba += i32::from(blocks);
			done += n;
			if let Some(dao) = self.dao.as_mut() { dao.next_lba = *lba; }
		}

		Ok(())
	}

	/// # Write Zeros.
	///
	/// Write `count` empty blocks starting at `lba`. For the raw data modes
	/// each block is a complete sector, headed with `enc_lba` (advancing
	/// alongside).
	///
	/// ## Errors
	///
	/// Returns an error if any write fails.
	pub fn write_zeros(&mut self, mode: TrackMode, lba: &mut i32, enc_lba: i32, count: u32)
	-> Result<(), BurnError> {
		let size = usize::from(mode.write_block_size());
		let mut buf = vec![0_u8; size * ZERO_CHUNK as usize];
		let mut enc = enc_lba;
		let mut left = count;
		while 0 < left {
			let n = left.min(ZERO_CHUNK);
			for block in buf.chunks_exact_mut(size).take(n as usize) {
				crate::sector::zero_block(mode, enc, block);
				enc += 1;
			}
			self.write_data(mode, lba, &buf[..size * n as usize], n)?;
			left -= n;
		}
		Ok(())
	}
}



/// # Speed in KB/s.
const fn speed_kb(speed: u16) -> u16 {
	if speed == 0 { u16::MAX }
	else { speed.saturating_mul(176) }
}

/// # WRITE(10).
///
/// Send one chunk, waiting out "long write in progress" conditions.
fn write10<T: ScsiTransport>(
	dev: &mut T,
	log: &mut DaoLog,
	lba: i32,
	blocks: u16,
	data: &[u8],
) -> Result<(), BurnError> {
	let [a, b, c, d] = lba.to_be_bytes();
	let [e, f] = blocks.to_be_bytes();
	let cdb = [0x2A, 0, a, b, c, d, 0, e, f, 0];

	let mut tries = 0_u16;
	loop {
		match dev.send(&cdb, DataDir::Out(data)) {
			Ok(()) => return Ok(()),
			Err(BurnError::Scsi { op, sense: Some(s) }) if is_busy(s) => {
				tries += 1;
				if LONG_WRITE_TRIES <= tries {
					let err = BurnError::Scsi { op, sense: Some(s) };
					log.add_error(lba, &err);
					return Err(err);
				}
				log.add_retry(lba);
				sleep(LONG_WRITE_DELAY);
			},
			Err(err) => {
				log.add_error(lba, &err);
				return Err(err);
			},
		}
	}
}

/// # Busy?
const fn is_busy(sense: Sense) -> bool { sense.is_long_write_in_progress() }
