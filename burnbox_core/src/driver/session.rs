/*!
# Burnbox: Write Session

Both driver kinds share the same lifecycle: initialize (checks, mode
pages, addressing), start (cue sheet and/or lead-in, first pause), stream
the program area via `write_data`, then finish (lead-out for raw writers,
flush, fixation).
*/

use crate::{
	BurnError,
	CD_FRAME_SIZE,
	CD_LEADIN,
	CD_LEADOUT_LEN,
	CdText,
	CdrDriver,
	CueSheet,
	DataDir,
	DiskInfo,
	DiskStatus,
	DriverKind,
	DriverOptions,
	MAX_TRACKS,
	ScsiTransport,
	Toc,
	TocCheck,
	TocType,
	TrackMode,
	WriteOptions,
	cdtext::PACK_SIZE,
	sector::encode_sector,
};
use super::{
	raw::{
		pq_hex,
		RawLayout,
	},
	write10,
};
use std::time::Duration;



/// # Session Timeout.
///
/// Fixation (and some cue sheets) can keep the drive busy for minutes.
const DAO_TIMEOUT: Duration = Duration::from_secs(600);

/// # Default Lead-in Start.
///
/// This is 97:26:66 in ATIP terms, a common value, used when the disc
/// doesn't say.
const DEFAULT_LEAD_IN: i32 = -11_634;

/// # Minimum Lead-in Length.
///
/// Used to place the CD-TEXT lead-in of a follow-up session.
const MIN_LEAD_IN: i32 = 4500;

/// # R-W Block Size.
const RW_SIZE: usize = 96;



#[derive(Debug)]
/// # Session State.
///
/// Everything the driver needs to remember between `init_dao` and
/// `finish_dao`.
pub(super) struct DaoState {
	/// # Next Expected Write Address.
	pub(super) next_lba: i32,

	/// # Transport Timeout (To Restore).
	saved_timeout: Duration,

	/// # Program Area Start (Absolute).
	session_lba: i32,

	/// # Lead-out Start (Absolute).
	leadout: i32,

	/// # First Write Address.
	lead_in_start: i32,

	/// # Writing Started?
	started: bool,

	first_mode: TrackMode,
	lead_in_mode: TrackMode,
	lead_out_mode: TrackMode,

	/// # Cue Sheet (Session-At-Once Only).
	cue: Option<CueSheet>,

	/// # CD-TEXT Packs.
	packs: Vec<[u8; PACK_SIZE]>,

	/// # Raw Layout (Raw Only).
	layout: Option<RawLayout>,

	/// # Raw Output Buffer.
	pub(super) buf: Vec<u8>,
}

impl DaoState {
	/// # Encode Raw Blocks.
	///
	/// Expand write-format blocks into full sectors with synthesized
	/// sub-channel, leaving the result in `self.buf`.
	///
	/// ## Errors
	///
	/// Returns an error if there is no raw layout.
	pub(super) fn encode_raw(
		&mut self,
		mode: TrackMode,
		lba: i32,
		data: &[u8],
		pq: bool,
		bcd: bool,
	) -> Result<(), BurnError> {
		let layout = self.layout.as_ref()
			.ok_or(BurnError::Bug("raw writes require a raw layout"))?;

		let src = usize::from(mode.write_block_size());
		let frame = usize::from(CD_FRAME_SIZE);
		let wire = frame + if pq { 16 } else { RW_SIZE };
		let count = data.len() / src;

		self.buf.resize(count * wire, 0);
		for ((block, out), l) in data.chunks_exact(src).zip(self.buf.chunks_exact_mut(wire)).zip(lba..) {
			encode_sector(mode, l, block, out);
			let sub = layout.subchannel(l);
			if pq {
				let raw = if bcd { sub.to_pq16() } else { pq_hex(&sub) };
				out[frame..].copy_from_slice(&raw);
			}
			else {
				let rw = layout.rw(l);
				out[frame..].copy_from_slice(&sub.to_pw96(rw.as_ref()));
			}
		}

		Ok(())
	}
}



impl<T: ScsiTransport> CdrDriver<T> {
	#[must_use]
	/// # Check TOC (Driver).
	///
	/// Flag anything about the TOC this particular driver can't (or
	/// shouldn't) write. See also [`Toc::check`].
	pub fn check_toc(&self, toc: &Toc, opts: &WriteOptions) -> TocCheck {
		let mut warnings = Vec::new();
		let mut errors = Vec::new();

		if
			opts.cd_text() &&
			toc.cd_text().is_some_and(|t| ! t.is_empty()) &&
			matches!(self.kind, DriverKind::Mmc) &&
			! self.has(DriverOptions::CD_TEXT)
		{
			warnings.push("This drive cannot write CD-TEXT; it will be skipped.".to_owned());
		}

		if matches!(self.kind, DriverKind::Mmc) {
			for (t, num) in toc.tracks().iter().zip(1_u8..) {
				if t.mode().is_raw() {
					errors.push(format!(
						"Track {num:02} ({}) requires the raw driver.",
						t.mode(),
					));
				}
			}
		}

		if opts.multi_session() && ! matches!(toc.kind(), TocType::CdRomXa) {
			errors.push("Multi-session discs must be CD-ROM-XA.".to_owned());
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

	/// # Initialize Session.
	///
	/// Check the TOC and disc, configure the drive, and work out where
	/// everything goes. Nothing is written yet.
	///
	/// ## Errors
	///
	/// Returns an error if the TOC fails its checks, the disc is unsuitable
	/// or too small, or the drive can't be configured.
	pub fn init_dao(&mut self, toc: &Toc, opts: &WriteOptions) -> Result<DiskInfo, BurnError> {
		if self.dao.is_some() { return Err(BurnError::Bug("session already active")); }
		if toc.is_empty() { return Err(BurnError::Noop); }
		for check in [toc.check(), self.check_toc(toc, opts)] {
			if let TocCheck::Error(msgs) = check {
				return Err(BurnError::TocCheck(msgs.join(" ")));
			}
		}

		self.wait_ready()?;
		let info = self.disk_info()?;
		let raw = matches!(self.kind, DriverKind::MmcRaw);
		match info.status {
			DiskStatus::Empty => {},
			DiskStatus::Appendable => if raw { return Err(BurnError::DiskNotEmpty); },
			DiskStatus::Complete | DiskStatus::Other => return Err(BurnError::DiskNotAppendable),
		}

		let first_session = matches!(info.status, DiskStatus::Empty);
		let (prev_last, session_lba) =
			if first_session { (0, 0) }
			else { (info.last_track, info.this_session_lba + CD_LEADIN) };
		if MAX_TRACKS < prev_last.saturating_add(toc.len()) {
			return Err(BurnError::TrackCount);
		}

		let needed = toc.blocks().saturating_add(CD_LEADIN.unsigned_abs());
		if ! opts.force() && info.capacity < needed {
			return Err(BurnError::Capacity { needed, available: info.capacity });
		}

		// Speed and capability problems aren't fatal.
		if let Err(e) = self.set_speed(opts.speed()) { self.log.add_error(0, &e); }
		let burnproof = self.capabilities().is_ok_and(|c| c.burnproof);
		self.set_write_params(toc, opts, first_session, burnproof)?;
		self.send_opc();

		let packs =
			if opts.cd_text() && (raw || self.has(DriverOptions::CD_TEXT)) {
				match toc.cd_text().filter(|t| ! t.is_empty()) {
					Some(t) => t.encode(prev_last + 1, prev_last + toc.len())?,
					None => Vec::new(),
				}
			}
			else { Vec::new() };

		let lead_in_start =
			if first_session { info.lead_in_start.unwrap_or(DEFAULT_LEAD_IN) }
			else { session_lba - CD_LEADIN - MIN_LEAD_IN };

		let (cue, layout, next_lba) = match self.kind {
			DriverKind::Mmc => {
				let cue = CueSheet::new(toc, ! packs.is_empty(), prev_last, session_lba)?;
				let next =
					if packs.is_empty() { session_lba - CD_LEADIN }
					else { lead_in_start };
				(Some(cue), None, next)
			},
			DriverKind::MmcRaw => {
				let layout = RawLayout::new(
					toc,
					lead_in_start,
					opts.multi_session(),
					info.lead_out_max,
					packs.clone(),
				);
				(None, Some(layout), lead_in_start)
			},
		};

		let saved_timeout = self.dev.timeout();
		self.dev.set_timeout(DAO_TIMEOUT);
		if let Err(e) = self.prevent_medium_removal(true) { self.log.add_error(0, &e); }

		self.dao = Some(DaoState {
			next_lba,
			saved_timeout,
			session_lba,
			leadout: session_lba + toc.leadout(),
			lead_in_start,
			started: false,
			first_mode: toc.tracks().first().map_or(TrackMode::Audio, |t| t.mode()),
			lead_in_mode: toc.lead_in_mode(),
			lead_out_mode: toc.lead_out_mode(),
			cue,
			packs,
			layout,
			buf: Vec::new(),
		});

		Ok(info)
	}

	/// # Start Session.
	///
	/// Send the cue sheet (session-at-once) or the lead-in (raw), then the
	/// two-second pause before the first track. Returns the LBA where the
	/// program area begins; `write_data` should continue from there.
	///
	/// ## Errors
	///
	/// Returns an error if no session was initialized, or any of the
	/// writes fail.
	pub fn start_dao(&mut self) -> Result<i32, BurnError> {
		let state = self.dao.as_mut().ok_or(BurnError::Bug("no active session"))?;
		if state.started { return Err(BurnError::Bug("session already started")); }
		state.started = true;

		let session_lba = state.session_lba;
		let pause = session_lba - CD_LEADIN;
		let first_mode = state.first_mode;
		let lead_in_mode = state.lead_in_mode;
		let lead_in_start = state.lead_in_start;
		let cue = state.cue.as_ref().map(CueSheet::to_bytes);
		let packs = if cue.is_some() { state.packs.clone() } else { Vec::new() };

		match cue {
			Some(cue) => {
				let len = u32::try_from(cue.len()).map_err(|_| BurnError::Bug("cue sheet overflow"))?;
				let [_, a, b, c] = len.to_be_bytes();
				self.send(&[0x5D, 0, 0, 0, 0, 0, a, b, c, 0], DataDir::Out(&cue))?;
				if ! packs.is_empty() { self.write_text_lead_in(&packs, lead_in_start, pause)?; }
			},
			None => {
				let mut lba = lead_in_start;
				let count = u32::try_from(pause - lead_in_start).unwrap_or_default();
				self.write_zeros(lead_in_mode, &mut lba, lead_in_start, count)?;
			},
		}

		let mut lba = pause;
		self.write_zeros(first_mode, &mut lba, pause, CD_LEADIN.unsigned_abs())?;
		Ok(session_lba)
	}

	/// # Finish Session.
	///
	/// Write the lead-out (raw), flush, and wait for the drive to finish
	/// fixating. The session is closed afterward, success or failure.
	///
	/// ## Errors
	///
	/// Returns an error if the program area is incomplete or the drive
	/// fails to settle.
	pub fn finish_dao(&mut self) -> Result<(), BurnError> {
		let res = self.finish_program();
		if self.dao.as_ref().is_some_and(|s| s.started) { self.flush_cache(); }
		let res = res.and_then(|()| self.wait_ready());
		self.close_dao();
		res
	}

	/// # Finish Program Area.
	///
	/// Make sure everything was written, then add the lead-out (raw).
	fn finish_program(&mut self) -> Result<(), BurnError> {
		let state = self.dao.as_ref().ok_or(BurnError::Bug("no active session"))?;
		if ! state.started { return Err(BurnError::Bug("session not started")); }
		if state.next_lba != state.leadout {
			return Err(BurnError::Bug("incomplete program area"));
		}

		if matches!(self.kind, DriverKind::MmcRaw) {
			let mode = state.lead_out_mode;
			let mut lba = state.leadout;
			let enc_lba = lba;
			self.write_zeros(mode, &mut lba, enc_lba, CD_LEADOUT_LEN)?;
		}

		Ok(())
	}

	/// # Abort Session.
	///
	/// Stop wherever things are, restoring the drive's timeout and unlocking
	/// the tray. This never fails; there'd be no way to handle it if it did.
	pub fn abort_dao(&mut self) {
		if self.dao.as_ref().is_some_and(|s| s.started) { self.flush_cache(); }
		self.close_dao();
	}

	/// # Close Session.
	fn close_dao(&mut self) {
		if let Some(state) = self.dao.take() {
			self.dev.set_timeout(state.saved_timeout);
			if let Err(e) = self.prevent_medium_removal(false) { self.log.add_error(0, &e); }
		}
	}

	/// # Write CD-TEXT Lead-in.
	///
	/// Session-at-once drives with CD-TEXT support expect the host to supply
	/// the lead-in R-W data, 96 bytes per block, up to the first pause.
	fn write_text_lead_in(&mut self, packs: &[[u8; PACK_SIZE]], start: i32, end: i32)
	-> Result<(), BurnError> {
		let per = i32::try_from((self.dev.max_transfer() / RW_SIZE).clamp(1, usize::from(u16::MAX)))
			.unwrap_or(1);
		let mut buf = Vec::with_capacity(RW_SIZE * per.unsigned_abs() as usize);
		let mut lba = start;
		while lba < end {
			let n = per.min(end - lba);
			buf.clear();
			for l in lba..lba + n {
				let idx = usize::try_from(l - start).unwrap_or_default();
				buf.extend_from_slice(&CdText::rw_symbols(packs, idx));
			}
			let blocks = u16::try_from(n).map_err(|_| BurnError::Bug("chunk overflow"))?;
			write10(&mut self.dev, &mut self.log, lba, blocks, &buf)?;
			lba += n;
			if let Some(state) = self.dao.as_mut() { state.next_lba = lba; }
		}
		Ok(())
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		CdTextKind,
		SubChannel,
		SubTrack,
		Track,
		PQ_SUBCHANNEL_SIZE,
		scsi::mock::{
			disc,
			FakeDrive,
		},
	};

	/// # Track Length.
	const LEN: u32 = 300;

	/// # Drive With a Blank Disc.
	fn drive(kind: DriverKind, options: DriverOptions, status: u8, capacity: u32)
	-> CdrDriver<FakeDrive> {
		let mut drv = CdrDriver::new(FakeDrive::default(), kind, options);
		disc(drv.dev_mut(), status, capacity);
		drv
	}

	/// # Audio TOC.
	fn toc(tracks: usize) -> Toc {
		let mut toc = Toc::new(TocType::CdDa);
		let bytes = u64::from(LEN) * u64::from(CD_FRAME_SIZE);
		for _ in 0..tracks {
			toc.push_track(Track::new(TrackMode::Audio).with_subtrack(SubTrack::zero(bytes)))
				.expect("Push failed.");
		}
		toc
	}

	/// # Write the Program Area.
	fn program(drv: &mut CdrDriver<FakeDrive>, toc: &Toc, mut lba: i32) {
		let buf = vec![0_u8; usize::from(CD_FRAME_SIZE) * LEN as usize];
		for _ in toc.tracks() {
			drv.write_data(TrackMode::Audio, &mut lba, &buf, LEN).expect("Write failed.");
		}
	}

	#[test]
	fn t_session_mmc() {
		let mut drv = drive(DriverKind::Mmc, DriverOptions::empty(), 0, 300_000);
		let toc = toc(2);
		let opts = WriteOptions::default();

		let info = drv.init_dao(&toc, &opts).expect("Init failed.");
		assert_eq!(info.status, DiskStatus::Empty);
		assert!(drv.in_session());
		assert_eq!(drv.dev().timeout, DAO_TIMEOUT);
		assert!(drv.dev().writes.is_empty(), "Nothing is written during init.");

		let start = drv.start_dao().expect("Start failed.");
		assert_eq!(start, 0);

		// Cue sheet: lead-in, two tracks, lead-out.
		let cue = drv.dev().commands(0x5D).next().expect("Missing cue sheet.");
		assert_eq!(cue.data.len(), 4 * 8);
		assert_eq!(cue.cdb[6..9], [0, 0, 32]);

		// Out-of-order writes are refused.
		let buf = vec![0_u8; usize::from(CD_FRAME_SIZE)];
		let mut bad = 5;
		assert_eq!(
			drv.write_data(TrackMode::Audio, &mut bad, &buf, 1),
			Err(BurnError::Bug("out-of-order write")),
		);

		program(&mut drv, &toc, start);
		drv.finish_dao().expect("Finish failed.");
		assert!(! drv.in_session());

		// The pause and program area should be contiguous from -150.
		let writes = &drv.dev().writes;
		assert_eq!(writes.first().map(|w| w.0), Some(-150));
		for pair in writes.windows(2) {
			assert_eq!(pair[0].0 + i32::from(pair[0].1), pair[1].0, "Writes not contiguous.");
		}
		let total: i32 = writes.iter().map(|w| i32::from(w.1)).sum();
		assert_eq!(total, 150 + 600);

		// Order of operations.
		let ops = drv.dev().ops();
		let pos = |op: u8| ops.iter().position(|o| *o == op).expect("Missing op.");
		assert!(pos(0x55) < pos(0x5D), "Mode select before cue sheet.");
		assert!(pos(0x5D) < pos(0x2A), "Cue sheet before data.");
		assert!(ops.iter().rposition(|o| *o == 0x2A) < ops.iter().rposition(|o| *o == 0x35));

		// Lock, then unlock; timeout restored.
		let locks: Vec<u8> = drv.dev().commands(0x1E).map(|c| c.cdb[4]).collect();
		assert_eq!(locks, vec![1, 0]);
		assert_eq!(drv.dev().timeout, Duration::from_secs(60));
	}

	#[test]
	fn t_session_raw() {
		let mut drv = drive(DriverKind::MmcRaw, DriverOptions::USE_PQ, 0, 300_000);
		drv.dev_mut().max_transfer = 64 * 2368;
		let toc = toc(1);
		let opts = WriteOptions::default();

		drv.init_dao(&toc, &opts).expect("Init failed.");
		let start = drv.start_dao().expect("Start failed.");
		assert_eq!(start, 0);

		let lead_in = crate::Msf::lead_in_lba(97, 26, 66);
		assert_eq!(drv.dev().writes.first().map(|w| w.0), Some(lead_in));

		// Every raw block carries 16 bytes of sub-channel.
		let wire = usize::from(CD_FRAME_SIZE + PQ_SUBCHANNEL_SIZE);
		for cmd in drv.dev().commands(0x2A) {
			let blocks = usize::from(u16::from_be_bytes([cmd.cdb[7], cmd.cdb[8]]));
			assert_eq!(cmd.data.len(), blocks * wire);
		}

		// The first lead-in block should be a TOC entry for track 1.
		let first = drv.dev().commands(0x2A).next().expect("No writes.");
		let raw: [u8; 16] = first.data[2352..2368].try_into().expect("Bad PQ.");
		let sub = SubChannel::from_pq16(&raw);
		assert_eq!(sub.point().map(|(p, _)| p), Some(1));

		program(&mut drv, &toc, start);
		drv.finish_dao().expect("Finish failed.");

		let (lba, len) = drv.dev().writes.last().copied().expect("No writes.");
		assert_eq!(lba + i32::from(len), 300 + 6750, "Missing lead-out.");
		let total: i32 = drv.dev().writes.iter().map(|w| i32::from(w.1)).sum();
		assert_eq!(total, -lead_in + 300 + 6750);
	}

	#[test]
	fn t_session_text() {
		let mut drv = drive(DriverKind::Mmc, DriverOptions::CD_TEXT, 0, 300_000);
		let mut toc = toc(1);
		let mut text = CdText::default();
		let block = text.add_block(crate::cdtext::LANGUAGE_ENGLISH).expect("Block failed.");
		block.set(CdTextKind::Title, 0, "Album").expect("Set failed.");
		block.set(CdTextKind::Title, 1, "Song").expect("Set failed.");
		toc.set_cd_text(Some(text));

		drv.init_dao(&toc, &WriteOptions::default()).expect("Init failed.");
		drv.start_dao().expect("Start failed.");

		let lead_in = crate::Msf::lead_in_lba(97, 26, 66);
		let first = drv.dev().commands(0x2A).next().expect("No writes.");
		assert_eq!(first.cdb[2..6], lead_in.to_be_bytes());
		assert_eq!(first.data.len() % RW_SIZE, 0, "Lead-in blocks are R-W only.");

		let lead: i32 = drv.dev().writes.iter()
			.filter(|w| w.0 < -150)
			.map(|w| i32::from(w.1))
			.sum();
		assert_eq!(lead, -150 - lead_in);

		// Without the option, there's just a warning.
		let drv = drive(DriverKind::Mmc, DriverOptions::empty(), 0, 300_000);
		let check = drv.check_toc(&toc, &WriteOptions::default());
		assert!(matches!(check, TocCheck::Warning(_)));
	}

	#[test]
	fn t_disc_state() {
		let toc = toc(1);
		let opts = WriteOptions::default();

		let mut drv = drive(DriverKind::Mmc, DriverOptions::empty(), 0b10, 300_000);
		assert_eq!(drv.init_dao(&toc, &opts), Err(BurnError::DiskNotAppendable));
		assert!(! drv.in_session());

		let mut drv = drive(DriverKind::MmcRaw, DriverOptions::empty(), 0b01, 300_000);
		assert_eq!(drv.init_dao(&toc, &opts), Err(BurnError::DiskNotEmpty));

		// Appending a session shifts things past the previous one.
		let mut drv = drive(DriverKind::Mmc, DriverOptions::empty(), 0b01, 300_000);
		drv.init_dao(&toc, &opts).expect("Init failed.");
		assert_eq!(drv.start_dao(), Ok(20_150));
		assert_eq!(drv.dev().writes.first().map(|w| w.0), Some(20_000));
		drv.abort_dao();

		// Too small.
		let mut drv = drive(DriverKind::Mmc, DriverOptions::empty(), 0, 100);
		assert_eq!(
			drv.init_dao(&toc, &opts),
			Err(BurnError::Capacity { needed: 450, available: 100 }),
		);
		let mut drv = drive(DriverKind::Mmc, DriverOptions::empty(), 0, 100);
		assert!(drv.init_dao(&toc, &opts.with_force(true)).is_ok(), "Force skips capacity.");
	}

	#[test]
	fn t_check_toc() {
		let drv = drive(DriverKind::Mmc, DriverOptions::empty(), 0, 300_000);
		let mut toc = Toc::new(TocType::CdRom);
		toc.push_track(
			Track::new(TrackMode::Mode1Raw)
				.with_subtrack(SubTrack::zero(u64::from(LEN) * 2352))
		).expect("Push failed.");

		let check = drv.check_toc(&toc, &WriteOptions::default());
		assert!(check.is_error(), "Raw modes need the raw driver.");

		let drv = drv.with_kind(DriverKind::MmcRaw);
		assert!(drv.check_toc(&toc, &WriteOptions::default()).is_ok());

		let check = drv.check_toc(&toc, &WriteOptions::default().with_multi_session(true));
		assert!(check.is_error(), "Multi-session needs XA.");
		toc.set_kind(TocType::CdRomXa);
		let check = drv.check_toc(&toc, &WriteOptions::default().with_multi_session(true));
		assert!(check.is_ok());
	}

	#[test]
	fn t_abort() {
		let mut drv = drive(DriverKind::Mmc, DriverOptions::empty(), 0, 300_000);
		let toc = toc(1);

		// Nothing to do.
		drv.abort_dao();
		assert_eq!(drv.dev().commands(0x1E).count(), 0);

		drv.init_dao(&toc, &WriteOptions::default()).expect("Init failed.");
		assert_eq!(drv.start_dao().map(|_| ()), Ok(()));
		drv.dev_mut().fail(0x35, None);
		drv.abort_dao();
		assert!(! drv.in_session());
		assert_eq!(drv.dev().timeout, Duration::from_secs(60));
		assert_eq!(drv.dev().commands(0x1E).last().map(|c| c.cdb[4]), Some(0));

		// Sessions can't be restarted.
		assert_eq!(drv.start_dao(), Err(BurnError::Bug("no active session")));
	}

	#[test]
	fn t_finish_failures() {
		// An incomplete program area still closes the session.
		let mut drv = drive(DriverKind::Mmc, DriverOptions::empty(), 0, 300_000);
		let toc = toc(1);
		drv.init_dao(&toc, &WriteOptions::default()).expect("Init failed.");
		drv.start_dao().expect("Start failed.");
		assert_eq!(drv.finish_dao(), Err(BurnError::Bug("incomplete program area")));
		assert!(! drv.in_session(), "Failed finishes must close the session.");
		assert_eq!(drv.dev().timeout, Duration::from_secs(60), "Timeout not restored.");
		assert_eq!(drv.dev().commands(0x1E).last().map(|c| c.cdb[4]), Some(0), "Tray still locked.");

		// So does a failed raw lead-out.
		let mut drv = drive(DriverKind::MmcRaw, DriverOptions::USE_PQ, 0, 300_000);
		drv.dev_mut().max_transfer = 64 * 2368;
		drv.init_dao(&toc, &WriteOptions::default()).expect("Init failed.");
		let start = drv.start_dao().expect("Start failed.");
		program(&mut drv, &toc, start);
		drv.dev_mut().fail(0x2A, None);
		assert_eq!(drv.finish_dao(), Err(BurnError::Scsi { op: 0x2A, sense: None }));
		assert!(! drv.in_session(), "Failed lead-outs must close the session.");
		assert_eq!(drv.dev().timeout, Duration::from_secs(60), "Timeout not restored.");
		assert_eq!(drv.dev().commands(0x1E).last().map(|c| c.cdb[4]), Some(0), "Tray still locked.");
		assert_eq!(drv.dev().ops().last(), Some(&0x1E), "Unlock should come last.");
	}
}
